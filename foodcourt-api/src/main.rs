use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use foodcourt_service::{auth, store::PgStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod handlers;
mod models;


use config::{CreateAdminArgs, DatabaseArgs, ServeArgs};
use handlers::{AppState, app};

#[derive(Parser)]
#[command(version, about = "Food ordering backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve(ServeArgs),
    /// Apply pending database migrations
    Migrate(DatabaseArgs),
    /// Create an administrator account
    CreateAdmin(CreateAdminArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Migrate(args) => migrate(&args),
        Commands::CreateAdmin(args) => create_admin(args),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    if args.migrate {
        migrate(&args.database)?;
    }

    let store = Arc::new(PgStore::new(args.database.database_url.clone()));
    let state = AppState::new(
        store,
        &args.secret_key,
        args.access_token_expires(),
        args.order_status_policy,
    );

    let listener = tokio::net::TcpListener::bind(args.listen_addr)
        .await
        .with_context(|| format!("cannot bind {}", args.listen_addr))?;
    info!(
        order_status_policy = %args.order_status_policy,
        "Foodcourt API listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app(state)).await?;

    Ok(())
}

fn migrate(args: &DatabaseArgs) -> anyhow::Result<()> {
    let applied = foodcourt_service::run_migrations(&args.database_url)?;
    info!(applied, "migrations up to date");
    Ok(())
}

fn create_admin(args: CreateAdminArgs) -> anyhow::Result<()> {
    let store: Arc<dyn foodcourt_service::store::Store> =
        Arc::new(PgStore::new(args.database.database_url));
    let user = auth::create_admin(&store, &args.name, &args.email, &args.password)?;
    info!(user_id = %user.id, email = %user.email, "admin created");
    Ok(())
}
