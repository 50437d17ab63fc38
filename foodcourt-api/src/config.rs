use std::net::SocketAddr;

use chrono::TimeDelta;
use clap::Args;
use foodcourt_service::order::StatusPolicy;

#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// HMAC secret used to sign access tokens.
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:5000")]
    pub listen_addr: SocketAddr,

    #[arg(long, env = "ACCESS_TOKEN_EXPIRES_HOURS", default_value_t = 8)]
    pub access_token_expires_hours: i64,

    /// `strict` only allows forward moves and cancellation; `permissive`
    /// accepts any status change.
    #[arg(long, env = "ORDER_STATUS_POLICY", default_value = "strict")]
    pub order_status_policy: StatusPolicy,

    /// Apply pending migrations before serving.
    #[arg(long)]
    pub migrate: bool,
}

impl ServeArgs {
    pub fn access_token_expires(&self) -> TimeDelta {
        TimeDelta::hours(self.access_token_expires_hours)
    }
}

#[derive(Args, Debug, Clone)]
pub struct CreateAdminArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub email: String,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,
}
