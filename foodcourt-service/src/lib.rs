use diesel::{Connection, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod models;
pub mod order;
pub mod pricing;
pub mod schema;
pub mod store;

#[cfg(test)]
mod test_support;

pub use error::Error;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

pub fn establish_connection(database_url: &str) -> Result<PgConnection, Error> {
    Ok(PgConnection::establish(database_url)?)
}

pub fn run_migrations(database_url: &str) -> Result<usize, Error> {
    let mut conn = establish_connection(database_url)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Internal(format!("Failed to run migrations: {e}")))?;
    Ok(applied.len())
}
