// Launchpad Infrastructure - SQLite Adapter
// Implements: JobRepository, Maintenance

mod connection;
mod error;
mod job_repository;
mod maintenance_impl;
mod migration;

pub use connection::create_pool;
pub use job_repository::SqliteJobRepository;
pub use maintenance_impl::SqliteMaintenance;
pub use migration::run_migrations;

use launchpad_core::error::Result;
use sqlx::SqlitePool;

/// Open (or create) the store at `database_url` and bring its schema up to date
pub async fn open(database_url: &str) -> Result<SqlitePool> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
