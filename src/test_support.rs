//! Shared fixtures for unit tests.

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

/// Migrated in-memory SQLite database on a single connection.
pub async fn memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect sqlite");
    crate::migrator::Migrator::up(&db, None)
        .await
        .expect("migrate sqlite");
    db
}
