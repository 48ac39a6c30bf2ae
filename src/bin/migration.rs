//! Schema management for the cart database.
//!
//! Run with: cargo run --bin migration -- up

use std::time::Duration;

use anyhow::{Context, Result};
use cart_api::migrator::Migrator;
use clap::{Parser, Subcommand};
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "migration", about = "Apply or inspect cart-api schema migrations")]
struct Cli {
    /// Database URL; falls back to DATABASE_URL, then APP__DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply all pending migrations (default)
    Up,
    /// Roll back the most recent migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Show which migrations are applied
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let database_url = cli
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .or_else(|| std::env::var("APP__DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite://cart.db?mode=rwc".to_string());

    info!("Connecting to database: {}", database_url);

    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(2)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(true);

    let db = Database::connect(options)
        .await
        .context("failed to connect to database")?;

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => {
            Migrator::up(&db, None).await.context("migration failed")?;
            info!("Migrations completed successfully");
        }
        Command::Down { steps } => {
            Migrator::down(&db, Some(steps))
                .await
                .context("rollback failed")?;
            info!("Rolled back {} migration(s)", steps);
        }
        Command::Status => {
            Migrator::status(&db).await.context("status check failed")?;
        }
        Command::Fresh => {
            Migrator::fresh(&db).await.context("fresh migration failed")?;
            info!("Database recreated");
        }
    }

    db.close().await.context("failed to close connection")?;
    Ok(())
}
