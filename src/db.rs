pub mod deletion;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge, histogram};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub use deletion::delete_where;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl DbConfig {
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    /// `(max, min)` pool sizes applied at connect time.
    ///
    /// SQLite pools hold one connection: a second writer's deferred transaction fails
    /// with `SQLITE_BUSY` rather than waiting. Callers queue on acquire instead.
    pub fn pool_bounds(&self) -> (u32, u32) {
        if self.is_sqlite() {
            (1, self.min_connections.min(1))
        } else {
            (
                self.max_connections,
                self.min_connections.min(self.max_connections),
            )
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns a `ServiceError::DatabaseError` if the connection cannot be established
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    let (max_connections, min_connections) = config.pool_bounds();
    debug!(
        max_connections,
        min_connections,
        "Configuring database connection"
    );
    if max_connections < config.max_connections {
        info!(
            "SQLite pool limited to {} connection (configured {})",
            max_connections, config.max_connections
        );
    }

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(true);

    gauge!("cart_api_db.max_connections", max_connections as f64);

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database connection establishment failed: {}", e);
        counter!("cart_api_db.connection_failures", 1);
        ServiceError::DatabaseError(e)
    })?;

    info!(
        "Database connection pool established (max_connections={})",
        max_connections
    );
    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs the embedded migrations up to the latest version
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!("Database migrations completed in {:?}", elapsed),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<Duration, ServiceError> {
    let start = Instant::now();
    let result = pool.ping().await;
    let elapsed = start.elapsed();

    match result {
        Ok(()) => {
            debug!("Database connection check successful in {:?}", elapsed);
            histogram!("cart_api_db.ping_latency", elapsed);
            Ok(elapsed)
        }
        Err(e) => {
            error!("Database connection check failed after {:?}: {}", elapsed, e);
            counter!("cart_api_db.connection_failures", 1);
            Err(ServiceError::DatabaseError(e))
        }
    }
}

/// Closes the database connection pool
pub async fn close_pool(pool: DbPool) -> Result<(), ServiceError> {
    info!("Closing database connection pool");
    pool.close().await.map_err(ServiceError::DatabaseError)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> DbConfig {
        DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn connects_migrates_and_pings_sqlite() {
        let pool = establish_connection_with_config(&memory_config())
            .await
            .expect("connect");
        run_migrations(&pool).await.expect("migrations");
        assert!(check_connection(&pool).await.is_ok());
        close_pool(pool).await.expect("close");
    }

    #[test]
    fn sqlite_pools_are_capped_to_one_connection() {
        let sqlite = DbConfig {
            url: "sqlite://cart.db?mode=rwc".to_string(),
            max_connections: 10,
            min_connections: 2,
            ..Default::default()
        };
        assert_eq!(sqlite.pool_bounds(), (1, 1));

        let postgres = DbConfig {
            url: "postgres://cart@localhost/cart".to_string(),
            max_connections: 10,
            min_connections: 2,
            ..Default::default()
        };
        assert_eq!(postgres.pool_bounds(), (10, 2));
    }

    #[tokio::test]
    async fn shipped_pool_size_connects_on_sqlite() {
        let config = DbConfig {
            max_connections: 10,
            ..memory_config()
        };
        let pool = establish_connection_with_config(&config)
            .await
            .expect("connect");
        run_migrations(&pool).await.expect("migrations");
        close_pool(pool).await.expect("close");
    }

    #[test]
    fn db_config_follows_app_config() {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "x".repeat(64),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        );
        cfg.db_max_connections = 3;
        cfg.db_acquire_timeout_secs = 2;

        let db_cfg = DbConfig::from(&cfg);
        assert_eq!(db_cfg.max_connections, 3);
        assert_eq!(db_cfg.acquire_timeout, Duration::from_secs(2));
        assert_eq!(db_cfg.url, "sqlite::memory:");
    }
}
