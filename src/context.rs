//! Process-wide wiring: database, event pipeline, services, reminder scheduler.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    errors::ServiceError,
    events,
    notifications::{HttpNotificationGateway, NotificationGateway},
    services::{
        cart_reminder::{CartReminderScheduler, CartReminderSweep, SchedulerHandle},
        commerce::{CartService, ProductCatalogService},
    },
    AppState,
};

const EVENT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a running server owns. Built once at startup, torn down by [`AppContext::shutdown`].
pub struct AppContext {
    state: AppState,
    event_task: JoinHandle<()>,
    scheduler: Option<SchedulerHandle>,
}

impl AppContext {
    pub async fn init(cfg: AppConfig) -> Result<Self, ServiceError> {
        let pool = db::establish_connection_from_app_config(&cfg).await?;
        if cfg.auto_migrate {
            db::run_migrations(&pool).await.map_err(|e| {
                error!("Failed running migrations: {}", e);
                e
            })?;
        }

        Self::with_connection(cfg, pool)
    }

    /// Wires services around an already connected (and migrated) pool.
    pub fn with_connection(cfg: AppConfig, pool: db::DbPool) -> Result<Self, ServiceError> {
        let db = Arc::new(pool);

        let (event_sender, event_rx) = events::channel(cfg.event_channel_capacity);
        let event_sender = Arc::new(event_sender);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth = Arc::new(AuthService::new(AuthConfig::from(&cfg)));
        let carts = CartService::new(db.clone(), event_sender.clone());
        let catalog = ProductCatalogService::new(db.clone(), event_sender.clone());

        let scheduler = if cfg.reminder.enabled {
            let gateway = HttpNotificationGateway::from_config(&cfg.reminder)
                .map_err(|e| ServiceError::InternalError(format!("Reminder gateway: {}", e)))?;
            let gateway: Arc<dyn NotificationGateway> = Arc::new(gateway);
            let sweep = CartReminderSweep::new(
                db.clone(),
                carts.clone(),
                gateway,
                event_sender.clone(),
                &cfg.reminder,
            );
            info!(run_at = %cfg.reminder.run_at, "Cart reminder sweep enabled");
            Some(CartReminderScheduler::new(Arc::new(sweep), cfg.reminder.run_at_time()).spawn())
        } else {
            info!("Cart reminder sweep disabled");
            None
        };

        let state = AppState {
            db,
            config: Arc::new(cfg),
            event_sender,
            auth,
            carts,
            catalog,
        };

        Ok(Self {
            state,
            event_task,
            scheduler,
        })
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub fn router(&self) -> Router {
        crate::build_router(self.state())
    }

    /// Stops the scheduler, drains pending events and closes the pool.
    pub async fn shutdown(self) {
        let Self {
            state,
            event_task,
            scheduler,
        } = self;

        if let Some(handle) = scheduler {
            handle.shutdown().await;
        }

        let AppState {
            db,
            event_sender,
            carts,
            catalog,
            ..
        } = state;
        drop(carts);
        drop(catalog);
        drop(event_sender);

        // The event loop ends once every sender is gone; router clones may still be alive.
        let abort = event_task.abort_handle();
        if tokio::time::timeout(EVENT_DRAIN_TIMEOUT, event_task)
            .await
            .is_err()
        {
            warn!("Event processor still running at shutdown; aborting");
            abort.abort();
        }

        match Arc::try_unwrap(db) {
            Ok(pool) => {
                if let Err(e) = db::close_pool(pool).await {
                    warn!("Failed to close database pool: {}", e);
                }
            }
            Err(_) => warn!("Database pool still shared at shutdown; leaving it to drop"),
        }

        info!("Application context shut down");
    }
}
