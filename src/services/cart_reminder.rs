//! Daily abandoned-cart reminder sweep and its scheduler.

use crate::{
    config::ReminderConfig,
    entities::notification_profile,
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{CartReminder, NotificationGateway},
    services::commerce::CartService,
};
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use metrics::counter;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Outcome counts of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub owners_scanned: usize,
    pub notified: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Sends one reminder per owner that still has cart lines and an enabled device.
#[derive(Clone)]
pub struct CartReminderSweep {
    db: Arc<DatabaseConnection>,
    carts: CartService,
    gateway: Arc<dyn NotificationGateway>,
    event_sender: Arc<EventSender>,
    heading: String,
    content: String,
    batch_size: usize,
}

impl CartReminderSweep {
    pub fn new(
        db: Arc<DatabaseConnection>,
        carts: CartService,
        gateway: Arc<dyn NotificationGateway>,
        event_sender: Arc<EventSender>,
        cfg: &ReminderConfig,
    ) -> Self {
        Self {
            db,
            carts,
            gateway,
            event_sender,
            heading: cfg.heading.clone(),
            content: cfg.content.clone(),
            batch_size: cfg.batch_size.max(1),
        }
    }

    /// Runs a single sweep. Delivery failures are counted, store failures abort the run.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<SweepReport, ServiceError> {
        let owners = self.carts.owners_with_items().await?;
        let mut report = SweepReport {
            owners_scanned: owners.len(),
            ..SweepReport::default()
        };

        for chunk in owners.chunks(self.batch_size) {
            let mut devices = self.enabled_devices(chunk).await?;

            for owner_id in chunk {
                let Some(player_ids) = devices.remove(owner_id) else {
                    report.skipped += 1;
                    continue;
                };

                let reminder = CartReminder {
                    user_id: *owner_id,
                    player_ids,
                    heading: self.heading.clone(),
                    content: self.content.clone(),
                };

                match self.gateway.send(&reminder).await {
                    Ok(()) => report.notified += 1,
                    Err(e) => {
                        warn!(%owner_id, error = %e, "Cart reminder not delivered");
                        report.failed += 1;
                    }
                }
            }
        }

        counter!("cart_reminder.notified", report.notified as u64);
        counter!("cart_reminder.failed", report.failed as u64);
        info!(
            owners = report.owners_scanned,
            notified = report.notified,
            skipped = report.skipped,
            failed = report.failed,
            "Cart reminder sweep complete"
        );

        self.event_sender
            .send_or_log(Event::CartRemindersSent {
                notified: report.notified,
                failed: report.failed,
            })
            .await;

        Ok(report)
    }

    /// Player ids of enabled devices, grouped by owner, without duplicates.
    async fn enabled_devices(
        &self,
        owners: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, ServiceError> {
        let profiles = notification_profile::Entity::find()
            .filter(notification_profile::Column::UserId.is_in(owners.to_vec()))
            .filter(notification_profile::Column::NotificationsEnabled.eq(true))
            .order_by_asc(notification_profile::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut devices: HashMap<Uuid, Vec<String>> = HashMap::new();
        for profile in profiles {
            let player_id = profile.player_id.trim();
            if player_id.is_empty() {
                continue;
            }
            let ids = devices.entry(profile.user_id).or_default();
            if !ids.iter().any(|id| id == player_id) {
                ids.push(player_id.to_string());
            }
        }
        Ok(devices)
    }
}

/// Next instant strictly after `now` whose UTC wall clock reads `at`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(at));
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// Fires [`CartReminderSweep::run_once`] once a day until shut down.
pub struct CartReminderScheduler {
    sweep: Arc<CartReminderSweep>,
    run_at: NaiveTime,
}

impl CartReminderScheduler {
    pub fn new(sweep: Arc<CartReminderSweep>, run_at: NaiveTime) -> Self {
        Self { sweep, run_at }
    }

    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!(run_at = %self.run_at, "Cart reminder scheduler started");

            loop {
                let now = Utc::now();
                let next = next_run_after(now, self.run_at);
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                info!(next_run = %next, "Next cart reminder sweep scheduled");

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown_rx.changed() => break,
                }

                tokio::select! {
                    result = self.sweep.run_once() => {
                        if let Err(e) = result {
                            error!("Cart reminder sweep failed: {}", e);
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            info!("Cart reminder scheduler stopped");
        });

        SchedulerHandle { shutdown_tx, task }
    }
}

/// Handle to a running scheduler task.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the task and waits for it to exit.
    pub async fn shutdown(self) {
        // The task may already be gone; nothing to signal then.
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Cart reminder scheduler ended abnormally: {}", e);
        }
    }
}
