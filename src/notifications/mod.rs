//! Push delivery for abandoned-cart reminders.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::config::ReminderConfig;

/// Notification type tag carried in the push `data` payload.
pub const CART_REMINDER_TYPE: &str = "cart_reminder";

/// One reminder addressed to every device of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartReminder {
    pub user_id: Uuid,
    pub player_ids: Vec<String>,
    pub heading: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalizedText {
    pub en: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushData {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Body POSTed to the push gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushNotification {
    pub app_id: String,
    pub include_player_ids: Vec<String>,
    pub data: PushData,
    pub contents: LocalizedText,
    pub headings: LocalizedText,
}

impl PushNotification {
    pub fn for_reminder(app_id: &str, reminder: &CartReminder) -> Self {
        Self {
            app_id: app_id.to_string(),
            include_player_ids: reminder.player_ids.clone(),
            data: PushData {
                user_id: reminder.user_id,
                kind: CART_REMINDER_TYPE.to_string(),
            },
            contents: LocalizedText {
                en: reminder.content.clone(),
            },
            headings: LocalizedText {
                en: reminder.heading.clone(),
            },
        }
    }
}

/// Notification gateway errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gateway rejected notification with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Gateway not configured: {0}")]
    NotConfigured(String),
}

impl NotificationError {
    /// Transport failures, 429s and 5xx responses may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Serialization(_) | Self::NotConfigured(_) => false,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, reminder: &CartReminder) -> Result<(), NotificationError>;
}

/// Gateway client posting JSON to the configured push endpoint.
#[derive(Clone)]
pub struct HttpNotificationGateway {
    client: reqwest::Client,
    url: String,
    app_id: String,
    api_key: String,
    max_attempts: u32,
    backoff: Duration,
}

impl std::fmt::Debug for HttpNotificationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNotificationGateway")
            .field("url", &self.url)
            .field("app_id", &self.app_id)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl HttpNotificationGateway {
    pub fn new(
        url: impl Into<String>,
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            app_id: app_id.into(),
            api_key: api_key.into(),
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        })
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    pub fn from_config(cfg: &ReminderConfig) -> Result<Self, NotificationError> {
        let missing =
            |field: &str| NotificationError::NotConfigured(format!("reminder.{field} is not set"));
        let url = cfg
            .gateway_url
            .clone()
            .ok_or_else(|| missing("gateway_url"))?;
        let app_id = cfg.app_id.clone().ok_or_else(|| missing("app_id"))?;
        let api_key = cfg.api_key.clone().ok_or_else(|| missing("api_key"))?;

        Ok(Self::new(url, app_id, api_key, cfg.request_timeout())?
            .with_retry(cfg.max_attempts, cfg.backoff()))
    }

    async fn post_once(&self, body: &PushNotification) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", self.api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotificationError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl NotificationGateway for HttpNotificationGateway {
    #[instrument(skip(self, reminder), fields(user_id = %reminder.user_id, devices = reminder.player_ids.len()))]
    async fn send(&self, reminder: &CartReminder) -> Result<(), NotificationError> {
        let body = PushNotification::for_reminder(&self.app_id, reminder);

        let mut attempt = 1;
        loop {
            match self.post_once(&body).await {
                Ok(()) => {
                    debug!(attempt, "Cart reminder delivered");
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "Cart reminder delivery failed: {} (attempt {}/{})",
                        e, attempt, self.max_attempts
                    );
                    // Exponential backoff: base, 2x base, 4x base...
                    let delay = self.backoff.saturating_mul(2_u32.saturating_pow(attempt - 1));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "Cart reminder delivery failed after {} attempt(s): {}",
                        attempt, e
                    );
                    return Err(e);
                }
            }
        }
    }
}
