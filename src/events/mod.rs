use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::commerce::OrderType;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Best-effort send for events emitted after a commit; a closed channel is only logged.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "Dropping event");
            counter!("cart_api_events.dropped", 1, "event" => name);
        }
    }
}

/// Domain events emitted by the cart and catalog services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    CartItemsUpserted {
        owner_id: Uuid,
        product_id: Uuid,
        order_type: OrderType,
        line_item_ids: Vec<Uuid>,
    },
    CartItemRemoved {
        owner_id: Uuid,
        line_item_id: Uuid,
    },
    ProductRetired {
        product_id: Uuid,
        retired_at: DateTime<Utc>,
    },
    CartRemindersSent {
        notified: usize,
        failed: usize,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::CartItemsUpserted { .. } => "cart_items_upserted",
            Event::CartItemRemoved { .. } => "cart_item_removed",
            Event::ProductRetired { .. } => "product_retired",
            Event::CartRemindersSent { .. } => "cart_reminders_sent",
        }
    }
}

/// Creates the channel pair used by the service context.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

// Drains the channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("cart_api_events.processed", 1, "event" => event.name());

        match &event {
            Event::CartItemsUpserted {
                owner_id,
                product_id,
                order_type,
                line_item_ids,
            } => {
                info!(
                    %owner_id,
                    %product_id,
                    %order_type,
                    lines = line_item_ids.len(),
                    "Cart items upserted"
                );
            }
            Event::CartItemRemoved {
                owner_id,
                line_item_id,
            } => {
                info!(%owner_id, %line_item_id, "Cart item removed");
            }
            Event::ProductRetired {
                product_id,
                retired_at,
            } => {
                info!(%product_id, %retired_at, "Product retired");
            }
            Event::CartRemindersSent { notified, failed } => {
                if *failed > 0 {
                    warn!(notified, failed, "Cart reminder sweep finished with failures");
                } else {
                    info!(notified, "Cart reminder sweep finished");
                }
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (sender, mut rx) = channel(4);
        let owner_id = Uuid::new_v4();
        let line_item_id = Uuid::new_v4();

        sender
            .send(Event::CartItemRemoved {
                owner_id,
                line_item_id,
            })
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(Event::CartItemRemoved {
                owner_id,
                line_item_id
            })
        );
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (sender, rx) = channel(1);
        drop(rx);

        let event = Event::CartRemindersSent {
            notified: 1,
            failed: 0,
        };
        assert!(sender.send(event.clone()).await.is_err());
        // must not panic
        sender.send_or_log(event).await;
    }

    #[tokio::test]
    async fn processor_exits_when_senders_drop() {
        let (sender, rx) = channel(2);
        let handle = tokio::spawn(process_events(rx));
        sender
            .send(Event::ProductRetired {
                product_id: Uuid::new_v4(),
                retired_at: Utc::now(),
            })
            .await
            .unwrap();
        drop(sender);
        handle.await.unwrap();
    }
}
