use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the services layer. Downstream collaborators
/// (notification dispatch, review eligibility, analytics) subscribe here;
/// none of them run inside the order transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
        customer_id: Uuid,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderCancelled(Uuid),
    /// A coupon code was supplied but contributed no discount. Checkout is
    /// deliberately not blocked; this event makes the decision observable.
    CouponIgnored {
        code: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    CartUpdated {
        customer_id: Uuid,
        product_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes the event stream and logs it. Real notification delivery hangs
/// off this task so a slow subscriber can never delay an order commit.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                order_number,
                customer_id,
            } => {
                info!(%order_id, %order_number, %customer_id, "order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "order status changed");
            }
            Event::OrderCancelled(order_id) => {
                info!(%order_id, "order cancelled");
            }
            Event::CouponIgnored { code, reason, .. } => {
                warn!(%code, %reason, "coupon ignored at checkout");
            }
            Event::CartUpdated {
                customer_id,
                product_id,
            } => {
                info!(%customer_id, %product_id, "cart updated");
            }
        }
    }
    info!("event channel closed; event processor exiting");
}
