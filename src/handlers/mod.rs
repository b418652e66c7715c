pub mod carts;
pub mod common;
pub mod orders;

use crate::{
    db::DbPool,
    events::EventSender,
    services::{
        carts::CartService,
        orders::OrderService,
        pricing::{DeliveryFeePolicy, PricingEngine},
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub carts: Arc<CartService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        delivery_policy: DeliveryFeePolicy,
    ) -> Self {
        let pricing = PricingEngine::new(delivery_policy, Some(event_sender.clone()));
        let orders = Arc::new(OrderService::new(
            db.clone(),
            pricing,
            Some(event_sender.clone()),
        ));
        let carts = Arc::new(CartService::new(db, Some(event_sender)));

        Self { orders, carts }
    }
}
