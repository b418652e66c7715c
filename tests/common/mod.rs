#![allow(dead_code)]

use std::sync::Arc;

use agromart_api::{
    config::AppConfig,
    db,
    entities::{
        address,
        cart_item,
        coupon::{self, DiscountType},
        product::{self, ProductStatus},
    },
    events::{self, EventSender},
    handlers::AppServices,
    services::pricing::DeliveryFeePolicy,
    AppState,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Helper harness for spinning up application state backed by a fresh
/// SQLite database file.
pub struct TestApp {
    pub state: AppState,
    db_file: std::path::PathBuf,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file = std::env::temp_dir().join(format!("agromart_test_{}.db", Uuid::new_v4()));
        let _ = std::fs::remove_file(&db_file);

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        // One connection keeps SQLite writes serialized and test behavior
        // deterministic.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::connect(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (tx, rx) = mpsc::channel(100);
        let event_sender = EventSender::new(tx);
        let event_task = tokio::spawn(events::process_events(rx));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            DeliveryFeePolicy::default(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        Self {
            state,
            db_file,
            _event_task: event_task,
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_file);
    }
}

/// Insert a product with the given price and stock; returns its id.
pub async fn seed_product(app: &TestApp, price: Decimal, stock: i32) -> Uuid {
    seed_product_full(app, price, stock, 1, None, ProductStatus::Active).await
}

pub async fn seed_product_full(
    app: &TestApp,
    price: Decimal,
    stock: i32,
    min_qty: i32,
    max_qty: Option<i32>,
    status: ProductStatus,
) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let row = product::ActiveModel {
        id: Set(id),
        name: Set(format!("Produce {}", &id.to_string()[..8])),
        description: Set("Farm fresh".to_string()),
        price: Set(price),
        stock_quantity: Set(stock),
        min_order_quantity: Set(min_qty),
        max_order_quantity: Set(max_qty),
        unit: Set("kg".to_string()),
        seller_id: Set(Uuid::new_v4()),
        shop_id: Set(None),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
    };
    row.insert(&*app.state.db)
        .await
        .expect("failed to seed product");
    id
}

/// Insert an address owned by the given customer; returns its id.
pub async fn seed_address(app: &TestApp, customer_id: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let row = address::ActiveModel {
        id: Set(id),
        customer_id: Set(customer_id),
        label: Set("Home".to_string()),
        recipient: Set("Test Customer".to_string()),
        phone: Set("+628123456789".to_string()),
        street: Set("Jl. Pasar Tani 1".to_string()),
        city: Set("Bandung".to_string()),
        province: Set("Jawa Barat".to_string()),
        postal_code: Set("40111".to_string()),
        is_default: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    row.insert(&*app.state.db)
        .await
        .expect("failed to seed address");
    id
}

/// Insert an active coupon valid for the next 24 hours; returns its code.
pub async fn seed_coupon(
    app: &TestApp,
    code: &str,
    discount_type: DiscountType,
    value: Decimal,
    min_order_value: Option<Decimal>,
    max_discount: Option<Decimal>,
) -> String {
    let now = Utc::now();
    let row = coupon::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code.to_string()),
        discount_type: Set(discount_type),
        discount_value: Set(value),
        min_order_value: Set(min_order_value),
        max_discount: Set(max_discount),
        valid_from: Set(now - Duration::hours(1)),
        valid_until: Set(now + Duration::hours(24)),
        is_active: Set(true),
        created_at: Set(now),
    };
    row.insert(&*app.state.db)
        .await
        .expect("failed to seed coupon");
    code.to_string()
}

/// Insert a cart line for (customer, product).
pub async fn seed_cart_line(app: &TestApp, customer_id: Uuid, product_id: Uuid, quantity: i32) {
    let now = Utc::now();
    let row = cart_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        created_at: Set(now),
        updated_at: Set(now),
    };
    row.insert(&*app.state.db)
        .await
        .expect("failed to seed cart line");
}
