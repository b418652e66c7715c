mod common;

use agromart_api::{
    entities::product::Entity as Product,
    services::{catalog::RequestedItem, orders::CreateOrderRequest},
};
use common::{seed_address, seed_product, TestApp};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use uuid::Uuid;

/// Two rival checkouts race for the last unit: exactly one may win, and the
/// final stock must be zero. The losing request observes the post-decrement
/// stock and fails validation inside its own transaction.
#[tokio::test]
async fn rival_checkouts_for_last_unit() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, dec!(100), 1).await;

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let orders = app.state.services.orders.clone();
        let customer_id = Uuid::new_v4();
        let address_id = seed_address(&app, customer_id).await;
        tasks.push(tokio::spawn(async move {
            orders
                .create_order(CreateOrderRequest {
                    customer_id,
                    delivery_address_id: address_id,
                    payment_method: "CARD".to_string(),
                    items: vec![RequestedItem {
                        product_id,
                        quantity: 1,
                    }],
                    coupon_code: None,
                })
                .await
        }));
    }

    let mut successes = 0;
    let mut stock_failures = 0;
    for task in tasks {
        match task.await.expect("task panicked") {
            Ok(_) => successes += 1,
            Err(e) => {
                let message = e.to_string();
                assert!(
                    message.contains("stock") || message.contains("Insufficient"),
                    "loser must fail on stock, got: {}",
                    message
                );
                stock_failures += 1;
            }
        }
    }

    assert_eq!(successes, 1, "exactly one checkout may win");
    assert_eq!(stock_failures, 1);

    let stock = Product::find_by_id(product_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity;
    assert_eq!(stock, 0);
}

/// Many rivals over a small stock pool: winners never drive stock negative.
#[tokio::test]
async fn stock_never_goes_negative_under_contention() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, dec!(10), 5).await;

    let mut tasks = Vec::new();
    for _ in 0..12 {
        let orders = app.state.services.orders.clone();
        let customer_id = Uuid::new_v4();
        let address_id = seed_address(&app, customer_id).await;
        tasks.push(tokio::spawn(async move {
            orders
                .create_order(CreateOrderRequest {
                    customer_id,
                    delivery_address_id: address_id,
                    payment_method: "CARD".to_string(),
                    items: vec![RequestedItem {
                        product_id,
                        quantity: 1,
                    }],
                    coupon_code: None,
                })
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.expect("task panicked") {
            successes += 1;
        }
    }

    assert_eq!(successes, 5, "exactly stock-many checkouts may win");

    let stock = Product::find_by_id(product_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity;
    assert_eq!(stock, 0);
}
