mod common;

use agromart_api::{
    entities::order::OrderStatus,
    errors::ServiceError,
    services::{catalog::RequestedItem, orders::CreateOrderRequest},
};
use assert_matches::assert_matches;
use common::{seed_address, seed_product, TestApp};
use rust_decimal_macros::dec;
use uuid::Uuid;

async fn place_order(app: &TestApp) -> Uuid {
    let customer_id = Uuid::new_v4();
    let address_id = seed_address(app, customer_id).await;
    let product_id = seed_product(app, dec!(100), 10).await;

    app.state
        .services
        .orders
        .create_order(CreateOrderRequest {
            customer_id,
            delivery_address_id: address_id,
            payment_method: "E_WALLET".to_string(),
            items: vec![RequestedItem {
                product_id,
                quantity: 1,
            }],
            coupon_code: None,
        })
        .await
        .expect("checkout failed")
        .id
}

#[tokio::test]
async fn order_walks_full_delivery_chain() {
    let app = TestApp::new().await;
    let order_id = place_order(&app).await;

    let chain = [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::ReadyForPickup,
        OrderStatus::PickedUp,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ];
    for status in chain {
        let updated = app
            .state
            .services
            .orders
            .update_order_status(order_id, status, None)
            .await
            .expect("transition should be legal");
        assert_eq!(updated.status, status);
    }
}

#[tokio::test]
async fn skipping_a_state_is_rejected() {
    let app = TestApp::new().await;
    let order_id = place_order(&app).await;

    let err = app
        .state
        .services
        .orders
        .update_order_status(order_id, OrderStatus::OutForDelivery, None)
        .await
        .expect_err("pending cannot jump to out-for-delivery");
    assert_matches!(err, ServiceError::InvalidStatusTransition(_));

    // Order unchanged
    let order = app
        .state
        .services
        .orders
        .get_order(order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn cancel_is_allowed_before_delivery() {
    let app = TestApp::new().await;
    let order_id = place_order(&app).await;

    app.state
        .services
        .orders
        .update_order_status(order_id, OrderStatus::Confirmed, None)
        .await
        .unwrap();

    let cancelled = app
        .state
        .services
        .orders
        .cancel_order(order_id, Some("changed my mind".to_string()))
        .await
        .expect("cancel should succeed");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.notes.as_deref(), Some("changed my mind"));
}

#[tokio::test]
async fn cancel_after_delivery_is_rejected() {
    let app = TestApp::new().await;
    let order_id = place_order(&app).await;

    for status in [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::ReadyForPickup,
        OrderStatus::PickedUp,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ] {
        app.state
            .services
            .orders
            .update_order_status(order_id, status, None)
            .await
            .unwrap();
    }

    let err = app
        .state
        .services
        .orders
        .cancel_order(order_id, None)
        .await
        .expect_err("delivered orders cannot be cancelled");
    assert_matches!(err, ServiceError::InvalidStatusTransition(_));
}

#[tokio::test]
async fn status_update_is_visible_in_listing() {
    let app = TestApp::new().await;
    let order_id = place_order(&app).await;

    let before = app
        .state
        .services
        .orders
        .get_order(order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(before.status, OrderStatus::Pending);

    app.state
        .services
        .orders
        .update_order_status(order_id, OrderStatus::Confirmed, None)
        .await
        .unwrap();

    let listed = app
        .state
        .services
        .orders
        .list_orders(Some(before.customer_id), 1, 20)
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.orders[0].status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn unknown_order_yields_not_found() {
    let app = TestApp::new().await;
    let missing = app
        .state
        .services
        .orders
        .get_order(Uuid::new_v4())
        .await
        .unwrap();
    assert!(missing.is_none());

    let err = app
        .state
        .services
        .orders
        .update_order_status(Uuid::new_v4(), OrderStatus::Confirmed, None)
        .await
        .expect_err("missing order");
    assert_matches!(err, ServiceError::NotFound(_));
}
