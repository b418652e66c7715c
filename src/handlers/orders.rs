use crate::handlers::common::{created_response, success_response, PaginationParams};
use crate::{
    entities::order::OrderStatus,
    errors::ApiError,
    services::{catalog::RequestedItem, orders::CreateOrderRequest},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for order endpoints
pub fn order_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:order_id", get(get_order))
        .route("/:order_id/status", post(update_order_status))
        .route("/:order_id/cancel", post(cancel_order))
}

/// Checkout: validate items, price the order, commit atomically.
async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .create_order(CreateOrderRequest {
            customer_id: payload.customer_id,
            delivery_address_id: payload.delivery_address_id,
            payment_method: payload.payment_method,
            items: payload.items,
            coupon_code: payload.coupon_code,
        })
        .await?;

    Ok(created_response(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", order_id)))?;

    Ok(success_response(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListOrdersParams>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_orders(params.customer_id, pagination.page, pagination.per_page)
        .await?;

    Ok(success_response(orders))
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_order_status(order_id, payload.status, payload.notes)
        .await?;

    Ok(success_response(order))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<CancelOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .cancel_order(order_id, payload.reason)
        .await?;

    Ok(success_response(order))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct CreateOrderPayload {
    pub customer_id: Uuid,
    pub delivery_address_id: Uuid,
    pub payment_method: String,
    pub items: Vec<RequestedItem>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: OrderStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderPayload {
    pub reason: Option<String>,
}
