use crate::handlers::common::{no_content_response, success_response, validate_input};
use crate::{errors::ApiError, services::carts::AddToCartRequest, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn cart_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/items", post(add_item))
        .route("/items/:product_id", put(update_item).delete(remove_item))
}

async fn get_cart(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CustomerParams>,
) -> Result<impl IntoResponse, ApiError> {
    let lines = state
        .services
        .carts
        .get_cart(params.customer_id)
        .await?;

    Ok(success_response(lines))
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CustomerParams>,
    Json(payload): Json<AddToCartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let line = state
        .services
        .carts
        .add_item(params.customer_id, payload)
        .await?;

    Ok(success_response(line))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
    Query(params): Query<CustomerParams>,
    Json(payload): Json<UpdateCartItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let line = state
        .services
        .carts
        .update_item(params.customer_id, product_id, payload.quantity)
        .await?;

    Ok(success_response(line))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
    Query(params): Query<CustomerParams>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .carts
        .remove_item(params.customer_id, product_id)
        .await?;

    Ok(no_content_response())
}

// Request DTOs

/// Identifies the acting customer. Session auth lives in front of this
/// service; handlers take the customer id directly.
#[derive(Debug, Deserialize)]
pub struct CustomerParams {
    pub customer_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCartItemPayload {
    #[validate(range(min = 1))]
    pub quantity: i32,
}
