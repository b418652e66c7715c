use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// JSON body returned for every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Bad Request", "Not Found")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Business-layer errors. Catalog violations carry the offending product so
/// the first failing line item can be surfaced verbatim to the caller.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product unavailable: {0}")]
    ProductUnavailable(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Below minimum order quantity: {0}")]
    BelowMinimumQuantity(String),

    #[error("Above maximum order quantity: {0}")]
    AboveMaximumQuantity(String),

    #[error("Invalid status transition: {0}")]
    InvalidStatusTransition(String),

    #[error("Order error: {0}")]
    OrderError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    /// HTTP status for this error. Catalog violations during checkout are
    /// business-rule failures (400); ownership mismatches are 403; datastore
    /// and transactional failures surface as 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_)
            | ServiceError::InvalidOperation(_)
            | ServiceError::ProductNotFound(_)
            | ServiceError::ProductUnavailable(_)
            | ServiceError::InsufficientStock(_)
            | ServiceError::BelowMinimumQuantity(_)
            | ServiceError::AboveMaximumQuantity(_)
            | ServiceError::InvalidStatusTransition(_) => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::DatabaseError(_)
            | ServiceError::OrderError(_)
            | ServiceError::EventError(_)
            | ServiceError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message included in the response body. Internal failures are logged
    /// with full context but surfaced generically.
    pub fn response_message(&self) -> String {
        match self {
            ServiceError::DatabaseError(_) | ServiceError::InternalError(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Errors produced at the HTTP boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::ServiceError(service_error) => (
                service_error.status_code(),
                service_error.response_message(),
            ),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ServiceError::ProductNotFound("p".into()))]
    #[case(ServiceError::ProductUnavailable("p".into()))]
    #[case(ServiceError::InsufficientStock("p".into()))]
    #[case(ServiceError::BelowMinimumQuantity("p".into()))]
    #[case(ServiceError::AboveMaximumQuantity("p".into()))]
    #[case(ServiceError::InvalidStatusTransition("pending -> delivered".into()))]
    fn catalog_violations_map_to_bad_request(#[case] err: ServiceError) {
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn ownership_mismatch_is_forbidden() {
        let err = ServiceError::Forbidden("address does not belong to customer".into());
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn service_errors_convert_straight_into_responses() {
        // Handlers rely on `?` and the From impl; no manual mapping step.
        let response =
            ApiError::from(ServiceError::Forbidden("not your address".into())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response =
            ApiError::from(ServiceError::InsufficientStock("carrots".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_errors_are_not_leaked() {
        let err = ServiceError::DatabaseError(sea_orm::error::DbErr::Custom("boom".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.response_message(), "Internal server error");
    }
}
