//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, GatewayError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
///
/// Every error response carries `{"success": false, "message": ...}`;
/// internal details are logged, never surfaced to the client.
#[derive(Debug)]
pub enum ApiError {
    /// No acting user could be resolved from the request.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Resource not found.
    NotFound(String),
    /// Checkout workflow error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "success": false, "message": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        CheckoutError::UserNotFound(_) | CheckoutError::BookNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        CheckoutError::InsufficientStock { .. } | CheckoutError::Validation(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        CheckoutError::Store(store_err) => store_error_to_response(store_err, &err),
        CheckoutError::Gateway(gateway_err) => {
            tracing::error!(error = %gateway_err, "payment gateway failure");
            (
                StatusCode::BAD_GATEWAY,
                "payment gateway unavailable".to_string(),
            )
        }
    }
}

fn store_error_to_response(store_err: &StoreError, err: &CheckoutError) -> (StatusCode, String) {
    match store_err {
        StoreError::BookNotFound(_)
        | StoreError::UserNotFound(_)
        | StoreError::OrderNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::InsufficientStock { .. } | StoreError::TotalMismatch { .. } => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        StoreError::OrderAlreadyPaid(_)
        | StoreError::OrderCancelled(_)
        | StoreError::InvalidTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
        StoreError::Decode { .. } | StoreError::Database(_) | StoreError::Migration(_) => {
            tracing::error!(error = %store_err, "storage failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Checkout(CheckoutError::Store(err))
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Checkout(CheckoutError::Gateway(err))
    }
}
