//! Checkout workflow error types.

use common::{BookId, UserId};
use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// Errors from the payment gateway adapter.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The HTTP request to the gateway failed (timeout, connect, ...).
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("gateway rejected session request: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The adapter is misconfigured.
    #[error("gateway configuration error: {0}")]
    Config(String),
}

/// Errors that can occur during the checkout workflow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The acting user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// A cart line references a book that does not exist.
    #[error("book not found: {0}")]
    BookNotFound(BookId),

    /// A cart line asked for more units than are available.
    #[error("insufficient stock for book {book_id}: requested {requested}, available {available}")]
    InsufficientStock {
        book_id: BookId,
        requested: u32,
        available: u32,
    },

    /// The cart or total failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] DomainError),

    /// A storage error; the enclosing unit of work was rolled back.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The payment gateway call failed; the placed order was cancelled
    /// and its stock restored before this surfaced.
    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
