//! Domain error types.

use common::BookId;
use thiserror::Error;

use crate::order::OrderStatus;

/// Errors that can occur while validating domain values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A cart must contain at least one line.
    #[error("cart must contain at least one item")]
    EmptyCart,

    /// Every cart line needs a positive quantity.
    #[error("quantity for book {book_id} must be positive")]
    InvalidQuantity { book_id: BookId },

    /// The requested order status transition is not allowed.
    #[error("cannot transition order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// An order status string did not match any known status.
    #[error("unknown order status: {0}")]
    UnknownStatus(String),

    /// A payment method string did not match any known method.
    #[error("unknown payment method: {0}")]
    UnknownPaymentMethod(String),
}
