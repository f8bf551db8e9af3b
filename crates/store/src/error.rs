use common::{BookId, OrderId, UserId};
use domain::{Money, OrderStatus};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
///
/// Any of these raised inside a unit of work aborts the whole
/// transaction; partial effects are never committed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No book exists with the given id.
    #[error("book not found: {0}")]
    BookNotFound(BookId),

    /// No user exists with the given id.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// No order exists with the given id.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// A cart line asked for more units than the catalog holds.
    #[error("insufficient stock for book {book_id}: requested {requested}, available {available}")]
    InsufficientStock {
        book_id: BookId,
        requested: u32,
        available: u32,
    },

    /// The client-submitted total deviates from the recomputed one.
    #[error("submitted total {submitted} does not match computed total {computed}")]
    TotalMismatch { submitted: Money, computed: Money },

    /// The order has a confirmed payment and cannot be cancelled.
    #[error("order {0} is already paid")]
    OrderAlreadyPaid(OrderId),

    /// The order was cancelled and cannot accept a payment confirmation.
    #[error("order {0} has been cancelled")]
    OrderCancelled(OrderId),

    /// The requested status change is not a legal transition.
    #[error("cannot transition order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A stored value failed to parse back into its domain type.
    #[error("unrecognized {column} value in storage: {value}")]
    Decode { column: &'static str, value: String },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
