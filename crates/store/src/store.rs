//! The storage trait and the unit-of-work input/output types.

use async_trait::async_trait;
use common::{BookId, OrderId, UserId, VillageId};
use domain::{Book, Cart, Money, Order, OrderLineItem, OrderStatus, PaymentMethod, User};

use crate::error::Result;

/// Everything needed to place an order in one unit of work.
///
/// The submitted total comes from the client and is reconciled against
/// the total recomputed from catalog prices inside the transaction; the
/// order row always stores the computed value.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub payment_method: PaymentMethod,
    pub cart: Cart,
    pub submitted_total: Money,
}

/// The durable result of a successful placement.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub line_items: Vec<OrderLineItem>,
}

/// Outcome of a payment confirmation, distinguishing the first
/// confirmation from idempotent repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMark {
    Confirmed,
    AlreadyConfirmed,
}

/// Outcome of a cancellation, distinguishing the call that actually
/// cancelled and restocked from idempotent repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    AlreadyCancelled,
}

/// Storage operations for the catalog, users, and the order ledger.
///
/// `place_order`, `mark_paid`, `cancel_and_restock`, and `update_status`
/// are each a single atomic unit of work: all of their effects become
/// visible together or not at all.
#[async_trait]
pub trait Store: Send + Sync {
    // -- catalog --

    /// Inserts a book into the catalog.
    async fn insert_book(&self, book: Book) -> Result<()>;

    /// Loads a book by id.
    async fn get_book(&self, id: BookId) -> Result<Option<Book>>;

    /// Loads the books for the given ids; absent ids fail with
    /// `BookNotFound` so callers never silently build partial manifests.
    async fn get_books(&self, ids: &[BookId]) -> Result<Vec<Book>>;

    // -- users --

    /// Inserts a user.
    async fn insert_user(&self, user: User) -> Result<()>;

    /// Loads a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Sets the user's shipping village.
    async fn set_shipping_village(&self, user_id: UserId, village_id: VillageId) -> Result<()>;

    // -- order ledger --

    /// Places an order: locks the cart's book rows, verifies stock,
    /// recomputes and reconciles the total, creates the order and its
    /// line items, and decrements stock — all in one transaction.
    async fn place_order(&self, new_order: NewOrder) -> Result<PlacedOrder>;

    /// Loads an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Loads the line items of an order.
    async fn get_line_items(&self, id: OrderId) -> Result<Vec<OrderLineItem>>;

    /// Lists a user's orders, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Flips `payment_status` false→true exactly once. Repeat calls
    /// report `AlreadyConfirmed`; a cancelled order is a conflict.
    async fn mark_paid(&self, id: OrderId) -> Result<PaymentMark>;

    /// Cancels a pending order and restores its stock in one
    /// transaction. Repeat calls report `AlreadyCancelled`; a paid or
    /// non-pending order is a conflict.
    async fn cancel_and_restock(&self, id: OrderId) -> Result<CancelOutcome>;

    /// Applies an admin status transition, validated against the
    /// `OrderStatus` machine. Touches nothing but the status column.
    async fn update_status(&self, id: OrderId, new_status: OrderStatus) -> Result<Order>;
}
