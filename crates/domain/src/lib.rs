//! Domain layer for the bookshop backend.
//!
//! This crate provides the entities and pure rules of the order/payment
//! workflow: the catalog `Book`, the `Cart` submitted by a client, the
//! `Order` with its line items and status state machine, and the `Money`
//! type used for all amounts.

pub mod book;
pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod user;

pub use book::Book;
pub use cart::{Cart, TOTAL_TOLERANCE, totals_match};
pub use error::DomainError;
pub use money::Money;
pub use order::{Order, OrderLineItem, OrderStatus, PaymentMethod};
pub use user::User;
