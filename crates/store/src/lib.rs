//! Relational storage for the bookshop backend.
//!
//! The [`Store`] trait owns the transactional unit of work behind order
//! placement plus the compensating operations used by payment
//! reconciliation. Two implementations are provided: [`PostgresStore`]
//! for production and [`InMemoryStore`] for tests and the demo server,
//! with identical all-or-nothing semantics.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{CancelOutcome, NewOrder, PaymentMark, PlacedOrder, Store};
