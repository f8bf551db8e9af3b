//! Shared identifier types used across the bookshop backend.

pub mod types;

pub use types::{BookId, OrderId, UserId, VillageId};
