//! Catalog book record.

use common::BookId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

/// A book in the catalog.
///
/// `stock_quantity` is the only field the order workflow mutates; it is
/// decremented at placement and restored by cancellation. Author and
/// category are foreign keys into reference data owned by the admin
/// subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub isbn: String,
    pub title: String,
    pub price: Money,
    pub stock_quantity: u32,
    pub author_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

impl Book {
    /// Creates a book with the fields the order workflow cares about.
    pub fn new(
        id: BookId,
        isbn: impl Into<String>,
        title: impl Into<String>,
        price: Money,
        stock_quantity: u32,
    ) -> Self {
        Self {
            id,
            isbn: isbn.into(),
            title: title.into(),
            price,
            stock_quantity,
            author_id: None,
            category_id: None,
            image_url: None,
        }
    }

    /// Returns true if the requested quantity can be satisfied from stock.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        quantity <= self.stock_quantity
    }
}
