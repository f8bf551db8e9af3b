//! Client-submitted cart and total reconciliation.

use std::collections::BTreeMap;

use common::BookId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// Tolerance allowed between a client-submitted total and the total
/// recomputed from catalog prices. One minor unit absorbs client-side
/// rounding without accepting tampered totals.
pub const TOTAL_TOLERANCE: Money = Money::from_cents(1);

/// Returns true if a submitted total is close enough to the computed one.
pub fn totals_match(submitted: Money, computed: Money) -> bool {
    submitted.abs_diff(computed) <= TOTAL_TOLERANCE
}

/// A validated, non-empty map of book id to requested quantity.
///
/// Construction rejects empty carts and zero quantities; duplicate book
/// ids are merged by summing their quantities. Iteration order is
/// ascending by book id, which downstream storage relies on for a stable
/// row-lock order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: BTreeMap<BookId, u32>,
}

impl Cart {
    /// Builds a cart from `(book_id, quantity)` pairs.
    pub fn new(items: impl IntoIterator<Item = (BookId, u32)>) -> Result<Self, DomainError> {
        let mut lines: BTreeMap<BookId, u32> = BTreeMap::new();
        for (book_id, quantity) in items {
            if quantity == 0 {
                return Err(DomainError::InvalidQuantity { book_id });
            }
            *lines.entry(book_id).or_insert(0) += quantity;
        }
        if lines.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        Ok(Self { lines })
    }

    /// Iterates lines in ascending book-id order.
    pub fn iter(&self) -> impl Iterator<Item = (BookId, u32)> + '_ {
        self.lines.iter().map(|(id, qty)| (*id, *qty))
    }

    /// Number of distinct books in the cart.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// A validated cart is never empty, but clippy wants the pair.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Requested quantity for a book, if present.
    pub fn quantity_of(&self, book_id: BookId) -> Option<u32> {
        self.lines.get(&book_id).copied()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.values().sum()
    }

    /// Computes the order total given a price per book.
    ///
    /// Returns `None` if any book in the cart has no price available.
    pub fn total_with(&self, price_of: impl Fn(BookId) -> Option<Money>) -> Option<Money> {
        let mut total = Money::zero();
        for (book_id, quantity) in self.iter() {
            total += price_of(book_id)?.multiply(quantity);
        }
        Some(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_cart() {
        assert_eq!(Cart::new([]), Err(DomainError::EmptyCart));
    }

    #[test]
    fn rejects_zero_quantity() {
        let book_id = BookId::new();
        let result = Cart::new([(book_id, 0)]);
        assert_eq!(result, Err(DomainError::InvalidQuantity { book_id }));
    }

    #[test]
    fn merges_duplicate_lines() {
        let book_id = BookId::new();
        let cart = Cart::new([(book_id, 2), (book_id, 3)]).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(book_id), Some(5));
    }

    #[test]
    fn iterates_in_ascending_book_id_order() {
        let ids: Vec<BookId> = (0..6).map(|_| BookId::new()).collect();
        let cart = Cart::new(ids.iter().map(|id| (*id, 1))).unwrap();
        let iterated: Vec<BookId> = cart.iter().map(|(id, _)| id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(iterated, sorted);
    }

    #[test]
    fn total_with_multiplies_prices() {
        let a = BookId::new();
        let b = BookId::new();
        let cart = Cart::new([(a, 2), (b, 1)]).unwrap();
        let total = cart
            .total_with(|id| {
                if id == a {
                    Some(Money::from_cents(999))
                } else {
                    Some(Money::from_cents(500))
                }
            })
            .unwrap();
        assert_eq!(total.cents(), 2498);
    }

    #[test]
    fn total_with_missing_price_is_none() {
        let cart = Cart::new([(BookId::new(), 1)]).unwrap();
        assert_eq!(cart.total_with(|_| None), None);
    }

    #[test]
    fn totals_match_within_tolerance() {
        let computed = Money::from_cents(1998);
        assert!(totals_match(Money::from_cents(1998), computed));
        assert!(totals_match(Money::from_cents(1999), computed));
        assert!(!totals_match(Money::from_cents(2000), computed));
    }
}
