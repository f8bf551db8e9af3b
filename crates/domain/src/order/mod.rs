//! Orders and their line items.

mod status;

pub use status::OrderStatus;

use chrono::{DateTime, Utc};
use common::{BookId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Pay the courier on delivery; no gateway involved.
    Cash,
    /// Hosted checkout with the external card processor.
    Card,
}

impl PaymentMethod {
    /// Returns the method name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            other => Err(DomainError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

/// A durable order row.
///
/// `total_amount` is the total recomputed from catalog prices at placement
/// time and never recalculated afterwards. `payment_status` flips false to
/// true exactly once, via payment verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: bool,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Returns true if the order is still awaiting payment confirmation.
    pub fn awaiting_payment(&self) -> bool {
        !self.payment_status && self.status != OrderStatus::Cancelled
    }
}

/// One `(book, quantity)` line of an order.
///
/// A historical snapshot: `unit_price` is the catalog price at placement
/// time, not a live reference, so the record stays accurate when the
/// catalog changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub order_id: OrderId,
    pub book_id: BookId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLineItem {
    /// Returns the total for this line (`quantity * unit_price`).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_roundtrips_through_str() {
        for method in [PaymentMethod::Cash, PaymentMethod::Card] {
            let parsed: PaymentMethod = method.as_str().parse().unwrap();
            assert_eq!(parsed, method);
        }
    }

    #[test]
    fn unknown_payment_method_is_rejected() {
        let result: Result<PaymentMethod, _> = "cheque".parse();
        assert_eq!(
            result,
            Err(DomainError::UnknownPaymentMethod("cheque".to_string()))
        );
    }

    #[test]
    fn line_total_multiplies() {
        let line = OrderLineItem {
            order_id: OrderId::new(),
            book_id: BookId::new(),
            quantity: 3,
            unit_price: Money::from_cents(999),
        };
        assert_eq!(line.line_total().cents(), 2997);
    }

    #[test]
    fn awaiting_payment_reflects_flag_and_status() {
        let mut order = Order {
            id: OrderId::new(),
            user_id: UserId::new(),
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::Card,
            payment_status: false,
            total_amount: Money::from_cents(1998),
            created_at: Utc::now(),
        };
        assert!(order.awaiting_payment());

        order.payment_status = true;
        assert!(!order.awaiting_payment());

        order.payment_status = false;
        order.status = OrderStatus::Cancelled;
        assert!(!order.awaiting_payment());
    }
}
