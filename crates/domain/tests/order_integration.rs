//! Integration tests exercising the domain crate's public surface.

use common::{BookId, OrderId, UserId};
use domain::{
    Cart, DomainError, Money, Order, OrderLineItem, OrderStatus, PaymentMethod, totals_match,
};

#[test]
fn cart_totals_reconcile_against_catalog_prices() {
    let hardback = BookId::new();
    let paperback = BookId::new();
    let cart = Cart::new([(hardback, 2), (paperback, 1)]).unwrap();

    let computed = cart
        .total_with(|id| {
            if id == hardback {
                Some(Money::from_cents(2499))
            } else {
                Some(Money::from_cents(999))
            }
        })
        .unwrap();

    assert_eq!(computed.cents(), 5997);
    assert!(totals_match(Money::from_cents(5997), computed));
    assert!(totals_match(Money::from_cents(5998), computed));
    assert!(!totals_match(Money::from_cents(5900), computed));
}

#[test]
fn order_walks_the_fulfillment_path() {
    let statuses = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];
    for pair in statuses.windows(2) {
        assert!(pair[0].can_transition_to(pair[1]));
    }
    assert!(statuses.last().unwrap().is_terminal());
}

#[test]
fn line_items_snapshot_their_prices() {
    let order_id = OrderId::new();
    let lines = [
        OrderLineItem {
            order_id,
            book_id: BookId::new(),
            quantity: 2,
            unit_price: Money::from_cents(999),
        },
        OrderLineItem {
            order_id,
            book_id: BookId::new(),
            quantity: 1,
            unit_price: Money::from_cents(500),
        },
    ];

    let total = lines
        .iter()
        .fold(Money::zero(), |acc, li| acc + li.line_total());
    assert_eq!(total.cents(), 2498);
}

#[test]
fn order_serializes_with_lowercase_enums() {
    let order = Order {
        id: OrderId::new(),
        user_id: UserId::new(),
        status: OrderStatus::Pending,
        payment_method: PaymentMethod::Card,
        payment_status: false,
        total_amount: Money::from_cents(1998),
        created_at: chrono::Utc::now(),
    };

    let json = serde_json::to_value(&order).unwrap();
    assert_eq!(json["status"], "pending");
    assert_eq!(json["payment_method"], "card");
    assert_eq!(json["total_amount"], 1998);
}

#[test]
fn duplicate_cart_lines_merge_before_validation() {
    let book = BookId::new();
    let cart = Cart::new([(book, 1), (book, 1), (book, 1)]).unwrap();
    assert_eq!(cart.total_quantity(), 3);
    assert_eq!(cart.len(), 1);
}

#[test]
fn invalid_carts_name_the_problem() {
    assert!(matches!(Cart::new([]), Err(DomainError::EmptyCart)));

    let book = BookId::new();
    assert!(matches!(
        Cart::new([(book, 0)]),
        Err(DomainError::InvalidQuantity { book_id }) if book_id == book
    ));
}
