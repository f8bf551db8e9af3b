use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{BookId, OrderId, UserId, VillageId};
use domain::{Book, Money, Order, OrderLineItem, OrderStatus, User, totals_match};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{CancelOutcome, NewOrder, PaymentMark, PlacedOrder, Store};

#[derive(Default)]
struct State {
    books: HashMap<BookId, Book>,
    users: HashMap<UserId, User>,
    orders: HashMap<OrderId, Order>,
    line_items: HashMap<OrderId, Vec<OrderLineItem>>,
}

/// In-memory store implementation for tests and the demo server.
///
/// Each unit-of-work method holds the single write lock for its whole
/// body, so it has the same all-or-nothing visibility as the PostgreSQL
/// implementation: no mutation happens until every check has passed.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current stock level of a book.
    pub async fn stock_of(&self, id: BookId) -> Option<u32> {
        self.state.read().await.books.get(&id).map(|b| b.stock_quantity)
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_book(&self, book: Book) -> Result<()> {
        self.state.write().await.books.insert(book.id, book);
        Ok(())
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn get_books(&self, ids: &[BookId]) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        let mut books = Vec::with_capacity(ids.len());
        for id in ids {
            let book = state
                .books
                .get(id)
                .cloned()
                .ok_or(StoreError::BookNotFound(*id))?;
            books.push(book);
        }
        Ok(books)
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        self.state.write().await.users.insert(user.id, user);
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn set_shipping_village(&self, user_id: UserId, village_id: VillageId) -> Result<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserNotFound(user_id))?;
        user.village_id = Some(village_id);
        Ok(())
    }

    async fn place_order(&self, new_order: NewOrder) -> Result<PlacedOrder> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&new_order.user_id) {
            return Err(StoreError::UserNotFound(new_order.user_id));
        }

        // Validate every line before mutating anything.
        let mut computed_total = Money::zero();
        let mut priced_lines: Vec<(BookId, u32, Money)> = Vec::with_capacity(new_order.cart.len());
        for (book_id, quantity) in new_order.cart.iter() {
            let book = state
                .books
                .get(&book_id)
                .ok_or(StoreError::BookNotFound(book_id))?;
            if !book.has_stock_for(quantity) {
                return Err(StoreError::InsufficientStock {
                    book_id,
                    requested: quantity,
                    available: book.stock_quantity,
                });
            }
            computed_total += book.price.multiply(quantity);
            priced_lines.push((book_id, quantity, book.price));
        }

        if !totals_match(new_order.submitted_total, computed_total) {
            return Err(StoreError::TotalMismatch {
                submitted: new_order.submitted_total,
                computed: computed_total,
            });
        }

        let order_id = OrderId::new();
        let mut line_items = Vec::with_capacity(priced_lines.len());
        for (book_id, quantity, unit_price) in priced_lines {
            if let Some(book) = state.books.get_mut(&book_id) {
                book.stock_quantity -= quantity;
            }
            line_items.push(OrderLineItem {
                order_id,
                book_id,
                quantity,
                unit_price,
            });
        }

        let order = Order {
            id: order_id,
            user_id: new_order.user_id,
            status: OrderStatus::Pending,
            payment_method: new_order.payment_method,
            payment_status: false,
            total_amount: computed_total,
            created_at: Utc::now(),
        };
        state.orders.insert(order_id, order.clone());
        state.line_items.insert(order_id, line_items.clone());

        Ok(PlacedOrder { order, line_items })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn get_line_items(&self, id: OrderId) -> Result<Vec<OrderLineItem>> {
        Ok(self
            .state
            .read()
            .await
            .line_items
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn mark_paid(&self, id: OrderId) -> Result<PaymentMark> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;

        if order.status == OrderStatus::Cancelled {
            return Err(StoreError::OrderCancelled(id));
        }
        if order.payment_status {
            return Ok(PaymentMark::AlreadyConfirmed);
        }
        order.payment_status = true;
        Ok(PaymentMark::Confirmed)
    }

    async fn cancel_and_restock(&self, id: OrderId) -> Result<CancelOutcome> {
        let mut state = self.state.write().await;

        {
            let order = state
                .orders
                .get_mut(&id)
                .ok_or(StoreError::OrderNotFound(id))?;
            if order.payment_status {
                return Err(StoreError::OrderAlreadyPaid(id));
            }
            match order.status {
                OrderStatus::Cancelled => return Ok(CancelOutcome::AlreadyCancelled),
                OrderStatus::Pending => {}
                other => {
                    return Err(StoreError::InvalidTransition {
                        from: other,
                        to: OrderStatus::Cancelled,
                    });
                }
            }
            order.status = OrderStatus::Cancelled;
        }

        let restock: Vec<(BookId, u32)> = state
            .line_items
            .get(&id)
            .map(|items| items.iter().map(|li| (li.book_id, li.quantity)).collect())
            .unwrap_or_default();
        for (book_id, quantity) in restock {
            if let Some(book) = state.books.get_mut(&book_id) {
                book.stock_quantity += quantity;
            }
        }

        Ok(CancelOutcome::Cancelled)
    }

    async fn update_status(&self, id: OrderId, new_status: OrderStatus) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;

        if !order.status.can_transition_to(new_status) {
            return Err(StoreError::InvalidTransition {
                from: order.status,
                to: new_status,
            });
        }
        order.status = new_status;
        Ok(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Cart, PaymentMethod};

    async fn seeded_store() -> (InMemoryStore, UserId, BookId) {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        let book_id = BookId::new();
        store
            .insert_user(User::new(user_id, "reader@example.com"))
            .await
            .unwrap();
        store
            .insert_book(Book::new(
                book_id,
                "978-1",
                "The Test Book",
                Money::from_cents(999),
                10,
            ))
            .await
            .unwrap();
        (store, user_id, book_id)
    }

    fn cash_order(user_id: UserId, cart: Cart, total_cents: i64) -> NewOrder {
        NewOrder {
            user_id,
            payment_method: PaymentMethod::Cash,
            cart,
            submitted_total: Money::from_cents(total_cents),
        }
    }

    #[tokio::test]
    async fn place_order_decrements_stock_and_snapshots_total() {
        let (store, user_id, book_id) = seeded_store().await;
        let cart = Cart::new([(book_id, 2)]).unwrap();

        let placed = store
            .place_order(cash_order(user_id, cart, 1998))
            .await
            .unwrap();

        assert_eq!(placed.order.total_amount.cents(), 1998);
        assert!(!placed.order.payment_status);
        assert_eq!(placed.order.status, OrderStatus::Pending);
        assert_eq!(placed.line_items.len(), 1);
        assert_eq!(placed.line_items[0].unit_price.cents(), 999);
        assert_eq!(store.stock_of(book_id).await, Some(8));
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_no_trace() {
        let (store, user_id, book_id) = seeded_store().await;
        let other = BookId::new();
        store
            .insert_book(Book::new(other, "978-2", "Scarce", Money::from_cents(500), 1))
            .await
            .unwrap();
        let cart = Cart::new([(book_id, 2), (other, 5)]).unwrap();

        let result = store.place_order(cash_order(user_id, cart, 4498)).await;

        assert!(matches!(
            result,
            Err(StoreError::InsufficientStock { book_id: b, .. }) if b == other
        ));
        assert_eq!(store.stock_of(book_id).await, Some(10));
        assert_eq!(store.stock_of(other).await, Some(1));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn total_mismatch_is_rejected() {
        let (store, user_id, book_id) = seeded_store().await;
        let cart = Cart::new([(book_id, 2)]).unwrap();

        let result = store.place_order(cash_order(user_id, cart, 100)).await;

        assert!(matches!(result, Err(StoreError::TotalMismatch { .. })));
        assert_eq!(store.stock_of(book_id).await, Some(10));
    }

    #[tokio::test]
    async fn unknown_user_is_rejected() {
        let (store, _, book_id) = seeded_store().await;
        let cart = Cart::new([(book_id, 1)]).unwrap();

        let result = store.place_order(cash_order(UserId::new(), cart, 999)).await;
        assert!(matches!(result, Err(StoreError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn mark_paid_is_idempotent() {
        let (store, user_id, book_id) = seeded_store().await;
        let cart = Cart::new([(book_id, 1)]).unwrap();
        let placed = store
            .place_order(cash_order(user_id, cart, 999))
            .await
            .unwrap();

        assert_eq!(
            store.mark_paid(placed.order.id).await.unwrap(),
            PaymentMark::Confirmed
        );
        assert_eq!(
            store.mark_paid(placed.order.id).await.unwrap(),
            PaymentMark::AlreadyConfirmed
        );
    }

    #[tokio::test]
    async fn cancel_and_restock_is_idempotent() {
        let (store, user_id, book_id) = seeded_store().await;
        let cart = Cart::new([(book_id, 4)]).unwrap();
        let placed = store
            .place_order(cash_order(user_id, cart, 3996))
            .await
            .unwrap();
        assert_eq!(store.stock_of(book_id).await, Some(6));

        assert_eq!(
            store.cancel_and_restock(placed.order.id).await.unwrap(),
            CancelOutcome::Cancelled
        );
        assert_eq!(store.stock_of(book_id).await, Some(10));

        // Second and third calls change nothing.
        for _ in 0..2 {
            assert_eq!(
                store.cancel_and_restock(placed.order.id).await.unwrap(),
                CancelOutcome::AlreadyCancelled
            );
            assert_eq!(store.stock_of(book_id).await, Some(10));
        }
    }

    #[tokio::test]
    async fn paid_order_cannot_be_cancelled() {
        let (store, user_id, book_id) = seeded_store().await;
        let cart = Cart::new([(book_id, 1)]).unwrap();
        let placed = store
            .place_order(cash_order(user_id, cart, 999))
            .await
            .unwrap();
        store.mark_paid(placed.order.id).await.unwrap();

        let result = store.cancel_and_restock(placed.order.id).await;
        assert!(matches!(result, Err(StoreError::OrderAlreadyPaid(_))));
        assert_eq!(store.stock_of(book_id).await, Some(9));
    }

    #[tokio::test]
    async fn cancelled_order_rejects_payment_confirmation() {
        let (store, user_id, book_id) = seeded_store().await;
        let cart = Cart::new([(book_id, 1)]).unwrap();
        let placed = store
            .place_order(cash_order(user_id, cart, 999))
            .await
            .unwrap();
        store.cancel_and_restock(placed.order.id).await.unwrap();

        let result = store.mark_paid(placed.order.id).await;
        assert!(matches!(result, Err(StoreError::OrderCancelled(_))));
    }

    #[tokio::test]
    async fn update_status_follows_the_state_machine() {
        let (store, user_id, book_id) = seeded_store().await;
        let cart = Cart::new([(book_id, 1)]).unwrap();
        let placed = store
            .place_order(cash_order(user_id, cart, 999))
            .await
            .unwrap();
        let id = placed.order.id;

        let order = store
            .update_status(id, OrderStatus::Processing)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Processing);

        let result = store.update_status(id, OrderStatus::Delivered).await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidTransition {
                from: OrderStatus::Processing,
                to: OrderStatus::Delivered,
            })
        ));

        store.update_status(id, OrderStatus::Shipped).await.unwrap();
        let order = store
            .update_status(id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn admin_status_change_has_no_stock_side_effects() {
        let (store, user_id, book_id) = seeded_store().await;
        let cart = Cart::new([(book_id, 2)]).unwrap();
        let placed = store
            .place_order(cash_order(user_id, cart, 1998))
            .await
            .unwrap();

        store
            .update_status(placed.order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        // Admin cancellation transitions status only; restocking belongs
        // to the payment reconciliation path.
        assert_eq!(store.stock_of(book_id).await, Some(8));
    }

    #[tokio::test]
    async fn set_shipping_village_updates_user() {
        let (store, user_id, _) = seeded_store().await;
        let village = VillageId::from_uuid(uuid::Uuid::new_v4());

        store.set_shipping_village(user_id, village).await.unwrap();
        let user = store.get_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.village_id, Some(village));

        let result = store
            .set_shipping_village(UserId::new(), village)
            .await;
        assert!(matches!(result, Err(StoreError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn round_trip_reports_exact_line_items() {
        let (store, user_id, book_a) = seeded_store().await;
        let book_b = BookId::new();
        store
            .insert_book(Book::new(book_b, "978-3", "Companion", Money::from_cents(500), 5))
            .await
            .unwrap();
        let cart = Cart::new([(book_a, 2), (book_b, 1)]).unwrap();

        let placed = store
            .place_order(cash_order(user_id, cart, 2498))
            .await
            .unwrap();

        let reloaded = store.get_order(placed.order.id).await.unwrap().unwrap();
        assert_eq!(reloaded.total_amount.cents(), 2498);

        let items = store.get_line_items(placed.order.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items.iter().find(|li| li.book_id == book_a).unwrap().quantity,
            2
        );
        assert_eq!(
            items.iter().find(|li| li.book_id == book_b).unwrap().quantity,
            1
        );
    }
}
