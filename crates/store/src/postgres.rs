use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookId, OrderId, UserId, VillageId};
use domain::{Book, Money, Order, OrderLineItem, OrderStatus, PaymentMethod, User, totals_match};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{CancelOutcome, NewOrder, PaymentMark, PlacedOrder, Store};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_book(row: PgRow) -> Result<Book> {
        let stock: i32 = row.try_get("stock_quantity")?;
        Ok(Book {
            id: BookId::from_uuid(row.try_get::<Uuid, _>("id")?),
            isbn: row.try_get("isbn")?,
            title: row.try_get("title")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock_quantity: stock.max(0) as u32,
            author_id: row.try_get("author_id")?,
            category_id: row.try_get("category_id")?,
            image_url: row.try_get("image_url")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status_raw: String = row.try_get("order_status")?;
        let status: OrderStatus = status_raw.parse().map_err(|_| StoreError::Decode {
            column: "order_status",
            value: status_raw.clone(),
        })?;
        let method_raw: String = row.try_get("payment_method")?;
        let payment_method: PaymentMethod = method_raw.parse().map_err(|_| StoreError::Decode {
            column: "payment_method",
            value: method_raw.clone(),
        })?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            status,
            payment_method,
            payment_status: row.try_get("payment_status")?,
            total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_line_item(row: PgRow) -> Result<OrderLineItem> {
        let quantity: i32 = row.try_get("quantity")?;
        Ok(OrderLineItem {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            book_id: BookId::from_uuid(row.try_get::<Uuid, _>("book_id")?),
            quantity: quantity.max(0) as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn insert_book(&self, book: Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, isbn, title, price_cents, stock_quantity, author_id, category_id, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(book.price.cents())
        .bind(book.stock_quantity as i32)
        .bind(book.author_id)
        .bind(book.category_id)
        .bind(&book.image_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT id, isbn, title, price_cents, stock_quantity, author_id, category_id, image_url
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_book).transpose()
    }

    async fn get_books(&self, ids: &[BookId]) -> Result<Vec<Book>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, isbn, title, price_cents, stock_quantity, author_id, category_id, image_url
            FROM books
            WHERE id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;

        let books: Vec<Book> = rows
            .into_iter()
            .map(Self::row_to_book)
            .collect::<Result<_>>()?;

        if let Some(missing) = ids.iter().find(|id| books.iter().all(|b| b.id != **id)) {
            return Err(StoreError::BookNotFound(*missing));
        }
        Ok(books)
    }

    async fn insert_user(&self, user: User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, email, village_id) VALUES ($1, $2, $3)")
            .bind(user.id.as_uuid())
            .bind(&user.email)
            .bind(user.village_id.map(|v| v.as_uuid()))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, village_id FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(User {
                id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
                email: row.try_get("email")?,
                village_id: row
                    .try_get::<Option<Uuid>, _>("village_id")?
                    .map(VillageId::from_uuid),
            })),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn set_shipping_village(&self, user_id: UserId, village_id: VillageId) -> Result<()> {
        let result = sqlx::query("UPDATE users SET village_id = $2 WHERE id = $1")
            .bind(user_id.as_uuid())
            .bind(village_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound(user_id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, new_order), fields(user_id = %new_order.user_id))]
    async fn place_order(&self, new_order: NewOrder) -> Result<PlacedOrder> {
        let mut tx = self.pool.begin().await?;

        let user_exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = $1")
            .bind(new_order.user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        if user_exists.is_none() {
            return Err(StoreError::UserNotFound(new_order.user_id));
        }

        // Lock the cart's book rows in ascending id order (the Cart
        // iterates that way), verify stock under the lock, and collect
        // placement-time prices. An early return drops the transaction,
        // rolling everything back.
        let mut computed_total = Money::zero();
        let mut priced_lines: Vec<(BookId, u32, Money)> = Vec::with_capacity(new_order.cart.len());
        for (book_id, quantity) in new_order.cart.iter() {
            let row = sqlx::query(
                "SELECT price_cents, stock_quantity FROM books WHERE id = $1 FOR UPDATE",
            )
            .bind(book_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::BookNotFound(book_id))?;

            let available: i32 = row.try_get("stock_quantity")?;
            if i64::from(quantity) > i64::from(available) {
                return Err(StoreError::InsufficientStock {
                    book_id,
                    requested: quantity,
                    available: available.max(0) as u32,
                });
            }

            let unit_price = Money::from_cents(row.try_get("price_cents")?);
            computed_total += unit_price.multiply(quantity);
            priced_lines.push((book_id, quantity, unit_price));
        }

        if !totals_match(new_order.submitted_total, computed_total) {
            return Err(StoreError::TotalMismatch {
                submitted: new_order.submitted_total,
                computed: computed_total,
            });
        }

        let order_id = OrderId::new();
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO orders (id, user_id, order_status, payment_method, payment_status, total_amount_cents)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING created_at
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(new_order.user_id.as_uuid())
        .bind(OrderStatus::Pending.as_str())
        .bind(new_order.payment_method.as_str())
        .bind(computed_total.cents())
        .fetch_one(&mut *tx)
        .await?;

        let mut line_items = Vec::with_capacity(priced_lines.len());
        for (book_id, quantity, unit_price) in &priced_lines {
            sqlx::query(
                r#"
                INSERT INTO order_line_items (order_id, book_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(book_id.as_uuid())
            .bind(*quantity as i32)
            .bind(unit_price.cents())
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE books SET stock_quantity = stock_quantity - $2 WHERE id = $1")
                .bind(book_id.as_uuid())
                .bind(*quantity as i32)
                .execute(&mut *tx)
                .await?;

            line_items.push(OrderLineItem {
                order_id,
                book_id: *book_id,
                quantity: *quantity,
                unit_price: *unit_price,
            });
        }

        tx.commit().await?;

        tracing::info!(%order_id, total = %computed_total, "order placed");

        Ok(PlacedOrder {
            order: Order {
                id: order_id,
                user_id: new_order.user_id,
                status: OrderStatus::Pending,
                payment_method: new_order.payment_method,
                payment_status: false,
                total_amount: computed_total,
                created_at,
            },
            line_items,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, order_status, payment_method, payment_status, total_amount_cents, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get_line_items(&self, id: OrderId) -> Result<Vec<OrderLineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, book_id, quantity, unit_price_cents
            FROM order_line_items
            WHERE order_id = $1
            ORDER BY book_id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line_item).collect()
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, order_status, payment_method, payment_status, total_amount_cents, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn mark_paid(&self, id: OrderId) -> Result<PaymentMark> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT order_status, payment_status FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::OrderNotFound(id))?;

        let status_raw: String = row.try_get("order_status")?;
        if status_raw == OrderStatus::Cancelled.as_str() {
            return Err(StoreError::OrderCancelled(id));
        }
        if row.try_get::<bool, _>("payment_status")? {
            return Ok(PaymentMark::AlreadyConfirmed);
        }

        sqlx::query("UPDATE orders SET payment_status = TRUE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(PaymentMark::Confirmed)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_and_restock(&self, id: OrderId) -> Result<CancelOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT order_status, payment_status FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::OrderNotFound(id))?;

        if row.try_get::<bool, _>("payment_status")? {
            return Err(StoreError::OrderAlreadyPaid(id));
        }

        let status_raw: String = row.try_get("order_status")?;
        let status: OrderStatus = status_raw.parse().map_err(|_| StoreError::Decode {
            column: "order_status",
            value: status_raw.clone(),
        })?;
        match status {
            OrderStatus::Cancelled => return Ok(CancelOutcome::AlreadyCancelled),
            OrderStatus::Pending => {}
            other => {
                return Err(StoreError::InvalidTransition {
                    from: other,
                    to: OrderStatus::Cancelled,
                });
            }
        }

        sqlx::query("UPDATE orders SET order_status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(OrderStatus::Cancelled.as_str())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE books b
            SET stock_quantity = b.stock_quantity + li.quantity
            FROM order_line_items li
            WHERE li.order_id = $1 AND b.id = li.book_id
            "#,
        )
        .bind(id.as_uuid())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %id, "order cancelled, stock restored");
        Ok(CancelOutcome::Cancelled)
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(&self, id: OrderId, new_status: OrderStatus) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let status_raw: Option<String> =
            sqlx::query_scalar("SELECT order_status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let status_raw = status_raw.ok_or(StoreError::OrderNotFound(id))?;
        let current: OrderStatus = status_raw.parse().map_err(|_| StoreError::Decode {
            column: "order_status",
            value: status_raw.clone(),
        })?;

        if !current.can_transition_to(new_status) {
            return Err(StoreError::InvalidTransition {
                from: current,
                to: new_status,
            });
        }

        let row = sqlx::query(
            r#"
            UPDATE orders SET order_status = $2
            WHERE id = $1
            RETURNING id, user_id, order_status, payment_method, payment_status, total_amount_cents, created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(new_status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let order = Self::row_to_order(row)?;
        tx.commit().await?;
        Ok(order)
    }
}
