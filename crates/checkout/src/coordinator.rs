//! Coordinator for the order placement and payment workflow.

use common::{OrderId, UserId, VillageId};
use domain::{Cart, Money, Order, OrderStatus};
use store::{CancelOutcome, NewOrder, PaymentMark, PlacedOrder, Store};

use crate::error::{CheckoutError, Result};
use crate::gateway::{CheckoutSession, PaymentGateway, SessionLineItem, SessionRequest};

/// Outcome of a payment verification call.
///
/// The `Already*` variants report idempotent repeats: the callback may
/// fire any number of times with the same effect as firing once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentVerdict {
    /// Payment confirmed; the flag flipped on this call.
    Confirmed,
    /// Payment was already confirmed by an earlier call.
    AlreadyConfirmed,
    /// Payment failed; the order was cancelled and stock restored on
    /// this call.
    Cancelled,
    /// The order was already cancelled by an earlier call.
    AlreadyCancelled,
}

/// Orchestrates order placement across the two payment paths.
///
/// Placement itself is a single storage transaction. The hosted-checkout
/// path adds a gateway call after the commit; a gateway failure is
/// compensated by cancelling the fresh order and restoring its stock, so
/// no pending order is left holding inventory for a session that never
/// existed.
pub struct CheckoutCoordinator<S, G>
where
    S: Store,
    G: PaymentGateway,
{
    store: S,
    gateway: G,
}

impl<S, G> CheckoutCoordinator<S, G>
where
    S: Store,
    G: PaymentGateway,
{
    /// Creates a new coordinator.
    pub fn new(store: S, gateway: G) -> Self {
        Self { store, gateway }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Advisory stock pre-check for precise client errors.
    ///
    /// The authoritative check runs again under row locks inside the
    /// placement transaction; passing here guarantees nothing under
    /// contention.
    pub async fn validate_availability(&self, cart: &Cart) -> Result<()> {
        for (book_id, requested) in cart.iter() {
            let book = self
                .store
                .get_book(book_id)
                .await?
                .ok_or(CheckoutError::BookNotFound(book_id))?;
            if !book.has_stock_for(requested) {
                return Err(CheckoutError::InsufficientStock {
                    book_id,
                    requested,
                    available: book.stock_quantity,
                });
            }
        }
        Ok(())
    }

    /// Places a pay-on-delivery order.
    ///
    /// No gateway is involved; the order stays unpaid until the courier
    /// collects.
    #[tracing::instrument(skip(self, cart), fields(lines = cart.len()))]
    pub async fn place_order_cash_on_delivery(
        &self,
        user_id: UserId,
        cart: Cart,
        submitted_total: Money,
    ) -> Result<PlacedOrder> {
        let start = std::time::Instant::now();

        self.ensure_user(user_id).await?;
        self.validate_availability(&cart).await?;

        let placed = self
            .store
            .place_order(NewOrder {
                user_id,
                payment_method: domain::PaymentMethod::Cash,
                cart,
                submitted_total,
            })
            .await?;

        metrics::counter!("orders_placed_total", "method" => "cash").increment(1);
        metrics::histogram!("order_placement_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        Ok(placed)
    }

    /// Places a card order and creates its hosted checkout session.
    ///
    /// Returns the placed order together with the session whose URL the
    /// customer is redirected to. The order commits before the customer
    /// pays; `verify_payment` reconciles the outcome later.
    #[tracing::instrument(skip(self, cart), fields(lines = cart.len()))]
    pub async fn place_order_hosted_checkout(
        &self,
        user_id: UserId,
        cart: Cart,
        submitted_total: Money,
        origin: &str,
    ) -> Result<(PlacedOrder, CheckoutSession)> {
        let start = std::time::Instant::now();

        self.ensure_user(user_id).await?;
        self.validate_availability(&cart).await?;

        let placed = self
            .store
            .place_order(NewOrder {
                user_id,
                payment_method: domain::PaymentMethod::Card,
                cart,
                submitted_total,
            })
            .await?;
        let order_id = placed.order.id;

        let request = self.build_session_request(&placed, origin).await?;

        match self.gateway.create_session(request).await {
            Ok(session) => {
                metrics::counter!("orders_placed_total", "method" => "card").increment(1);
                metrics::counter!("checkout_sessions_created_total").increment(1);
                metrics::histogram!("order_placement_duration_seconds")
                    .record(start.elapsed().as_secs_f64());
                tracing::info!(%order_id, session_id = %session.session_id, "checkout session created");
                Ok((placed, session))
            }
            Err(gateway_err) => {
                tracing::warn!(%order_id, error = %gateway_err, "gateway call failed, compensating");
                self.compensate_placement(order_id).await?;
                Err(CheckoutError::Gateway(gateway_err))
            }
        }
    }

    /// Reconciles a payment callback for an order.
    ///
    /// Success confirms the payment exactly once; failure cancels the
    /// order and restores its stock exactly once. Both directions are
    /// idempotent across repeated callbacks.
    #[tracing::instrument(skip(self))]
    pub async fn verify_payment(&self, order_id: OrderId, success: bool) -> Result<PaymentVerdict> {
        if success {
            match self.store.mark_paid(order_id).await? {
                PaymentMark::Confirmed => {
                    metrics::counter!("payments_confirmed_total").increment(1);
                    tracing::info!(%order_id, "payment confirmed");
                    Ok(PaymentVerdict::Confirmed)
                }
                PaymentMark::AlreadyConfirmed => Ok(PaymentVerdict::AlreadyConfirmed),
            }
        } else {
            match self.store.cancel_and_restock(order_id).await? {
                CancelOutcome::Cancelled => {
                    metrics::counter!("orders_cancelled_total", "reason" => "payment_failed")
                        .increment(1);
                    tracing::info!(%order_id, "payment failed, order cancelled and restocked");
                    Ok(PaymentVerdict::Cancelled)
                }
                CancelOutcome::AlreadyCancelled => Ok(PaymentVerdict::AlreadyCancelled),
            }
        }
    }

    /// Updates the user's shipping village.
    ///
    /// Invoked by the caller before placement; placing an order never
    /// touches the user record.
    #[tracing::instrument(skip(self))]
    pub async fn set_shipping_village(&self, user_id: UserId, village_id: VillageId) -> Result<()> {
        self.store.set_shipping_village(user_id, village_id).await?;
        Ok(())
    }

    /// Applies an admin-driven order status transition.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Order> {
        let order = self.store.update_status(order_id, new_status).await?;
        tracing::info!(%order_id, status = %order.status, "order status updated");
        Ok(order)
    }

    async fn ensure_user(&self, user_id: UserId) -> Result<()> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(CheckoutError::UserNotFound(user_id))?;
        Ok(())
    }

    async fn build_session_request(
        &self,
        placed: &PlacedOrder,
        origin: &str,
    ) -> Result<SessionRequest> {
        let book_ids: Vec<_> = placed.line_items.iter().map(|li| li.book_id).collect();
        let books = self.store.get_books(&book_ids).await?;

        let line_items = placed
            .line_items
            .iter()
            .map(|li| {
                let title = books
                    .iter()
                    .find(|b| b.id == li.book_id)
                    .map(|b| b.title.clone())
                    .unwrap_or_else(|| li.book_id.to_string());
                SessionLineItem {
                    title,
                    unit_price: li.unit_price,
                    quantity: li.quantity,
                }
            })
            .collect();

        let order_id = placed.order.id;
        let origin = origin.trim_end_matches('/');
        Ok(SessionRequest {
            order_id,
            line_items,
            success_url: format!("{origin}/payment/result?order_id={order_id}&success=true"),
            cancel_url: format!("{origin}/payment/result?order_id={order_id}&success=false"),
        })
    }

    /// Undoes a placement whose gateway call failed.
    async fn compensate_placement(&self, order_id: OrderId) -> Result<()> {
        match self.store.cancel_and_restock(order_id).await {
            Ok(_) => {
                metrics::counter!("orders_cancelled_total", "reason" => "gateway_failure")
                    .increment(1);
                Ok(())
            }
            Err(err) => {
                tracing::error!(%order_id, error = %err, "compensation failed; order left pending");
                Err(CheckoutError::Store(err))
            }
        }
    }
}
