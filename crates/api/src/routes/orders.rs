//! Order placement, payment verification, and admin endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use checkout::{CheckoutCoordinator, CheckoutError, PaymentGateway, PaymentVerdict};
use common::{OrderId, UserId};
use domain::{Cart, Money, Order, OrderLineItem, OrderStatus};
use serde::{Deserialize, Serialize};
use store::Store;
use uuid::Uuid;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub coordinator: CheckoutCoordinator<S, Arc<dyn PaymentGateway>>,
}

/// Resolves the acting user from the `x-user-id` header.
///
/// This is the seam where the external credential issuer plugs in: the
/// reverse proxy verifies the JWT and forwards the subject id here.
pub fn acting_user(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let raw = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing x-user-id header".to_string()))?;
    let uuid = Uuid::parse_str(raw)
        .map_err(|e| ApiError::Unauthorized(format!("invalid x-user-id header: {e}")))?;
    Ok(UserId::from_uuid(uuid))
}

// -- Request types --

#[derive(Deserialize)]
pub struct LineItemRequest {
    pub book_id: Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<LineItemRequest>,
    pub total_amount_cents: i64,
}

#[derive(Deserialize)]
pub struct CheckoutSessionRequest {
    pub items: Vec<LineItemRequest>,
    pub total_amount_cents: i64,
    /// Origin used to build the success/cancel redirect URLs.
    pub origin: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub order_id: Uuid,
    pub success: bool,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub session_url: String,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub payment_method: String,
    pub payment_status: bool,
    pub total_amount_cents: i64,
    pub created_at: String,
    pub line_items: Vec<LineItemResponse>,
}

#[derive(Serialize)]
pub struct LineItemResponse {
    pub book_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

fn order_response(order: &Order, line_items: &[OrderLineItem]) -> OrderResponse {
    OrderResponse {
        id: order.id.to_string(),
        user_id: order.user_id.to_string(),
        status: order.status.to_string(),
        payment_method: order.payment_method.to_string(),
        payment_status: order.payment_status,
        total_amount_cents: order.total_amount.cents(),
        created_at: order.created_at.to_rfc3339(),
        line_items: line_items
            .iter()
            .map(|li| LineItemResponse {
                book_id: li.book_id.to_string(),
                quantity: li.quantity,
                unit_price_cents: li.unit_price.cents(),
            })
            .collect(),
    }
}

fn build_cart(items: &[LineItemRequest]) -> Result<Cart, ApiError> {
    Cart::new(
        items
            .iter()
            .map(|item| (item.book_id.into(), item.quantity)),
    )
    .map_err(|e| ApiError::Checkout(CheckoutError::Validation(e)))
}

// -- Handlers --

/// POST /orders — place a pay-on-delivery order.
#[tracing::instrument(skip(state, headers, req))]
pub async fn place<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<AckResponse>), ApiError> {
    let user_id = acting_user(&headers)?;
    let cart = build_cart(&req.items)?;

    let placed = state
        .coordinator
        .place_order_cash_on_delivery(user_id, cart, Money::from_cents(req.total_amount_cents))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AckResponse {
            success: true,
            message: format!("order {} placed", placed.order.id),
        }),
    ))
}

/// POST /orders/checkout-session — place a card order and return the
/// hosted checkout redirect URL.
#[tracing::instrument(skip(state, headers, req))]
pub async fn checkout_session<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user_id = acting_user(&headers)?;
    let cart = build_cart(&req.items)?;

    let (_placed, session) = state
        .coordinator
        .place_order_hosted_checkout(
            user_id,
            cart,
            Money::from_cents(req.total_amount_cents),
            &req.origin,
        )
        .await?;

    Ok(Json(SessionResponse {
        success: true,
        session_url: session.url,
    }))
}

/// GET|POST /orders/verify — reconcile a payment callback.
#[tracing::instrument(skip(state))]
pub async fn verify<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<AckResponse>, ApiError> {
    let order_id = OrderId::from_uuid(params.order_id);
    let verdict = state
        .coordinator
        .verify_payment(order_id, params.success)
        .await?;

    let (success, message) = match verdict {
        PaymentVerdict::Confirmed => (true, format!("payment for order {order_id} confirmed")),
        PaymentVerdict::AlreadyConfirmed => {
            (true, format!("payment for order {order_id} was already confirmed"))
        }
        PaymentVerdict::Cancelled => (
            false,
            format!("payment failed; order {order_id} cancelled and stock restored"),
        ),
        PaymentVerdict::AlreadyCancelled => {
            (false, format!("order {order_id} was already cancelled"))
        }
    };

    Ok(Json(AckResponse { success, message }))
}

/// GET /orders/{id} — load an order with its line items.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    let order = state
        .coordinator
        .store()
        .get_order(order_id)
        .await
        .map_err(CheckoutError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("order {order_id} not found")))?;
    let line_items = state
        .coordinator
        .store()
        .get_line_items(order_id)
        .await
        .map_err(CheckoutError::from)?;

    Ok(Json(order_response(&order, &line_items)))
}

/// GET /orders — list the acting user's orders, newest first.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let user_id = acting_user(&headers)?;
    let orders = state
        .coordinator
        .store()
        .orders_for_user(user_id)
        .await
        .map_err(CheckoutError::from)?;

    let mut responses = Vec::with_capacity(orders.len());
    for order in &orders {
        let line_items = state
            .coordinator
            .store()
            .get_line_items(order.id)
            .await
            .map_err(CheckoutError::from)?;
        responses.push(order_response(order, &line_items));
    }

    Ok(Json(responses))
}

/// PATCH /orders/{id} — admin order status transition.
///
/// Transitions the status only; stock and payment are untouched.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = OrderId::from_uuid(id);
    let new_status: OrderStatus = req
        .status
        .parse()
        .map_err(|e: domain::DomainError| ApiError::BadRequest(e.to_string()))?;

    let order = state
        .coordinator
        .update_order_status(order_id, new_status)
        .await?;
    let line_items = state
        .coordinator
        .store()
        .get_line_items(order_id)
        .await
        .map_err(CheckoutError::from)?;

    Ok(Json(order_response(&order, &line_items)))
}
