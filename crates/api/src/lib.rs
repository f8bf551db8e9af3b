//! HTTP API server for the bookshop order and payment workflow.
//!
//! Provides REST endpoints for order placement (pay-on-delivery and
//! hosted checkout), payment verification, and admin status transitions,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::{CheckoutCoordinator, PaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            post(routes::orders::place::<S>).get(routes::orders::list::<S>),
        )
        .route(
            "/orders/checkout-session",
            post(routes::orders::checkout_session::<S>),
        )
        .route(
            "/orders/verify",
            get(routes::orders::verify::<S>).post(routes::orders::verify::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>).patch(routes::orders::update_status::<S>),
        )
        .route(
            "/users/shipping-address",
            put(routes::users::set_shipping_address::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state from a store and a payment gateway.
pub fn create_state<S: Store + 'static>(
    store: S,
    gateway: Arc<dyn PaymentGateway>,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        coordinator: CheckoutCoordinator::new(store, gateway),
    })
}
