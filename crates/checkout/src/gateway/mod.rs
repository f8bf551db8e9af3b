//! Payment gateway trait and in-memory implementation.

mod http;

pub use http::{HostedCheckoutClient, HostedCheckoutConfig};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use domain::Money;

use crate::error::GatewayError;

/// One line of the manifest sent to the hosted checkout page.
#[derive(Debug, Clone)]
pub struct SessionLineItem {
    /// Display title of the book.
    pub title: String,
    /// Price per unit in minor currency units.
    pub unit_price: Money,
    /// Quantity ordered.
    pub quantity: u32,
}

/// A request for a hosted checkout session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// The order the session pays for.
    pub order_id: OrderId,
    /// Manifest shown on the hosted payment page.
    pub line_items: Vec<SessionLineItem>,
    /// Where the processor redirects after a successful payment.
    pub success_url: String,
    /// Where the processor redirects after a cancelled payment.
    pub cancel_url: String,
}

/// A hosted checkout session created by the processor.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// The session ID assigned by the processor.
    pub session_id: String,
    /// The hosted payment page the customer is redirected to.
    pub url: String,
}

/// Trait for hosted-checkout payment processors.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a hosted checkout session for an order.
    async fn create_session(
        &self,
        request: SessionRequest,
    ) -> Result<CheckoutSession, GatewayError>;
}

#[async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for Arc<T> {
    async fn create_session(
        &self,
        request: SessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        (**self).create_session(request).await
    }
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    sessions: HashMap<String, SessionRequest>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail on the next create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns the number of sessions created.
    pub fn session_count(&self) -> usize {
        self.state.read().unwrap().sessions.len()
    }

    /// Returns the request recorded for a session ID, if any.
    pub fn session_request(&self, session_id: &str) -> Option<SessionRequest> {
        self.state.read().unwrap().sessions.get(session_id).cloned()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_session(
        &self,
        request: SessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(GatewayError::Rejected {
                status: 503,
                body: "gateway offline".to_string(),
            });
        }

        state.next_id += 1;
        let session_id = format!("CHK-{:04}", state.next_id);
        let url = format!("https://checkout.example.test/session/{session_id}");
        state.sessions.insert(session_id.clone(), request);

        Ok(CheckoutSession { session_id, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SessionRequest {
        SessionRequest {
            order_id: OrderId::new(),
            line_items: vec![SessionLineItem {
                title: "Widget Almanac".to_string(),
                unit_price: Money::from_cents(999),
                quantity: 2,
            }],
            success_url: "https://shop.example/payment/result?success=true".to_string(),
            cancel_url: "https://shop.example/payment/result?success=false".to_string(),
        }
    }

    #[tokio::test]
    async fn create_session_records_request() {
        let gateway = InMemoryPaymentGateway::new();

        let session = gateway.create_session(request()).await.unwrap();
        assert!(session.session_id.starts_with("CHK-"));
        assert!(session.url.contains(&session.session_id));
        assert_eq!(gateway.session_count(), 1);

        let recorded = gateway.session_request(&session.session_id).unwrap();
        assert_eq!(recorded.line_items.len(), 1);
        assert_eq!(recorded.line_items[0].quantity, 2);
    }

    #[tokio::test]
    async fn fail_on_create() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_create(true);

        let result = gateway.create_session(request()).await;
        assert!(matches!(result, Err(GatewayError::Rejected { status: 503, .. })));
        assert_eq!(gateway.session_count(), 0);
    }

    #[tokio::test]
    async fn sequential_session_ids() {
        let gateway = InMemoryPaymentGateway::new();

        let s1 = gateway.create_session(request()).await.unwrap();
        let s2 = gateway.create_session(request()).await.unwrap();

        assert_eq!(s1.session_id, "CHK-0001");
        assert_eq!(s2.session_id, "CHK-0002");
    }
}
