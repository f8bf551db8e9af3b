//! Order placement workflow for the bookshop backend.
//!
//! [`CheckoutCoordinator`] is the single entry point that turns a
//! client-submitted cart into a durable order, under two payment paths:
//! pay-on-delivery and hosted checkout with an external card processor.
//! The gateway adapter lives in [`gateway`], with an HTTP client for the
//! real processor and an in-memory double for tests.

pub mod coordinator;
pub mod error;
pub mod gateway;

pub use coordinator::{CheckoutCoordinator, PaymentVerdict};
pub use error::{CheckoutError, GatewayError};
pub use gateway::{
    CheckoutSession, HostedCheckoutClient, HostedCheckoutConfig, InMemoryPaymentGateway,
    PaymentGateway, SessionLineItem, SessionRequest,
};
