//! HTTP client for the hosted checkout processor.
//!
//! POSTs a session manifest to the processor's session endpoint and
//! returns the redirect URL. There are no automatic retries: a failed or
//! timed-out call surfaces to the coordinator, which compensates.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CheckoutSession, PaymentGateway, SessionRequest};
use crate::error::GatewayError;

/// Hosted checkout client configuration.
#[derive(Debug, Clone)]
pub struct HostedCheckoutConfig {
    /// Base URL of the payment processor API.
    pub base_url: String,

    /// Request timeout; bounds how long a placement can hang on the
    /// gateway before the compensation path runs.
    pub timeout: Duration,

    /// Bearer token for the processor API, if required.
    pub api_key: Option<String>,
}

impl Default for HostedCheckoutConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(30),
            api_key: None,
        }
    }
}

impl HostedCheckoutConfig {
    /// Create config from environment variables.
    ///
    /// - `CHECKOUT_GATEWAY_URL`: Required processor base URL
    /// - `CHECKOUT_GATEWAY_TIMEOUT_SECS`: Optional timeout in seconds (default: 30)
    /// - `CHECKOUT_GATEWAY_API_KEY`: Optional bearer token
    pub fn from_env() -> Result<Self, GatewayError> {
        let base_url = std::env::var("CHECKOUT_GATEWAY_URL")
            .map_err(|_| GatewayError::Config("CHECKOUT_GATEWAY_URL not set".to_string()))?;

        let timeout_secs = std::env::var("CHECKOUT_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            api_key: std::env::var("CHECKOUT_GATEWAY_API_KEY").ok(),
        })
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct SessionRequestBody<'a> {
    order_id: String,
    line_items: Vec<LineItemBody<'a>>,
    success_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Serialize)]
struct LineItemBody<'a> {
    title: &'a str,
    unit_amount_cents: i64,
    quantity: u32,
}

#[derive(Deserialize)]
struct SessionResponseBody {
    id: String,
    url: String,
}

/// Hosted checkout processor client.
pub struct HostedCheckoutClient {
    client: Client,
    config: HostedCheckoutConfig,
}

impl HostedCheckoutClient {
    /// Create a new client with the given configuration.
    pub fn new(config: HostedCheckoutConfig) -> Result<Self, GatewayError> {
        if config.base_url.is_empty() {
            return Err(GatewayError::Config(
                "gateway base URL not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(GatewayError::Http)?;

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self, GatewayError> {
        let config = HostedCheckoutConfig::from_env()?;
        Self::new(config)
    }

    fn sessions_endpoint(&self) -> String {
        format!("{}/v1/checkout/sessions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutClient {
    async fn create_session(
        &self,
        request: SessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let body = SessionRequestBody {
            order_id: request.order_id.to_string(),
            line_items: request
                .line_items
                .iter()
                .map(|li| LineItemBody {
                    title: &li.title,
                    unit_amount_cents: li.unit_price.cents(),
                    quantity: li.quantity,
                })
                .collect(),
            success_url: &request.success_url,
            cancel_url: &request.cancel_url,
        };

        let mut req = self.client.post(self.sessions_endpoint()).json(&body);
        if let Some(ref key) = self.config.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                "checkout session request rejected"
            );
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: SessionResponseBody = response.json().await?;
        tracing::debug!(session_id = %parsed.id, "checkout session created");

        Ok(CheckoutSession {
            session_id: parsed.id,
            url: parsed.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use domain::Money;

    #[test]
    fn config_defaults() {
        let config = HostedCheckoutConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.base_url.is_empty());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn config_builder() {
        let config = HostedCheckoutConfig::default()
            .with_base_url("https://pay.example.com".to_string())
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, "https://pay.example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn empty_base_url_fails() {
        let result = HostedCheckoutClient::new(HostedCheckoutConfig::default());
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[test]
    fn sessions_endpoint_trims_trailing_slash() {
        let client = HostedCheckoutClient::new(
            HostedCheckoutConfig::default().with_base_url("https://pay.example.com/".to_string()),
        )
        .unwrap();
        assert_eq!(
            client.sessions_endpoint(),
            "https://pay.example.com/v1/checkout/sessions"
        );
    }

    #[test]
    fn request_body_serializes_minor_units() {
        let body = SessionRequestBody {
            order_id: OrderId::new().to_string(),
            line_items: vec![LineItemBody {
                title: "The Test Book",
                unit_amount_cents: Money::from_cents(999).cents(),
                quantity: 2,
            }],
            success_url: "https://shop.example/ok",
            cancel_url: "https://shop.example/no",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["line_items"][0]["unit_amount_cents"], 999);
        assert_eq!(json["line_items"][0]["quantity"], 2);
    }
}
