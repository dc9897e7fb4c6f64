//! Stripe Checkout sessions

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};
use validator::Validate;

use crate::config::config::StripeConfig;
use crate::error::{AppError, Result};
use crate::llm::upstream_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    Payment,
    #[default]
    Subscription,
}

impl CheckoutMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Subscription => "subscription",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 200))]
    pub price_id: String,
    #[serde(default)]
    #[validate(url)]
    pub success_url: Option<String>,
    #[serde(default)]
    #[validate(url)]
    pub cancel_url: Option<String>,
    #[serde(default)]
    pub mode: CheckoutMode,
    #[serde(default)]
    #[validate(range(min = 1, max = 1000))]
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

pub struct CheckoutClient {
    client: reqwest::Client,
    config: StripeConfig,
}

impl CheckoutClient {
    pub fn new(config: StripeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }

    #[instrument(skip(self, request), fields(user_id = %user_id, price_id = %request.price_id))]
    pub async fn create_session(
        &self,
        user_id: &str,
        email: Option<&str>,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession> {
        request.validate()?;
        if self.config.secret_key.is_empty() {
            return Err(AppError::Config("Stripe secret key is not configured".into()));
        }

        let success_url = request.success_url.unwrap_or_else(|| self.config.success_url.clone());
        let cancel_url = request.cancel_url.unwrap_or_else(|| self.config.cancel_url.clone());
        let quantity = request.quantity.unwrap_or(1).to_string();

        let mut form = vec![
            ("mode", request.mode.as_str().to_string()),
            ("line_items[0][price]", request.price_id.clone()),
            ("line_items[0][quantity]", quantity),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("client_reference_id", user_id.to_string()),
        ];
        if let Some(email) = email {
            form.push(("customer_email", email.to_string()));
        }

        let response = self
            .client
            .post(format!(
                "{}/v1/checkout/sessions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error("stripe", response).await);
        }

        let session: CheckoutSession = response.json().await?;
        info!(session_id = %session.id, "checkout session created");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: String, secret_key: &str) -> CheckoutClient {
        CheckoutClient::new(StripeConfig {
            base_url,
            secret_key: secret_key.into(),
            success_url: "https://app.pharmaconnect.com.br/sucesso".into(),
            cancel_url: "https://app.pharmaconnect.com.br/planos".into(),
        })
        .unwrap()
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            price_id: "price_123".into(),
            success_url: None,
            cancel_url: None,
            mode: CheckoutMode::Subscription,
            quantity: None,
        }
    }

    #[tokio::test]
    async fn test_creates_session_with_form_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("authorization", "Bearer sk_test_1"))
            .and(body_string_contains("mode=subscription"))
            .and(body_string_contains("client_reference_id=u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1",
                "url": "https://checkout.stripe.com/c/pay/cs_test_1",
                "object": "checkout.session"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(server.uri(), "sk_test_1")
            .create_session("u1", Some("ana@farma.com.br"), request())
            .await
            .unwrap();

        assert_eq!(session.id, "cs_test_1");
        assert!(session.url.starts_with("https://checkout.stripe.com"));
    }

    #[tokio::test]
    async fn test_stripe_errors_are_upstream_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": {"message": "No such price"}})))
            .mount(&server)
            .await;

        let err = client(server.uri(), "sk_test_1")
            .create_session("u1", None, request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_missing_secret_key() {
        let err = client("http://localhost:1".into(), "")
            .create_session("u1", None, request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
