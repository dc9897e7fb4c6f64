//! Shared helpers for the integration tests

#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use pharmaconnect::api::{app_state::AppState, create_router};
use pharmaconnect::config::config::AppConfig;
use pharmaconnect::storage::Tables;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    /// Stands in for OpenAI, Perplexity and Stripe
    pub upstream: MockServer,
}

/// Development config pointed at the mock upstream
pub async fn test_config() -> (AppConfig, MockServer) {
    let upstream = MockServer::start().await;
    let mut config = AppConfig::development();
    config.openai.base_url = upstream.uri();
    config.openai.api_key = "sk-test".into();
    config.perplexity.base_url = upstream.uri();
    config.perplexity.api_key = "pplx-test".into();
    config.stripe.base_url = upstream.uri();
    config.stripe.secret_key = "sk_test_123".into();
    (config, upstream)
}

pub async fn spawn_app() -> TestApp {
    let (config, upstream) = test_config().await;
    spawn_with(config, upstream)
}

pub fn spawn_with(config: AppConfig, upstream: MockServer) -> TestApp {
    let state = AppState::from_config(config, Tables::in_memory()).unwrap();
    TestApp {
        router: create_router(state.clone()),
        state,
        upstream,
    }
}

impl TestApp {
    pub fn token(&self, user: &str) -> String {
        self.state
            .auth
            .issue_user_token(user, Some(&format!("{}@example.com.br", user)), 3600)
            .unwrap()
    }

    /// Send a request as `user` and return status plus JSON body (`Null` when empty)
    pub async fn call(&self, method: &str, uri: &str, user: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn post(&self, uri: &str, user: &str, body: Value) -> (StatusCode, Value) {
        self.call("POST", uri, user, Some(body)).await
    }

    pub async fn get(&self, uri: &str, user: &str) -> (StatusCode, Value) {
        self.call("GET", uri, user, None).await
    }

    /// Answer every chat completion with `answer`
    pub async fn mock_chat(&self, answer: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": answer}}]
            })))
            .mount(&self.upstream)
            .await;
    }
}
