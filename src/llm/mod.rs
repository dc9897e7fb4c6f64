//! Chat completion clients
//!
//! OpenAI and Perplexity both speak the Chat Completions wire format, so a
//! single client type serves both; they differ only in base URL, key and
//! model.

pub mod chat;

pub use chat::{ChatCompletionClient, ChatMessage, ChatModel, ChatOptions, Role};

use reqwest::StatusCode;

use crate::error::AppError;

/// Map a failed upstream response onto an `AppError`
pub async fn upstream_error(context: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(%status, context, "upstream call failed: {}", body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::UpstreamUnauthorized(format!("{} rejected the API key", context))
        }
        StatusCode::TOO_MANY_REQUESTS => AppError::UpstreamRateLimited,
        _ => AppError::Upstream(format!("{} returned {}: {}", context, status, body)),
    }
}
