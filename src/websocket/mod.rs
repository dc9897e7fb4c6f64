//! Realtime WebSocket endpoints
//!
//! Two feeds share this module: the per-user notification stream and the
//! WebRTC signaling relay. Browsers cannot set headers on a WebSocket
//! upgrade, so both authenticate with an `access_token` query parameter.

pub mod notifications;
pub mod signaling;

pub use notifications::{NotificationHub, notifications_ws_handler};
pub use signaling::{SignalingHub, signaling_ws_handler};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::security::auth::{Claims, JwtAuth};

/// Server → client envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct WebSocketMessage {
    pub r#type: String,
    pub topic: String,
    pub data: serde_json::Value,
}

impl WebSocketMessage {
    pub fn new(kind: &str, topic: &str, data: serde_json::Value) -> Self {
        Self {
            r#type: kind.to_string(),
            topic: topic.to_string(),
            data,
        }
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub access_token: Option<String>,
}

/// Validate the upgrade request's token before accepting the socket
pub fn authenticate_query(auth: &JwtAuth, query: &TokenQuery) -> Result<Claims> {
    let token = query
        .access_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Authentication("missing access_token".into()))?;
    auth.validate_token(token)
}
