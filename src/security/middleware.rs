//! Security Middleware Module
//!
//! Axum middleware for bearer authentication, security headers and CORS.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::debug;

use crate::api::app_state::AppState;
use crate::error::AppError;
use crate::security::auth::{Claims, bearer_token};

/// Require a valid bearer token and expose its `Claims` to handlers
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(token) = bearer_token(header) else {
        return AppError::Authentication("missing bearer token".into()).into_response();
    };

    match state.auth.validate_token(token) {
        Ok(claims) => {
            debug!(user_id = %claims.sub, role = %claims.role, "request authenticated");
            req.extensions_mut().insert::<Claims>(claims);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

/// Security headers middleware
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "Permissions-Policy",
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );

    response
}

/// Any origin may call the API; preflights are answered by the layer
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("apikey"),
            header::HeaderName::from_static("x-client-info"),
        ])
        .max_age(Duration::from_secs(86400))
}
