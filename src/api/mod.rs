//! API module
//!
//! HTTP surface: edge functions, table resources and realtime sockets.

pub mod app_state;
pub mod dto;
pub mod handlers;
pub mod routes;

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower_http::trace::TraceLayer;

use crate::api::app_state::AppState;
use crate::observability::{create_observability_router, metrics_middleware};
use crate::security::middleware::{auth_middleware, cors_layer, security_headers_middleware};
use crate::websocket::{notifications_ws_handler, signaling_ws_handler};

pub fn create_router(app_state: AppState) -> Router {
    let body_limit = app_state.config.server.max_request_size;

    // Bearer-authenticated surface
    let authed = Router::new()
        .nest("/functions/v1", routes::function_routes::create_function_router())
        .nest("/rest/v1", routes::rest_routes::create_rest_router())
        .route_layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware,
        ));

    // WebSocket upgrades carry the token in the query string
    let realtime = Router::new()
        .route("/realtime/v1/notifications", get(notifications_ws_handler))
        .route("/functions/v1/webrtc-signaling", get(signaling_ws_handler));

    Router::new()
        .merge(authed)
        .merge(realtime)
        .merge(create_observability_router())
        .route_layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            metrics_middleware,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(app_state)
}
