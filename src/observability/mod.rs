//! Observability
//!
//! Prometheus metrics, structured logging and health checks.

use axum::{
    Json, Router,
    extract::{MatchedPath, Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::app_state::AppState;
use crate::config::config::LoggingConfig;
use crate::error::{AppError, Result};
use crate::storage::repository::Filter;

// ===== Metrics =====

/// Application metrics, registered on a private registry
pub struct AppMetrics {
    registry: Registry,
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub http_requests_in_flight: IntGauge,
    pub function_calls_total: IntCounterVec,
    pub handoff_jobs_total: IntCounterVec,
}

impl AppMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("pharmaconnect".into()), None).map_err(metrics_error)?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests"),
            &["method", "route", "status"],
        )
        .map_err(metrics_error)?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request duration in seconds"),
            &["method", "route"],
        )
        .map_err(metrics_error)?;
        let http_requests_in_flight =
            IntGauge::new("http_requests_in_flight", "Requests being served").map_err(metrics_error)?;
        let function_calls_total = IntCounterVec::new(
            Opts::new("function_calls_total", "Edge function calls by outcome"),
            &["function", "outcome"],
        )
        .map_err(metrics_error)?;
        let handoff_jobs_total = IntCounterVec::new(
            Opts::new("handoff_jobs_total", "Handoff jobs processed by final status"),
            &["status"],
        )
        .map_err(metrics_error)?;

        registry.register(Box::new(http_requests_total.clone())).map_err(metrics_error)?;
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .map_err(metrics_error)?;
        registry.register(Box::new(http_requests_in_flight.clone())).map_err(metrics_error)?;
        registry.register(Box::new(function_calls_total.clone())).map_err(metrics_error)?;
        registry.register(Box::new(handoff_jobs_total.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            function_calls_total,
            handoff_jobs_total,
        })
    }

    pub fn record_function(&self, function: &str, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        self.function_calls_total.with_label_values(&[function, outcome]).inc();
    }

    pub fn record_handoff(&self, status: &str, count: u64) {
        if count > 0 {
            self.handoff_jobs_total.with_label_values(&[status]).inc_by(count);
        }
    }

    /// Prometheus text exposition
    pub fn gather(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| AppError::Internal(e.to_string()))
    }
}

fn metrics_error(e: prometheus::Error) -> AppError {
    AppError::Internal(format!("metrics: {}", e))
}

// ===== Health Check =====

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub checks: Vec<HealthCheck>,
}

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    pub message: Option<String>,
    pub latency_ms: Option<u64>,
}

impl HealthCheck {
    fn healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Process-wide observability state
pub struct ObservabilityState {
    pub metrics: AppMetrics,
    pub start_time: DateTime<Utc>,
    pub version: String,
}

impl ObservabilityState {
    pub fn new(version: &str) -> Result<Self> {
        Ok(Self {
            metrics: AppMetrics::new()?,
            start_time: Utc::now(),
            version: version.to_string(),
        })
    }

    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

async fn storage_check(state: &AppState) -> HealthCheck {
    let started = std::time::Instant::now();
    let result = state.tables.profiles.list(&Filter::new(), 1, 0).await;
    let latency_ms = Some(started.elapsed().as_millis() as u64);

    match result {
        Ok(_) => HealthCheck {
            name: "storage".into(),
            status: "healthy".into(),
            message: Some(state.config.database.backend.clone()),
            latency_ms,
        },
        Err(e) => HealthCheck {
            name: "storage".into(),
            status: "unhealthy".into(),
            message: Some(e.to_string()),
            latency_ms,
        },
    }
}

/// Full health report
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let checks = vec![storage_check(&state).await];
    let all_healthy = checks.iter().all(HealthCheck::healthy);

    let status = HealthStatus {
        status: if all_healthy { "healthy" } else { "unhealthy" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.observability.version.clone(),
        uptime_seconds: state.observability.uptime_seconds(),
        checks,
    };

    let code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

pub async fn liveness() -> impl IntoResponse {
    "OK"
}

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if storage_check(&state).await.healthy() {
        (StatusCode::OK, "Ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
    }
}

pub async fn metrics(State(state): State<AppState>) -> Result<Response> {
    let body = state.observability.metrics.gather()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

pub async fn version(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.config.app_name,
        "version": state.observability.version,
        "environment": state.config.environment,
        "uptime_seconds": state.observability.uptime_seconds(),
    }))
}

pub fn create_observability_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .route("/metrics", get(metrics))
        .route("/version", get(version))
}

// ===== Request Metrics Middleware =====

pub async fn metrics_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let metrics = &state.observability.metrics;
    metrics.http_requests_in_flight.inc();
    let timer = metrics
        .http_request_duration_seconds
        .with_label_values(&[method.as_str(), route.as_str()])
        .start_timer();

    let response = next.run(req).await;

    timer.observe_duration();
    metrics.http_requests_in_flight.dec();
    metrics
        .http_requests_total
        .with_label_values(&[method.as_str(), route.as_str(), response.status().as_str()])
        .inc();

    response
}

// ===== Structured Logging =====

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level. When `log_dir` is set, logs
/// also go to a daily rolling file; keep the returned guard alive so the
/// file writer flushes.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{},pharmaconnect={}", config.level, config.level)))
        .map_err(|e| AppError::Config(format!("invalid log level: {}", e)))?;

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "pharmaconnect.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    let installed = if config.structured {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()
    };
    installed.map_err(|e| AppError::Config(format!("failed to install tracing subscriber: {}", e)))?;

    Ok(guard)
}
