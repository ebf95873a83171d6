//! # Hook-Ledger HTTP Service
//!
//! HTTP server for receiving webhooks and serving normalized events to pollers.
//!
//! This service provides:
//! - Webhook intake endpoint (`POST /webhook`, path configurable)
//! - Event retrieval for pollers (`GET /api/events`)
//! - Administrative clear (`DELETE /admin/events`)
//! - Health, readiness and Prometheus metrics endpoints

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod responses;

pub use config::{EventsConfig, LoggingConfig, ServerConfig, ServiceConfig, WebhookConfig};
pub use errors::{ConfigError, EventsHandlerError, ServiceError, WebhookHandlerError};
pub use health::{HealthCheckResult, HealthChecker, HealthStatus, StoreHealthChecker};
pub use metrics::ServiceMetrics;
pub use responses::*;

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{Json, Response},
    routing::{delete, get, post},
    Router,
};
use bytes::Bytes;
use hook_ledger_core::{
    ingest, retrieve, EventStore, HookLedgerError, IngestOutcome, WebhookHeaders, WebhookKind,
    WebhookProcessor, WebhookRequest,
};
use std::{
    collections::HashMap,
    future::{Future, IntoFuture},
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Webhook processor for normalizing deliveries
    pub webhook_processor: Arc<dyn WebhookProcessor>,

    /// Health checker for system monitoring
    pub health_checker: Arc<dyn HealthChecker>,

    /// Event store shared by every request
    pub event_store: Arc<dyn EventStore>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        webhook_processor: Arc<dyn WebhookProcessor>,
        health_checker: Arc<dyn HealthChecker>,
        event_store: Arc<dyn EventStore>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config,
            webhook_processor,
            health_checker,
            event_store,
            metrics,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let webhook_routes =
        Router::new().route(&state.config.webhooks.endpoint_path, post(handle_webhook));

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/health/deep", get(handle_deep_health_check))
        .route("/ready", get(handle_readiness_check));

    let api_routes = Router::new().route("/api/events", get(list_events));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    let admin_routes = Router::new().route("/admin/events", delete(clear_events));

    let max_body_size = state.config.server.max_body_size;
    let enable_cors = state.config.server.enable_cors;

    let router = Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(api_routes)
        .merge(observability_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(DefaultBodyLimit::max(max_body_size))
                .into_inner(),
        );

    let router = if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

/// Start HTTP server
pub async fn start_server(
    config: ServiceConfig,
    webhook_processor: Arc<dyn WebhookProcessor>,
    health_checker: Arc<dyn HealthChecker>,
    event_store: Arc<dyn EventStore>,
) -> Result<(), ServiceError> {
    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;

    let state = AppState::new(
        config.clone(),
        webhook_processor,
        health_checker,
        event_store,
        metrics,
    );
    let app = create_router(state);

    let address = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = address.parse().map_err(|e| ServiceError::BindFailed {
        address: address.clone(),
        message: format!("invalid socket address: {}", e),
    })?;
    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: addr.to_string(),
                message: e.to_string(),
            })?;

    info!("Starting HTTP server on {}", addr);

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let (signalled_tx, signalled_rx) = oneshot::channel();

    let shutdown_signal = async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl+C signal handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM signal handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
            },
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
            },
        }
        let _ = signalled_tx.send(());
    };

    // No new connections are accepted after the signal; in-flight requests
    // get until the shutdown timeout to finish.
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .into_future();

    match serve_with_drain_deadline(server, signalled_rx, shutdown_timeout).await {
        Some(result) => result.map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?,
        None => warn!(
            timeout_seconds = shutdown_timeout.as_secs(),
            "Graceful shutdown timed out, abandoning in-flight requests"
        ),
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Drive `server` to completion, giving up `drain_timeout` after `signalled`
/// fires. Returns `None` when the deadline won.
async fn serve_with_drain_deadline<F>(
    server: F,
    signalled: oneshot::Receiver<()>,
    drain_timeout: Duration,
) -> Option<F::Output>
where
    F: Future,
{
    let deadline = async move {
        match signalled.await {
            Ok(()) => tokio::time::sleep(drain_timeout).await,
            // Sender dropped without a signal: the server is already finishing
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        output = server => Some(output),
        _ = deadline => None,
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Handle webhook deliveries
///
/// 1. Parse headers; a missing event header is a `400`
/// 2. Parse the body; a missing or non-JSON body is a `400`
/// 3. Normalize; deliveries that produce no record are acknowledged `200`
/// 4. Store; a storage failure is a `503` so the sender retries
#[instrument(skip(state, headers, body))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookOutcomeResponse>, WebhookHandlerError> {
    let start = Instant::now();

    // Convert headers to HashMap
    let header_map: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_lowercase(),
                v.to_str().unwrap_or("").to_string(),
            )
        })
        .collect();

    let webhook_headers = WebhookHeaders::from_http_headers(&header_map).map_err(|e| {
        state.metrics.record_webhook_rejected();
        WebhookHandlerError::InvalidHeaders(e)
    })?;

    let request = WebhookRequest::new(webhook_headers, body);
    state
        .metrics
        .record_webhook_received(metric_kind(request.event_type()));

    let outcome = ingest(
        state.webhook_processor.as_ref(),
        state.event_store.as_ref(),
        &request,
    )
    .await;
    state.metrics.record_webhook_duration(start.elapsed());

    match outcome {
        Ok(IngestOutcome::Stored(record)) => {
            state.metrics.record_event_stored();
            Ok(Json(WebhookOutcomeResponse::Stored(WebhookResponse {
                status: "success".to_string(),
                event: record.action,
                author: record.author,
                id: record.id,
            })))
        }
        Ok(IngestOutcome::Skipped(reason)) => {
            info!(
                event_type = %request.event_type(),
                reason = %reason,
                "Acknowledged webhook without storing an event"
            );
            state.metrics.record_webhook_ignored(reason.label());
            Ok(Json(WebhookOutcomeResponse::Acknowledged(
                WebhookAckResponse::from(&reason),
            )))
        }
        Err(e) => {
            match &e {
                HookLedgerError::Storage(_) => state.metrics.record_storage_failure("insert"),
                _ => state.metrics.record_webhook_rejected(),
            }
            Err(e.into())
        }
    }
}

/// Bounded label set for the webhook counters
fn metric_kind(event_type: &str) -> &'static str {
    match WebhookKind::from_label(event_type) {
        WebhookKind::Push => "push",
        WebhookKind::PullRequest => "pull_request",
        WebhookKind::Ping => "ping",
        WebhookKind::Unsupported(_) => "other",
    }
}

// ============================================================================
// Event Handlers
// ============================================================================

/// Serve one poll of the retrieval protocol
#[instrument(skip(state))]
async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventsParams>,
) -> Result<Json<EventsResponse>, EventsHandlerError> {
    let request = params.into_request();

    let batch = retrieve(
        state.event_store.as_ref(),
        &request,
        state.config.events.limits(),
    )
    .await
    .map_err(|e| {
        state.metrics.record_storage_failure("query");
        EventsHandlerError::Retrieval(e)
    })?;

    state.metrics.record_poll(batch.mode.as_str(), batch.count);
    Ok(Json(EventsResponse::success(batch)))
}

/// Delete every stored event record
#[instrument(skip(state))]
async fn clear_events(State(state): State<AppState>) -> Result<Json<ClearResponse>, EventsHandlerError> {
    let deleted = state.event_store.clear().await.map_err(|e| {
        state.metrics.record_storage_failure("clear");
        EventsHandlerError::Clear(e)
    })?;

    warn!(deleted, "Cleared all event records");
    state.metrics.record_clear(deleted);

    Ok(Json(ClearResponse {
        status: "success".to_string(),
        deleted,
    }))
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Basic health check endpoint
#[instrument(skip(state))]
async fn handle_health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let status = state.health_checker.check_basic_health().await;
    health_response(status)
}

/// Deep health check with event store connectivity
#[instrument(skip(state))]
async fn handle_deep_health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let status = state.health_checker.check_deep_health().await;
    health_response(status)
}

fn health_response(status: HealthStatus) -> Result<Json<HealthResponse>, StatusCode> {
    let response = HealthResponse {
        status: if status.is_healthy {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        timestamp: chrono::Utc::now(),
        checks: status.checks,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    if status.is_healthy {
        Ok(Json(response))
    } else {
        warn!(checks = ?response.checks, "Health check failed");
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Readiness check for load balancers
#[instrument(skip(state))]
async fn handle_readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, StatusCode> {
    let is_ready = state.health_checker.check_readiness().await;

    let response = ReadinessResponse {
        ready: is_ready,
        timestamp: chrono::Utc::now(),
    };

    if is_ready {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.encode().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Log each request inside a span carrying its correlation id and, for
/// webhook deliveries, the sender's delivery id
#[instrument(skip(request, next), fields(
    method = %request.method(),
    path = %request.uri().path(),
    correlation_id,
    delivery_id
))]
async fn request_logging_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let started = Instant::now();
    let span = tracing::Span::current();

    let correlation_id = header_text(request.headers(), "x-correlation-id")
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    span.record("correlation_id", correlation_id.as_str());
    if let Some(delivery_id) = header_text(request.headers(), "x-github-delivery") {
        span.record("delivery_id", delivery_id.as_str());
    }

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert("x-correlation-id", value);
    }

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if status.is_server_error() {
        error!(status = status.as_u16(), elapsed_ms, "Request failed");
    } else if status.is_client_error() {
        warn!(status = status.as_u16(), elapsed_ms, "Request rejected");
    } else {
        info!(status = status.as_u16(), elapsed_ms, "Request served");
    }

    response
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
