//! NewsData.io Gateway
//!
//! Single-binary Rust service that:
//! 1. Loads a pool of NewsData.io API keys
//! 2. Serves news queries over HTTP for the pipeline's agents
//! 3. Rotates keys on rate limits and degrades to empty results when all
//!    keys are exhausted
//! 4. Exposes pool health and Prometheus metrics

mod config;
mod metrics;
mod routes;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use newsdata::{NewsQuery, RotatingKeyHttpClient};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::Config;
use crate::routes::GatewayState;

/// Maximum time to wait for in-flight requests after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the calling agent's name, used as a log label.
const AGENT_HEADER: &str = "x-agent-name";

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    gateway: GatewayState,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer based on `max_connections`.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/news/{endpoint}", get(news_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting news-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        base_url = %config.newsdata.base_url,
        timeout_secs = config.newsdata.timeout_secs,
        max_retries = config.newsdata.max_retries,
        "configuration loaded"
    );

    let api_keys = config
        .newsdata
        .api_keys
        .as_ref()
        .context("no NewsData API keys configured")?;
    let client = RotatingKeyHttpClient::new(api_keys.expose(), config.newsdata.client_config())
        .context("failed to build NewsData client")?;

    info!(
        credentials = client.pool().len(),
        identifiers = ?client.pool().identifiers(),
        "key pool ready"
    );

    let gateway = GatewayState::new(client);
    let requests_total = gateway.requests_total.clone();

    let app_state = AppState {
        gateway,
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts: notify the server to drain, then race the drain against
    // the timeout.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    // Wait for the OS signal
    shutdown_signal().await;

    // Signal the server to begin draining
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!(
        requests_served = requests_total.load(Ordering::Relaxed),
        "shutdown complete"
    );
    Ok(())
}

/// Health endpoint: gateway counters plus the key pool summary.
/// Returns 200 while at least one key is available, 503 when every key is parked.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.gateway.started_at.elapsed().as_secs();
    let requests = state.gateway.requests_total.load(Ordering::Relaxed);
    let errors = state.gateway.errors_total.load(Ordering::Relaxed);
    let pool = state.gateway.client.pool_health().await;

    let status = pool["status"].as_str().unwrap_or("unhealthy").to_string();
    let status_code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let body = serde_json::json!({
        "status": status,
        "uptime_seconds": uptime,
        "requests_served": requests,
        "errors_total": errors,
        "pool": pool,
    });

    (
        status_code,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint: returns metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// News endpoint: `GET /v1/news/{latest|archive|crypto|market}?q=...`
async fn news_handler(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());

    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => {
            state
                .gateway
                .errors_total
                .fetch_add(1, Ordering::Relaxed);
            warn!(request_id = %request_id, error = %rejection, "rejected query string");
            return routes::error_response(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                &rejection.body_text(),
                &request_id,
            );
        }
    };

    let agent = headers
        .get(AGENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    routes::news(&state.gateway, &endpoint, query, agent, request_id).await
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
