//! News request handling
//!
//! Maps `GET /v1/news/{endpoint}` onto the rotating-key client. Rate limiting
//! never reaches the caller: it is absorbed by rotation or surfaces as an
//! empty `200`. Every other failure becomes a JSON error body carrying the
//! request id.

use axum::Json;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use newsdata::{Endpoint, NewsQuery, RotatingKeyHttpClient};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Response header echoing the generated request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared state passed to the news handler via axum State extractor
#[derive(Clone)]
pub struct GatewayState {
    pub client: Arc<RotatingKeyHttpClient>,
    pub requests_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(client: RotatingKeyHttpClient) -> Self {
        Self {
            client: Arc::new(client),
            requests_total: Arc::new(AtomicU64::new(0)),
            errors_total: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

/// JSON error response: {"error":{"type":"...","message":"...","request_id":"req_..."}}
pub fn error_response(
    status: StatusCode,
    error_type: &str,
    message: &str,
    request_id: &str,
) -> Response {
    let body = serde_json::json!({
        "error": {
            "type": error_type,
            "message": message,
            "request_id": request_id,
        }
    });
    let mut response = (status, Json(body)).into_response();
    attach_request_id(&mut response, request_id);
    response
}

fn attach_request_id(response: &mut Response, request_id: &str) {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}

/// Status code, error type and metrics label for a client error.
fn classify(err: &newsdata::Error) -> (StatusCode, &'static str, &'static str) {
    match err {
        newsdata::Error::Upstream { status: 400 | 422, .. } => {
            (StatusCode::BAD_REQUEST, "invalid_request", "upstream")
        }
        newsdata::Error::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream_error", "upstream"),
        newsdata::Error::Network { .. } => (StatusCode::BAD_GATEWAY, "network_error", "network"),
        newsdata::Error::Parse(_) => (StatusCode::BAD_GATEWAY, "parse_error", "parse"),
        newsdata::Error::Config(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "config_error",
            "config",
        ),
    }
}

/// Serve one news request.
///
/// `agent` is the caller label from `x-agent-name`, used in logs only.
#[instrument(skip_all, fields(request_id = %request_id, endpoint = %endpoint))]
pub async fn news(
    state: &GatewayState,
    endpoint: &str,
    query: NewsQuery,
    agent: Option<&str>,
    request_id: String,
) -> Response {
    state.requests_total.fetch_add(1, Ordering::Relaxed);

    let endpoint: Endpoint = match endpoint.parse() {
        Ok(e) => e,
        Err(message) => {
            state.errors_total.fetch_add(1, Ordering::Relaxed);
            warn!(%message, "rejected unknown endpoint");
            return error_response(StatusCode::NOT_FOUND, "not_found", &message, &request_id);
        }
    };

    let started = Instant::now();
    let result = state.client.fetch(endpoint, &query, agent).await;
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok(body) => {
            info!(
                agent = agent.unwrap_or("-"),
                results = body.results.len(),
                elapsed_ms = (elapsed * 1000.0) as u64,
                "news request served"
            );
            crate::metrics::record_request(endpoint.as_str(), StatusCode::OK.as_u16(), elapsed);
            let mut response = (StatusCode::OK, Json(body)).into_response();
            attach_request_id(&mut response, &request_id);
            response
        }
        Err(e) => {
            state.errors_total.fetch_add(1, Ordering::Relaxed);
            let (status, error_type, label) = classify(&e);
            error!(error = %e, status = status.as_u16(), "news request failed");
            crate::metrics::record_upstream_error(label);
            crate::metrics::record_request(endpoint.as_str(), status.as_u16(), elapsed);
            error_response(status, error_type, &e.to_string(), &request_id)
        }
    }
}
