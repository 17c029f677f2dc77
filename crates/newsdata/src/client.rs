//! Rotating-key NewsData.io client
//!
//! One logical request may span several HTTP attempts:
//! - 429 → park the key, rotate, reissue on the new key (not a retry)
//! - timeout / connection error / 5xx → ordinary retry with fixed backoff,
//!   bounded by `max_retries` per logical request
//! - other 4xx, malformed 2xx → error to the caller
//!
//! When no key is left the request returns `NewsResponse::empty()`.

use std::sync::Arc;
use std::time::Duration;

use key_pool::{
    Clock, CredentialPool, Lease, RateLimitBody, Rotation, SystemClock, classify_rate_limit_body,
    parse_retry_after,
};
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use tracing::{debug, error, instrument, warn};

use crate::error::{Error, Result, excerpt};
use crate::query::{Endpoint, NewsQuery};
use crate::response::NewsResponse;

/// Query parameter NewsData reads the key from.
const API_KEY_PARAM: &str = "apikey";

/// Connection settings for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Ordinary retries per logical request (rotations do not count).
    pub max_retries: u32,
    /// Fixed delay between ordinary retries.
    pub retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsdata.io/api/1".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_delay: Duration::from_millis(100),
        }
    }
}

/// Result of one HTTP attempt that did not fail outright.
enum Outcome {
    Success(NewsResponse),
    RateLimited {
        retry_after: Duration,
        body: RateLimitBody,
    },
}

/// NewsData.io client that rotates across a pool of API keys.
///
/// Share it as `Arc<RotatingKeyHttpClient>`; all methods take `&self`.
pub struct RotatingKeyHttpClient {
    http: reqwest::Client,
    pool: CredentialPool,
    config: ClientConfig,
}

impl RotatingKeyHttpClient {
    /// Build a client from a comma-delimited key list.
    ///
    /// Fails with `Error::Config` if no key survives parsing or the base URL
    /// is not http(s).
    pub fn new(api_keys: &str, config: ClientConfig) -> Result<Self> {
        Self::with_clock(api_keys, config, Arc::new(SystemClock))
    }

    /// Same as [`new`](Self::new) with an explicit clock for key expiry.
    pub fn with_clock(api_keys: &str, config: ClientConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.base_url
            )));
        }

        let pool = CredentialPool::with_clock(api_keys, clock)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, pool, config })
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Pool snapshot for health reporting (identifiers only).
    pub async fn pool_health(&self) -> serde_json::Value {
        self.pool.health().await
    }

    /// Breaking news from the last 48 hours.
    pub async fn fetch_latest(
        &self,
        query: &NewsQuery,
        context: Option<&str>,
    ) -> Result<NewsResponse> {
        self.fetch(Endpoint::Latest, query, context).await
    }

    /// Historical news (`from_date` / `to_date`).
    pub async fn fetch_archive(
        &self,
        query: &NewsQuery,
        context: Option<&str>,
    ) -> Result<NewsResponse> {
        self.fetch(Endpoint::Archive, query, context).await
    }

    /// Cryptocurrency news, optionally filtered by `coin`.
    pub async fn fetch_crypto(
        &self,
        query: &NewsQuery,
        context: Option<&str>,
    ) -> Result<NewsResponse> {
        self.fetch(Endpoint::Crypto, query, context).await
    }

    /// Financial market news, optionally filtered by `symbol`.
    pub async fn fetch_market(
        &self,
        query: &NewsQuery,
        context: Option<&str>,
    ) -> Result<NewsResponse> {
        self.fetch(Endpoint::Market, query, context).await
    }

    /// Run one logical request against `endpoint`.
    ///
    /// `context` labels the caller (e.g. an agent name) in logs only.
    #[instrument(skip_all, fields(endpoint = %endpoint, context = context.unwrap_or("-")))]
    pub async fn fetch(
        &self,
        endpoint: Endpoint,
        query: &NewsQuery,
        context: Option<&str>,
    ) -> Result<NewsResponse> {
        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.path()
        );
        let params = query.to_pairs();
        let mut failures = 0u32;
        let mut rotations = 0usize;

        'request: loop {
            let Some(lease) = self.pool.acquire().await else {
                return Ok(NewsResponse::empty());
            };

            loop {
                match self.send_once(&url, &params, &lease).await {
                    Ok(Outcome::Success(response)) => {
                        debug!(
                            credential = lease.identifier(),
                            results = response.results.len(),
                            rotations,
                            retries = failures,
                            "news request completed"
                        );
                        return Ok(response);
                    }
                    Ok(Outcome::RateLimited { retry_after, body }) => {
                        let window = body.unavailable_window(retry_after);
                        if self.pool.is_multi_key() {
                            debug!(
                                credential = lease.identifier(),
                                reason = body.reason(),
                                window_secs = window.as_secs(),
                                "upstream rate limited credential"
                            );
                        }
                        match self.pool.report_rate_limited(&lease, window).await {
                            Rotation::Rotated { .. } => {
                                // A zero window can hand back the key that was just
                                // limited, so the cap is one more than the pool size.
                                rotations += 1;
                                if rotations > self.pool.len() {
                                    self.pool.report_exhausted().await;
                                    return Ok(NewsResponse::empty());
                                }
                                continue 'request;
                            }
                            Rotation::Exhausted { .. } => return Ok(NewsResponse::empty()),
                        }
                    }
                    Err(e) if e.is_retryable() && failures < self.config.max_retries => {
                        failures += 1;
                        warn!(
                            credential = lease.identifier(),
                            attempt = failures,
                            error = %e,
                            "retrying NewsData request"
                        );
                        tokio::time::sleep(self.config.retry_delay).await;
                        self.pool.record_attempt(&lease).await;
                    }
                    Err(Error::Network { message, .. }) => {
                        error!(credential = lease.identifier(), error = %message, "NewsData request failed");
                        return Err(Error::Network {
                            attempts: failures + 1,
                            message,
                        });
                    }
                    Err(e) => {
                        error!(credential = lease.identifier(), error = %e, "NewsData request failed");
                        return Err(e);
                    }
                }
            }
        }
    }

    /// One HTTP attempt with the leased key.
    async fn send_once(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        lease: &Lease,
    ) -> Result<Outcome> {
        let response = self
            .http
            .get(url)
            .query(&[(API_KEY_PARAM, lease.expose_key())])
            .query(params)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(
                response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok()),
                self.pool.now(),
            );
            let body = response.text().await.unwrap_or_default();
            return Ok(Outcome::RateLimited {
                retry_after,
                body: classify_rate_limit_body(&body),
            });
        }

        let body = response.text().await.map_err(|e| self.network_error(e))?;
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: excerpt(&self.pool.redact(&body)),
            });
        }

        serde_json::from_str::<NewsResponse>(&body)
            .map(Outcome::Success)
            .map_err(|e| {
                Error::Parse(format!(
                    "{e}; body: {}",
                    excerpt(&self.pool.redact(&body))
                ))
            })
    }

    /// Transport failure without the request URL (it carries the key).
    fn network_error(&self, err: reqwest::Error) -> Error {
        Error::Network {
            attempts: 1,
            message: self.pool.redact(&err.without_url().to_string()),
        }
    }
}
