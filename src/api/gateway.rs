//! Authenticated HTTP gateway
//!
//! Provides the unified client for all Personio API interactions with:
//! - Bearer-token injection on every call
//! - Retry logic with exponential backoff and jitter
//! - `Retry-After` compliance on 429 responses
//! - A single forced token refresh on 401
//!
//! The timeout configured on the underlying client applies per HTTP attempt,
//! not per logical operation; a paginated fetch may run for many attempts
//! across many pages.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use super::pagination::{self, PageStream};
use super::token::TokenProvider;
use super::{ApiError, ApiResult};

/// Initial backoff delay in milliseconds.
/// 1 second is long enough for rate limit windows to reset but short enough
/// to not overly delay recovery from transient errors.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay in milliseconds.
/// 30 seconds caps exponential backoff to prevent excessive wait times.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Upper bound of the uniform jitter added to each backoff delay so that
/// concurrent workers do not retry in lockstep.
const BACKOFF_JITTER_MS: u64 = 250;

/// Calculate the exponential backoff delay for a retry.
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let delay_ms = INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(retry_count));
    Duration::from_millis(delay_ms.min(MAX_BACKOFF_MS))
}

fn backoff_with_jitter(retry_count: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..=BACKOFF_JITTER_MS);
    calculate_backoff(retry_count) + Duration::from_millis(jitter)
}

/// Parse an integer `Retry-After` hint (seconds) from a 429 response.
fn retry_after_hint(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// The single choke point for outbound Personio API calls.
///
/// Cheap to clone; clones share the HTTP client and token provider so that
/// parallel document-download workers reuse one connection pool and one
/// cached credential.
#[derive(Clone)]
pub struct HttpGateway {
    client: Arc<Client>,
    base_url: String,
    tokens: Arc<TokenProvider>,
    max_attempts: u32,
}

impl HttpGateway {
    /// Create a new gateway.
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client (carries the per-attempt timeout)
    /// * `base_url` - API base URL (e.g., `https://api.personio.de`)
    /// * `tokens` - Shared token provider
    /// * `max_attempts` - Bound on physical attempts per call (minimum 1)
    pub fn new(
        client: Arc<Client>,
        base_url: impl Into<String>,
        tokens: Arc<TokenProvider>,
        max_attempts: u32,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            tokens,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Build the full URL for an endpoint, defaulting to the v1 API prefix
    /// unless the endpoint names a version explicitly.
    fn endpoint_url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.trim_start_matches('/');
        if endpoint.starts_with("v1/") || endpoint.starts_with("v2/") {
            format!("{}/{}", self.base_url, endpoint)
        } else {
            format!("{}/v1/{}", self.base_url, endpoint)
        }
    }

    /// Execute a request and parse the JSON response body.
    ///
    /// # Errors
    /// Returns [`ApiError`] after the retry policy is exhausted, immediately
    /// for non-retryable client errors, or [`ApiError::Authentication`] if a
    /// forced token refresh fails.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(String, String)],
    ) -> ApiResult<Value> {
        let response = self
            .execute_with_retry(method, endpoint, params, "application/json")
            .await?;

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("failed to deserialize response: {e}")))
    }

    /// Download a binary payload (employee documents).
    pub async fn download(&self, endpoint: &str) -> ApiResult<Bytes> {
        let response = self
            .execute_with_retry(Method::GET, endpoint, &[], "*/*")
            .await?;

        response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read response body: {e}")))
    }

    /// Traverse a paginated endpoint as a lazy sequence of pages.
    ///
    /// Pages arrive in the order the server returns them; the stream is
    /// finite and restartable only by calling `paginate` again with the same
    /// initial params. Cursor mechanics never surface to the caller.
    pub fn paginate(&self, endpoint: &str, params: &[(String, String)]) -> PageStream {
        pagination::page_stream(self.clone(), endpoint.to_string(), params.to_vec())
    }

    /// Retry loop shared by JSON requests and binary downloads.
    ///
    /// Retries on network errors, 5xx, and 429 (honoring `Retry-After`).
    /// A 401 forces exactly one token refresh and one extra attempt that does
    /// not count against the transient-retry budget. Other 4xx statuses fail
    /// immediately.
    async fn execute_with_retry(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(String, String)],
        accept: &str,
    ) -> ApiResult<Response> {
        let url = self.endpoint_url(endpoint);
        let mut attempt: u32 = 0;
        let mut refreshed = false;

        loop {
            let token = self.tokens.get_valid_token().await?;

            let result = self
                .client
                .request(method.clone(), &url)
                .query(params)
                .bearer_auth(&token)
                .header(ACCEPT, accept)
                .send()
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(ApiError::Network(format!(
                            "network error after {attempt} attempts: {e}"
                        )));
                    }
                    let delay = backoff_with_jitter(attempt - 1);
                    warn!(
                        endpoint,
                        attempt,
                        max_attempts = self.max_attempts,
                        "network error: {e}, retrying after {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                if refreshed {
                    return Err(ApiError::Status {
                        status: status.as_u16(),
                        endpoint: endpoint.to_string(),
                    });
                }
                refreshed = true;
                warn!(endpoint, "received 401, forcing a token refresh");
                self.tokens.refresh_stale(&token).await?;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                attempt += 1;
                if attempt >= self.max_attempts {
                    return Err(ApiError::Status {
                        status: status.as_u16(),
                        endpoint: endpoint.to_string(),
                    });
                }
                let delay = retry_after_hint(&response)
                    .unwrap_or_else(|| backoff_with_jitter(attempt - 1));
                warn!(
                    endpoint,
                    attempt,
                    max_attempts = self.max_attempts,
                    "rate limited (429), retrying after {delay:?}"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if status.is_server_error() {
                attempt += 1;
                if attempt >= self.max_attempts {
                    return Err(ApiError::Status {
                        status: status.as_u16(),
                        endpoint: endpoint.to_string(),
                    });
                }
                let delay = backoff_with_jitter(attempt - 1);
                warn!(
                    endpoint,
                    attempt,
                    max_attempts = self.max_attempts,
                    "server error {status}, retrying after {delay:?}"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if status.is_client_error() {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    endpoint: endpoint.to_string(),
                });
            }

            debug!(endpoint, attempts = attempt + 1, "request succeeded");
            return Ok(response);
        }
    }
}
