//! Personio API access layer
//!
//! The single choke point for all outbound calls. Every request flows through
//! [`gateway::HttpGateway`], which injects the bearer token obtained from
//! [`token::TokenProvider`], applies the retry policy, and exposes pagination
//! as a lazy page stream.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

pub mod gateway;
pub mod pagination;
pub mod token;

pub use gateway::HttpGateway;
pub use pagination::{Page, PageStream};
pub use token::TokenProvider;

/// HTTP connect timeout (seconds) - time to establish the TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// API access errors.
///
/// `Authentication` is fatal for the run and never retried; the remaining
/// variants are surfaced after the retry policy in the gateway is exhausted
/// (or immediately for non-retryable statuses).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Credential exchange failed or the auth payload was malformed
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Non-success HTTP status that is not retryable (or retries exhausted)
    #[error("request to {endpoint} failed with status {status}")]
    Status {
        /// HTTP status code of the failing response
        status: u16,
        /// Logical endpoint the request was issued against
        endpoint: String,
    },

    /// Connection error or timeout
    #[error("network error: {0}")]
    Network(String),

    /// Response body did not match the expected structure
    #[error("parse error: {0}")]
    Parse(String),

    /// Pagination traversal exceeded the safety bound
    #[error("pagination error: {0}")]
    Pagination(String),
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Build the HTTP client shared by the token provider and the gateway.
///
/// The request timeout applies per HTTP attempt, not per logical operation;
/// a paginated fetch may run for many attempts across many pages.
pub fn build_http_client(request_timeout: Duration) -> ApiResult<Arc<Client>> {
    let client = Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(request_timeout)
        .build()
        .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
    Ok(Arc::new(client))
}
