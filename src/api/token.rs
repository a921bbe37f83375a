//! Token lifecycle management
//!
//! Obtains and refreshes the access credential for the Personio API. The
//! cached credential is the only shared mutable state across concurrent
//! download workers, so refresh is serialized behind a single mutex: callers
//! that detect expiry (or a 401) at the same time still trigger at most one
//! credential exchange.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{ApiError, ApiResult};

/// Personio tokens last an hour; treat them as expired slightly early so an
/// in-flight request never carries a token that lapses mid-call.
const TOKEN_LIFETIME: Duration = Duration::from_secs(3600);
const TOKEN_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Access credential for the remote API.
///
/// Owned exclusively by [`TokenProvider`], mutated only by refresh, and never
/// persisted to disk.
#[derive(Debug, Clone)]
struct Credential {
    access_token: String,
    expires_at: Instant,
}

impl Credential {
    fn new(access_token: String) -> Self {
        Self {
            access_token,
            expires_at: Instant::now() + TOKEN_LIFETIME,
        }
    }

    fn is_valid(&self) -> bool {
        match self.expires_at.checked_sub(TOKEN_SAFETY_MARGIN) {
            Some(deadline) => Instant::now() < deadline,
            None => false,
        }
    }
}

/// Obtains and caches the API access credential.
pub struct TokenProvider {
    client: Arc<Client>,
    auth_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<Credential>>,
}

impl TokenProvider {
    /// Create a provider for the configured client identity.
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `base_url` - API base URL (e.g., `https://api.personio.de`)
    /// * `client_id` / `client_secret` - configured client identity
    pub fn new(
        client: Arc<Client>,
        base_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth_url: format!("{}/v1/auth", base_url.trim_end_matches('/')),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cached: Mutex::new(None),
        }
    }

    /// Return a valid access token, performing a credential exchange if the
    /// cached one is missing or about to expire.
    ///
    /// # Errors
    /// Returns [`ApiError::Authentication`] when the exchange fails; this is
    /// fatal for the run and is never retried.
    pub async fn get_valid_token(&self) -> ApiResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref() {
            if credential.is_valid() {
                return Ok(credential.access_token.clone());
            }
            debug!("cached token is within the expiry safety margin, refreshing");
        }

        let credential = self.exchange().await?;
        let token = credential.access_token.clone();
        *cached = Some(credential);
        Ok(token)
    }

    /// Force a refresh after the API rejected `stale_token` with a 401.
    ///
    /// If another worker already replaced the cached credential, the fresh
    /// token is returned without a second exchange, so concurrent 401s from
    /// parallel document downloads collapse into a single refresh.
    pub async fn refresh_stale(&self, stale_token: &str) -> ApiResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref() {
            if credential.access_token != stale_token {
                debug!("token already refreshed by a concurrent caller");
                return Ok(credential.access_token.clone());
            }
        }

        let credential = self.exchange().await?;
        let token = credential.access_token.clone();
        *cached = Some(credential);
        Ok(token)
    }

    /// Perform the credential exchange against the auth endpoint.
    async fn exchange(&self) -> ApiResult<Credential> {
        info!("authenticating with Personio API");

        let payload = json!({
            "client_id": self.client_id,
            "client_secret": self.client_secret,
        });

        let response = self
            .client
            .post(&self.auth_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ApiError::Authentication(format!("credential exchange failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Authentication(format!(
                "credential exchange returned status {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Authentication(format!("malformed auth response: {e}")))?;

        match body.pointer("/data/token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => {
                info!("successfully authenticated");
                Ok(Credential::new(token.to_string()))
            }
            _ => Err(ApiError::Authentication(
                "unexpected token response structure".to_string(),
            )),
        }
    }
}
