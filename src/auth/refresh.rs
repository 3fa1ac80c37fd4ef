//! Refresh transport
//!
//! The single network call that trades a refresh token for a new pair.

use crate::error::{Error, Result};
use crate::types::{RefreshRequest, TokenPair};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Exchanges a refresh token for a new access/refresh pair
#[async_trait]
pub trait RefreshTransport: Send + Sync {
    /// Perform the exchange
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;
}

/// Refresh transport posting to the backend's refresh endpoint
///
/// Uses a bare `reqwest::Client` so the refresh call itself is never
/// intercepted or replayed.
#[derive(Debug, Clone)]
pub struct HttpRefreshTransport {
    http_client: Client,
    refresh_url: String,
}

impl HttpRefreshTransport {
    /// Create a transport for the given endpoint
    pub fn new(refresh_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), refresh_url)
    }

    /// Create a transport with a custom HTTP client
    pub fn with_client(http_client: Client, refresh_url: impl Into<String>) -> Self {
        Self {
            http_client,
            refresh_url: refresh_url.into(),
        }
    }

    /// Endpoint this transport posts to
    pub fn refresh_url(&self) -> &str {
        &self.refresh_url
    }
}

#[async_trait]
impl RefreshTransport for HttpRefreshTransport {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        debug!("Requesting token refresh from {}", self.refresh_url);

        let response = self
            .http_client
            .post(&self.refresh_url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::token_refresh("Refresh request timed out")
                } else {
                    Error::Http(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::token_refresh(format!(
                "Refresh token request failed with status {status}: {body}"
            )));
        }

        let tokens: TokenPair = response.json().await.map_err(|e| {
            Error::token_refresh(format!("Malformed refresh response: {e}"))
        })?;
        Ok(tokens)
    }
}
