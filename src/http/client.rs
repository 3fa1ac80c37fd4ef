//! HTTP client with bearer auth and refresh-on-401
//!
//! Provides the authenticated client every dashboard call goes through:
//! - Bearer token attached from the credential store
//! - 401 responses absorbed by a single-flight refresh and one replay
//! - Non-2xx responses mapped to typed errors
//!
//! Transport errors are returned as they are. Retrying them is the caller's
//! call, not this client's.

use crate::auth::{
    Authenticator, HttpRefreshTransport, RefreshCoordinator, RefreshTransport, SessionHook,
};
use crate::error::{Error, Result};
use crate::session::CredentialStore;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for all requests
    pub base_url: Option<String>,
    /// Request timeout (also bounds the refresh call)
    pub timeout: Duration,
    /// Path or URL of the token refresh endpoint
    pub refresh_path: String,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            refresh_path: "/auth/refresh".to_string(),
            default_headers: HashMap::new(),
            user_agent: format!("agency-admin/{}", crate::VERSION),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the refresh endpoint
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.config.refresh_path = path.into();
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters
    pub query: HashMap<String, String>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<Value>,
    /// Override timeout for this request
    pub timeout: Option<Duration>,
    /// Surface a 401 directly instead of refreshing
    pub skip_refresh: bool,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Don't refresh on 401 (for calls that issue credentials)
    #[must_use]
    pub fn skip_refresh(mut self) -> Self {
        self.skip_refresh = true;
        self
    }
}

/// A request on its way out, with its replay marker
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    /// HTTP method
    pub method: Method,
    /// Path (joined to the base URL) or absolute URL
    pub url: String,
    /// Per-request options
    pub config: RequestConfig,
    retried: bool,
}

impl OutgoingRequest {
    /// Create a request
    pub fn new(method: Method, url: impl Into<String>, config: RequestConfig) -> Self {
        Self {
            method,
            url: url.into(),
            config,
            retried: false,
        }
    }

    /// Whether this request already went through a refresh cycle
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Mark the request as replayed; a further 401 is terminal
    pub fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Builder-style [`OutgoingRequest::mark_retried`]
    #[must_use]
    pub fn retried(mut self) -> Self {
        self.retried = true;
        self
    }

    fn refreshes_on_unauthorized(&self) -> bool {
        !self.retried && !self.config.skip_refresh
    }
}

/// Builder for [`HttpClient`]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    store: Option<CredentialStore>,
    transport: Option<Arc<dyn RefreshTransport>>,
    hook: Option<SessionHook>,
}

impl HttpClientBuilder {
    /// Use this credential store (default: a fresh in-memory store)
    #[must_use]
    pub fn store(mut self, store: CredentialStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Use this refresh transport (default: POST to the refresh endpoint)
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn RefreshTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Notify this callback of refreshes and session expiry
    #[must_use]
    pub fn session_hook(mut self, hook: SessionHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<HttpClient> {
        let client = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        let store = self.store.unwrap_or_else(CredentialStore::in_memory);
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpRefreshTransport::with_client(
                client.clone(),
                build_url(self.config.base_url.as_deref(), &self.config.refresh_path),
            )),
        };

        let mut coordinator =
            RefreshCoordinator::new(store.clone(), transport, self.config.timeout);
        if let Some(hook) = self.hook {
            coordinator = coordinator.with_hook(hook);
        }

        Ok(HttpClient {
            client,
            config: self.config,
            authenticator: Authenticator::new(store),
            coordinator: Arc::new(coordinator),
        })
    }
}

/// HTTP client with bearer auth and single-flight refresh
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Authenticator,
    coordinator: Arc<RefreshCoordinator>,
}

impl HttpClient {
    /// Start building a client
    pub fn builder(config: HttpClientConfig) -> HttpClientBuilder {
        HttpClientBuilder {
            config,
            store: None,
            transport: None,
            hook: None,
        }
    }

    /// Create a client over the given store with the HTTP refresh transport
    pub fn new(config: HttpClientConfig, store: CredentialStore) -> Result<Self> {
        Self::builder(config).store(store).build()
    }

    /// The credential store requests are authorized from
    pub fn store(&self) -> &CredentialStore {
        self.authenticator.store()
    }

    /// The refresh coordinator
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.request(Method::GET, url, RequestConfig::default())
            .await
    }

    /// Make a POST request
    pub async fn post(&self, url: &str, body: Value) -> Result<Response> {
        self.request(Method::POST, url, RequestConfig::default().json(body))
            .await
    }

    /// Make a PUT request
    pub async fn put(&self, url: &str, body: Value) -> Result<Response> {
        self.request(Method::PUT, url, RequestConfig::default().json(body))
            .await
    }

    /// Make a PATCH request
    pub async fn patch(&self, url: &str, body: Value) -> Result<Response> {
        self.request(Method::PATCH, url, RequestConfig::default().json(body))
            .await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str) -> Result<Response> {
        self.request(Method::DELETE, url, RequestConfig::default())
            .await
    }

    /// Make a generic request
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<Response> {
        self.send(OutgoingRequest::new(method, url, config)).await
    }

    /// Send a request, absorbing one 401 through a token refresh
    ///
    /// A 401 on a request not yet retried waits for (or starts) the shared
    /// refresh and replays the request once with the new token. A 401 on a
    /// retried request is returned as [`Error::Unauthorized`]. A failed
    /// refresh is returned as [`Error::SessionExpired`].
    pub async fn send(&self, mut request: OutgoingRequest) -> Result<Response> {
        let (response, sent_with) = self.dispatch(&request).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        if !request.refreshes_on_unauthorized() {
            return Err(unauthorized(response).await);
        }

        debug!(
            "{} {} returned 401, refreshing token",
            request.method, request.url
        );
        request.mark_retried();
        self.coordinator.refresh(sent_with.as_deref()).await?;

        debug!("Replaying {} {}", request.method, request.url);
        let (response, _) = self.dispatch(&request).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(unauthorized(response).await);
        }
        check_status(response).await
    }

    /// Make a request and parse JSON response
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<T> {
        let response = self.request(method, url, config).await?;
        let json: T = response.json().await.map_err(Error::Http)?;
        Ok(json)
    }

    /// Make a GET request and parse JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.request_json(Method::GET, url, RequestConfig::default())
            .await
    }

    /// Make a POST request and parse JSON response
    pub async fn post_json<T: DeserializeOwned>(&self, url: &str, body: Value) -> Result<T> {
        self.request_json(Method::POST, url, RequestConfig::default().json(body))
            .await
    }

    /// Build full URL from path
    pub fn build_url(&self, path: &str) -> String {
        build_url(self.config.base_url.as_deref(), path)
    }

    /// Send once, returning the response and the token that was attached
    async fn dispatch(&self, request: &OutgoingRequest) -> Result<(Response, Option<String>)> {
        let full_url = self.build_url(&request.url);
        let timeout = request.config.timeout.unwrap_or(self.config.timeout);

        // Build request, bearer token first
        let (mut req, token) = self
            .authenticator
            .apply(self.client.request(request.method.clone(), &full_url));

        // Default headers, then request-specific ones; neither may add a
        // second Authorization next to the bearer token
        let headers = self
            .config
            .default_headers
            .iter()
            .chain(&request.config.headers)
            .filter(|(key, _)| token.is_none() || !key.eq_ignore_ascii_case("authorization"));
        for (key, value) in headers {
            req = req.header(key.as_str(), value.as_str());
        }

        // Add query parameters
        if !request.config.query.is_empty() {
            req = req.query(&request.config.query);
        }

        // Add body
        if let Some(ref body) = request.config.body {
            req = req.json(body);
        }

        req = req.timeout(timeout);

        match req.send().await {
            Ok(response) => {
                debug!(
                    "{} {} -> {}",
                    request.method,
                    full_url,
                    response.status().as_u16()
                );
                Ok((response, token))
            }
            #[allow(clippy::cast_possible_truncation)]
            Err(e) if e.is_timeout() => Err(Error::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            Err(e) => Err(Error::Http(e)),
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("store", self.authenticator.store())
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

/// Join a path onto the base URL; absolute URLs pass through
fn build_url(base_url: Option<&str>, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    match base_url {
        Some(base) => {
            let base = base.trim_end_matches('/');
            let path = path.trim_start_matches('/');
            format!("{base}/{path}")
        }
        None => path.to_string(),
    }
}

/// Map non-2xx responses to errors
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::HttpStatus {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

async fn unauthorized(response: Response) -> Error {
    let body = response.text().await.unwrap_or_default();
    Error::Unauthorized { body }
}
