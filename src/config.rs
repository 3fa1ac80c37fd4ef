//! Client configuration
//!
//! Loaded from YAML, with environment overrides for the values that differ
//! between machines.

use crate::api::AuthEndpoints;
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpClientConfig;
use crate::session::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `base_url`
pub const ENV_BASE_URL: &str = "AGENCY_ADMIN_BASE_URL";

/// Environment variable overriding `session.file`
pub const ENV_SESSION_FILE: &str = "AGENCY_ADMIN_SESSION_FILE";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the admin backend API
    pub base_url: String,

    /// Per-request timeout in seconds (also bounds token refresh)
    pub timeout_secs: u64,

    /// User agent override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Where the session is persisted
    pub session: SessionConfig,

    /// Endpoint paths
    pub endpoints: EndpointsConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
            user_agent: None,
            session: SessionConfig::default(),
            endpoints: EndpointsConfig::default(),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Session persistence settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// File holding the persisted session
    pub file: PathBuf,

    /// Storage entry name
    pub key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(".agency-admin/session.json"),
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// Endpoint paths, relative to `base_url`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Login endpoint
    pub login: String,
    /// Signup endpoint
    pub signup: String,
    /// Token refresh endpoint
    pub refresh: String,
    /// Current-user endpoint
    pub me: String,
    /// Change-password endpoint
    pub change_password: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        let auth = AuthEndpoints::default();
        Self {
            login: auth.login,
            signup: auth.signup,
            refresh: "/auth/refresh".to_string(),
            me: auth.me,
            change_password: auth.change_password,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl ClientConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ClientConfig = if yaml.trim().is_empty() {
            ClientConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(ENV_BASE_URL).ok(),
            std::env::var(ENV_SESSION_FILE).ok().map(PathBuf::from),
        )
    }

    /// Apply explicit overrides (command-line flags, environment)
    #[must_use]
    pub fn with_overrides(mut self, base_url: Option<String>, session_file: Option<PathBuf>) -> Self {
        if let Some(base_url) = base_url.filter(|u| !u.is_empty()) {
            self.base_url = base_url;
        }
        if let Some(file) = session_file {
            self.session.file = file;
        }
        self
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::missing_field("base_url"));
        }
        let url = url::Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidConfigValue {
                field: "base_url".to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfigValue {
                field: "timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.session.key.is_empty() {
            return Err(Error::missing_field("session.key"));
        }
        Ok(())
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// HTTP client settings derived from this config
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(self.base_url.clone())
            .timeout(self.timeout())
            .refresh_path(self.endpoints.refresh.clone());
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder.build()
    }

    /// Account endpoint paths derived from this config
    pub fn auth_endpoints(&self) -> AuthEndpoints {
        AuthEndpoints {
            login: self.endpoints.login.clone(),
            signup: self.endpoints.signup.clone(),
            me: self.endpoints.me.clone(),
            change_password: self.endpoints.change_password.clone(),
        }
    }
}
