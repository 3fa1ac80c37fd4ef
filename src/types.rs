//! Common types shared across modules
//!
//! Wire shapes exchanged with the admin backend's auth endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// Token Types
// ============================================================================

/// Access/refresh token pair issued by the login and refresh endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived bearer token
    pub access_token: String,
    /// Long-lived token exchanged for a new pair
    pub refresh_token: String,
    /// Token type reported by the server (normally "bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenPair {
    /// Create a bearer token pair
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: default_token_type(),
        }
    }
}

/// Body sent to the refresh endpoint
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    /// Refresh token being exchanged
    pub refresh_token: &'a str,
}

// ============================================================================
// User Types
// ============================================================================

/// Signed-in administrator as returned by the current-user endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// Server-side identifier
    #[serde(default)]
    pub id: Option<Value>,

    /// Login email
    #[serde(default)]
    pub email: String,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Role (e.g. "admin", "staff")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Any other fields the backend sends
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl UserProfile {
    /// Create a profile with just an email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    /// Name to show for this user, falling back to the email
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}
