//! Session types
//!
//! `SessionState` is what gets persisted between runs; `Credential` is the
//! view of it the HTTP layer works with.

use super::claims::TokenClaims;
use crate::error::Result;
use crate::types::UserProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair of an authenticated session
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Bearer token attached to requests
    pub access_token: String,
    /// Token exchanged for a new pair when the access token is rejected
    pub refresh_token: String,
    /// Always true for a credential handed out by the store
    pub is_authenticated: bool,
}

impl Credential {
    /// Expiry encoded in the access token, when it is a JWT carrying `exp`
    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        TokenClaims::decode_unverified(&self.access_token)?.expires_at()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("is_authenticated", &self.is_authenticated)
            .finish()
    }
}

/// Persisted session fields
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Signed-in user, if known
    #[serde(default)]
    pub user: Option<UserProfile>,

    /// Access token
    #[serde(default)]
    pub token: Option<String>,

    /// Refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Whether the session is signed in
    #[serde(default)]
    pub is_authenticated: bool,
}

impl SessionState {
    /// Create an empty (signed-out) state
    pub fn new() -> Self {
        Self::default()
    }

    /// Credential view of this state, `None` when signed out
    pub fn credential(&self) -> Option<Credential> {
        if !self.is_authenticated {
            return None;
        }
        let access_token = self.token.clone().filter(|t| !t.is_empty())?;
        Some(Credential {
            access_token,
            refresh_token: self.refresh_token.clone().unwrap_or_default(),
            is_authenticated: true,
        })
    }

    /// A state claiming to be signed in must carry an access token
    pub fn is_consistent(&self) -> bool {
        !self.is_authenticated || self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("user", &self.user)
            .field("has_token", &self.token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("is_authenticated", &self.is_authenticated)
            .finish()
    }
}

/// The single storage entry: `{ "state": { ... }, "version": 0 }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Session fields
    pub state: SessionState,

    /// Format version
    #[serde(default)]
    pub version: u32,
}

impl PersistedSession {
    /// Wrap a state for persistence
    pub fn new(state: SessionState) -> Self {
        Self { state, version: 0 }
    }

    /// Decode a stored entry, failing closed
    ///
    /// Anything that does not parse, or that claims to be signed in without
    /// a token, yields `None` and must be treated as "no credential".
    pub fn decode(raw: &str) -> Option<SessionState> {
        let persisted: PersistedSession = serde_json::from_str(raw).ok()?;
        persisted
            .state
            .is_consistent()
            .then_some(persisted.state)
    }

    /// Encode a state as a storage entry
    pub fn encode(state: &SessionState) -> Result<String> {
        Ok(serde_json::to_string(&PersistedSession::new(state.clone()))?)
    }
}
