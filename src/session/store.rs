//! Credential store implementation
//!
//! In-memory session state with write-through persistence. Reads are
//! synchronous snapshots so the refresh coordinator can consult the store
//! without suspending; writes are serialized so the durable copy never lags
//! behind a newer in-memory state.

use super::storage::SessionStorage;
use super::types::{Credential, PersistedSession, SessionState};
use crate::types::{TokenPair, UserProfile};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Default name of the persisted session entry
pub const DEFAULT_STORAGE_KEY: &str = "auth-storage";

/// Single source of truth for the current session's tokens
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: RwLock<SessionState>,
    storage: Option<Arc<dyn SessionStorage>>,
    key: String,
    persist_lock: tokio::sync::Mutex<()>,
}

impl CredentialStore {
    /// Create an empty store persisting into `storage` under `key`
    ///
    /// Does not read existing state; use [`CredentialStore::load`] for that.
    pub fn new(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        Self::from_parts(SessionState::new(), Some(storage), key.into())
    }

    /// Create a store with no persistence
    pub fn in_memory() -> Self {
        Self::from_parts(SessionState::new(), None, DEFAULT_STORAGE_KEY.to_string())
    }

    /// Create a store from persisted state
    ///
    /// A missing entry gives an empty store. Unreadable storage or a
    /// malformed entry also give an empty store: the session fails closed.
    pub async fn load(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let state = match storage.read(&key).await {
            Ok(Some(raw)) => PersistedSession::decode(&raw).unwrap_or_else(|| {
                warn!("Ignoring malformed persisted session '{key}'");
                SessionState::new()
            }),
            Ok(None) => SessionState::new(),
            Err(e) => {
                warn!("Failed to read persisted session '{key}': {e}");
                SessionState::new()
            }
        };

        debug!(
            "Loaded session '{}' (authenticated: {})",
            key, state.is_authenticated
        );
        Self::from_parts(state, Some(storage), key)
    }

    fn from_parts(state: SessionState, storage: Option<Arc<dyn SessionStorage>>, key: String) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                storage,
                key,
                persist_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Current credential, `None` when signed out
    pub fn get(&self) -> Option<Credential> {
        self.read_state().credential()
    }

    /// Current access token
    pub fn access_token(&self) -> Option<String> {
        self.get().map(|c| c.access_token)
    }

    /// Current refresh token (empty tokens count as absent)
    pub fn refresh_token(&self) -> Option<String> {
        self.get()
            .map(|c| c.refresh_token)
            .filter(|t| !t.is_empty())
    }

    /// Signed-in user, if known
    pub fn user(&self) -> Option<UserProfile> {
        self.read_state().user.clone()
    }

    /// Whether a session is active
    pub fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }

    /// Full copy of the session state
    pub fn snapshot(&self) -> SessionState {
        self.read_state().clone()
    }

    /// Name of the persisted entry
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Check if the store has no durable backend
    pub fn is_in_memory(&self) -> bool {
        self.inner.storage.is_none()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Replace both tokens and mark the session authenticated
    pub async fn set(&self, access_token: impl Into<String>, refresh_token: impl Into<String>) {
        let access_token = access_token.into();
        let refresh_token = refresh_token.into();
        self.update(move |state| {
            state.token = Some(access_token);
            state.refresh_token = Some(refresh_token);
            state.is_authenticated = true;
        })
        .await;
    }

    /// Start a session from a login response
    pub async fn set_session(&self, tokens: TokenPair, user: Option<UserProfile>) {
        self.update(move |state| {
            state.token = Some(tokens.access_token);
            state.refresh_token = Some(tokens.refresh_token);
            state.is_authenticated = true;
            state.user = user;
        })
        .await;
    }

    /// Record the signed-in user
    pub async fn set_user(&self, user: UserProfile) {
        self.update(move |state| state.user = Some(user)).await;
    }

    /// Wipe the session
    pub async fn clear(&self) {
        self.update(|state| *state = SessionState::new()).await;
    }

    async fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut SessionState),
    {
        let _persist = self.inner.persist_lock.lock().await;

        let snapshot = {
            let mut state = self.write_state();
            mutate(&mut state);
            state.clone()
        };

        self.persist(&snapshot).await;
    }

    async fn persist(&self, state: &SessionState) {
        let Some(storage) = &self.inner.storage else {
            return;
        };

        let result = match PersistedSession::encode(state) {
            Ok(raw) => storage.write(&self.inner.key, &raw).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!("Failed to persist session '{}': {e}", self.inner.key);
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key", &self.inner.key)
            .field("is_authenticated", &self.is_authenticated())
            .field("is_in_memory", &self.is_in_memory())
            .finish_non_exhaustive()
    }
}
