//! Single-flight refresh coordination
//!
//! State machine with two states, `IDLE` and `REFRESHING`. The first request
//! to see a 401 while idle starts the refresh: it flips the flag and spawns
//! a task that calls the refresh transport, updates the store and settles
//! every queued request, its starter included. Requests that fail while a
//! refresh is in flight only enqueue a continuation.
//!
//! The flag is checked and set under a synchronous mutex that is never held
//! across an `.await`, so two near-simultaneous 401s cannot both start a
//! refresh. The refresh task is owned by the coordinator, so a caller that
//! stops waiting never cuts a refresh short for everyone else.

use super::refresh::RefreshTransport;
use super::types::{SessionEvent, SessionHook};
use crate::error::{Error, Result};
use crate::session::CredentialStore;
use crate::types::TokenPair;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Outcome broadcast to queued requests: new access token or failure reason
type RefreshOutcome = std::result::Result<String, String>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    pending: Vec<oneshot::Sender<RefreshOutcome>>,
}

enum Role {
    Starter(oneshot::Receiver<RefreshOutcome>),
    Waiter(oneshot::Receiver<RefreshOutcome>),
    Ready(String),
    SignedOut,
}

/// Coordinates token refresh across concurrent requests
pub struct RefreshCoordinator {
    store: CredentialStore,
    transport: Arc<dyn RefreshTransport>,
    state: Arc<Mutex<RefreshState>>,
    timeout: Duration,
    hook: Option<SessionHook>,
}

impl RefreshCoordinator {
    /// Create a coordinator
    ///
    /// `timeout` bounds the refresh call the same way it bounds any other
    /// request; running out of time is a refresh failure.
    pub fn new(
        store: CredentialStore,
        transport: Arc<dyn RefreshTransport>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            transport,
            state: Arc::new(Mutex::new(RefreshState::default())),
            timeout,
            hook: None,
        }
    }

    /// Set the callback notified on refresh success and session expiry
    #[must_use]
    pub fn with_hook(mut self, hook: SessionHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Obtain a fresh access token after a request carrying `stale_token`
    /// was rejected
    ///
    /// Joins the refresh in flight if there is one, starts one otherwise.
    /// When a refresh already finished since `stale_token` was attached, the
    /// current token is returned without another transport call. With no
    /// session at all there is nothing to refresh and the call fails without
    /// touching the transport or the hook.
    ///
    /// Must be called within a tokio runtime. Dropping the returned future
    /// only stops this caller from waiting; the refresh itself runs to
    /// completion.
    ///
    /// On failure the store has been cleared and the error is
    /// [`Error::SessionExpired`].
    pub async fn refresh(&self, stale_token: Option<&str>) -> Result<String> {
        let role = {
            let mut state = lock_state(&self.state);
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.pending.push(tx);
                Role::Waiter(rx)
            } else {
                match self.store.access_token() {
                    None => Role::SignedOut,
                    Some(current) if Some(current.as_str()) != stale_token => Role::Ready(current),
                    Some(_) => {
                        let (tx, rx) = oneshot::channel();
                        state.refreshing = true;
                        state.pending.push(tx);
                        Role::Starter(rx)
                    }
                }
            }
        };

        match role {
            Role::Ready(token) => {
                debug!("Token already refreshed, replaying with current token");
                Ok(token)
            }
            Role::SignedOut => Err(Error::session_expired("No active session")),
            Role::Starter(rx) => {
                debug!("Starting token refresh");
                tokio::spawn(self.task().run());
                wait_for(rx).await
            }
            Role::Waiter(rx) => {
                debug!("Refresh in progress, queued request");
                wait_for(rx).await
            }
        }
    }

    /// Whether a refresh call is outstanding
    pub fn is_refreshing(&self) -> bool {
        lock_state(&self.state).refreshing
    }

    /// Number of requests waiting on the refresh in flight, including the
    /// one that started it
    pub fn pending_count(&self) -> usize {
        lock_state(&self.state).pending.len()
    }

    /// The store this coordinator maintains
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    fn task(&self) -> RefreshTask {
        RefreshTask {
            store: self.store.clone(),
            transport: Arc::clone(&self.transport),
            state: Arc::clone(&self.state),
            timeout: self.timeout,
            hook: self.hook.clone(),
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("timeout", &self.timeout)
            .field("is_refreshing", &self.is_refreshing())
            .field("pending", &self.pending_count())
            .field("has_hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}

async fn wait_for(rx: oneshot::Receiver<RefreshOutcome>) -> Result<String> {
    match rx.await {
        Ok(Ok(token)) => Ok(token),
        Ok(Err(reason)) => Err(Error::session_expired(reason)),
        Err(_) => Err(Error::session_expired(
            "Refresh was abandoned before completing",
        )),
    }
}

fn lock_state(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Leave `REFRESHING` and hand the outcome to every queued request
fn finish(state: &Mutex<RefreshState>, outcome: &RefreshOutcome) {
    let pending = {
        let mut state = lock_state(state);
        state.refreshing = false;
        std::mem::take(&mut state.pending)
    };

    debug!("Settling {} queued request(s)", pending.len());
    for tx in pending {
        // Receiver gone means the caller stopped waiting
        let _ = tx.send(outcome.clone());
    }
}

/// One refresh cycle, detached from the request that started it
struct RefreshTask {
    store: CredentialStore,
    transport: Arc<dyn RefreshTransport>,
    state: Arc<Mutex<RefreshState>>,
    timeout: Duration,
    hook: Option<SessionHook>,
}

impl RefreshTask {
    async fn run(self) {
        let mut guard = RefreshGuard {
            state: &self.state,
            settled: false,
        };

        match self.exchange().await {
            Ok(tokens) => {
                let access_token = tokens.access_token.clone();
                self.store.set(tokens.access_token, tokens.refresh_token).await;
                guard.settle(Ok(access_token));

                info!("Access token refreshed");
                self.notify(SessionEvent::Refreshed);
            }
            Err(e) => {
                let reason = e.to_string();
                self.store.clear().await;
                guard.settle(Err(reason.clone()));

                warn!("Token refresh failed, session cleared: {reason}");
                self.notify(SessionEvent::Expired { reason });
            }
        }
    }

    async fn exchange(&self) -> Result<TokenPair> {
        let refresh_token = self
            .store
            .refresh_token()
            .ok_or_else(|| Error::token_refresh("No refresh token available"))?;

        match tokio::time::timeout(self.timeout, self.transport.refresh(&refresh_token)).await {
            Ok(result) => result,
            #[allow(clippy::cast_possible_truncation)]
            Err(_) => Err(Error::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    fn notify(&self, event: SessionEvent) {
        if let Some(hook) = &self.hook {
            hook(event);
        }
    }
}

/// Returns the coordinator to `IDLE` if the refresh task is torn down before
/// settling (runtime shutdown, panicking transport); waiters are rejected.
struct RefreshGuard<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl RefreshGuard<'_> {
    fn settle(&mut self, outcome: RefreshOutcome) {
        self.settled = true;
        finish(self.state, &outcome);
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Token refresh abandoned before completing");
            finish(
                self.state,
                &Err("Refresh was abandoned before completing".to_string()),
            );
        }
    }
}
