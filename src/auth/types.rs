//! Session lifecycle notifications

use std::sync::Arc;

/// Change in session status reported to the host application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The access token was renewed
    Refreshed,
    /// The session could not be renewed and the user must sign in again
    Expired {
        /// Why the refresh failed
        reason: String,
    },
}

/// Callback the host binds to react to session events (e.g. show login)
pub type SessionHook = Arc<dyn Fn(SessionEvent) + Send + Sync>;
