//! Authentication module
//!
//! Bearer-token request decoration and single-flight token refresh.
//!
//! The `Authenticator` attaches the current access token to outgoing
//! requests. When the server answers 401, the `RefreshCoordinator` makes
//! sure only one refresh call runs no matter how many requests failed, and
//! settles every waiting request with its outcome.

mod authenticator;
mod coordinator;
mod refresh;
mod types;

pub use authenticator::Authenticator;
pub use coordinator::RefreshCoordinator;
pub use refresh::{HttpRefreshTransport, RefreshTransport};
pub use types::{SessionEvent, SessionHook};
