//! Admin backend REST wrappers
//!
//! Thin request/response shapes for the account endpoints. These are the
//! calls that produce the credentials the HTTP client manages.

mod auth;
mod types;

pub use auth::{AuthApi, AuthEndpoints};
pub use types::{ChangePasswordRequest, LoginRequest, SignupRequest};
