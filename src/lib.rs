//! # Agency Admin Client
//!
//! Authenticated HTTP client for the talent agency's admin dashboard
//! backend.
//!
//! ## Features
//!
//! - **Bearer Auth**: Every request carries the current access token
//! - **Single-Flight Refresh**: Any number of concurrent 401s trigger one
//!   refresh call; every affected request is replayed once
//! - **Durable Sessions**: Credentials persist across restarts and fail
//!   closed when the stored entry is malformed
//! - **Account API**: Login, signup, current user, change password
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agency_admin_client::{
//!     api::AuthApi,
//!     http::{HttpClient, HttpClientConfig},
//!     session::{CredentialStore, FileStorage},
//!     Result,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let storage = Arc::new(FileStorage::new(".agency-admin/session.json"));
//!     let store = CredentialStore::load(storage, "auth-storage").await;
//!
//!     let config = HttpClientConfig::builder()
//!         .base_url("https://admin.example.com/api")
//!         .build();
//!     let client = Arc::new(HttpClient::new(config, store)?);
//!
//!     let api = AuthApi::new(client.clone());
//!     api.login("admin@example.com", "secret").await?;
//!
//!     let models: serde_json::Value = client.get_json("/models/domestic").await?;
//!     println!("{models}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         HttpClient                           │
//! │  request() → Authenticator → send → 401? → RefreshCoordinator│
//! └──────────────────────────────────────────────────────────────┘
//!          │                     │                    │
//! ┌────────┴────────┐ ┌──────────┴─────────┐ ┌────────┴─────────┐
//! │ CredentialStore │ │  RefreshTransport  │ │   SessionHook    │
//! │ FileStorage     │ │  POST /auth/refresh│ │   Expired → login│
//! └─────────────────┘ └────────────────────┘ └──────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the client
pub mod error;

/// Common types and type aliases
pub mod types;

/// Credential store and session persistence
pub mod session;

/// Bearer auth and token refresh coordination
pub mod auth;

/// Authenticated HTTP client
pub mod http;

/// Account endpoints
pub mod api;

/// Client configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use auth::{SessionEvent, SessionHook};
pub use http::{HttpClient, HttpClientConfig, RequestConfig};
pub use session::{Credential, CredentialStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
