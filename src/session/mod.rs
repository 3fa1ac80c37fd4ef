//! Session module
//!
//! Holds the signed-in administrator's credentials and keeps a durable copy
//! of them so a restarted process picks the session back up.
//!
//! # Overview
//!
//! The session module provides:
//! - `CredentialStore` - Single source of truth for the current tokens
//! - `SessionStorage` - Durable key-value backends (file, memory)
//! - `PersistedSession` - The serialized `{ state: { ... } }` entry
//! - `TokenClaims` - Unverified view of an access token's payload

mod claims;
mod storage;
mod store;
mod types;

pub use claims::TokenClaims;
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::{CredentialStore, DEFAULT_STORAGE_KEY};
pub use types::{Credential, PersistedSession, SessionState};
