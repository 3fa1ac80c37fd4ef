//! Authenticator implementation
//!
//! Applies the current bearer credential to requests.

use crate::session::CredentialStore;
use reqwest::RequestBuilder;

/// Authenticator handles applying authentication to HTTP requests
#[derive(Debug, Clone)]
pub struct Authenticator {
    store: CredentialStore,
}

impl Authenticator {
    /// Create an authenticator reading from the given store
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    /// Apply authentication to a request builder
    ///
    /// Sets `Authorization: Bearer <token>` when a token is present and
    /// returns the token that was attached. Without a token the request goes
    /// out unauthenticated.
    pub fn apply(&self, req: RequestBuilder) -> (RequestBuilder, Option<String>) {
        match self.store.access_token() {
            Some(token) => (req.bearer_auth(&token), Some(token)),
            None => (req, None),
        }
    }

    /// The store this authenticator reads from
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }
}
