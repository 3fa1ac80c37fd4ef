//! Account endpoints: login, signup, current user, change password

use super::types::{ChangePasswordRequest, LoginRequest, SignupRequest};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::types::{TokenPair, UserProfile};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Paths of the account endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthEndpoints {
    /// Exchanges email and password for a token pair
    pub login: String,
    /// Registers a new account
    pub signup: String,
    /// Returns the signed-in user
    pub me: String,
    /// Changes the signed-in user's password
    pub change_password: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            signup: "/auth/signup".to_string(),
            me: "/auth/me".to_string(),
            change_password: "/auth/change-password".to_string(),
        }
    }
}

/// Account API over the authenticated client
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: Arc<HttpClient>,
    endpoints: AuthEndpoints,
}

impl AuthApi {
    /// Create with the default endpoint paths
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self::with_endpoints(client, AuthEndpoints::default())
    }

    /// Create with custom endpoint paths
    pub fn with_endpoints(client: Arc<HttpClient>, endpoints: AuthEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// The underlying client
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Sign in and start a session
    ///
    /// Stores the issued token pair, then loads the profile. A profile that
    /// fails to load does not undo the login.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<UserProfile>> {
        let body = serde_json::to_value(LoginRequest { email, password })?;
        let tokens: TokenPair = self
            .client
            .request_json(
                Method::POST,
                &self.endpoints.login,
                RequestConfig::new().json(body).skip_refresh(),
            )
            .await
            .map_err(reject_credentials)?;

        self.client.store().set_session(tokens, None).await;
        info!("Signed in as {email}");

        match self.current_user().await {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!("Signed in but failed to load profile: {e}");
                Ok(None)
            }
        }
    }

    /// Register a new administrator account
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<UserProfile> {
        let body = serde_json::to_value(SignupRequest {
            email,
            password,
            name,
        })?;
        self.client
            .request_json(
                Method::POST,
                &self.endpoints.signup,
                RequestConfig::new().json(body).skip_refresh(),
            )
            .await
    }

    /// Fetch the signed-in user and remember it in the session
    pub async fn current_user(&self) -> Result<UserProfile> {
        let user: UserProfile = self.client.get_json(&self.endpoints.me).await?;
        self.client.store().set_user(user.clone()).await;
        Ok(user)
    }

    /// Change the signed-in user's password
    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<()> {
        let body = serde_json::to_value(ChangePasswordRequest {
            current_password,
            new_password,
        })?;
        self.client
            .request(
                Method::POST,
                &self.endpoints.change_password,
                RequestConfig::new().json(body),
            )
            .await?;
        info!("Password changed");
        Ok(())
    }

    /// End the session locally
    pub async fn logout(&self) {
        self.client.store().clear().await;
        info!("Signed out");
    }
}

fn reject_credentials(err: Error) -> Error {
    match err {
        Error::Unauthorized { .. } => Error::auth("Invalid email or password"),
        other => other,
    }
}
