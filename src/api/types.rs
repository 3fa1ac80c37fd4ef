//! Request bodies for the account endpoints
//!
//! No `Debug` derives: these carry passwords.

use serde::Serialize;

/// Body of the login call
#[derive(Clone, Serialize)]
pub struct LoginRequest<'a> {
    /// Account email
    pub email: &'a str,
    /// Account password
    pub password: &'a str,
}

/// Body of the signup call
#[derive(Clone, Serialize)]
pub struct SignupRequest<'a> {
    /// Account email
    pub email: &'a str,
    /// Chosen password
    pub password: &'a str,
    /// Display name, omitted when not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

/// Body of the change-password call
#[derive(Clone, Serialize)]
pub struct ChangePasswordRequest<'a> {
    /// Password being replaced
    pub current_password: &'a str,
    /// Replacement password
    pub new_password: &'a str,
}
