//! CLI runner - executes commands

use crate::api::AuthApi;
use crate::auth::{SessionEvent, SessionHook};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::session::{CredentialStore, FileStorage};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        let api = Self::build_api(&config).await?;
        let mut stdin = BufReader::new(tokio::io::stdin());

        match &self.cli.command {
            Commands::Login { email, password } => {
                let password = secret(password.as_deref(), "Password", &mut stdin).await?;
                self.login(&api, email, &password).await
            }
            Commands::Signup {
                email,
                password,
                name,
            } => {
                let password = secret(password.as_deref(), "Password", &mut stdin).await?;
                self.signup(&api, email, &password, name.as_deref()).await
            }
            Commands::Logout => {
                api.logout().await;
                self.output_message(&json!({"type": "LOGOUT", "authenticated": false}));
                Ok(())
            }
            Commands::Whoami => self.whoami(&api).await,
            Commands::Status => {
                self.status(api.client().store());
                Ok(())
            }
            Commands::ChangePassword { current, new } => {
                let current = secret(current.as_deref(), "Current password", &mut stdin).await?;
                let new = secret(new.as_deref(), "New password", &mut stdin).await?;
                api.change_password(&current, &new).await?;
                self.output_message(&json!({"type": "PASSWORD_CHANGED"}));
                Ok(())
            }
            Commands::Request {
                method,
                path,
                body,
                query,
            } => {
                self.request(api.client(), method, path, body.as_deref(), query)
                    .await
            }
        }
    }

    /// Load configuration: file, then environment, then flags
    fn load_config(&self) -> Result<ClientConfig> {
        let config = match &self.cli.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };

        let config = config
            .with_env_overrides()
            .with_overrides(self.cli.base_url.clone(), self.cli.session_file.clone());
        config.validate()?;
        Ok(config)
    }

    /// Build the account API over a client restored from the session file
    async fn build_api(config: &ClientConfig) -> Result<AuthApi> {
        let storage = Arc::new(FileStorage::new(&config.session.file));
        let store = CredentialStore::load(storage, config.session.key.clone()).await;

        let hook: SessionHook = Arc::new(|event| {
            if let SessionEvent::Expired { reason } = event {
                eprintln!("Session expired ({reason}). Run `agency-admin login` to sign in again.");
            }
        });

        let client = HttpClient::builder(config.http_client_config())
            .store(store)
            .session_hook(hook)
            .build()?;

        Ok(AuthApi::with_endpoints(
            Arc::new(client),
            config.auth_endpoints(),
        ))
    }

    async fn login(&self, api: &AuthApi, email: &str, password: &str) -> Result<()> {
        let user = api.login(email, password).await?;
        self.output_message(&json!({
            "type": "LOGIN",
            "authenticated": true,
            "user": user,
        }));
        Ok(())
    }

    async fn signup(
        &self,
        api: &AuthApi,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<()> {
        let user = api.signup(email, password, name).await?;
        self.output_message(&json!({"type": "SIGNUP", "user": user}));
        Ok(())
    }

    async fn whoami(&self, api: &AuthApi) -> Result<()> {
        if !api.client().store().is_authenticated() {
            return Err(Error::auth("Not signed in"));
        }
        let user = api.current_user().await?;
        self.output_message(&json!({"type": "USER", "user": user}));
        Ok(())
    }

    /// Local session summary; tokens themselves are never printed
    fn status(&self, store: &CredentialStore) {
        let session = store.snapshot();
        let expires_at = store.get().and_then(|c| c.access_expires_at());

        self.output_message(&json!({
            "type": "STATUS",
            "authenticated": store.is_authenticated(),
            "user": session.user,
            "has_refresh_token": store.refresh_token().is_some(),
            "access_expires_at": expires_at.map(|t| t.to_rfc3339()),
            "access_expired": expires_at.map(|t| t <= Utc::now()),
        }));
    }

    async fn request(
        &self,
        client: &HttpClient,
        method: &str,
        path: &str,
        body: Option<&str>,
        query: &[String],
    ) -> Result<()> {
        let method = Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| Error::config(format!("Invalid HTTP method: {method}")))?;

        let mut config = RequestConfig::new();
        if let Some(body) = body {
            let body: Value = serde_json::from_str(body)
                .map_err(|e| Error::config(format!("Invalid body JSON: {e}")))?;
            config = config.json(body);
        }
        for pair in query {
            let (key, value) = parse_query_pair(pair)?;
            config = config.query(key, value);
        }

        let response = client.request(method, path, config).await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        self.output_message(&json!({
            "type": "RESPONSE",
            "status": status,
            "body": body,
        }));
        Ok(())
    }

    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Flag or environment value if given, otherwise one line from `input`
/// (prompted on stderr)
async fn secret<R>(value: Option<&str>, prompt: &str, input: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    if let Some(value) = value {
        return Ok(value.to_string());
    }

    eprint!("{prompt}: ");
    let mut line = String::new();
    input.read_line(&mut line).await?;

    let value = line.trim_end_matches(['\r', '\n']);
    if value.is_empty() {
        return Err(Error::config(format!("{prompt} must not be empty")));
    }
    Ok(value.to_string())
}

/// Split a `key=value` query argument
fn parse_query_pair(pair: &str) -> Result<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(Error::config(format!(
            "Invalid query parameter '{pair}', expected key=value"
        ))),
    }
}
