//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Agency admin API command-line client
#[derive(Parser, Debug)]
#[command(name = "agency-admin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL (overrides config and environment)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Session file (overrides config and environment)
    #[arg(short, long, global = true)]
    pub session_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and persist the session
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password (read from stdin when omitted)
        #[arg(long, env = "AGENCY_ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Register a new admin account
    Signup {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password (read from stdin when omitted)
        #[arg(long, env = "AGENCY_ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Forget the persisted session
    Logout,

    /// Show the signed-in user (fetched from the backend)
    Whoami,

    /// Show the local session status without calling the backend
    Status,

    /// Change the signed-in user's password
    ChangePassword {
        /// Current password (read from stdin when omitted)
        #[arg(long, env = "AGENCY_ADMIN_PASSWORD", hide_env_values = true)]
        current: Option<String>,

        /// New password (read from stdin when omitted)
        #[arg(long, env = "AGENCY_ADMIN_NEW_PASSWORD", hide_env_values = true)]
        new: Option<String>,
    },

    /// Send an authenticated request and print the response body
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,

        /// Path relative to the base URL, or an absolute URL
        path: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,

        /// Query parameters as key=value
        #[arg(short, long = "query")]
        query: Vec<String>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON (one message per line)
    Json,
    /// Pretty-printed JSON
    Pretty,
}
