//! CLI module
//!
//! Command-line interface over the authenticated client.
//!
//! # Commands
//!
//! - `login` / `signup` / `logout` - Manage the persisted session
//! - `whoami` - Fetch the signed-in user
//! - `status` - Inspect the local session
//! - `change-password` - Change the signed-in user's password
//! - `request` - Send an arbitrary authenticated request

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
