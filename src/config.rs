// Command-line configuration.
//
// Values are resolved with this priority:
//
// 1. CLI arguments
// 2. Environment variables (`HYPERNAV_API`, `HYPERNAV_CONFIG`)
// 3. `server-url` remembered in the config file (API URL only)
// 4. Defaults (`http://localhost:8080`, `~/.hypernav.yml`)

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::warn;

use crate::auth::AuthMode;
use crate::session::SessionStore;

/// API base URL used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Config file used when the home directory cannot be found
const FALLBACK_CONFIG_FILE: &str = ".hypernav.yml";

/// Navigate a hypermedia API from the terminal
#[derive(Parser, Debug)]
#[command(name = "hypernav")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// API base URL (default: last used, then http://localhost:8080)
    #[arg(short, long, env = "HYPERNAV_API", global = true)]
    pub api: Option<String>,

    /// Config file holding the session (default: ~/.hypernav.yml)
    #[arg(long, env = "HYPERNAV_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Log in through the API's login link
    Login,
    /// Create an account through the API's signup link
    Signup,
}

impl Command {
    pub fn mode(self) -> AuthMode {
        match self {
            Command::Login => AuthMode::Login,
            Command::Signup => AuthMode::Signup,
        }
    }
}

impl Cli {
    /// Config file location: flag or env, else the home directory, else
    /// the working directory.
    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.config {
            return path.clone();
        }
        SessionStore::default_path().unwrap_or_else(|err| {
            warn!(error = %err, "falling back to working directory for config");
            PathBuf::from(FALLBACK_CONFIG_FILE)
        })
    }

    /// API base URL: flag or env, else the stored one, else the default.
    pub fn api_url(&self, stored: Option<String>) -> String {
        self.api
            .clone()
            .or(stored)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }
}
