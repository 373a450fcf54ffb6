// File-backed session store.
//
// The config file is a flat YAML mapping. This module owns the
// `session-token` and `root-href` keys (always written together) and the
// remembered `server-url`; any other keys found in the file are kept as-is
// when it is rewritten.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::Link;
use crate::error::StoreError;

/// Config file name in the home directory
const CONFIG_FILE: &str = ".hypernav.yml";

/// Where this process is in the auth lifecycle.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated { token: String, root_href: String },
}

impl SessionState {
    pub fn authenticated(token: impl Into<String>, root_href: impl Into<String>) -> Self {
        SessionState::Authenticated {
            token: token.into(),
            root_href: root_href.into(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated { token, .. } => Some(token),
        }
    }

    pub fn root_href(&self) -> Option<&str> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated { root_href, .. } => Some(root_href),
        }
    }

    /// Link to the authenticated root resource, if logged in.
    pub fn root_link(&self) -> Option<Link> {
        self.root_href().map(Link::new)
    }
}

// Tokens stay out of logs and test failure output.
impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Anonymous => write!(f, "Anonymous"),
            SessionState::Authenticated { root_href, .. } => f
                .debug_struct("Authenticated")
                .field("token", &"<redacted>")
                .field("root_href", root_href)
                .finish(),
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(rename = "session-token", default, skip_serializing_if = "Option::is_none")]
    session_token: Option<String>,
    #[serde(rename = "root-href", default, skip_serializing_if = "Option::is_none")]
    root_href: Option<String>,
    #[serde(rename = "server-url", default, skip_serializing_if = "Option::is_none")]
    server_url: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

impl ConfigFile {
    fn session(&self) -> SessionState {
        match (&self.session_token, &self.root_href) {
            (Some(token), Some(root)) if !token.is_empty() && !root.is_empty() => {
                SessionState::authenticated(token.clone(), root.clone())
            }
            (None, None) => SessionState::Anonymous,
            _ => {
                warn!("config holds an incomplete session; ignoring it");
                SessionState::Anonymous
            }
        }
    }

    fn set_session(&mut self, state: &SessionState) {
        match state {
            SessionState::Anonymous => {
                self.session_token = None;
                self.root_href = None;
            }
            SessionState::Authenticated { token, root_href } => {
                self.session_token = Some(token.clone());
                self.root_href = Some(root_href.clone());
            }
        }
    }
}

/// The only component that writes persistent state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionStore { path: path.into() }
    }

    /// `$HOME/.hypernav.yml`
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::NoHomeDir)?;
        Ok(home.join(CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty config file if none exists. Returns whether a file
    /// was already there.
    pub fn ensure_exists(&self) -> Result<bool, StoreError> {
        if self.path.exists() {
            return Ok(true);
        }
        self.create_parent()?;
        fs::File::create(&self.path).map_err(|source| self.io_error(source))?;
        debug!(path = %self.path.display(), "created config file");
        Ok(false)
    }

    /// Read the stored session. Any problem reading the file yields an
    /// anonymous session.
    pub fn load(&self) -> SessionState {
        match self.read() {
            Ok(config) => config.session(),
            Err(err) => {
                warn!(error = %err, "could not read session; continuing anonymously");
                SessionState::Anonymous
            }
        }
    }

    /// Persist both session fields in one write. A config file that is not
    /// valid YAML is copied aside before being replaced.
    pub fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        let mut config = match self.read() {
            Ok(config) => config,
            Err(StoreError::Yaml { .. }) => {
                self.back_up()?;
                ConfigFile::default()
            }
            Err(err) => return Err(err),
        };
        config.set_session(state);
        self.write(&config)
    }

    /// API base URL remembered from an earlier run.
    pub fn server_url(&self) -> Option<String> {
        self.read().ok().and_then(|config| config.server_url)
    }

    /// Remember the API base URL. Skipped when the existing config cannot
    /// be parsed, so hand edits are not overwritten.
    pub fn save_server_url(&self, url: &str) -> Result<(), StoreError> {
        let mut config = match self.read() {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "not remembering server url");
                return Ok(());
            }
        };
        if config.server_url.as_deref() == Some(url) {
            return Ok(());
        }
        config.server_url = Some(url.to_string());
        self.write(&config)
    }

    fn read(&self) -> Result<ConfigFile, StoreError> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }
        let contents = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        if contents.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| StoreError::Yaml {
            path: self.path.clone(),
            source,
        })
    }

    fn back_up(&self) -> Result<(), StoreError> {
        let backup = self.sibling_path(".bak");
        fs::copy(&self.path, &backup).map_err(|source| self.io_error(source))?;
        warn!(backup = %backup.display(), "config was not valid YAML; kept a copy");
        Ok(())
    }

    /// Write to a sibling temp file and rename it over the config, so a
    /// reader sees either the old file or the new one.
    fn write(&self, config: &ConfigFile) -> Result<(), StoreError> {
        let contents = serde_yaml::to_string(config).map_err(|source| StoreError::Yaml {
            path: self.path.clone(),
            source,
        })?;
        self.create_parent()?;
        let tmp = self.sibling_path(".tmp");
        fs::write(&tmp, contents).map_err(|source| self.io_error(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            self.io_error(source)
        })?;
        debug!(path = %self.path.display(), "config written");
        Ok(())
    }

    fn create_parent(&self) -> Result<(), StoreError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|source| self.io_error(source))
            }
            _ => Ok(()),
        }
    }

    /// The config path with `suffix` appended to the file name.
    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| CONFIG_FILE.into());
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
