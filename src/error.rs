// Error types shared by the library modules. The binary flattens all of
// these into printed messages; nothing here is fatal to the process.

use std::path::PathBuf;

use thiserror::Error;

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Failure while talking to the API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request to {url} failed: {status} - {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Link {url} is not a usable URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Session token cannot be sent as a header")]
    InvalidHeader,
}

impl FetchError {
    pub fn from_status(url: &str, status: reqwest::StatusCode, body: &str) -> Self {
        FetchError::Status {
            url: url.to_string(),
            status,
            body: truncate_body(body),
        }
    }

    /// Whether the request went through but the body was not a document.
    pub fn is_decode(&self) -> bool {
        matches!(self, FetchError::Decode { .. })
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

/// Failure of a login or signup flow.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Password confirmation and password do not match.")]
    PasswordMismatch,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Authentication response did not contain a session token")]
    EmptyToken,

    #[error("Authentication response did not contain a root link")]
    MissingRootLink,

    #[error("Could not store session: {0}")]
    Store(#[from] StoreError),

    #[error("Could not read input: {0}")]
    Input(#[from] std::io::Error),
}

/// Failure reading or writing the config file.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Config file {path} could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file {path} is not valid YAML: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Could not find home directory")]
    NoHomeDir,
}
