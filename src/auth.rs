// Login and signup flows: collect credentials from the terminal, submit
// them to the chosen link and store the session the server hands back.

use std::fmt;

use tracing::{info, warn};

use crate::api::{Credentials, Hypermedia, Link};
use crate::error::AuthError;
use crate::session::{SessionState, SessionStore};
use crate::ui::{self, Terminal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

impl AuthMode {
    /// Map an action name to a flow, if it is one.
    pub fn from_selection(selection: &str) -> Option<Self> {
        match selection {
            "login" => Some(AuthMode::Login),
            "signup" => Some(AuthMode::Signup),
            _ => None,
        }
    }

    /// Name of the link this flow submits to.
    pub fn link_name(self) -> &'static str {
        match self {
            AuthMode::Login => "login",
            AuthMode::Signup => "signup",
        }
    }

    fn progress_message(self) -> &'static str {
        match self {
            AuthMode::Login => "Logging in...",
            AuthMode::Signup => "Signing up...",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            AuthMode::Login => "Login successful.",
            AuthMode::Signup => "Signup successful.",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Login => write!(f, "Login"),
            AuthMode::Signup => write!(f, "Signup"),
        }
    }
}

/// Prompt for email, password and (signup only) the confirmation.
pub fn collect_credentials<T: Terminal + ?Sized>(
    term: &mut T,
    mode: AuthMode,
) -> Result<Credentials, AuthError> {
    let email = term.prompt_line("Email")?;
    let password = term.prompt_secret("Password")?;
    if mode == AuthMode::Signup {
        let confirmation = term.prompt_secret("Password Confirmation")?;
        if confirmation != password {
            return Err(AuthError::PasswordMismatch);
        }
    }
    Ok(Credentials { email, password })
}

/// Run one flow against `target`. On success the new session has been
/// written to `store` and is returned.
pub fn run_flow<H, T>(
    api: &H,
    store: &SessionStore,
    term: &mut T,
    mode: AuthMode,
    target: &Link,
) -> Result<SessionState, AuthError>
where
    H: Hypermedia + ?Sized,
    T: Terminal + ?Sized,
{
    let credentials = collect_credentials(term, mode)?;

    let spinner = ui::spinner(mode.progress_message());
    let submitted = api.submit(target, &credentials);
    spinner.finish_and_clear();
    let response = submitted?;

    if response.session.token.is_empty() {
        warn!(%mode, "session response carried no token");
        return Err(AuthError::EmptyToken);
    }
    let root = match response.root() {
        Some(link) if !link.href.is_empty() => link.href.clone(),
        _ => return Err(AuthError::MissingRootLink),
    };

    let state = SessionState::authenticated(response.session.token, root);
    store.save(&state)?;
    info!(%mode, email = %credentials.email, "session stored");
    Ok(state)
}
