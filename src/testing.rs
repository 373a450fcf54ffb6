// Test doubles shared by the unit tests.

use std::cell::RefCell;
use std::io::Cursor;

use crate::api::{Credentials, Hypermedia, Link, ResourceDocument, SessionDocument};
use crate::error::FetchError;
use crate::ui::LineTerminal;

pub type ScriptedTerminal = LineTerminal<Cursor<Vec<u8>>, Vec<u8>>;

/// Terminal that reads `input` and records everything written.
pub fn scripted(input: &str) -> ScriptedTerminal {
    LineTerminal::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Base(String),
    Authenticated { href: String, token: String },
    Submit { href: String, credentials: Credentials },
}

/// Canned API. A reply left as `None` behaves like a body that is not JSON.
#[derive(Default)]
pub struct FakeApi {
    base: Option<ResourceDocument>,
    root: Option<ResourceDocument>,
    session: Option<SessionDocument>,
    rejecting: bool,
    calls: RefCell<Vec<Call>>,
}

impl FakeApi {
    pub fn with_base(mut self, doc: ResourceDocument) -> Self {
        self.base = Some(doc);
        self
    }

    pub fn with_root(mut self, doc: ResourceDocument) -> Self {
        self.root = Some(doc);
        self
    }

    pub fn with_session(mut self, doc: SessionDocument) -> Self {
        self.session = Some(doc);
        self
    }

    /// Answer every request with 503.
    pub fn rejecting(mut self) -> Self {
        self.rejecting = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn reply<T: Clone>(&self, url: &str, reply: &Option<T>) -> Result<T, FetchError> {
        if self.rejecting {
            return Err(FetchError::from_status(
                url,
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
                "down",
            ));
        }
        reply.clone().ok_or_else(|| FetchError::Decode {
            url: url.to_string(),
            source: serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
        })
    }
}

impl Hypermedia for FakeApi {
    fn fetch_base(&self, base_url: &str) -> Result<ResourceDocument, FetchError> {
        self.calls.borrow_mut().push(Call::Base(base_url.to_string()));
        self.reply(base_url, &self.base)
    }

    fn fetch_authenticated(
        &self,
        link: &Link,
        token: &str,
    ) -> Result<ResourceDocument, FetchError> {
        self.calls.borrow_mut().push(Call::Authenticated {
            href: link.href.clone(),
            token: token.to_string(),
        });
        self.reply(&link.href, &self.root)
    }

    fn submit(
        &self,
        link: &Link,
        credentials: &Credentials,
    ) -> Result<SessionDocument, FetchError> {
        self.calls.borrow_mut().push(Call::Submit {
            href: link.href.clone(),
            credentials: credentials.clone(),
        });
        self.reply(&link.href, &self.session)
    }
}
