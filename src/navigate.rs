// One navigation step: fetch the resource the stored session points at,
// let the operator pick a link and follow it.
//
// Failures are reported on the terminal and turned into an `Outcome`;
// only terminal I/O errors are returned as errors.

use std::io;

use tracing::{debug, warn};

use crate::api::{self, Hypermedia, Link, ResourceDocument};
use crate::auth::{self, AuthMode};
use crate::error::{AuthError, FetchError};
use crate::session::{SessionState, SessionStore};
use crate::ui::{self, Terminal};

pub const NOT_IMPLEMENTED: &str = "Chosen selection has not yet been implemented";

/// How a step ended. Every variant is a normal exit for the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A login or signup stored a new session.
    Authenticated(SessionState),
    /// Signup confirmation did not match; nothing was sent.
    PasswordMismatch,
    /// The auth request was sent but no session came back.
    AuthFailed,
    /// The resource could not be fetched.
    FetchFailed,
    /// The selected flow has no link in the current document.
    LinkUnavailable(String),
    /// The selection is not an action this client knows.
    NotImplemented(String),
}

pub struct Navigator<'a, H: ?Sized, T: ?Sized> {
    api: &'a H,
    store: &'a SessionStore,
    term: &'a mut T,
    base_url: &'a str,
}

impl<'a, H, T> Navigator<'a, H, T>
where
    H: Hypermedia + ?Sized,
    T: Terminal + ?Sized,
{
    pub fn new(api: &'a H, store: &'a SessionStore, term: &'a mut T, base_url: &'a str) -> Self {
        Navigator {
            api,
            store,
            term,
            base_url,
        }
    }

    /// Fetch the current resource, ask for an action and dispatch it.
    pub fn step(&mut self) -> io::Result<Outcome> {
        let state = self.store.load();
        let doc = match self.current_document(&state)? {
            Some(doc) => doc,
            None => return Ok(Outcome::FetchFailed),
        };

        let names = ui::choices(&doc);
        let selection = ui::choose_action(&mut *self.term, &names)?;
        debug!(%selection, "action chosen");

        match AuthMode::from_selection(&selection) {
            Some(mode) => self.authenticate(mode, &doc),
            None => {
                self.term.say(NOT_IMPLEMENTED)?;
                Ok(Outcome::NotImplemented(selection))
            }
        }
    }

    /// Run a login or signup flow straight from the anonymous base resource.
    pub fn start_flow(&mut self, mode: AuthMode) -> io::Result<Outcome> {
        let fetched = self.fetch(&SessionState::Anonymous);
        match self.settle(fetched)? {
            Some(doc) => self.authenticate(mode, &doc),
            None => Ok(Outcome::FetchFailed),
        }
    }

    fn current_document(&mut self, state: &SessionState) -> io::Result<Option<ResourceDocument>> {
        let fetched = self.fetch(state);
        self.settle(fetched)
    }

    fn fetch(&self, state: &SessionState) -> Result<ResourceDocument, FetchError> {
        let spinner = ui::spinner("Loading...");
        let fetched = match state {
            // Older configs may hold a root href relative to the API.
            SessionState::Authenticated { token, root_href } => {
                api::resolve_href(&api::base_resource_url(self.base_url), root_href)
                    .and_then(|root| self.api.fetch_authenticated(&Link::new(root), token))
            }
            SessionState::Anonymous => self.api.fetch_base(self.base_url),
        };
        spinner.finish_and_clear();
        fetched
    }

    /// A body that does not decode counts as a document with no links.
    fn settle(
        &mut self,
        fetched: Result<ResourceDocument, FetchError>,
    ) -> io::Result<Option<ResourceDocument>> {
        match fetched {
            Ok(doc) => Ok(Some(doc)),
            Err(err) if err.is_decode() => {
                warn!(error = %err, "treating resource as empty");
                self.term.say(&err.to_string())?;
                Ok(Some(ResourceDocument::empty()))
            }
            Err(err) => {
                warn!(error = %err, "fetch failed");
                self.term.say(&err.to_string())?;
                Ok(None)
            }
        }
    }

    fn authenticate(&mut self, mode: AuthMode, doc: &ResourceDocument) -> io::Result<Outcome> {
        let Some(target) = doc.link(mode.link_name()) else {
            self.term
                .say(&format!("{} is not available from this resource", mode.link_name()))?;
            return Ok(Outcome::LinkUnavailable(mode.link_name().to_string()));
        };

        match auth::run_flow(self.api, self.store, &mut *self.term, mode, target) {
            Ok(state) => {
                self.term.say(mode.success_message())?;
                Ok(Outcome::Authenticated(state))
            }
            Err(AuthError::PasswordMismatch) => {
                self.term.say(&AuthError::PasswordMismatch.to_string())?;
                Ok(Outcome::PasswordMismatch)
            }
            Err(AuthError::Input(err)) => Err(err),
            Err(err) => {
                warn!(%mode, error = %err, "auth flow failed");
                self.term.say(&format!("{} failed: {}", mode, err))?;
                Ok(Outcome::AuthFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Credentials, Session, SessionDocument};
    use crate::testing::{scripted, Call, FakeApi, ScriptedTerminal};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    const BASE: &str = "http://api.test";

    fn store() -> (TempDir, SessionStore) {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = SessionStore::new(dir.path().join("config.yml"));
        (dir, store)
    }

    fn base_doc() -> ResourceDocument {
        serde_json::from_str(
            r#"{"_links":{"self":{"href":"s"},"login":{"href":"/login"},"signup":{"href":"/signup"}}}"#,
        )
        .unwrap()
    }

    fn session_doc(token: &str, root: &str) -> SessionDocument {
        let mut links = BTreeMap::new();
        links.insert("root".to_string(), Link::new(root));
        SessionDocument {
            session: Session {
                token: token.to_string(),
            },
            links,
        }
    }

    fn step(api: &FakeApi, store: &SessionStore, input: &str) -> (Outcome, String) {
        let mut term = scripted(input);
        let outcome = Navigator::new(api, store, &mut term, BASE).step().unwrap();
        (outcome, output(term))
    }

    fn output(term: ScriptedTerminal) -> String {
        String::from_utf8(term.into_output()).unwrap()
    }

    #[test]
    fn anonymous_step_fetches_base_and_lists_choices() {
        let (_dir, store) = store();
        let api = FakeApi::default().with_base(base_doc());

        let (outcome, out) = step(&api, &store, "nothing\n");

        assert_eq!(api.calls(), vec![Call::Base(BASE.into())]);
        assert!(out.contains("[login signup]"));
        assert!(!out.contains("self"));
        assert_eq!(outcome, Outcome::NotImplemented("nothing".into()));
    }

    #[test]
    fn unknown_selection_is_not_implemented() {
        let (_dir, store) = store();
        let api = FakeApi::default().with_base(base_doc());

        let (outcome, out) = step(&api, &store, "widgets\n");

        assert!(out.contains(NOT_IMPLEMENTED));
        assert_eq!(outcome, Outcome::NotImplemented("widgets".into()));
        assert_eq!(api.calls().len(), 1);
    }

    #[test]
    fn login_selection_runs_flow_and_stores_session() {
        let (_dir, store) = store();
        let api = FakeApi::default()
            .with_base(base_doc())
            .with_session(session_doc("T", "R"));

        let (outcome, out) = step(&api, &store, "login\na@b.com\npw\n");

        assert_eq!(outcome, Outcome::Authenticated(SessionState::authenticated("T", "R")));
        assert_eq!(store.load(), SessionState::authenticated("T", "R"));
        assert_eq!(
            api.calls()[1],
            Call::Submit {
                href: "/login".into(),
                credentials: Credentials {
                    email: "a@b.com".into(),
                    password: "pw".into(),
                },
            }
        );
        assert!(out.contains("Login successful."));
    }

    #[test]
    fn stored_session_fetches_root_with_token() {
        let (_dir, store) = store();
        store.save(&SessionState::authenticated("T", "R")).unwrap();
        let api = FakeApi::default().with_root(base_doc());

        step(&api, &store, "widgets\n");

        assert_eq!(
            api.calls(),
            vec![Call::Authenticated {
                href: "http://api.test/v1/R".into(),
                token: "T".into(),
            }]
        );
    }

    #[test]
    fn absolute_root_href_is_used_as_stored() {
        let (_dir, store) = store();
        store
            .save(&SessionState::authenticated("T", "https://root.test/home"))
            .unwrap();
        let api = FakeApi::default().with_root(base_doc());

        step(&api, &store, "widgets\n");

        assert_eq!(
            api.calls(),
            vec![Call::Authenticated {
                href: "https://root.test/home".into(),
                token: "T".into(),
            }]
        );
    }

    #[test]
    fn failed_session_write_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let store = SessionStore::new(blocker.join("config.yml"));
        let api = FakeApi::default()
            .with_base(base_doc())
            .with_session(session_doc("T", "R"));

        let (outcome, out) = step(&api, &store, "login\na@b.com\npw\n");

        assert_eq!(outcome, Outcome::AuthFailed);
        assert!(out.contains("Login failed: Could not store session"));
        assert_eq!(store.load(), SessionState::Anonymous);
    }

    #[test]
    fn each_step_issues_exactly_one_fetch() {
        let (_dir, store) = store();
        let api = FakeApi::default().with_base(base_doc());
        step(&api, &store, "widgets\n");
        step(&api, &store, "widgets\n");
        assert_eq!(api.calls(), vec![Call::Base(BASE.into()), Call::Base(BASE.into())]);

        store.save(&SessionState::authenticated("T", "R")).unwrap();
        let api = FakeApi::default().with_root(base_doc());
        step(&api, &store, "widgets\n");
        step(&api, &store, "widgets\n");
        assert_eq!(api.calls().len(), 2);
        assert!(api
            .calls()
            .iter()
            .all(|call| matches!(call, Call::Authenticated { .. })));
    }

    #[test]
    fn signup_mismatch_reports_and_sends_nothing() {
        let (_dir, store) = store();
        let api = FakeApi::default()
            .with_base(base_doc())
            .with_session(session_doc("T", "R"));

        let (outcome, out) = step(&api, &store, "signup\ne@x.com\none\ntwo\n");

        assert_eq!(outcome, Outcome::PasswordMismatch);
        assert!(out.contains("Password confirmation and password do not match."));
        assert_eq!(api.calls().len(), 1);
        assert_eq!(store.load(), SessionState::Anonymous);
    }

    #[test]
    fn malformed_document_offers_no_choices() {
        let (_dir, store) = store();
        let api = FakeApi::default();

        let (outcome, out) = step(&api, &store, "\n");

        assert!(out.contains("Could not decode response"));
        assert!(out.contains("Available actions: []"));
        assert_eq!(outcome, Outcome::NotImplemented(String::new()));
    }

    #[test]
    fn rejected_fetch_ends_the_step() {
        let (_dir, store) = store();
        let api = FakeApi::default().rejecting();

        let (outcome, out) = step(&api, &store, "login\n");

        assert_eq!(outcome, Outcome::FetchFailed);
        assert!(out.contains("503"));
        assert!(!out.contains("Choose action"));
    }

    #[test]
    fn login_without_link_is_unavailable() {
        let (_dir, store) = store();
        store.save(&SessionState::authenticated("T", "R")).unwrap();
        let mut root = ResourceDocument::empty();
        root.links.insert("todos".into(), Link::new("/todos"));
        let api = FakeApi::default().with_root(root);

        let (outcome, out) = step(&api, &store, "login\n");

        assert_eq!(outcome, Outcome::LinkUnavailable("login".into()));
        assert!(out.contains("login is not available from this resource"));
        assert_eq!(api.calls().len(), 1);
    }

    #[test]
    fn failed_submission_is_reported() {
        let (_dir, store) = store();
        let api = FakeApi::default().with_base(base_doc());

        let (outcome, out) = step(&api, &store, "login\na@b.com\npw\n");

        assert_eq!(outcome, Outcome::AuthFailed);
        assert!(out.contains("Login failed:"));
        assert_eq!(store.load(), SessionState::Anonymous);
    }

    #[test]
    fn start_flow_skips_the_action_prompt() {
        let (_dir, store) = store();
        store.save(&SessionState::authenticated("old", "R0")).unwrap();
        let api = FakeApi::default()
            .with_base(base_doc())
            .with_session(session_doc("T", "R"));
        let mut term = scripted("a@b.com\npw\npw\n");

        let outcome = Navigator::new(&api, &store, &mut term, BASE)
            .start_flow(AuthMode::Signup)
            .unwrap();

        assert_eq!(outcome, Outcome::Authenticated(SessionState::authenticated("T", "R")));
        assert_eq!(api.calls()[0], Call::Base(BASE.into()));
        assert!(!output(term).contains("Choose action"));
    }
}
