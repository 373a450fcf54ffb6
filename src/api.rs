// API module: wire types for the hypermedia documents and a small blocking
// HTTP client that fetches them. Everything the rest of the crate needs from
// the network goes through the `Hypermedia` trait so flows can be exercised
// without a server.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::HeaderValue;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::FetchError;

/// Link name a document uses for its own location.
pub const SELF_LINK: &str = "self";

/// Link name in a session document pointing at the authenticated entry point.
pub const ROOT_LINK: &str = "root";

/// Header carrying the session token on authenticated requests.
pub const SESSION_TOKEN_HEADER: &str = "Session-Token";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Path of the anonymous entry document below the API base URL.
const BASE_RESOURCE_PATH: &str = "/v1/";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Link { href: href.into() }
    }
}

/// A resource as returned by the API: a flat map of named links.
///
/// A body without `_links` decodes to an empty document rather than failing.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDocument {
    #[serde(rename = "_links", default)]
    pub links: BTreeMap<String, Link>,
}

impl ResourceDocument {
    /// A document with no links at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.get(name)
    }

    /// Link names an operator may pick from, in ascending order. The self
    /// link is never included.
    pub fn choosable(&self) -> impl Iterator<Item = &str> {
        self.links
            .keys()
            .map(String::as_str)
            .filter(|name| *name != SELF_LINK)
    }
}

/// Resolve `href` against the URL of the document it appeared in.
/// Absolute hrefs come back unchanged.
pub fn resolve_href(document_url: &str, href: &str) -> Result<String, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: href.to_string(),
        reason,
    };
    if Url::parse(href).is_ok() {
        return Ok(href.to_string());
    }
    let base = Url::parse(document_url).map_err(|err| invalid(err.to_string()))?;
    let resolved = base.join(href).map_err(|err| invalid(err.to_string()))?;
    Ok(resolved.to_string())
}

/// Rewrite every link in `links` to an absolute URL. Links that cannot be
/// resolved are left as they are.
fn resolve_links(links: &mut BTreeMap<String, Link>, document_url: &str) {
    for (name, link) in links.iter_mut() {
        match resolve_href(document_url, &link.href) {
            Ok(href) => link.href = href,
            Err(err) => warn!(%name, error = %err, "leaving link unresolved"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
}

/// Response body of the login and signup endpoints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionDocument {
    pub session: Session,
    #[serde(rename = "_links", default)]
    pub links: BTreeMap<String, Link>,
}

impl SessionDocument {
    pub fn root(&self) -> Option<&Link> {
        self.links.get(ROOT_LINK)
    }
}

/// Email and password submitted to an auth endpoint. Never persisted.
#[derive(Serialize, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Operations the navigation and auth flows need from the API.
pub trait Hypermedia {
    /// GET `{base_url}/v1/` without credentials.
    fn fetch_base(&self, base_url: &str) -> Result<ResourceDocument, FetchError>;

    /// GET `link.href` carrying the session token header.
    fn fetch_authenticated(&self, link: &Link, token: &str)
        -> Result<ResourceDocument, FetchError>;

    /// POST the credentials as JSON to `link.href`.
    fn submit(&self, link: &Link, credentials: &Credentials)
        -> Result<SessionDocument, FetchError>;
}

/// Blocking reqwest client talking to the real API. Every link in a
/// returned document is absolute, resolved against the URL it was fetched
/// from; hrefs passed in must be absolute too.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(HttpFetcher { client })
    }

    /// Check the status and decode the body of a response.
    fn decode<T: DeserializeOwned>(url: &str, res: Response) -> Result<T, FetchError> {
        let status = res.status();
        let body = res.text()?;
        if !status.is_success() {
            warn!(%url, %status, "request rejected");
            return Err(FetchError::from_status(url, status, &body));
        }
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    fn target(link: &Link) -> Result<Url, FetchError> {
        Url::parse(&link.href).map_err(|err| FetchError::InvalidUrl {
            url: link.href.clone(),
            reason: err.to_string(),
        })
    }
}

/// Build the URL of the anonymous entry document.
pub fn base_resource_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), BASE_RESOURCE_PATH)
}

impl Hypermedia for HttpFetcher {
    fn fetch_base(&self, base_url: &str) -> Result<ResourceDocument, FetchError> {
        let url = base_resource_url(base_url);
        debug!(%url, "fetching base resource");
        let res = self.client.get(&url).send()?;
        let mut doc: ResourceDocument = Self::decode(&url, res)?;
        resolve_links(&mut doc.links, &url);
        Ok(doc)
    }

    fn fetch_authenticated(
        &self,
        link: &Link,
        token: &str,
    ) -> Result<ResourceDocument, FetchError> {
        debug!(url = %link.href, "fetching root resource");
        let target = Self::target(link)?;
        let value = HeaderValue::from_str(token).map_err(|_| FetchError::InvalidHeader)?;
        let res = self
            .client
            .get(target)
            .header(SESSION_TOKEN_HEADER, value)
            .send()?;
        let mut doc: ResourceDocument = Self::decode(&link.href, res)?;
        resolve_links(&mut doc.links, &link.href);
        Ok(doc)
    }

    fn submit(
        &self,
        link: &Link,
        credentials: &Credentials,
    ) -> Result<SessionDocument, FetchError> {
        debug!(url = %link.href, email = %credentials.email, "submitting credentials");
        let target = Self::target(link)?;
        let res = self.client.post(target).json(credentials).send()?;
        let mut doc: SessionDocument = Self::decode(&link.href, res)?;
        resolve_links(&mut doc.links, &link.href);
        Ok(doc)
    }
}
