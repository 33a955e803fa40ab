//! The read-only authorization contract consumed by dispatch calls.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Proxy URLs keyed by scheme (`"http"`, `"https"` or `"all"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proxies {
    entries: BTreeMap<String, String>,
}

impl Proxies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, scheme: impl Into<String>, url: impl Into<String>) -> Self {
        self.insert(scheme, url);
        self
    }

    pub fn insert(&mut self, scheme: impl Into<String>, url: impl Into<String>) {
        self.entries.insert(scheme.into(), url.into());
    }

    pub fn get(&self, scheme: &str) -> Option<&str> {
        self.entries.get(scheme).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(scheme, url)| (scheme.as_str(), url.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Basic credentials for the proxy.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

impl ProxyAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for ProxyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything one dispatch call reads from the authorization source, taken
/// together at call start.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub headers: HashMap<String, String>,
    pub proxies: Proxies,
    pub proxy_auth: Option<ProxyAuth>,
    pub timeout: Duration,
}

impl fmt::Debug for AuthSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.headers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("AuthSnapshot")
            .field("headers", &names)
            .field("proxies", &self.proxies)
            .field("proxy_auth", &self.proxy_auth)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Source of credentials, proxy settings and the request timeout.
///
/// Implementations are shared across concurrent calls and must only be read
/// through this trait.
pub trait Authorization: Send + Sync {
    fn authorization_headers(&self) -> HashMap<String, String>;

    fn proxies(&self) -> Proxies;

    fn proxy_auth(&self) -> Option<ProxyAuth>;

    fn max_timeout(&self) -> Duration;

    fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            headers: self.authorization_headers(),
            proxies: self.proxies(),
            proxy_auth: self.proxy_auth(),
            timeout: self.max_timeout(),
        }
    }
}
