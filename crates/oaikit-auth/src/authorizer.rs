use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use parking_lot::RwLock;

use crate::authorization::{AuthSnapshot, Authorization, Proxies, ProxyAuth};
use crate::error::{Error, Result};

/// Timeout applied when none is configured.
pub const DEFAULT_MAX_TIMEOUT: Duration = Duration::from_secs(30);

const API_KEY_ENV: &str = "OPENAI_API_KEY";
const ORGANIZATION_ENV: &str = "OPENAI_ORG_ID";
const PROJECT_ENV: &str = "OPENAI_PROJECT_ID";
const PROXY_ENV: &str = "OAIKIT_PROXY_URL";
const TIMEOUT_ENV: &str = "OAIKIT_TIMEOUT_SECS";

#[derive(Default)]
struct AuthState {
    key: Option<String>,
    organization: Option<String>,
    project: Option<String>,
    proxies: Proxies,
    proxy_auth: Option<ProxyAuth>,
    max_timeout: Option<Duration>,
}

/// Shared credential and connection settings.
///
/// Setters take `&self` so an `Arc<Authorizer>` can be rotated while calls
/// are in flight; each call keeps the values it read at start.
#[derive(Default)]
pub struct Authorizer {
    state: RwLock<AuthState>,
}

impl Authorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the process environment.
    ///
    /// - `OPENAI_API_KEY` (required)
    /// - `OPENAI_ORG_ID`, `OPENAI_PROJECT_ID`
    /// - `OAIKIT_PROXY_URL`: proxy for all schemes
    /// - `OAIKIT_TIMEOUT_SECS`: max timeout, whole seconds
    pub fn from_env() -> Result<Self> {
        let auth = Self::new();
        auth.set_key_env(API_KEY_ENV)?;

        if let Some(org) = non_empty_env(ORGANIZATION_ENV) {
            auth.set_organization(org);
        }
        if let Some(project) = non_empty_env(PROJECT_ENV) {
            auth.set_project(project);
        }
        if let Some(proxy) = non_empty_env(PROXY_ENV) {
            auth.set_proxies(Proxies::new().with("all", proxy));
        }
        if let Some(raw) = non_empty_env(TIMEOUT_ENV) {
            let secs = raw.trim().parse::<u64>().map_err(|_| Error::InvalidValue {
                name: TIMEOUT_ENV.to_string(),
                value: raw.clone(),
            })?;
            auth.set_max_timeout(Duration::from_secs(secs));
        }

        {
            let state = auth.state.read();
            tracing::debug!(
                organization = state.organization.is_some(),
                project = state.project.is_some(),
                proxied = !state.proxies.is_empty(),
                timeout = ?state.max_timeout.unwrap_or(DEFAULT_MAX_TIMEOUT),
                "loaded authorization from environment"
            );
        }
        Ok(auth)
    }

    pub fn set_key(&self, key: impl Into<String>) -> Result<()> {
        let key = clean_key(key.into())?;
        self.state.write().key = Some(key);
        Ok(())
    }

    /// Replace key, organization and project together, so no call can see a
    /// mix of old and new values.
    pub fn set_credentials(
        &self,
        key: impl Into<String>,
        organization: Option<String>,
        project: Option<String>,
    ) -> Result<()> {
        let key = clean_key(key.into())?;
        let mut state = self.state.write();
        state.key = Some(key);
        state.organization = organization;
        state.project = project;
        Ok(())
    }

    pub fn set_key_env(&self, var: &str) -> Result<()> {
        let key = non_empty_env(var).ok_or_else(|| Error::MissingEnvVar(var.to_string()))?;
        self.set_key(key)
    }

    /// Read the key from the first non-blank line of a file.
    pub fn set_key_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = std::fs::read_to_string(path)?;
        let key = contents
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or(Error::EmptyKey)?;
        self.set_key(key)
    }

    pub fn set_organization(&self, organization: impl Into<String>) {
        self.state.write().organization = Some(organization.into());
    }

    pub fn set_organization_env(&self, var: &str) -> Result<()> {
        let org = non_empty_env(var).ok_or_else(|| Error::MissingEnvVar(var.to_string()))?;
        self.set_organization(org);
        Ok(())
    }

    pub fn set_project(&self, project: impl Into<String>) {
        self.state.write().project = Some(project.into());
    }

    pub fn set_project_env(&self, var: &str) -> Result<()> {
        let project = non_empty_env(var).ok_or_else(|| Error::MissingEnvVar(var.to_string()))?;
        self.set_project(project);
        Ok(())
    }

    pub fn set_proxies(&self, proxies: Proxies) {
        self.state.write().proxies = proxies;
    }

    pub fn set_proxy_auth(&self, auth: ProxyAuth) {
        self.state.write().proxy_auth = Some(auth);
    }

    pub fn set_max_timeout(&self, timeout: Duration) {
        self.state.write().max_timeout = Some(timeout);
    }

    pub fn has_key(&self) -> bool {
        self.state.read().key.is_some()
    }
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Authorizer")
            .field("key", &state.key.as_ref().map(|_| "<redacted>"))
            .field("organization", &state.organization)
            .field("project", &state.project)
            .field("proxies", &state.proxies)
            .field("proxy_auth", &state.proxy_auth)
            .field("max_timeout", &state.max_timeout)
            .finish()
    }
}

impl AuthState {
    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(key) = &self.key {
            headers.insert("Authorization".to_string(), format!("Bearer {key}"));
        }
        if let Some(org) = &self.organization {
            headers.insert("OpenAI-Organization".to_string(), org.clone());
        }
        if let Some(project) = &self.project {
            headers.insert("OpenAI-Project".to_string(), project.clone());
        }
        headers
    }
}

impl Authorization for Authorizer {
    fn authorization_headers(&self) -> HashMap<String, String> {
        self.state.read().headers()
    }

    fn proxies(&self) -> Proxies {
        self.state.read().proxies.clone()
    }

    fn proxy_auth(&self) -> Option<ProxyAuth> {
        self.state.read().proxy_auth.clone()
    }

    fn max_timeout(&self) -> Duration {
        self.state.read().max_timeout.unwrap_or(DEFAULT_MAX_TIMEOUT)
    }

    fn snapshot(&self) -> AuthSnapshot {
        let state = self.state.read();
        AuthSnapshot {
            headers: state.headers(),
            proxies: state.proxies.clone(),
            proxy_auth: state.proxy_auth.clone(),
            timeout: state.max_timeout.unwrap_or(DEFAULT_MAX_TIMEOUT),
        }
    }
}

fn clean_key(key: String) -> Result<String> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::EmptyKey);
    }
    Ok(key.to_string())
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn headers_carry_bearer_org_and_project() {
        let auth = Authorizer::new();
        auth.set_key("sk-test").unwrap();
        auth.set_organization("org-1");
        auth.set_project("proj-1");

        let headers = auth.authorization_headers();
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer sk-test");
        assert_eq!(headers.get("OpenAI-Organization").unwrap(), "org-1");
        assert_eq!(headers.get("OpenAI-Project").unwrap(), "proj-1");
    }

    #[test]
    fn empty_key_is_rejected() {
        let auth = Authorizer::new();
        assert!(matches!(auth.set_key("   "), Err(Error::EmptyKey)));
        assert!(!auth.has_key());
        assert!(auth.authorization_headers().is_empty());
    }

    #[test]
    fn missing_env_var_is_reported() {
        let auth = Authorizer::new();
        let err = auth
            .set_key_env("OAIKIT_TEST_DEFINITELY_UNSET_VARIABLE")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingEnvVar(name) if name == "OAIKIT_TEST_DEFINITELY_UNSET_VARIABLE"
        ));
    }

    #[test]
    fn key_file_uses_first_non_blank_line() {
        let path = std::env::temp_dir().join(format!(
            "oaikit-key-test-{}-{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("time")
                .as_nanos()
        ));
        std::fs::write(&path, "\n  sk-from-file  \nignored\n").expect("write key file");

        let auth = Authorizer::new();
        auth.set_key_file(&path).unwrap();
        assert_eq!(
            auth.authorization_headers().get("Authorization").unwrap(),
            "Bearer sk-from-file"
        );

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn timeout_defaults_and_overrides() {
        let auth = Authorizer::new();
        assert_eq!(auth.max_timeout(), DEFAULT_MAX_TIMEOUT);
        auth.set_max_timeout(Duration::from_secs(90));
        assert_eq!(auth.max_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn snapshot_is_unaffected_by_later_rotation() {
        let auth = Authorizer::new();
        auth.set_key("sk-old").unwrap();
        auth.set_proxies(Proxies::new().with("https", "http://proxy:3128"));
        auth.set_proxy_auth(ProxyAuth::new("user", "pass"));

        let snapshot = auth.snapshot();
        auth.set_key("sk-new").unwrap();
        auth.set_proxies(Proxies::new());

        assert_eq!(snapshot.headers.get("Authorization").unwrap(), "Bearer sk-old");
        assert_eq!(snapshot.proxies.get("https"), Some("http://proxy:3128"));
        assert_eq!(snapshot.proxy_auth, Some(ProxyAuth::new("user", "pass")));
        assert_eq!(
            auth.authorization_headers().get("Authorization").unwrap(),
            "Bearer sk-new"
        );
    }

    #[test]
    fn snapshot_never_mixes_rotated_credentials() {
        let auth = Arc::new(Authorizer::new());
        auth.set_credentials("sk-a", Some("org-a".into()), Some("proj-a".into()))
            .unwrap();

        let writer = {
            let auth = Arc::clone(&auth);
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    let tag = if i % 2 == 0 { "b" } else { "a" };
                    auth.set_credentials(
                        format!("sk-{tag}"),
                        Some(format!("org-{tag}")),
                        Some(format!("proj-{tag}")),
                    )
                    .unwrap();
                }
            })
        };

        for _ in 0..2_000 {
            let snapshot = auth.snapshot();
            let key = &snapshot.headers["Authorization"];
            let tag = key.trim_start_matches("Bearer sk-");
            assert_eq!(snapshot.headers["OpenAI-Organization"], format!("org-{tag}"));
            assert_eq!(snapshot.headers["OpenAI-Project"], format!("proj-{tag}"));
        }
        writer.join().expect("writer thread");
    }

    #[test]
    fn set_credentials_clears_unset_fields() {
        let auth = Authorizer::new();
        auth.set_credentials("sk-1", Some("org-1".into()), None).unwrap();
        auth.set_project("proj-1");
        auth.set_credentials("sk-2", None, None).unwrap();

        let headers = auth.snapshot().headers;
        assert_eq!(headers["Authorization"], "Bearer sk-2");
        assert!(!headers.contains_key("OpenAI-Organization"));
        assert!(!headers.contains_key("OpenAI-Project"));
        assert!(matches!(
            auth.set_credentials(" ", None, None),
            Err(Error::EmptyKey)
        ));
    }
}
