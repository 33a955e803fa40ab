mod network;
mod responses;

use std::sync::Arc;

use oaikit_auth::Authorizer;

pub use network::{HttpNetwork, Network, NetworkRequest, RawResponse};
pub use responses::{RESPONSES_PATH, ResponseFuture, Responses};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Default service root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for the OpenAI client.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub base_url: String,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

impl OpenAIConfig {
    /// Read `OPENAI_BASE_URL`, falling back to [`DEFAULT_BASE_URL`].
    pub fn from_env() -> Self {
        match std::env::var("OPENAI_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Self {
                base_url: url.trim().to_string(),
            },
            _ => Self::default(),
        }
    }
}

/// Entry point: a shared [`Authorizer`] plus the endpoints that use it.
///
/// ```ignore
/// use oaikit_auth::Authorizer;
/// use oaikit_llm::ResponseOptions;
/// use oaikit_openai::{OpenAI, OpenAIConfig};
///
/// let client = OpenAI::new(OpenAIConfig::from_env(), Authorizer::from_env()?);
/// let reply = client
///     .responses()
///     .create("gpt-4o", "Say hi", ResponseOptions::default(), None)?;
/// println!("{}", reply.output_text());
/// ```
#[derive(Debug, Clone)]
pub struct OpenAI {
    auth: Arc<Authorizer>,
    responses: Responses,
}

impl OpenAI {
    /// Client using [`HttpNetwork`].
    pub fn new(config: OpenAIConfig, auth: Authorizer) -> Self {
        Self::with_network(config, Arc::new(auth), Arc::new(HttpNetwork::new()))
    }

    pub fn with_network(
        config: OpenAIConfig,
        auth: Arc<Authorizer>,
        network: Arc<dyn Network>,
    ) -> Self {
        let responses = Responses::new(config.base_url, auth.clone(), network);
        Self { auth, responses }
    }

    /// The shared authorizer. Changes apply to calls started afterwards.
    pub fn auth(&self) -> &Arc<Authorizer> {
        &self.auth
    }

    pub fn responses(&self) -> &Responses {
        &self.responses
    }
}
