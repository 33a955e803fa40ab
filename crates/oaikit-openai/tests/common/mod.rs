//! A recording [`Network`] for dispatcher tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use oaikit_auth::{Proxies, ProxyAuth};
use oaikit_llm::{StreamId, TransportError};
use oaikit_openai::{Network, NetworkRequest, RawResponse};

/// What the mock saw for one exchange, minus the callback.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub content_type: String,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub streamed: bool,
    pub proxies: Proxies,
    pub proxy_auth: Option<ProxyAuth>,
    pub timeout: Duration,
}

#[derive(Default)]
pub struct MockNetwork {
    reply: String,
    chunks: Vec<String>,
    failure: Option<(u16, String)>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockNetwork {
    /// Answers every non-streamed exchange with `body`.
    pub fn replying(body: impl Into<String>) -> Self {
        Self {
            reply: body.into(),
            ..Default::default()
        }
    }

    /// Delivers `chunks` in order to the callback of a streamed exchange.
    pub fn streaming(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Fails every exchange with the given status.
    pub fn failing(status: u16, body: impl Into<String>) -> Self {
        Self {
            failure: Some((status, body.into())),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.body).collect()
    }
}

impl Network for MockNetwork {
    fn request(&self, request: NetworkRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().expect("requests lock").push(Recorded {
            method: request.method.to_string(),
            url: request.url(),
            content_type: request.content_type.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
            streamed: request.callback.is_some(),
            proxies: request.proxies.clone(),
            proxy_auth: request.proxy_auth.clone(),
            timeout: request.timeout,
        });

        if let Some((status, body)) = &self.failure {
            return Err(TransportError::Status {
                status: *status,
                body: body.clone(),
            });
        }

        match request.callback {
            Some(mut callback) => {
                let id = StreamId::next();
                for chunk in &self.chunks {
                    if !callback.call(chunk, id) {
                        return Err(TransportError::Aborted);
                    }
                }
                Ok(RawResponse {
                    status: 200,
                    body: self.chunks.concat(),
                })
            }
            None => Ok(RawResponse {
                status: 200,
                body: self.reply.clone(),
            }),
        }
    }
}

pub const HELLO: &str = r#"{"id":"resp_1","status":"completed","output":[{"type":"message","content":[{"type":"output_text","text":"hello"}]}]}"#;

/// A streamed body split mid-frame across chunks.
pub const STREAM_CHUNKS: [&str; 4] = [
    "event: response.output_text.delta\ndata: {\"type\":\"response.output_text.delta\",\"delta\":\"hel\"}\n\n",
    "event: response.output_text.delta\ndata: {\"type\":\"response.output_text.delta\",\"del",
    "ta\":\"lo\"}\n\n",
    "event: response.completed\ndata: {\"type\":\"response.completed\",\"response\":{\"id\":\"resp_2\",\"status\":\"completed\",\"output\":[{\"type\":\"message\",\"content\":[{\"type\":\"output_text\",\"text\":\"hello\"}]}]}}\n\n",
];
