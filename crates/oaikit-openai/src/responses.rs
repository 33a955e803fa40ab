use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use oaikit_auth::Authorization;
use oaikit_llm::{
    Error, ResponseEnvelope, ResponseInput, ResponseOptions, ResponseRequest, Result,
    StreamCallback, decode_events, terminal_response, to_wire_body,
};
use reqwest::Method;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::network::{Network, NetworkRequest};

/// Path of the create-response endpoint, relative to the service root.
pub const RESPONSES_PATH: &str = "/responses";

const CONTENT_TYPE_JSON: &str = "application/json";

struct ResponsesState {
    root: String,
    auth: Arc<dyn Authorization>,
    network: Arc<dyn Network>,
}

/// Dispatcher for the create-response endpoint.
///
/// Cloning is cheap; clones share the root, authorization source and
/// transport.
#[derive(Clone)]
pub struct Responses {
    state: Arc<ResponsesState>,
}

impl Responses {
    pub fn new(
        root: impl Into<String>,
        auth: Arc<dyn Authorization>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            state: Arc::new(ResponsesState {
                root: root.into(),
                auth,
                network,
            }),
        }
    }

    pub fn root(&self) -> &str {
        &self.state.root
    }

    /// Build the canonical request document without sending it.
    pub fn build_request(
        model: impl Into<String>,
        input: impl Into<ResponseInput>,
        options: ResponseOptions,
    ) -> Result<ResponseRequest> {
        oaikit_llm::build_request(model, input, options)
    }

    /// Build a request from typed arguments and send it.
    ///
    /// `stream: true` is set exactly when `stream` is given; any `stream`
    /// value in `options` is replaced.
    pub fn create(
        &self,
        model: impl Into<String>,
        input: impl Into<ResponseInput>,
        mut options: ResponseOptions,
        stream: Option<StreamCallback>,
    ) -> Result<ResponseEnvelope> {
        options.stream = stream.is_some().then_some(true);
        let request = Self::build_request(model, input, options)?;
        self.create_raw(&request.into_value(), stream)
    }

    /// Send a complete request document as-is.
    ///
    /// With a callback, every chunk of the body is delivered to it before this
    /// returns, and the envelope holds the `response` object of the last
    /// terminal stream event (`null` when there is none). A streamed body that
    /// cannot be decoded as server-sent events is an [`Error::Sse`].
    pub fn create_raw(
        &self,
        request: &Value,
        stream: Option<StreamCallback>,
    ) -> Result<ResponseEnvelope> {
        let body = to_wire_body(request)?;
        let snapshot = self.state.auth.snapshot();
        let streaming = stream.is_some();
        let model = request.get("model").and_then(Value::as_str).unwrap_or("");

        tracing::debug!(
            root = %self.state.root,
            model,
            streaming,
            bytes = body.len(),
            "dispatching create response"
        );

        let raw = self
            .state
            .network
            .request(NetworkRequest {
                method: Method::POST,
                root: self.state.root.clone(),
                path: RESPONSES_PATH.to_string(),
                content_type: CONTENT_TYPE_JSON.to_string(),
                headers: snapshot.headers,
                body,
                callback: stream,
                proxies: snapshot.proxies,
                proxy_auth: snapshot.proxy_auth,
                timeout: snapshot.timeout,
            })
            .map_err(Error::from)
            .inspect_err(|e| tracing::warn!(model, error = %e, "create response failed"))?;

        if !streaming {
            return ResponseEnvelope::from_body(&raw.body)
                .inspect_err(|e| tracing::warn!(model, error = %e, "response body is not json"));
        }

        let events = decode_events(&raw.body)
            .inspect_err(|e| tracing::warn!(model, error = %e, "streamed body is not valid sse"))?;
        let response = terminal_response(&events).cloned().unwrap_or(Value::Null);
        Ok(ResponseEnvelope::new(response))
    }

    /// [`create`](Self::create) on tokio's blocking pool. Request validation
    /// also happens there, so argument errors surface on await.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create_async(
        &self,
        model: impl Into<String>,
        input: impl Into<ResponseInput>,
        options: ResponseOptions,
        stream: Option<StreamCallback>,
    ) -> ResponseFuture {
        let this = self.clone();
        let model = model.into();
        let input = input.into();
        ResponseFuture::spawn(move || this.create(model, input, options, stream))
    }

    /// [`create_raw`](Self::create_raw) on tokio's blocking pool.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create_raw_async(
        &self,
        request: Value,
        stream: Option<StreamCallback>,
    ) -> ResponseFuture {
        let this = self.clone();
        ResponseFuture::spawn(move || this.create_raw(&request, stream))
    }
}

impl std::fmt::Debug for Responses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responses")
            .field("root", &self.state.root)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Async handle
// ---------------------------------------------------------------------------

/// A create call running in the background. Resolves to exactly what the
/// synchronous call would have returned.
#[must_use = "the call runs regardless, but its result is lost unless awaited"]
pub struct ResponseFuture {
    handle: JoinHandle<Result<ResponseEnvelope>>,
}

impl ResponseFuture {
    fn spawn(call: impl FnOnce() -> Result<ResponseEnvelope> + Send + 'static) -> Self {
        Self {
            handle: tokio::task::spawn_blocking(call),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for ResponseFuture {
    type Output = Result<ResponseEnvelope>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(Error::Task(e.to_string())),
        })
    }
}

impl std::fmt::Debug for ResponseFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseFuture")
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}
