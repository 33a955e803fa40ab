//! The transport seam: one HTTP exchange per [`NetworkRequest`].

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use oaikit_auth::{Proxies, ProxyAuth};
use oaikit_llm::{StreamCallback, StreamId, TransportError};
use reqwest::Method;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;

const READ_BUFFER: usize = 8 * 1024;

/// Everything a transport needs to perform one exchange.
#[derive(Debug)]
pub struct NetworkRequest {
    pub method: Method,
    pub root: String,
    pub path: String,
    pub content_type: String,
    pub headers: HashMap<String, String>,
    pub body: String,
    /// Receives the body chunk by chunk when set.
    pub callback: Option<StreamCallback>,
    pub proxies: Proxies,
    pub proxy_auth: Option<ProxyAuth>,
    pub timeout: Duration,
}

impl NetworkRequest {
    /// `root` and `path` joined with exactly one slash.
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.root.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

/// A completed exchange. For streamed exchanges `body` holds every chunk
/// delivered to the callback, concatenated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Performs HTTP exchanges. Blocks the calling thread until the exchange
/// completes, fails or is aborted by the callback.
pub trait Network: Send + Sync {
    fn request(&self, request: NetworkRequest) -> Result<RawResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

/// [`Network`] backed by `reqwest::blocking`.
///
/// A client is built inside every call from that call's proxy and timeout
/// settings, so nothing blocking outlives the call. Called from a thread
/// inside a tokio runtime, the exchange runs on a short-lived helper thread
/// and the caller blocks until it finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpNetwork;

impl HttpNetwork {
    pub fn new() -> Self {
        Self
    }

    fn client(request: &NetworkRequest) -> Result<Client, TransportError> {
        let mut builder = Client::builder().timeout(request.timeout);
        for (scheme, url) in request.proxies.iter() {
            let proxy = match scheme {
                "http" => reqwest::Proxy::http(url),
                "https" => reqwest::Proxy::https(url),
                _ => reqwest::Proxy::all(url),
            }
            .map_err(|e| TransportError::Connect(format!("invalid proxy {url}: {e}")))?;
            let proxy = match &request.proxy_auth {
                Some(auth) => proxy.basic_auth(&auth.username, &auth.password),
                None => proxy,
            };
            builder = builder.proxy(proxy);
        }
        builder.build().map_err(|e| map_error(e, request.timeout))
    }

    fn exchange(mut request: NetworkRequest) -> Result<RawResponse, TransportError> {
        let client = Self::client(&request)?;
        let url = request.url();

        let mut builder = client
            .request(request.method.clone(), &url)
            .header(CONTENT_TYPE, request.content_type.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder
            .body(std::mem::take(&mut request.body))
            .send()
            .map_err(|e| map_error(e, request.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::debug!(%url, status = status.as_u16(), "non-success status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = match request.callback.as_mut() {
            Some(callback) => read_streamed(&mut response, callback, request.timeout)?,
            None => response
                .text()
                .map_err(|e| map_error(e, request.timeout))?,
        };

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}

impl Network for HttpNetwork {
    fn request(&self, request: NetworkRequest) -> Result<RawResponse, TransportError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Self::exchange(request);
        }
        // The blocking client runs a runtime of its own, which tokio will not
        // start or drop on a thread that is inside a runtime.
        std::thread::scope(|scope| {
            match scope.spawn(move || Self::exchange(request)).join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        })
    }
}

/// Read the body in chunks, handing each decoded piece to the callback.
/// Returning early drops `response`, which closes the connection.
fn read_streamed(
    response: &mut Response,
    callback: &mut StreamCallback,
    timeout: Duration,
) -> Result<String, TransportError> {
    let id = StreamId::next();
    let mut buf = [0u8; READ_BUFFER];
    let mut pending = Vec::new();
    let mut body = String::new();

    loop {
        let n = match response.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                return Err(TransportError::Timeout(timeout));
            }
            Err(e) => return Err(TransportError::Http(Box::new(e))),
        };
        if n == 0 {
            break;
        }
        pending.extend_from_slice(&buf[..n]);
        let chunk = take_utf8(&mut pending, false);
        if !deliver(&chunk, callback, id, &mut body) {
            tracing::debug!(%id, received = body.len(), "stream aborted by callback");
            return Err(TransportError::Aborted);
        }
    }

    let rest = take_utf8(&mut pending, true);
    if !deliver(&rest, callback, id, &mut body) {
        return Err(TransportError::Aborted);
    }
    Ok(body)
}

fn deliver(chunk: &str, callback: &mut StreamCallback, id: StreamId, body: &mut String) -> bool {
    if chunk.is_empty() {
        return true;
    }
    tracing::trace!(%id, bytes = chunk.len(), "stream chunk");
    body.push_str(chunk);
    callback.call(chunk, id)
}

/// Decode `pending` as far as possible, replacing each invalid sequence with
/// U+FFFD. An incomplete trailing sequence stays buffered unless `flush` is
/// set.
fn take_utf8(pending: &mut Vec<u8>, flush: bool) -> String {
    let mut text = String::new();
    let mut start = 0;
    while start < pending.len() {
        let rest = &pending[start..];
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                text.push_str(valid);
                start = pending.len();
            }
            Err(e) => {
                let valid_end = start + e.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&pending[start..valid_end]));
                match e.error_len() {
                    Some(invalid) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        start = valid_end + invalid;
                    }
                    None if flush => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        start = pending.len();
                    }
                    None => {
                        start = valid_end;
                        break;
                    }
                }
            }
        }
    }
    pending.drain(..start);
    text
}

fn map_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Http(Box::new(err))
    }
}
