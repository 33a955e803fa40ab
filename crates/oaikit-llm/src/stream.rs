//! The streaming callback contract and server-sent event decoding for the
//! Responses API.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde_json::Value;

use crate::error::{Error, Result};

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of one streaming exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u64);

impl StreamId {
    /// Allocate a process-unique identifier.
    pub fn next() -> Self {
        Self(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Receives each chunk of a streamed body as it arrives.
///
/// Returning `false` asks the transport to abort the exchange. Once that
/// happens the wrapped function is never invoked again.
pub struct StreamCallback {
    inner: Box<dyn FnMut(&str, StreamId) -> bool + Send>,
    stopped: bool,
}

impl StreamCallback {
    pub fn new(f: impl FnMut(&str, StreamId) -> bool + Send + 'static) -> Self {
        Self {
            inner: Box::new(f),
            stopped: false,
        }
    }

    /// Deliver one chunk. Returns whether the exchange should continue.
    pub fn call(&mut self, chunk: &str, id: StreamId) -> bool {
        if self.stopped {
            return false;
        }
        let keep_going = (self.inner)(chunk, id);
        if !keep_going {
            self.stopped = true;
        }
        keep_going
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl fmt::Debug for StreamCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCallback")
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A decoded Responses API stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// `response.output_text.delta`
    TextDelta(String),

    /// `response.reasoning_summary_text.delta`
    ReasoningDelta(String),

    /// `response.function_call_arguments.delta`
    FunctionCallArgumentsDelta {
        item_id: Option<String>,
        delta: String,
    },

    /// `response.output_item.added`
    OutputItemAdded(Value),

    /// `response.output_item.done`
    OutputItemDone(Value),

    /// `response.completed`, `response.incomplete` or `response.failed`,
    /// carrying the final response object.
    Finished { kind: String, response: Value },

    /// An `error` event.
    Error(String),

    /// Anything else (`response.created`, `response.in_progress`, ...).
    Other { kind: String, data: String },
}

impl StreamEvent {
    fn from_parts(kind: &str, data: &str) -> Self {
        let Ok(payload) = serde_json::from_str::<Value>(data) else {
            return StreamEvent::Other {
                kind: kind.to_string(),
                data: data.to_string(),
            };
        };

        // The payload's own `type` wins over the SSE `event:` line, which some
        // proxies strip.
        let kind = payload
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(kind)
            .to_string();
        let ty = kind.clone();

        match ty.as_str() {
            "response.output_text.delta" => StreamEvent::TextDelta(string_field(&payload, "delta")),
            "response.reasoning_summary_text.delta" => {
                StreamEvent::ReasoningDelta(string_field(&payload, "delta"))
            }
            "response.function_call_arguments.delta" => StreamEvent::FunctionCallArgumentsDelta {
                item_id: payload
                    .get("item_id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                delta: string_field(&payload, "delta"),
            },
            "response.output_item.added" => {
                StreamEvent::OutputItemAdded(payload.get("item").cloned().unwrap_or_default())
            }
            "response.output_item.done" => {
                StreamEvent::OutputItemDone(payload.get("item").cloned().unwrap_or_default())
            }
            "response.completed" | "response.incomplete" | "response.failed" => {
                match payload.get("response") {
                    Some(response) => StreamEvent::Finished {
                        response: response.clone(),
                        kind,
                    },
                    None => StreamEvent::Other {
                        kind,
                        data: data.to_string(),
                    },
                }
            }
            "error" => StreamEvent::Error(
                payload
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| data.to_string()),
            ),
            _ => StreamEvent::Other {
                kind,
                data: data.to_string(),
            },
        }
    }
}

fn string_field(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Decode a complete server-sent event body into typed events.
pub fn decode_events(body: &str) -> Result<Vec<StreamEvent>> {
    let source = futures::stream::iter([Ok::<_, std::convert::Infallible>(
        body.as_bytes().to_vec(),
    )]);
    let raw = futures::executor::block_on(source.eventsource().collect::<Vec<_>>());

    raw.into_iter()
        .map(|event| {
            let event = event.map_err(|e| Error::Sse(e.to_string()))?;
            Ok(StreamEvent::from_parts(&event.event, &event.data))
        })
        .collect()
}

/// The response object carried by the last terminal event, if any.
pub fn terminal_response(events: &[StreamEvent]) -> Option<&Value> {
    events.iter().rev().find_map(|event| match event {
        StreamEvent::Finished { response, .. } => Some(response),
        _ => None,
    })
}

/// Incremental decoder for use inside a [`StreamCallback`]: buffers chunks
/// and yields the events of every complete frame seen so far.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: String,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) -> Result<Vec<StreamEvent>> {
        self.pending.push_str(chunk);
        let Some(end) = last_frame_end(&self.pending) else {
            return Ok(Vec::new());
        };
        let complete: String = self.pending.drain(..end).collect();
        decode_events(&complete)
    }

    /// Decode whatever is still buffered, even without a closing blank line.
    pub fn finish(&mut self) -> Result<Vec<StreamEvent>> {
        if self.pending.trim().is_empty() {
            self.pending.clear();
            return Ok(Vec::new());
        }
        let mut rest = std::mem::take(&mut self.pending);
        rest.push_str("\n\n");
        decode_events(&rest)
    }
}

fn last_frame_end(buffer: &str) -> Option<usize> {
    let lf = buffer.rfind("\n\n").map(|i| i + 2);
    let crlf = buffer.rfind("\r\n\r\n").map(|i| i + 4);
    lf.max(crlf)
}
