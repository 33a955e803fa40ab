//! # oaikit-llm
//!
//! Transport-agnostic building blocks for the Responses API:
//!
//! - [`capabilities`]: which parameters a model family accepts.
//! - [`request`]: the canonical request document and its option object.
//! - [`response`]: a tolerant envelope around the raw response document.
//! - [`stream`]: the streaming callback contract and SSE event decoding.

pub mod capabilities;
pub mod error;
pub mod request;
pub mod response;
pub mod stream;

pub use capabilities::{ModelCapabilities, SystemRole, is_reasoning_model, resolve};
pub use error::{Error, Result, TransportError};
pub use request::{
    InputContent, InputItem, ReasoningEffort, ResponseInput, ResponseOptions, ResponseRequest,
    Role, ToolChoice, build_request, to_wire_body,
};
pub use response::{ResponseEnvelope, Usage};
pub use stream::{
    StreamCallback, StreamDecoder, StreamEvent, StreamId, decode_events, terminal_response,
};
