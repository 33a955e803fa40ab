use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// The raw response document of one dispatch call, with tolerant accessors.
///
/// Nothing here fails on a document of unexpected shape: missing fields read
/// as `None` (or `Value::Null` through indexing).
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    raw: Value,
}

impl ResponseEnvelope {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// Parse a complete response body.
    pub fn from_body(body: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(body)?))
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn id(&self) -> Option<&str> {
        self.raw.get("id").and_then(Value::as_str)
    }

    pub fn status(&self) -> Option<&str> {
        self.raw.get("status").and_then(Value::as_str)
    }

    pub fn usage(&self) -> Option<Usage> {
        let usage = UsageObject::deserialize(self.raw.get("usage")?).ok()?;
        Some(Usage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
            reasoning_tokens: usage.output_tokens_details.and_then(|d| d.reasoning_tokens),
            cached_tokens: usage.input_tokens_details.and_then(|d| d.cached_tokens),
        })
    }

    /// The first non-empty `output_text` part of the first `message` item
    /// that has one.
    pub fn first_output_text(&self) -> Option<String> {
        let items = self.raw.get("output")?.as_array()?;
        items.iter().find_map(|item| match OutputItem::from_value(item) {
            OutputItem::Message { content } => content.iter().find_map(|part| {
                match OutputContent::from_value(part) {
                    OutputContent::OutputText { text } if !text.is_empty() => Some(text),
                    _ => None,
                }
            }),
            OutputItem::Unknown => None,
        })
    }

    /// The generated text, or the whole document rendered as a string when
    /// no `output_text` part exists.
    pub fn output_text(&self) -> String {
        self.first_output_text()
            .unwrap_or_else(|| self.to_string())
    }
}

impl From<Value> for ResponseEnvelope {
    fn from(raw: Value) -> Self {
        Self::new(raw)
    }
}

impl Index<&str> for ResponseEnvelope {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        &self.raw[key]
    }
}

impl fmt::Display for ResponseEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{:#}", self.raw)
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

/// Token accounting reported by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// Output shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        content: Vec<Value>,
    },
    #[serde(other)]
    Unknown,
}

impl OutputItem {
    fn from_value(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or(OutputItem::Unknown)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputContent {
    OutputText {
        text: String,
    },
    #[serde(other)]
    Unknown,
}

impl OutputContent {
    fn from_value(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or(OutputContent::Unknown)
    }
}

#[derive(Debug, Deserialize)]
struct UsageObject {
    input_tokens: u32,
    output_tokens: u32,
    #[serde(default)]
    total_tokens: Option<u32>,
    #[serde(default)]
    output_tokens_details: Option<OutputTokensDetails>,
    #[serde(default)]
    input_tokens_details: Option<InputTokensDetails>,
}

#[derive(Debug, Deserialize)]
struct OutputTokensDetails {
    reasoning_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct InputTokensDetails {
    cached_tokens: Option<u32>,
}
