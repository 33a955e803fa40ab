use serde_json::{Map, Value, json};

use crate::capabilities::{ModelCapabilities, SystemRole};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The `input` of a request: plain text or an ordered list of items.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseInput {
    Text(String),
    Items(Vec<Value>),
}

impl ResponseInput {
    fn is_empty(&self) -> bool {
        match self {
            ResponseInput::Text(text) => text.is_empty(),
            ResponseInput::Items(items) => items.is_empty(),
        }
    }

    fn into_value(self) -> Value {
        match self {
            ResponseInput::Text(text) => Value::String(text),
            ResponseInput::Items(items) => Value::Array(items),
        }
    }
}

impl From<&str> for ResponseInput {
    fn from(text: &str) -> Self {
        ResponseInput::Text(text.to_string())
    }
}

impl From<String> for ResponseInput {
    fn from(text: String) -> Self {
        ResponseInput::Text(text)
    }
}

impl From<Vec<Value>> for ResponseInput {
    fn from(items: Vec<Value>) -> Self {
        ResponseInput::Items(items)
    }
}

impl From<Vec<InputItem>> for ResponseInput {
    fn from(items: Vec<InputItem>) -> Self {
        ResponseInput::Items(items.iter().map(InputItem::to_value).collect())
    }
}

/// Typed helpers for the common input item shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum InputItem {
    Message {
        role: Role,
        content: Vec<InputContent>,
    },
    /// The result of a tool call, replayed as input.
    FunctionCallOutput { call_id: String, output: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Developer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Developer => "developer",
        }
    }
}

impl From<SystemRole> for Role {
    fn from(role: SystemRole) -> Self {
        match role {
            SystemRole::System => Role::System,
            SystemRole::Developer => Role::Developer,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputContent {
    InputText { text: String },
    InputImage { image_url: String },
    /// Assistant output replayed as input.
    OutputText { text: String },
}

impl InputItem {
    pub fn message(role: Role, text: impl Into<String>) -> Self {
        let text = text.into();
        let content = match role {
            Role::Assistant => InputContent::OutputText { text },
            _ => InputContent::InputText { text },
        };
        InputItem::Message {
            role,
            content: vec![content],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::message(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::message(Role::Assistant, text)
    }

    /// A system-level message using the role label the model prefers.
    pub fn instructions(caps: &ModelCapabilities, text: impl Into<String>) -> Self {
        Self::message(caps.default_system_role.into(), text)
    }

    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        InputItem::FunctionCallOutput {
            call_id: call_id.into(),
            output: output.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            InputItem::Message { role, content } => json!({
                "type": "message",
                "role": role.as_str(),
                "content": content.iter().map(InputContent::to_value).collect::<Vec<_>>(),
            }),
            InputItem::FunctionCallOutput { call_id, output } => json!({
                "type": "function_call_output",
                "call_id": call_id,
                "output": output,
            }),
        }
    }
}

impl InputContent {
    pub fn to_value(&self) -> Value {
        match self {
            InputContent::InputText { text } => json!({ "type": "input_text", "text": text }),
            InputContent::InputImage { image_url } => {
                json!({ "type": "input_image", "image_url": image_url })
            }
            InputContent::OutputText { text } => json!({ "type": "output_text", "text": text }),
        }
    }
}

// ---------------------------------------------------------------------------
// Typed option values
// ---------------------------------------------------------------------------

/// Reasoning effort level for o-series / gpt-5 models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningEffort {
    None,
    Minimal,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasoningEffort::None => "none",
            ReasoningEffort::Minimal => "minimal",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl From<ReasoningEffort> for Value {
    fn from(effort: ReasoningEffort) -> Self {
        json!({ "effort": effort.as_str() })
    }
}

/// Controls how the model selects tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    None,
    Required,
    /// Force calling a specific function by name.
    Function(String),
}

impl From<ToolChoice> for Value {
    fn from(choice: ToolChoice) -> Self {
        match choice {
            ToolChoice::Auto => json!("auto"),
            ToolChoice::None => json!("none"),
            ToolChoice::Required => json!("required"),
            ToolChoice::Function(name) => json!({ "type": "function", "name": name }),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Optional request fields. Every `None` is left out of the wire document.
///
/// ```
/// use oaikit_llm::{ReasoningEffort, ResponseOptions};
///
/// let mut options = ResponseOptions::default();
/// options
///     .instructions("Answer in one sentence.")
///     .reasoning(ReasoningEffort::Low)
///     .max_output_tokens(256);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseOptions {
    pub instructions: Option<String>,
    pub reasoning: Option<Value>,
    pub text: Option<Value>,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub seed: Option<u32>,
    pub tools: Option<Value>,
    pub tool_choice: Option<Value>,
    pub parallel_tool_calls: Option<bool>,
    pub store: Option<bool>,
    pub previous_response_id: Option<String>,
    pub include: Option<Value>,
    pub metadata: Option<Value>,
    pub user: Option<String>,
    pub truncation: Option<String>,
    pub stream: Option<bool>,
}

impl ResponseOptions {
    pub fn instructions(&mut self, instructions: impl Into<String>) -> &mut Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Accepts a [`ReasoningEffort`] or a raw reasoning object.
    pub fn reasoning(&mut self, reasoning: impl Into<Value>) -> &mut Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn text(&mut self, text: impl Into<Value>) -> &mut Self {
        self.text = Some(text.into());
        self
    }

    pub fn max_output_tokens(&mut self, n: u32) -> &mut Self {
        self.max_output_tokens = Some(n);
        self
    }

    pub fn temperature(&mut self, t: f64) -> &mut Self {
        self.temperature = Some(t);
        self
    }

    pub fn top_p(&mut self, p: f64) -> &mut Self {
        self.top_p = Some(p);
        self
    }

    pub fn seed(&mut self, seed: u32) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    pub fn tools(&mut self, tools: impl Into<Value>) -> &mut Self {
        self.tools = Some(tools.into());
        self
    }

    /// Accepts a [`ToolChoice`] or a raw tool choice value.
    pub fn tool_choice(&mut self, choice: impl Into<Value>) -> &mut Self {
        self.tool_choice = Some(choice.into());
        self
    }

    pub fn parallel_tool_calls(&mut self, enabled: bool) -> &mut Self {
        self.parallel_tool_calls = Some(enabled);
        self
    }

    pub fn store(&mut self, store: bool) -> &mut Self {
        self.store = Some(store);
        self
    }

    pub fn previous_response_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.previous_response_id = Some(id.into());
        self
    }

    pub fn include<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|field| Value::String(field.into()))
            .collect();
        self.include = Some(Value::Array(fields));
        self
    }

    pub fn metadata(&mut self, metadata: impl Into<Value>) -> &mut Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn user(&mut self, user: impl Into<String>) -> &mut Self {
        self.user = Some(user.into());
        self
    }

    pub fn truncation(&mut self, truncation: impl Into<String>) -> &mut Self {
        self.truncation = Some(truncation.into());
        self
    }

    pub fn stream(&mut self, stream: bool) -> &mut Self {
        self.stream = Some(stream);
        self
    }
}

// ---------------------------------------------------------------------------
// Canonical request document
// ---------------------------------------------------------------------------

/// The canonical request document: `model`, `input`, and exactly the
/// optional keys the caller set, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRequest {
    fields: Map<String, Value>,
}

impl ResponseRequest {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<ResponseRequest> for Value {
    fn from(request: ResponseRequest) -> Self {
        request.into_value()
    }
}

/// Build the canonical request document.
///
/// Fails with [`Error::InvalidArgument`] when `model` is empty, `input` is
/// empty text or an empty item list, or `temperature`/`top_p` is not finite
/// (JSON has no NaN or infinity). Capability mismatches (e.g. a
/// temperature on a reasoning model) are not checked here.
pub fn build_request(
    model: impl Into<String>,
    input: impl Into<ResponseInput>,
    options: ResponseOptions,
) -> Result<ResponseRequest> {
    let model = model.into();
    let input = input.into();

    if model.is_empty() {
        return Err(Error::InvalidArgument("model must not be empty".into()));
    }
    if input.is_empty() {
        return Err(Error::InvalidArgument("input must not be empty".into()));
    }
    for (name, value) in [("temperature", options.temperature), ("top_p", options.top_p)] {
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(Error::InvalidArgument(format!("{name} must be finite")));
        }
    }

    let mut fields = Map::new();
    fields.insert("model".into(), Value::String(model));
    fields.insert("input".into(), input.into_value());

    let ResponseOptions {
        instructions,
        reasoning,
        text,
        max_output_tokens,
        temperature,
        top_p,
        seed,
        tools,
        tool_choice,
        parallel_tool_calls,
        store,
        previous_response_id,
        include,
        metadata,
        user,
        truncation,
        stream,
    } = options;

    put(&mut fields, "instructions", instructions);
    put(&mut fields, "reasoning", reasoning);
    put(&mut fields, "text", text);
    put(&mut fields, "max_output_tokens", max_output_tokens);
    put(&mut fields, "temperature", temperature);
    put(&mut fields, "top_p", top_p);
    put(&mut fields, "seed", seed);
    put(&mut fields, "tools", tools);
    put(&mut fields, "tool_choice", tool_choice);
    put(&mut fields, "parallel_tool_calls", parallel_tool_calls);
    put(&mut fields, "store", store);
    put(&mut fields, "previous_response_id", previous_response_id);
    put(&mut fields, "include", include);
    put(&mut fields, "metadata", metadata);
    put(&mut fields, "user", user);
    put(&mut fields, "truncation", truncation);
    put(&mut fields, "stream", stream);

    Ok(ResponseRequest { fields })
}

fn put<T: Into<Value>>(fields: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        fields.insert(key.to_string(), value.into());
    }
}

/// Serialize a request document for the wire: pretty-printed, 4-space
/// indent, keys in insertion order.
pub fn to_wire_body(request: &Value) -> Result<String> {
    use serde::Serialize;

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    request.serialize(&mut serializer)?;
    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}
