//! Shared data structures modeling chat, image-generation, and model-listing
//! calls.
//!
//! These types normalize provider-specific payloads so the rest of the crate
//! can stay agnostic of individual API differences.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat role string compatible with provider-specific semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub String);

impl Role {
    pub fn system() -> Self {
        Self("system".to_string())
    }

    pub fn user() -> Self {
        Self("user".to_string())
    }

    pub fn assistant() -> Self {
        Self("assistant".to_string())
    }
}

/// Normalized chat message shared across providers.
///
/// Each message bundles a [`Role`], optional name, and a sequence of
/// [`ContentPart`] entries so callers can mix text, images, or tool directives
/// in a single request.
///
/// # Examples
///
/// ```
/// # use katachi::types::{ContentPart, Message, Role, TextContent};
/// let msg = Message {
///     role: Role::user(),
///     name: Some("alice".into()),
///     content: vec![ContentPart::Text(TextContent { text: "Hello".into() })],
///     metadata: None,
/// };
/// assert_eq!(msg.content.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role associated with this message.
    pub role: Role,
    /// Optional vendor-specific name attribute.
    pub name: Option<String>,
    /// Content parts provided in order.
    #[serde(default)]
    pub content: Vec<ContentPart>,
    /// Arbitrary metadata forwarded to providers.
    pub metadata: Option<HashMap<String, Value>>,
}

impl Message {
    /// Builds a single-text message for the given role.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            name: None,
            content: vec![ContentPart::Text(TextContent { text: text.into() })],
            metadata: None,
        }
    }
}

/// Content part covering text, images, tools, and vendor data.
///
/// Providers consume these variants when converting a [`Message`] into their
/// own JSON wire format. Use [`ContentPart::ToolCall`] and
/// [`ContentPart::ToolResult`] when implementing tool handoffs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content variant.
    Text(TextContent),
    /// Image content variant.
    Image(ImageContent),
    /// Tool invocation emitted by the assistant.
    ToolCall(ToolCall),
    /// Tool execution result authored by the tool role.
    ToolResult(ToolResult),
    /// Vendor-defined or opaque content payload.
    Data { data: Value },
}

/// Textual content payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    /// Plain UTF-8 text.
    pub text: String,
}

/// Image payload compatible with OpenAI and Anthropic semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageContent {
    /// Source describing where the image bytes come from.
    pub source: ImageSource,
    /// Optional detail hints such as OpenAI detail levels.
    pub detail: Option<ImageDetail>,
    /// Additional metadata forwarded verbatim.
    pub metadata: Option<HashMap<String, Value>>,
}

/// Source for an image input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    /// Public URL accessible by the provider.
    Url { url: String },
    /// Base64-encoded inline payload.
    Base64 {
        data: String,
        mime_type: Option<String>,
    },
    /// Provider-managed file identifier.
    FileId { file_id: String },
}

/// Detail preset requested for image inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageDetail {
    Low,
    High,
    Auto,
}

/// Declarative definition of a tool available to the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name exposed to the model.
    pub name: String,
    /// Natural-language description of the tool purpose.
    pub description: Option<String>,
    /// Optional JSON Schema describing the input payload.
    pub input_schema: Option<Value>,
    /// Category of the tool implementation.
    pub kind: ToolKind,
    /// Provider-specific metadata forwarded untouched.
    pub metadata: Option<HashMap<String, Value>>,
}

/// Enumerates supported tool kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolKind {
    /// Custom function definition.
    Function,
    /// Provider-specific extension with optional configuration.
    Custom { name: String, config: Option<Value> },
}

/// Tool call emitted inside a chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-supplied invocation identifier.
    pub id: Option<String>,
    /// Unique name exposed to the model.
    pub name: String,
    /// Structured arguments serialized as JSON.
    pub arguments: Value,
    /// Category of the tool implementation.
    pub kind: ToolCallKind,
}

/// Tool call categories for responses and streaming deltas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolCallKind {
    /// Function call.
    Function,
    /// Provider-defined custom call type.
    Custom { name: String },
}

/// Result returned by a tool execution step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Correlated call identifier.
    pub call_id: Option<String>,
    /// JSON payload returned by the tool.
    pub output: Value,
    /// Indicates whether the tool reported an error.
    #[serde(default)]
    pub is_error: bool,
    /// Optional metadata such as captured stdio.
    pub metadata: Option<HashMap<String, Value>>,
}

/// Chat request shared across all providers.
///
/// Populate `messages`, configure [`ChatOptions`], and optionally attach tool
/// definitions or response-format hints before passing it to
/// [`crate::client::LLMClient::chat`].
///
/// # Examples
///
/// ```
/// # use katachi::types::{ChatRequest, ChatOptions, Message, Role};
/// let request = ChatRequest {
///     messages: vec![
///         Message::text(Role::system(), "You are concise."),
///         Message::text(Role::user(), "Summarize Rust traits."),
///     ],
///     options: ChatOptions { temperature: Some(0.3), ..Default::default() },
///     tools: Vec::new(),
///     tool_choice: None,
///     response_format: None,
///     metadata: None,
/// };
/// assert_eq!(request.messages.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Ordered list of messages to send.
    pub messages: Vec<Message>,
    /// Fine-grained chat options.
    #[serde(default)]
    pub options: ChatOptions,
    /// Tool definitions available to the assistant.
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    /// Strategy describing how tools may be invoked.
    pub tool_choice: Option<ToolChoice>,
    /// Optional response-formatting requirements.
    pub response_format: Option<ResponseFormat>,
    /// Vendor-specific metadata forwarded untouched.
    pub metadata: Option<HashMap<String, Value>>,
}

impl ChatRequest {
    /// Builds a minimal single-turn request from one user prompt.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::text(Role::user(), prompt)],
            options: ChatOptions::default(),
            tools: Vec::new(),
            tool_choice: None,
            response_format: None,
            metadata: None,
        }
    }
}

/// Tunable chat options supported across providers.
///
/// Every field is optional so callers only set knobs they care about.
/// Providers ignore unknown fields or fall back to their documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatOptions {
    /// Optional model identifier override.
    pub model: Option<String>,
    /// Sampling temperature, typically within `0.0..=2.0`.
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter where `1.0` disables the filter.
    pub top_p: Option<f32>,
    /// Maximum number of output tokens returned by the provider.
    pub max_output_tokens: Option<u32>,
    /// Encourages models to talk about new topics (`-2.0..=2.0`).
    pub presence_penalty: Option<f32>,
    /// Discourages repeating identical tokens (`-2.0..=2.0`).
    pub frequency_penalty: Option<f32>,
    /// Whether providers may execute tool calls in parallel.
    pub parallel_tool_calls: Option<bool>,
    /// Additional provider-specific options (service tiers, stop sequences, etc.).
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

/// Tool-choice strategies supported across providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Provider decides when to call tools.
    Auto,
    /// Provider must invoke at least one tool.
    Any,
    /// Tools are disabled for the request.
    None,
    /// Force a specific tool by name.
    Tool { name: String },
    /// Custom serialized configuration passed directly to the provider.
    Custom(Value),
}

/// Response-formatting modes supported by providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free-form text output.
    Text,
    /// Structured JSON object.
    JsonObject,
    /// JSON Schema constrained output.
    JsonSchema { schema: Value },
    /// Provider-specific response descriptor.
    Custom(Value),
}

/// Aggregated chat response returned by a provider.
///
/// Responses carry a list of [`OutputItem`]s (messages, tool calls, etc.) plus
/// optional token usage and finish metadata, mirroring the union of OpenAI and
/// Anthropic style payloads while remaining provider-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Outputs produced by the model (messages, tools, etc.).
    pub outputs: Vec<OutputItem>,
    /// Token usage accounting.
    pub usage: Option<TokenUsage>,
    /// Why the response stopped.
    pub finish_reason: Option<FinishReason>,
    /// Effective model identifier reported by the provider.
    pub model: Option<String>,
    /// Metadata about the provider invocation.
    pub provider: ProviderMetadata,
}

impl ChatResponse {
    /// Returns the first text block produced by the assistant, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.outputs.iter().find_map(|item| match item {
            OutputItem::Message { message, .. } => {
                message.content.iter().find_map(|part| match part {
                    ContentPart::Text(TextContent { text }) => Some(text.as_str()),
                    _ => None,
                })
            }
            _ => None,
        })
    }
}

/// Individual output entry emitted by the provider.
///
/// The `index` mirrors upstream array indices so streaming deltas can be
/// merged deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputItem {
    /// Completed assistant message.
    Message { message: Message, index: usize },
    /// Tool invocation emitted by the assistant.
    ToolCall { call: ToolCall, index: usize },
    /// Tool execution result authored by the tool role.
    ToolResult { result: ToolResult, index: usize },
    /// Provider-specific payload.
    Custom { data: Value, index: usize },
}

/// Streaming chunk representing incremental response data.
///
/// Streaming transports emit one or more chunks until `is_terminal` becomes
/// `true`. Consumers should aggregate [`ChatEvent`] entries in order and
/// finalize once the terminal chunk arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Incremental events produced by streaming responses.
    pub events: Vec<ChatEvent>,
    /// Optional real-time token usage updates.
    pub usage: Option<TokenUsage>,
    /// Indicates whether this is the terminal chunk.
    pub is_terminal: bool,
    /// Metadata about the provider invocation.
    pub provider: ProviderMetadata,
}

/// Streaming event emitted as part of a [`ChatChunk`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Text delta.
    MessageDelta(MessageDelta),
    /// Tool-call delta.
    ToolCallDelta(ToolCallDelta),
    /// Provider-specific raw event.
    Custom { data: Value },
}

/// Delta describing textual content generated so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDelta {
    /// Target message index within the response.
    pub index: usize,
    /// Optional role override.
    pub role: Option<Role>,
    /// Incremental content fragments.
    pub content: Vec<ContentDelta>,
    /// Why the response stopped.
    pub finish_reason: Option<FinishReason>,
}

/// Variants for streamed content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    /// Text fragment appended to the message.
    Text { text: String },
    /// Rich JSON fragment.
    Json { value: Value },
}

/// Delta describing the ongoing tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Tool call index.
    pub index: usize,
    /// Streaming identifier assigned by the provider.
    pub id: Option<String>,
    /// Unique name exposed to the model.
    pub name: Option<String>,
    /// Arguments appended so far.
    pub arguments_delta: Option<String>,
    /// Category of the tool implementation.
    pub kind: Option<ToolCallKind>,
    /// Indicates whether the call finished.
    pub is_finished: bool,
}

/// Token usage metrics collected from the provider.
///
/// Providers often emit partial usage in streaming mode; consumers can merge
/// the optional values as they arrive.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    /// prompt tokens
    pub prompt_tokens: Option<u64>,
    /// completion tokens
    pub completion_tokens: Option<u64>,
    /// reasoning tokens
    pub reasoning_tokens: Option<u64>,
    /// Total tokens across prompt, completion, and reasoning.
    pub total_tokens: Option<u64>,
    /// Provider-specific accounting details.
    pub details: Option<HashMap<String, Value>>,
}

/// Why a chat response stopped generating content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error,
    Other(String),
}

/// Provider metadata returned with each response.
///
/// Use this structure to correlate logs, surface request IDs to clients, or
/// surface endpoint information during incident triage.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Provider identifier such as `openai`.
    pub provider: String,
    /// Upstream request identifier.
    pub request_id: Option<String>,
    /// Endpoint description or URL.
    pub endpoint: Option<String>,
    /// Raw response excerpt for debugging.
    pub raw: Option<Value>,
}

/// Capability descriptor used to filter providers at runtime.
///
/// [`crate::client::LLMClient`] exposes capability lookups so applications can
/// pick compatible providers before dispatching a request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CapabilityDescriptor {
    /// Whether the provider supports streaming outputs.
    pub supports_stream: bool,
    /// Whether image inputs are supported.
    pub supports_image_input: bool,
    /// Whether image generation is supported.
    pub supports_image_generation: bool,
    /// Whether model listing is supported.
    pub supports_model_listing: bool,
    /// Whether tool calls are supported.
    pub supports_tools: bool,
    /// Whether structured JSON output is available.
    pub supports_structured_output: bool,
    /// Whether parallel tool calls are supported.
    pub supports_parallel_tool_calls: bool,
}

/// One entry returned by a provider's model listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Exact model identifier usable in requests.
    pub id: String,
    /// Creation timestamp (Unix seconds) when reported.
    pub created: Option<u64>,
    /// Owning organization when reported.
    pub owned_by: Option<String>,
    /// Human-readable display name when reported.
    pub display_name: Option<String>,
    /// Context window in tokens, from the local model table when known.
    pub context_window: Option<u32>,
}

/// Image generation request shared across providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Natural-language description of the desired image.
    pub prompt: String,
    /// Optional model identifier override.
    pub model: Option<String>,
    /// Number of images to generate; provider default when unset.
    pub count: Option<u8>,
    /// Dimension preset such as `1024x1024`.
    pub size: Option<String>,
    /// Quality preset such as `standard` or `hd`.
    pub quality: Option<String>,
    /// Additional provider-specific options forwarded untouched.
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl ImageRequest {
    /// Builds a request with only the prompt set.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            count: None,
            size: None,
            quality: None,
            extra: HashMap::new(),
        }
    }
}

/// Aggregated image generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    /// Generated images in provider order.
    pub images: Vec<GeneratedImage>,
    /// Effective model identifier reported by the provider.
    pub model: Option<String>,
    /// Metadata about the provider invocation.
    pub provider: ProviderMetadata,
}

/// One generated image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Where the image bytes live.
    pub payload: ImagePayload,
    /// Prompt rewrite applied by the provider, if any.
    pub revised_prompt: Option<String>,
}

/// Delivery channel for generated image bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImagePayload {
    /// Short-lived download URL.
    Url { url: String },
    /// Base64-encoded image bytes.
    Base64 { data: String },
}
