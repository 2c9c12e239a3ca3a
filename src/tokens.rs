//! Token estimation heuristics plus static model metadata tables.
//!
//! The estimator favors simplicity over exact parity with vendor tokenizers,
//! so the returned counts are approximate but deterministic. Applications can
//! use it for budgeting requests, enforcing safety margins, or pre-validating
//! dynamic prompts before dispatching a network call. The context-window and
//! cost tables are keyed by exact model identifier.

use std::collections::HashMap;

use crate::types::{
    ChatRequest, ContentPart, ImageContent, ImageDetail, ResponseFormat, Role, TokenUsage,
};

/// Groups provider families that share similar tokenization characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// OpenAI-style tokenizer with ~4 ASCII chars per token.
    OpenAI,
    /// Anthropic Claude models, slightly denser on mixed locales.
    Anthropic,
}

/// Estimates token counts using provider-specific heuristics.
#[derive(Debug, Clone)]
pub struct TokenEstimator {
    provider_type: ProviderType,
}

impl TokenEstimator {
    /// Creates an estimator tuned to a specific provider family.
    pub fn new(provider_type: ProviderType) -> Self {
        Self { provider_type }
    }

    /// Returns the configured provider type.
    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    /// Estimates the number of tokens for a piece of text.
    ///
    /// The characters-per-token ratio interpolates between dense CJK-style
    /// text and sparse ASCII prose based on the observed ASCII share.
    pub fn estimate_text(&self, text: &str) -> usize {
        let mut total_chars = 0usize;
        let mut ascii_chars = 0usize;

        for ch in text.chars() {
            total_chars += 1;
            if ch.is_ascii() {
                ascii_chars += 1;
            }
        }

        if total_chars == 0 {
            return 0;
        }

        let ascii_ratio = ascii_chars as f64 / total_chars as f64;
        let chars_per_token = match self.provider_type {
            ProviderType::OpenAI => 2.0 + 2.0 * ascii_ratio,
            ProviderType::Anthropic => 2.1 + 1.9 * ascii_ratio,
        };

        ((total_chars as f64) / chars_per_token).ceil() as usize
    }

    /// Estimates the tokens for an entire chat request.
    ///
    /// The helper accounts for per-message framing overhead, content parts
    /// (text, images, tool payloads), tool definitions, and response-format
    /// hints. It returns a [`TokenEstimate`] exposing both the total and a
    /// per-role breakdown so callers can spot oversized messages quickly.
    ///
    /// # Examples
    ///
    /// ```
    /// # use katachi::tokens::{TokenEstimator, ProviderType};
    /// # use katachi::types::{ChatRequest, Message, Role};
    /// let mut request = ChatRequest::from_prompt("Explain enums");
    /// request.messages.insert(0, Message::text(Role::system(), "You are terse"));
    /// let estimate = TokenEstimator::new(ProviderType::OpenAI).estimate_request(&request);
    /// assert!(estimate.total > 0);
    /// assert!(estimate.by_role.contains_key("system"));
    /// ```
    pub fn estimate_request(&self, request: &ChatRequest) -> TokenEstimate {
        const OVERHEAD_PER_MESSAGE: usize = 4;

        let mut total = 0usize;
        let mut by_role: HashMap<String, usize> = HashMap::new();

        for message in &request.messages {
            let mut message_tokens = OVERHEAD_PER_MESSAGE;

            for part in &message.content {
                message_tokens += self.estimate_content_part(part, &message.role);
            }

            *by_role.entry(message.role.0.clone()).or_insert(0) += message_tokens;
            total += message_tokens;
        }

        if !request.tools.is_empty() {
            total += request.tools.len() * 50;
        }

        if let Some(format) = &request.response_format {
            total += self.estimate_response_format(format);
        }

        TokenEstimate {
            total,
            by_role,
            overhead: OVERHEAD_PER_MESSAGE * request.messages.len(),
        }
    }

    fn estimate_content_part(&self, part: &ContentPart, _role: &Role) -> usize {
        match part {
            ContentPart::Text(text) => self.estimate_text(&text.text),
            ContentPart::Image(image) => self.estimate_image_tokens(image),
            ContentPart::ToolCall(call) => {
                self.estimate_text(&serde_json::to_string(call).unwrap_or_default())
            }
            ContentPart::ToolResult(result) => {
                self.estimate_text(&serde_json::to_string(result).unwrap_or_default())
            }
            ContentPart::Data { data } => self.estimate_text(&data.to_string()),
        }
    }

    fn estimate_image_tokens(&self, image: &ImageContent) -> usize {
        let base = match self.provider_type {
            ProviderType::OpenAI => 760,
            ProviderType::Anthropic => 680,
        };

        let detail_multiplier = match image.detail {
            Some(ImageDetail::High) => 2,
            _ => 1,
        };

        base * detail_multiplier
    }

    fn estimate_response_format(&self, format: &ResponseFormat) -> usize {
        match format {
            ResponseFormat::JsonObject => 20,
            ResponseFormat::JsonSchema { schema } => self.estimate_text(&schema.to_string()),
            ResponseFormat::Custom(value) => self.estimate_text(&value.to_string()),
            ResponseFormat::Text => 0,
        }
    }
}

/// Token estimate breakdown for a chat request.
#[derive(Debug, Clone)]
pub struct TokenEstimate {
    /// Estimated total tokens in the request payload.
    pub total: usize,
    /// Breakdown aggregated by chat role (system/user/assistant/etc.).
    pub by_role: HashMap<String, usize>,
    /// Per-message framing overhead used in the calculation.
    pub overhead: usize,
}

/// Looks up the context window, in tokens, for an exactly matching model id.
pub fn context_window(model: &str) -> Option<u32> {
    let window = match model {
        "gpt-4.1" | "gpt-4.1-mini" | "gpt-4.1-nano" => 1_047_576,
        "gpt-4o" | "gpt-4o-mini" => 128_000,
        "o3" | "o4-mini" => 200_000,
        "claude-3-5-sonnet-20241022"
        | "claude-3-5-haiku-20241022"
        | "claude-3-7-sonnet-20250219"
        | "claude-sonnet-4-20250514"
        | "claude-opus-4-20250514" => 200_000,
        _ => return None,
    };
    Some(window)
}

/// Returns the context window for `model`, or `fallback` when unknown.
///
/// # Examples
///
/// ```
/// use katachi::tokens::{context_window, context_window_or, has_context_window};
///
/// assert_eq!(context_window("gpt-4o"), Some(128_000));
/// assert_eq!(context_window_or("totally-unknown", 999), 999);
/// assert!(!has_context_window(""));
/// ```
pub fn context_window_or(model: &str, fallback: u32) -> u32 {
    context_window(model).unwrap_or(fallback)
}

/// Whether the model id has a documented context window in the local table.
pub fn has_context_window(model: &str) -> bool {
    context_window(model).is_some()
}

/// Price of one model in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelCost {
    /// Input (prompt) price per million tokens.
    pub input_per_million: f64,
    /// Output (completion) price per million tokens.
    pub output_per_million: f64,
}

/// Looks up published pricing for an exactly matching model id.
pub fn model_cost(model: &str) -> Option<ModelCost> {
    let (input_per_million, output_per_million) = match model {
        "gpt-4.1" => (2.00, 8.00),
        "gpt-4.1-mini" => (0.40, 1.60),
        "gpt-4.1-nano" => (0.10, 0.40),
        "gpt-4o" => (2.50, 10.00),
        "gpt-4o-mini" => (0.15, 0.60),
        "o3" => (2.00, 8.00),
        "o4-mini" => (1.10, 4.40),
        "claude-3-5-sonnet-20241022" => (3.00, 15.00),
        "claude-3-5-haiku-20241022" => (0.80, 4.00),
        "claude-3-7-sonnet-20250219" => (3.00, 15.00),
        "claude-sonnet-4-20250514" => (3.00, 15.00),
        "claude-opus-4-20250514" => (15.00, 75.00),
        _ => return None,
    };
    Some(ModelCost {
        input_per_million,
        output_per_million,
    })
}

/// Computes the USD cost of one call from reported usage.
///
/// Reasoning tokens are billed as output tokens. Returns `None` when the
/// model has no published pricing in the local table.
pub fn estimate_cost(model: &str, usage: &TokenUsage) -> Option<f64> {
    let cost = model_cost(model)?;
    let prompt = usage.prompt_tokens.unwrap_or(0) as f64;
    let completion =
        (usage.completion_tokens.unwrap_or(0) + usage.reasoning_tokens.unwrap_or(0)) as f64;
    Some((prompt * cost.input_per_million + completion * cost.output_per_million) / 1_000_000.0)
}
