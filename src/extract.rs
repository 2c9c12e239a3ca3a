//! One-shot structured extraction: chat once, validate against a schema
//! declaration, and hand back a populated instance.
//!
//! The flow attaches the emitted JSON Schema as a response-format constraint,
//! parses the first text output as JSON, and runs the full fail-soft
//! validation pipeline. On validation failure with retries enabled, the
//! invalid output and the complete violation report are appended to the
//! conversation so the model can self-correct.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LLMError;
use crate::provider::LLMProvider;
use crate::schema::{SchemaInstance, SchemaType};
use crate::types::{ChatRequest, Message, ResponseFormat, Role};

/// Configuration for [`extract_structured`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Maximum number of attempts (initial + retries). `1` means a single
    /// attempt with no self-correction round.
    pub max_attempts: u32,
    /// Force the schema into a system message even when the provider reports
    /// native structured-output support.
    pub schema_in_prompt: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            schema_in_prompt: false,
        }
    }
}

/// Chats with the provider and parses the reply into a schema instance.
///
/// Provider errors propagate immediately; only JSON-parse and schema
/// validation failures consume retry attempts. The returned instance is fully
/// populated and independent of the raw model output.
///
/// # Errors
///
/// Returns [`LLMError::Validation`] when the output is not JSON,
/// [`LLMError::Schema`] with the aggregated violation list when validation
/// fails on the final attempt, or whatever the provider raised.
pub async fn extract_structured(
    provider: &dyn LLMProvider,
    schema: &SchemaType,
    mut request: ChatRequest,
    options: ExtractOptions,
) -> Result<SchemaInstance, LLMError> {
    if options.max_attempts == 0 {
        return Err(LLMError::Validation {
            message: "max_attempts must be at least 1".to_string(),
        });
    }

    let document = schema.to_json_schema();
    request.response_format = Some(ResponseFormat::JsonSchema { schema: document });

    if options.schema_in_prompt || !provider.capabilities().supports_structured_output {
        inject_schema_prompt(&mut request, schema);
    }

    let mut last_error = None;
    for attempt in 1..=options.max_attempts {
        debug!(attempt, schema = schema.name(), "extraction attempt");
        let response = provider.chat(request.clone()).await?;
        let Some(text) = response.first_text().map(str::to_string) else {
            last_error = Some(LLMError::Validation {
                message: "model response contained no text output".to_string(),
            });
            continue;
        };

        match parse_payload(schema, &text) {
            Ok(instance) => return Ok(instance),
            Err(err) => {
                warn!(attempt, error = %err, "extraction output rejected");
                if attempt < options.max_attempts {
                    request
                        .messages
                        .push(Message::text(Role::assistant(), text));
                    request.messages.push(Message::text(
                        Role::user(),
                        format!(
                            "The previous reply was rejected: {err}. Respond again with a \
                             single JSON object that satisfies the schema, with no \
                             surrounding prose."
                        ),
                    ));
                }
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or(LLMError::Unknown {
        message: "extraction produced no attempts".to_string(),
    }))
}

fn inject_schema_prompt(request: &mut ChatRequest, schema: &SchemaType) {
    let prompt = format!(
        "Respond with a single JSON object matching this JSON Schema, with no \
         surrounding prose:\n{}",
        schema.stringify(true)
    );
    request
        .messages
        .insert(0, Message::text(Role::system(), prompt));
}

fn parse_payload(schema: &SchemaType, text: &str) -> Result<SchemaInstance, LLMError> {
    let stripped = strip_code_fence(text);
    let value: Value = serde_json::from_str(stripped).map_err(|err| LLMError::Validation {
        message: format!("model output is not valid JSON: {err}"),
    })?;
    let mut instance = schema.create();
    instance.parse(&value)?;
    Ok(instance)
}

/// Tolerates models that wrap their JSON in Markdown code fences.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return trimmed;
    };
    // drop the optional language tag on the opening fence
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim(),
        None => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChatStream;
    use crate::schema::{SchemaBuilder, integer, string};
    use crate::types::{
        CapabilityDescriptor, ChatResponse, ContentPart, ModelInfo, OutputItem, ProviderMetadata,
        TextContent,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider replaying canned text outputs while recording the requests.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<&'static str>>,
        requests: Mutex<Vec<ChatRequest>>,
        structured_output: bool,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<&'static str>, structured_output: bool) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
                structured_output,
            }
        }

        fn text_response(text: &str) -> ChatResponse {
            ChatResponse {
                outputs: vec![OutputItem::Message {
                    message: crate::types::Message {
                        role: Role::assistant(),
                        name: None,
                        content: vec![ContentPart::Text(TextContent {
                            text: text.to_string(),
                        })],
                        metadata: None,
                    },
                    index: 0,
                }],
                usage: None,
                finish_reason: None,
                model: None,
                provider: ProviderMetadata::default(),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LLMError> {
            self.requests.lock().expect("lock").push(request);
            let reply = self
                .replies
                .lock()
                .expect("lock")
                .pop_front()
                .expect("script exhausted");
            Ok(Self::text_response(reply))
        }

        async fn stream_chat(&self, _request: ChatRequest) -> Result<ChatStream, LLMError> {
            Err(LLMError::UnsupportedFeature {
                feature: "scripted_stream",
            })
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, LLMError> {
            Ok(Vec::new())
        }

        fn capabilities(&self) -> CapabilityDescriptor {
            CapabilityDescriptor {
                supports_structured_output: self.structured_output,
                ..CapabilityDescriptor::default()
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn person_schema() -> SchemaType {
        SchemaBuilder::new("Person")
            .field("name", string().with_min_length(1))
            .field("age", integer().with_minimum(0.0))
            .build()
    }

    #[tokio::test]
    async fn extraction_parses_valid_output_on_first_attempt() {
        let provider = ScriptedProvider::new(vec![r#"{"name": "Ada", "age": 30}"#], true);
        let schema = person_schema();

        let instance = extract_structured(
            &provider,
            &schema,
            ChatRequest::from_prompt("Describe Ada"),
            ExtractOptions::default(),
        )
        .await
        .expect("extraction should succeed");

        assert_eq!(instance.get_str("name"), Some("Ada"));
        assert_eq!(instance.get_i64("age"), Some(30));

        // native structured output: no schema system message injected
        let requests = provider.requests.lock().expect("lock");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 1);
        assert!(matches!(
            requests[0].response_format,
            Some(ResponseFormat::JsonSchema { .. })
        ));
    }

    #[tokio::test]
    async fn extraction_strips_code_fences() {
        let provider =
            ScriptedProvider::new(vec!["```json\n{\"name\": \"Ada\", \"age\": 30}\n```"], true);
        let schema = person_schema();

        let instance = extract_structured(
            &provider,
            &schema,
            ChatRequest::from_prompt("Describe Ada"),
            ExtractOptions::default(),
        )
        .await
        .expect("fenced output should parse");
        assert_eq!(instance.get_i64("age"), Some(30));
    }

    #[tokio::test]
    async fn extraction_retries_with_violation_feedback() {
        let provider = ScriptedProvider::new(
            vec![
                r#"{"name": "", "age": -1}"#,
                r#"{"name": "Ada", "age": 30}"#,
            ],
            true,
        );
        let schema = person_schema();

        let instance = extract_structured(
            &provider,
            &schema,
            ChatRequest::from_prompt("Describe Ada"),
            ExtractOptions {
                max_attempts: 2,
                ..ExtractOptions::default()
            },
        )
        .await
        .expect("second attempt should succeed");
        assert_eq!(instance.get_str("name"), Some("Ada"));

        let requests = provider.requests.lock().expect("lock");
        assert_eq!(requests.len(), 2);
        // retry carries the rejected output and a correction instruction
        let retry_messages = &requests[1].messages;
        assert_eq!(retry_messages.len(), 3);
        assert_eq!(retry_messages[1].role.0, "assistant");
        match &retry_messages[2].content[0] {
            ContentPart::Text(TextContent { text }) => {
                assert!(text.contains("rejected"));
                assert!(text.contains("minLength") || text.contains("below"));
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausted_attempts_surface_the_schema_error() {
        let provider = ScriptedProvider::new(vec![r#"{"name": "", "age": -1}"#], true);
        let schema = person_schema();

        let err = extract_structured(
            &provider,
            &schema,
            ChatRequest::from_prompt("Describe Ada"),
            ExtractOptions::default(),
        )
        .await
        .expect_err("single invalid attempt must fail");
        match err {
            LLMError::Schema { violations, .. } => assert_eq!(violations.len(), 2),
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn schema_prompt_is_injected_without_native_support() {
        let provider = ScriptedProvider::new(vec![r#"{"name": "Ada", "age": 30}"#], false);
        let schema = person_schema();

        extract_structured(
            &provider,
            &schema,
            ChatRequest::from_prompt("Describe Ada"),
            ExtractOptions::default(),
        )
        .await
        .expect("extraction should succeed");

        let requests = provider.requests.lock().expect("lock");
        let first = &requests[0].messages[0];
        assert_eq!(first.role.0, "system");
        match &first.content[0] {
            ContentPart::Text(TextContent { text }) => {
                assert!(text.contains("json-schema.org"));
                assert!(text.contains("\"Person\""));
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn code_fence_stripping_handles_plain_and_tagged_fences() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }
}
