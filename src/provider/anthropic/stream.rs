use futures_util::StreamExt;
use serde_json::Value;

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::ChatStream;
use crate::stream::{StreamDecoder, StreamEvent};
use crate::types::{ChatChunk, ChatEvent, ContentDelta, MessageDelta, ProviderMetadata, Role};

use super::response::{convert_finish_reason, convert_usage};
use super::types::AnthropicUsage;

/// Adapts the shared SSE decoder into Anthropic chat chunks.
///
/// Anthropic streams typed JSON events instead of an OpenAI-style `[DONE]`
/// marker; `message_stop` flags the terminal chunk.
pub(crate) fn create_stream(
    body: HttpBodyStream,
    provider: &'static str,
    endpoint: String,
) -> ChatStream {
    let decoder = StreamDecoder::new(body, provider);
    let stream = decoder.map(move |event| match event? {
        // Anthropic does not send `[DONE]`; treat it as a bare terminal chunk
        // anyway so OpenAI-compatible relays also terminate cleanly.
        StreamEvent::Done => Ok(ChatChunk {
            events: Vec::new(),
            usage: None,
            is_terminal: true,
            provider: ProviderMetadata {
                provider: provider.to_string(),
                request_id: None,
                endpoint: Some(endpoint.clone()),
                raw: None,
            },
        }),
        StreamEvent::Data(data) => {
            let value: Value = serde_json::from_str(&data).map_err(|err| LLMError::Provider {
                provider,
                message: format!("failed to parse stream event: {err}"),
            })?;
            convert_stream_event(value, provider, &endpoint)
        }
    });
    Box::pin(stream)
}

fn convert_stream_event(
    event: Value,
    provider: &'static str,
    endpoint: &str,
) -> Result<ChatChunk, LLMError> {
    let mut events = Vec::new();
    let mut usage = None;

    let kind = event
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let is_terminal = kind == "message_stop";

    match kind {
        "content_block_delta" => {
            if let Some(delta) = event.get("delta") {
                let index = event.get("index").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
                if let Some(text) = delta.get("text").and_then(|v| v.as_str()) {
                    events.push(ChatEvent::MessageDelta(MessageDelta {
                        index,
                        role: Some(Role::assistant()),
                        content: vec![ContentDelta::Text {
                            text: text.to_string(),
                        }],
                        finish_reason: None,
                    }));
                } else if let Some(partial) = delta.get("partial_json").and_then(|v| v.as_str()) {
                    // tool input arrives as input_json_delta fragments
                    events.push(ChatEvent::MessageDelta(MessageDelta {
                        index,
                        role: Some(Role::assistant()),
                        content: vec![ContentDelta::Json {
                            value: Value::String(partial.to_string()),
                        }],
                        finish_reason: None,
                    }));
                }
            }
        }
        "message_delta" => {
            if let Some(delta) = event.get("delta") {
                if let Some(reason) = delta
                    .get("stop_reason")
                    .and_then(|v| v.as_str())
                    .map(convert_finish_reason)
                {
                    events.push(ChatEvent::MessageDelta(MessageDelta {
                        index: 0,
                        role: Some(Role::assistant()),
                        content: Vec::new(),
                        finish_reason: Some(reason),
                    }));
                }
            }
            // usage rides on the event itself or inside the delta depending
            // on the API revision; accept both
            let usage_value = event
                .get("usage")
                .or_else(|| event.get("delta").and_then(|d| d.get("usage")));
            if let Some(usage_obj) = usage_value {
                if let Ok(anthropic_usage) =
                    serde_json::from_value::<AnthropicUsage>(usage_obj.clone())
                {
                    usage = Some(convert_usage(&anthropic_usage));
                }
            }
        }
        "message_stop" => {}
        _ => {}
    }

    // Always attach a Custom event with the raw structure to aid debugging
    // and extensions.
    events.push(ChatEvent::Custom {
        data: event.clone(),
    });

    Ok(ChatChunk {
        events,
        usage,
        is_terminal,
        provider: ProviderMetadata {
            provider: provider.to_string(),
            request_id: None,
            endpoint: Some(endpoint.to_string()),
            raw: None,
        },
    })
}
