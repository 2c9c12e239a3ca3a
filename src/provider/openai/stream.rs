use futures_util::StreamExt;
use serde_json::json;

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::ChatStream;
use crate::stream::{StreamDecoder, StreamEvent};
use crate::types::{
    ChatChunk, ChatEvent, ContentDelta, MessageDelta, ProviderMetadata, Role, ToolCallDelta,
    ToolCallKind,
};

use super::response::{convert_finish_reason, convert_usage};
use super::types::{OpenAiDeltaContent, OpenAiMessagePart, OpenAiStreamChunk, OpenAiToolCallDelta};

/// Adapts the shared SSE decoder into OpenAI chat chunks.
pub(crate) fn create_stream(
    body: HttpBodyStream,
    provider: &'static str,
    endpoint: String,
) -> ChatStream {
    let decoder = StreamDecoder::new(body, provider);
    let stream = decoder.map(move |event| match event? {
        StreamEvent::Done => Ok(terminal_chunk(provider, &endpoint)),
        StreamEvent::Data(data) => {
            let chunk: OpenAiStreamChunk =
                serde_json::from_str(&data).map_err(|err| LLMError::Provider {
                    provider,
                    message: format!("failed to parse stream chunk: {err}"),
                })?;
            convert_stream_chunk(chunk, provider, &endpoint)
        }
    });
    Box::pin(stream)
}

fn terminal_chunk(provider: &'static str, endpoint: &str) -> ChatChunk {
    ChatChunk {
        events: Vec::new(),
        usage: None,
        is_terminal: true,
        provider: ProviderMetadata {
            provider: provider.to_string(),
            request_id: None,
            endpoint: Some(endpoint.to_string()),
            raw: Some(json!({"event": "[DONE]"})),
        },
    }
}

fn convert_stream_chunk(
    chunk: OpenAiStreamChunk,
    provider: &'static str,
    endpoint: &str,
) -> Result<ChatChunk, LLMError> {
    let mut events = Vec::new();
    for choice in &chunk.choices {
        if let Some(delta) = &choice.delta {
            if delta.role.is_some() || delta.content.is_some() || choice.finish_reason.is_some() {
                let content_updates = match &delta.content {
                    Some(OpenAiDeltaContent::Parts(parts)) => convert_content_delta(parts),
                    Some(OpenAiDeltaContent::Text(text)) => {
                        if text.is_empty() {
                            Vec::new()
                        } else {
                            vec![ContentDelta::Text { text: text.clone() }]
                        }
                    }
                    None => Vec::new(),
                };
                let message_delta = MessageDelta {
                    index: choice.index,
                    role: delta.role.clone().map(Role),
                    content: content_updates,
                    finish_reason: choice.finish_reason.as_deref().map(convert_finish_reason),
                };
                if message_delta.role.is_some()
                    || !message_delta.content.is_empty()
                    || message_delta.finish_reason.is_some()
                {
                    events.push(ChatEvent::MessageDelta(message_delta));
                }
            }
            if let Some(tool_calls) = &delta.tool_calls {
                for tool_call in tool_calls {
                    events.push(ChatEvent::ToolCallDelta(convert_tool_call_delta_event(
                        tool_call,
                        choice.index,
                        choice.finish_reason.as_deref(),
                    )));
                }
            }
        }
    }
    let usage = chunk.usage.clone().map(convert_usage);
    let raw = serde_json::to_value(&chunk).ok();
    Ok(ChatChunk {
        events,
        usage,
        is_terminal: false,
        provider: ProviderMetadata {
            provider: provider.to_string(),
            request_id: None,
            endpoint: Some(endpoint.to_string()),
            raw,
        },
    })
}

fn convert_content_delta(parts: &[OpenAiMessagePart]) -> Vec<ContentDelta> {
    let mut deltas = Vec::new();
    for part in parts {
        match part.kind.as_str() {
            "text" | "input_text" => {
                if let Some(text) = &part.text {
                    if !text.is_empty() {
                        deltas.push(ContentDelta::Text { text: text.clone() });
                    }
                }
            }
            _ => {
                let value =
                    serde_json::to_value(part).unwrap_or_else(|_| json!({ "type": part.kind }));
                deltas.push(ContentDelta::Json { value });
            }
        }
    }
    deltas
}

fn convert_tool_call_delta_event(
    delta: &OpenAiToolCallDelta,
    fallback_index: usize,
    finish_reason: Option<&str>,
) -> ToolCallDelta {
    let index = delta.index.unwrap_or(fallback_index);
    let (name, arguments) = delta
        .function
        .as_ref()
        .map(|f| (f.name.clone(), f.arguments.clone()))
        .unwrap_or((None, None));
    let kind = match delta.kind.as_deref() {
        Some("function") => Some(ToolCallKind::Function),
        _ => None,
    };
    ToolCallDelta {
        index,
        id: delta.id.clone(),
        name,
        arguments_delta: arguments,
        kind,
        is_finished: matches!(finish_reason, Some("tool_calls")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn body_from(lines: &[&str]) -> HttpBodyStream {
        let chunks: Vec<Result<Vec<u8>, LLMError>> = lines
            .iter()
            .map(|line| Ok(format!("{line}\n\n").into_bytes()))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    #[tokio::test]
    async fn stream_yields_text_deltas_then_terminal_chunk() {
        let body = body_from(&[
            r#"data: {"choices":[{"index":0,"delta":{"role":"assistant","content":"Hel"}}]}"#,
            r#"data: {"choices":[{"index":0,"delta":{"content":"lo"},"finish_reason":"stop"}]}"#,
            "data: [DONE]",
        ]);
        let mut chat_stream = create_stream(body, "openai", "endpoint".to_string());

        let first = chat_stream.next().await.expect("chunk").expect("ok");
        assert!(!first.is_terminal);
        match &first.events[0] {
            ChatEvent::MessageDelta(delta) => {
                assert_eq!(delta.role.as_ref().map(|r| r.0.as_str()), Some("assistant"));
                match &delta.content[0] {
                    ContentDelta::Text { text } => assert_eq!(text, "Hel"),
                    other => panic!("unexpected delta: {other:?}"),
                }
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let second = chat_stream.next().await.expect("chunk").expect("ok");
        match &second.events[0] {
            ChatEvent::MessageDelta(delta) => {
                assert!(delta.finish_reason.is_some());
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let terminal = chat_stream.next().await.expect("chunk").expect("ok");
        assert!(terminal.is_terminal);
        assert!(chat_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_surfaces_tool_call_deltas() {
        let body = body_from(&[
            r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"lookup","arguments":"{\"q\":"}}]},"finish_reason":null}]}"#,
            r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"rust\"}"}}]},"finish_reason":"tool_calls"}]}"#,
            "data: [DONE]",
        ]);
        let mut chat_stream = create_stream(body, "openai", "endpoint".to_string());

        let first = chat_stream.next().await.expect("chunk").expect("ok");
        match &first.events[0] {
            ChatEvent::ToolCallDelta(delta) => {
                assert_eq!(delta.id.as_deref(), Some("call_1"));
                assert_eq!(delta.name.as_deref(), Some("lookup"));
                assert!(!delta.is_finished);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // finish_reason also produces a MessageDelta event, so search for the
        // tool-call delta instead of assuming its position
        let second = chat_stream.next().await.expect("chunk").expect("ok");
        let tool_delta = second
            .events
            .iter()
            .find_map(|event| match event {
                ChatEvent::ToolCallDelta(delta) => Some(delta),
                _ => None,
            })
            .expect("tool call delta present");
        assert_eq!(tool_delta.arguments_delta.as_deref(), Some("\"rust\"}"));
        assert!(tool_delta.is_finished);
    }

    #[tokio::test]
    async fn malformed_chunk_surfaces_provider_error() {
        let body = body_from(&["data: not json"]);
        let mut chat_stream = create_stream(body, "openai", "endpoint".to_string());
        let err = chat_stream.next().await.expect("item").unwrap_err();
        match err {
            LLMError::Provider { provider, .. } => assert_eq!(provider, "openai"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
