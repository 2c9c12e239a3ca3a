use std::collections::HashMap;

use futures_util::StreamExt;
use tracing::debug;

use crate::error::LLMError;
use crate::extract::{ExtractOptions, extract_structured};
use crate::provider::{ChatStream, DynProvider};
use crate::schema::{SchemaInstance, SchemaType};
use crate::types::{
    CapabilityDescriptor, ChatEvent, ChatRequest, ChatResponse, ContentDelta, ImageRequest,
    ImageResponse, ModelInfo,
};

/// LLM 调用入口 负责维护已注册的 Provider
pub struct LLMClient {
    providers: HashMap<String, DynProvider>,
}

impl LLMClient {
    /// 创建 Builder 便于后续注册 Provider
    pub fn builder() -> LLMClientBuilder {
        LLMClientBuilder {
            providers: HashMap::new(),
        }
    }

    /// 发送同步聊天请求
    pub async fn chat(&self, handle: &str, request: ChatRequest) -> Result<ChatResponse, LLMError> {
        let provider = self.get_provider(handle)?;
        provider.chat(request).await
    }

    /// 发起流式聊天请求
    pub async fn stream_chat(
        &self,
        handle: &str,
        request: ChatRequest,
    ) -> Result<ChatStream, LLMError> {
        let provider = self.get_provider(handle)?;
        provider.stream_chat(request).await
    }

    /// 列出指定句柄可见的模型
    pub async fn list_models(&self, handle: &str) -> Result<Vec<ModelInfo>, LLMError> {
        let provider = self.get_provider(handle)?;
        provider.list_models().await
    }

    /// 按提示词生成图像
    pub async fn generate_image(
        &self,
        handle: &str,
        request: ImageRequest,
    ) -> Result<ImageResponse, LLMError> {
        let provider = self.get_provider(handle)?;
        provider.generate_image(request).await
    }

    /// One-shot convenience: sends one user prompt and returns the reply text.
    pub async fn generate_text(
        &self,
        handle: &str,
        prompt: impl Into<String> + Send,
    ) -> Result<String, LLMError> {
        let response = self.chat(handle, ChatRequest::from_prompt(prompt)).await?;
        response
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| LLMError::Unknown {
                message: "response contained no text output".to_string(),
            })
    }

    /// Streams a chat request, feeding each text delta to `on_delta` in order.
    ///
    /// The handler observes the forward-only, single-pass sequence of text
    /// fragments; the accumulated text is returned once the stream ends.
    /// Cancellation is the caller's concern via the transport's abort
    /// mechanism, not a first-class concept here.
    pub async fn stream_text<F>(
        &self,
        handle: &str,
        request: ChatRequest,
        mut on_delta: F,
    ) -> Result<String, LLMError>
    where
        F: FnMut(&str) + Send,
    {
        let mut stream = self.stream_chat(handle, request).await?;
        let mut collected = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in &chunk.events {
                if let ChatEvent::MessageDelta(delta) = event {
                    for content in &delta.content {
                        if let ContentDelta::Text { text } = content {
                            on_delta(text);
                            collected.push_str(text);
                        }
                    }
                }
            }
            if chunk.is_terminal {
                break;
            }
        }
        debug!(handle, chars = collected.len(), "stream completed");
        Ok(collected)
    }

    /// One-shot convenience: chats and parses the reply into a schema instance.
    pub async fn extract(
        &self,
        handle: &str,
        schema: &SchemaType,
        request: ChatRequest,
        options: ExtractOptions,
    ) -> Result<SchemaInstance, LLMError> {
        let provider = self.get_provider(handle)?;
        extract_structured(provider.as_ref(), schema, request, options).await
    }

    /// 返回当前已注册的句柄
    pub fn handles(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// 查询指定句柄的能力描述
    pub fn capabilities(&self, handle: &str) -> Result<CapabilityDescriptor, LLMError> {
        let provider = self.get_provider(handle)?;
        Ok(provider.capabilities())
    }

    /// 返回所有支持工具调用的句柄列表
    pub fn handles_supporting_tools(&self) -> Vec<String> {
        self.handles_where(|caps| caps.supports_tools)
    }

    /// 返回所有支持流式输出的句柄列表
    pub fn handles_supporting_stream(&self) -> Vec<String> {
        self.handles_where(|caps| caps.supports_stream)
    }

    /// 返回所有支持图像生成的句柄列表
    pub fn handles_supporting_image_generation(&self) -> Vec<String> {
        self.handles_where(|caps| caps.supports_image_generation)
    }

    fn handles_where(&self, predicate: impl Fn(&CapabilityDescriptor) -> bool) -> Vec<String> {
        self.providers
            .iter()
            .filter_map(|(handle, provider)| {
                if predicate(&provider.capabilities()) {
                    Some(handle.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    fn get_provider(&self, handle: &str) -> Result<DynProvider, LLMError> {
        self.providers
            .get(handle)
            .cloned()
            .ok_or_else(|| LLMError::Validation {
                message: format!("unknown model handle: {handle}"),
            })
    }
}

/// 负责注册 Provider 的 Builder
pub struct LLMClientBuilder {
    providers: HashMap<String, DynProvider>,
}

impl LLMClientBuilder {
    /// 注册一个句柄对应的 Provider
    pub fn register_handle<S: Into<String>>(mut self, handle: S, provider: DynProvider) -> Self {
        self.providers.insert(handle.into(), provider);
        self
    }

    /// 构建最终的 LLMClient
    pub fn build(self) -> LLMClient {
        LLMClient {
            providers: self.providers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LLMProvider;
    use crate::types::{
        ChatChunk, ContentPart, Message, MessageDelta, OutputItem, ProviderMetadata, Role,
        TextContent,
    };
    use async_trait::async_trait;
    use futures_util::stream;
    use std::sync::Arc;

    /// 简单的测试 Provider 实现 返回固定文本或固定流
    struct DummyProvider {
        name: &'static str,
        caps: CapabilityDescriptor,
        reply: &'static str,
    }

    impl DummyProvider {
        fn with_caps(caps: CapabilityDescriptor) -> Self {
            Self {
                name: "dummy",
                caps,
                reply: "hello from dummy",
            }
        }
    }

    #[async_trait]
    impl LLMProvider for DummyProvider {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, LLMError> {
            Ok(ChatResponse {
                outputs: vec![OutputItem::Message {
                    message: Message::text(Role::assistant(), self.reply),
                    index: 0,
                }],
                usage: None,
                finish_reason: None,
                model: None,
                provider: ProviderMetadata::default(),
            })
        }

        async fn stream_chat(&self, _request: ChatRequest) -> Result<ChatStream, LLMError> {
            let deltas = ["hel", "lo"];
            let mut chunks: Vec<Result<ChatChunk, LLMError>> = deltas
                .iter()
                .map(|text| {
                    Ok(ChatChunk {
                        events: vec![ChatEvent::MessageDelta(MessageDelta {
                            index: 0,
                            role: Some(Role::assistant()),
                            content: vec![ContentDelta::Text {
                                text: (*text).to_string(),
                            }],
                            finish_reason: None,
                        })],
                        usage: None,
                        is_terminal: false,
                        provider: ProviderMetadata::default(),
                    })
                })
                .collect();
            chunks.push(Ok(ChatChunk {
                events: Vec::new(),
                usage: None,
                is_terminal: true,
                provider: ProviderMetadata::default(),
            }));
            Ok(Box::pin(stream::iter(chunks)))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, LLMError> {
            Ok(vec![ModelInfo {
                id: "dummy-model".to_string(),
                created: None,
                owned_by: None,
                display_name: None,
                context_window: None,
            }])
        }

        fn capabilities(&self) -> CapabilityDescriptor {
            self.caps.clone()
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    fn client_with(handle: &str, caps: CapabilityDescriptor) -> LLMClient {
        LLMClient::builder()
            .register_handle(handle, Arc::new(DummyProvider::with_caps(caps)) as DynProvider)
            .build()
    }

    #[test]
    fn capabilities_returns_descriptor_for_handle() {
        let client = client_with(
            "p1",
            CapabilityDescriptor {
                supports_stream: true,
                supports_tools: true,
                ..CapabilityDescriptor::default()
            },
        );

        let caps = client.capabilities("p1").expect("capabilities");
        assert!(caps.supports_stream);
        assert!(caps.supports_tools);
        assert!(!caps.supports_image_generation);
    }

    #[test]
    fn capabilities_returns_error_for_unknown_handle() {
        let client = LLMClient::builder().build();

        let err = client.capabilities("missing").expect_err("should fail");
        match err {
            LLMError::Validation { message } => {
                assert!(
                    message.contains("missing"),
                    "unexpected validation message: {message}"
                );
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn capability_filters_select_matching_handles() {
        let client = LLMClient::builder()
            .register_handle(
                "tools",
                Arc::new(DummyProvider::with_caps(CapabilityDescriptor {
                    supports_tools: true,
                    ..CapabilityDescriptor::default()
                })) as DynProvider,
            )
            .register_handle(
                "images",
                Arc::new(DummyProvider::with_caps(CapabilityDescriptor {
                    supports_image_generation: true,
                    supports_stream: true,
                    ..CapabilityDescriptor::default()
                })) as DynProvider,
            )
            .build();

        assert_eq!(client.handles_supporting_tools(), vec!["tools".to_string()]);
        assert_eq!(
            client.handles_supporting_image_generation(),
            vec!["images".to_string()]
        );
        assert_eq!(
            client.handles_supporting_stream(),
            vec!["images".to_string()]
        );
    }

    #[tokio::test]
    async fn generate_text_returns_first_text_output() {
        let client = client_with("p1", CapabilityDescriptor::default());
        let text = client
            .generate_text("p1", "say hi")
            .await
            .expect("generate_text");
        assert_eq!(text, "hello from dummy");
    }

    #[tokio::test]
    async fn stream_text_feeds_deltas_in_order() {
        let client = client_with("p1", CapabilityDescriptor::default());
        let mut seen = Vec::new();
        let collected = client
            .stream_text("p1", ChatRequest::from_prompt("hi"), |delta| {
                seen.push(delta.to_string());
            })
            .await
            .expect("stream_text");
        assert_eq!(seen, vec!["hel".to_string(), "lo".to_string()]);
        assert_eq!(collected, "hello");
    }

    #[tokio::test]
    async fn list_models_routes_to_provider() {
        let client = client_with("p1", CapabilityDescriptor::default());
        let models = client.list_models("p1").await.expect("list");
        assert_eq!(models[0].id, "dummy-model");
    }
}
