use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::LLMError;
use crate::http::{
    DynHttpTransport, HttpRequest, HttpResponse, HttpStreamResponse, get_with_headers,
};
use crate::provider::{ChatStream, LLMProvider};
use crate::stream::collect_stream_text;
use crate::types::{CapabilityDescriptor, ChatRequest, ChatResponse, ModelInfo};

use super::error::parse_anthropic_error;
use super::models::map_model_list;
use super::request::build_anthropic_body;
use super::response::map_response;
use super::stream::create_stream;
use super::types::{AnthropicMessageResponse, AnthropicModelList};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_VERSION: &str = "2023-06-01";

/// Anthropic Provider（兼容 Claude Messages API）
pub struct AnthropicProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) version: String,
    pub(crate) beta: Option<String>,
    pub(crate) default_model: Option<String>,
}

impl AnthropicProvider {
    /// 使用默认 base_url 与 anthropic-version 创建 Provider
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            version: DEFAULT_VERSION.to_string(),
            beta: None,
            default_model: None,
        }
    }

    /// 自定义 base_url，便于接入代理或兼容层
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 自定义 Anthropic API 版本（anthropic-version）
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// 设置 anthropic-beta 头，支持逗号分隔的 beta 列表
    pub fn with_beta(mut self, beta: impl Into<String>) -> Self {
        self.beta = Some(beta.into());
        self
    }

    /// 设置默认模型名称
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    fn versioned(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/{path}")
        } else {
            format!("{base}/v1/{path}")
        }
    }

    pub(crate) fn messages_endpoint(&self) -> String {
        self.versioned("messages")
    }

    pub(crate) fn models_endpoint(&self) -> String {
        self.versioned("models")
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("x-api-key".to_string(), self.api_key.clone());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("anthropic-version".to_string(), self.version.clone());
        if let Some(beta) = &self.beta {
            headers.insert("anthropic-beta".to_string(), beta.clone());
        }
        headers
    }

    fn resolve_model(&self, request: &ChatRequest) -> Result<String, LLMError> {
        request
            .options
            .model
            .clone()
            .or_else(|| self.default_model.clone())
            .ok_or_else(|| LLMError::Validation {
                message: "model is required for Anthropic messages".to_string(),
            })
    }

    fn build_request_body(&self, request: &ChatRequest, stream: bool) -> Result<Value, LLMError> {
        let model = self.resolve_model(request)?;
        build_anthropic_body(request, &model, stream)
    }

    async fn send_request(&self, body: Value) -> Result<HttpResponse, LLMError> {
        let payload = serde_json::to_vec(&body).map_err(|err| LLMError::Validation {
            message: format!("failed to serialize request: {err}"),
        })?;
        let mut request = HttpRequest::post_json(self.messages_endpoint(), payload);
        request.headers = self.build_headers();
        self.transport.send(request).await
    }

    async fn send_stream_request(&self, body: Value) -> Result<HttpStreamResponse, LLMError> {
        let payload = serde_json::to_vec(&body).map_err(|err| LLMError::Validation {
            message: format!("failed to serialize request: {err}"),
        })?;
        let mut request = HttpRequest::post_json(self.messages_endpoint(), payload);
        request.headers = self.build_headers();
        self.transport.send_stream(request).await
    }

    fn ensure_success(&self, response: HttpResponse) -> Result<String, LLMError> {
        let status = response.status;
        let headers = response.headers.clone();
        let text = response.into_string()?;
        if (200..300).contains(&status) {
            Ok(text)
        } else {
            Err(parse_anthropic_error(status, &text, headers))
        }
    }

    fn try_parse<T: DeserializeOwned>(&self, text: &str) -> Result<T, LLMError> {
        serde_json::from_str(text).map_err(|err| LLMError::Provider {
            provider: self.name(),
            message: format!("failed to parse Anthropic response: {err}"),
        })
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LLMError> {
        let body = self.build_request_body(&request, false)?;
        debug!(provider = self.name(), "sending chat request");
        let response = self.send_request(body).await?;
        let text = self.ensure_success(response)?;
        let parsed: AnthropicMessageResponse = self.try_parse(&text)?;
        map_response(parsed, self.name(), self.messages_endpoint())
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, LLMError> {
        let body = self.build_request_body(&request, true)?;
        debug!(provider = self.name(), "opening chat stream");
        let response = self.send_stream_request(body).await?;
        if !(200..300).contains(&response.status) {
            let status = response.status;
            let headers = response.headers;
            let text = collect_stream_text(response.body, self.name()).await?;
            return Err(parse_anthropic_error(status, &text, headers));
        }
        Ok(create_stream(
            response.body,
            self.name(),
            self.messages_endpoint(),
        ))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LLMError> {
        let response = get_with_headers(
            self.transport.as_ref(),
            self.models_endpoint(),
            self.build_headers(),
        )
        .await?;
        let text = self.ensure_success(response)?;
        let parsed: AnthropicModelList = self.try_parse(&text)?;
        Ok(map_model_list(parsed))
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_stream: true,
            supports_image_input: true,
            supports_image_generation: false,
            supports_model_listing: true,
            supports_tools: true,
            supports_structured_output: false,
            supports_parallel_tool_calls: true,
        }
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
