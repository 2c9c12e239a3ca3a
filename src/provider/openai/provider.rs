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
use crate::types::{
    CapabilityDescriptor, ChatRequest, ChatResponse, ImageRequest, ImageResponse, ModelInfo,
};

use super::error::parse_openai_error;
use super::images::{build_image_body, map_image_response};
use super::models::map_model_list;
use super::request::build_openai_body;
use super::response::map_response;
use super::stream::create_stream;
use super::types::{OpenAiChatResponse, OpenAiImageGenerationResponse, OpenAiModelList};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";

/// OpenAI Provider 覆盖 Chat Completions / Models / Images
pub struct OpenAiProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) organization: Option<String>,
    pub(crate) project: Option<String>,
    pub(crate) default_model: Option<String>,
}

impl OpenAiProvider {
    /// 创建带默认 base_url 的 Provider
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            organization: None,
            project: None,
            default_model: None,
        }
    }

    /// 自定义 base_url
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 配置组织 ID
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// 配置项目 ID
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// 设置默认模型
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

    pub(crate) fn chat_endpoint(&self) -> String {
        self.versioned("chat/completions")
    }

    pub(crate) fn models_endpoint(&self) -> String {
        self.versioned("models")
    }

    pub(crate) fn images_endpoint(&self) -> String {
        self.versioned("images/generations")
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        if let Some(org) = &self.organization {
            headers.insert("OpenAI-Organization".to_string(), org.clone());
        }
        if let Some(project) = &self.project {
            headers.insert("OpenAI-Project".to_string(), project.clone());
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
                message: "model is required for OpenAI chat".to_string(),
            })
    }

    fn build_request_body(&self, request: &ChatRequest, stream: bool) -> Result<Value, LLMError> {
        let model = self.resolve_model(request)?;
        build_openai_body(request, &model, stream)
    }

    async fn send_json(&self, url: String, body: Value) -> Result<HttpResponse, LLMError> {
        let payload = serde_json::to_vec(&body).map_err(|err| LLMError::Validation {
            message: format!("failed to serialize request: {err}"),
        })?;
        let mut request = HttpRequest::post_json(url, payload);
        request.headers = self.build_headers();
        self.transport.send(request).await
    }

    async fn send_json_stream(
        &self,
        url: String,
        body: Value,
    ) -> Result<HttpStreamResponse, LLMError> {
        let payload = serde_json::to_vec(&body).map_err(|err| LLMError::Validation {
            message: format!("failed to serialize request: {err}"),
        })?;
        let mut request = HttpRequest::post_json(url, payload);
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
            Err(parse_openai_error(status, &text, headers))
        }
    }

    fn try_parse<T: DeserializeOwned>(&self, text: &str) -> Result<T, LLMError> {
        serde_json::from_str(text).map_err(|err| LLMError::Provider {
            provider: self.name(),
            message: format!("failed to parse OpenAI response: {err}"),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAiProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LLMError> {
        let body = self.build_request_body(&request, false)?;
        debug!(provider = self.name(), "sending chat request");
        let response = self.send_json(self.chat_endpoint(), body).await?;
        let text = self.ensure_success(response)?;
        let parsed: OpenAiChatResponse = self.try_parse(&text)?;
        map_response(parsed, self.name(), self.chat_endpoint())
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<ChatStream, LLMError> {
        let body = self.build_request_body(&request, true)?;
        debug!(provider = self.name(), "opening chat stream");
        let response = self.send_json_stream(self.chat_endpoint(), body).await?;
        if !(200..300).contains(&response.status) {
            let status = response.status;
            let headers = response.headers;
            let text = collect_stream_text(response.body, self.name()).await?;
            return Err(parse_openai_error(status, &text, headers));
        }
        Ok(create_stream(response.body, self.name(), self.chat_endpoint()))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LLMError> {
        let response = get_with_headers(
            self.transport.as_ref(),
            self.models_endpoint(),
            self.build_headers(),
        )
        .await?;
        let text = self.ensure_success(response)?;
        let parsed: OpenAiModelList = self.try_parse(&text)?;
        Ok(map_model_list(parsed))
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse, LLMError> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());
        let body = build_image_body(&request, &model);
        debug!(provider = self.name(), model = %model, "sending image generation request");
        let response = self.send_json(self.images_endpoint(), body).await?;
        let text = self.ensure_success(response)?;
        let parsed: OpenAiImageGenerationResponse = self.try_parse(&text)?;
        map_image_response(parsed, &model, self.name(), self.images_endpoint())
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_stream: true,
            supports_image_input: true,
            supports_image_generation: true,
            supports_model_listing: true,
            supports_tools: true,
            supports_structured_output: true,
            supports_parallel_tool_calls: true,
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpBodyStream, HttpTransport};
    use futures_util::stream;
    use std::sync::{Arc, Mutex};

    /// Transport returning a canned response while recording the request.
    struct RecordingTransport {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingTransport {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
            self.seen.lock().expect("lock").push(request);
            Ok(HttpResponse {
                status: self.status,
                headers: HashMap::new(),
                body: self.body.as_bytes().to_vec(),
            })
        }

        async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
            self.seen.lock().expect("lock").push(request);
            let body: HttpBodyStream =
                Box::pin(stream::iter(vec![Ok(self.body.as_bytes().to_vec())]));
            Ok(HttpStreamResponse {
                status: self.status,
                headers: HashMap::new(),
                body,
            })
        }
    }

    #[test]
    fn endpoints_normalize_v1_suffix() {
        let transport = Arc::new(RecordingTransport::new(200, "{}"));
        let provider = OpenAiProvider::new(transport, "key")
            .with_base_url("https://proxy.example/v1/");
        assert_eq!(
            provider.chat_endpoint(),
            "https://proxy.example/v1/chat/completions"
        );
        assert_eq!(provider.models_endpoint(), "https://proxy.example/v1/models");
        assert_eq!(
            provider.images_endpoint(),
            "https://proxy.example/v1/images/generations"
        );
    }

    #[tokio::test]
    async fn list_models_issues_authenticated_get() {
        let transport = Arc::new(RecordingTransport::new(
            200,
            r#"{"object":"list","data":[{"id":"gpt-4o","owned_by":"openai"}]}"#,
        ));
        let provider = OpenAiProvider::new(transport.clone(), "sk-test")
            .with_organization("org-1")
            .with_project("proj-1");

        let models = provider.list_models().await.expect("list");
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "gpt-4o");
        assert_eq!(models[0].context_window, Some(128_000));

        let seen = transport.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, crate::http::HttpMethod::Get);
        assert!(seen[0].body.is_none());
        assert_eq!(
            seen[0].headers.get("Authorization"),
            Some(&"Bearer sk-test".to_string())
        );
        assert_eq!(
            seen[0].headers.get("OpenAI-Organization"),
            Some(&"org-1".to_string())
        );
        assert_eq!(
            seen[0].headers.get("OpenAI-Project"),
            Some(&"proj-1".to_string())
        );
    }

    #[tokio::test]
    async fn generate_image_defaults_the_model() {
        let transport = Arc::new(RecordingTransport::new(
            200,
            r#"{"created":1,"data":[{"url":"https://img.example/1.png"}]}"#,
        ));
        let provider = OpenAiProvider::new(transport.clone(), "sk-test");

        let response = provider
            .generate_image(ImageRequest::from_prompt("a lighthouse at dusk"))
            .await
            .expect("generate");
        assert_eq!(response.model.as_deref(), Some("gpt-image-1"));
        assert_eq!(response.images.len(), 1);

        let seen = transport.seen.lock().expect("lock");
        let payload: Value =
            serde_json::from_slice(seen[0].body.as_ref().expect("body")).expect("json");
        assert_eq!(payload["model"], serde_json::json!("gpt-image-1"));
        assert_eq!(payload["prompt"], serde_json::json!("a lighthouse at dusk"));
    }

    #[tokio::test]
    async fn chat_requires_a_model() {
        let transport = Arc::new(RecordingTransport::new(200, "{}"));
        let provider = OpenAiProvider::new(transport, "sk-test");
        let err = provider
            .chat(ChatRequest::from_prompt("hi"))
            .await
            .expect_err("no model configured");
        assert!(matches!(err, LLMError::Validation { .. }));
    }

    #[tokio::test]
    async fn chat_maps_error_statuses() {
        let transport = Arc::new(RecordingTransport::new(
            401,
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#,
        ));
        let provider =
            OpenAiProvider::new(transport, "bad-key").with_default_model("gpt-4.1-mini");
        let err = provider
            .chat(ChatRequest::from_prompt("hi"))
            .await
            .expect_err("auth failure");
        assert!(matches!(err, LLMError::Auth { .. }));
    }
}
