use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;
use serde::Serialize;

use crate::error::LLMError;

/// Enumerates HTTP methods understood by the lightweight transport abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// Minimal HTTP request representation shared across providers.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Builds a POST request with a JSON request body.
    ///
    /// The helper sets the `Content-Type` header to `application/json` and stores the
    /// provided buffer as the body, making it ideal for serialized payloads.
    ///
    /// # Examples
    ///
    /// ```
    /// use katachi::http::{HttpMethod, HttpRequest};
    ///
    /// let request = HttpRequest::post_json("https://example.com", br"{}".to_vec());
    /// assert_eq!(request.method, HttpMethod::Post);
    /// assert_eq!(request.headers.get("Content-Type"), Some(&"application/json".to_string()));
    /// ```
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: Some(body),
            timeout: None,
        }
    }

    /// Builds a body-less GET request.
    ///
    /// Used by model-listing endpoints; pair it with
    /// [`HttpRequest::with_headers`] to stamp authentication.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Overrides the request headers after construction.
    ///
    /// This is useful when providers need to stamp additional headers or replace
    /// authorization metadata before dispatching the request.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// Minimal HTTP response representation.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Converts the body into a UTF-8 string.
    ///
    /// The method consumes the response and returns the decoded string or a
    /// [`LLMError::Transport`] if the payload contains invalid UTF-8.
    ///
    /// # Examples
    ///
    /// ```
    /// use katachi::http::HttpResponse;
    ///
    /// let response = HttpResponse { status: 200, headers: Default::default(), body: b"ok".to_vec() };
    /// assert_eq!(response.into_string().unwrap(), "ok");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::Transport`] when the body cannot be interpreted as UTF-8.
    pub fn into_string(self) -> Result<String, LLMError> {
        String::from_utf8(self.body).map_err(|err| LLMError::transport(err.to_string()))
    }
}

/// HTTP response that carries a streaming body.
pub struct HttpStreamResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: HttpBodyStream,
}

/// Alias for the body stream returned by [`HttpTransport::send_stream`].
pub type HttpBodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, LLMError>> + Send>>;

/// Transport abstraction used to decouple providers from the concrete HTTP client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and resolves when the full response is available.
    ///
    /// # Errors
    ///
    /// Implementations should map transport failures to [`LLMError::Transport`] and other
    /// issues to the appropriate [`LLMError`] variant.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError>;

    /// Sends a request and returns a streaming body.
    ///
    /// # Errors
    ///
    /// Implementations should return [`LLMError::Transport`] for network failures or
    /// propagate provider-specific errors otherwise.
    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError>;
}

/// Thread-safe handle to a transport implementation.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

/// Serializes a body to JSON, attaches headers, and issues a POST request.
///
/// This helper centralizes JSON serialization so each provider can reuse the same logic
/// without duplicating header or error handling.
///
/// # Errors
///
/// Returns [`LLMError::Validation`] if serialization fails or forwards the error raised by
/// [`HttpTransport::send`].
pub async fn post_json_with_headers<T: Serialize>(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    body: &T,
) -> Result<HttpResponse, LLMError> {
    let payload = serde_json::to_vec(body).map_err(|err| LLMError::Validation {
        message: format!("failed to serialize request: {err}"),
    })?;
    let request = HttpRequest::post_json(url, payload).with_headers(headers);
    transport.send(request).await
}

/// Issues a JSON POST request and returns the streaming response.
///
/// The helper mirrors [`post_json_with_headers`] but calls
/// [`HttpTransport::send_stream`] to support Server-Sent Events and similar protocols.
///
/// # Errors
///
/// Returns [`LLMError::Validation`] when serialization fails or propagates any error from
/// [`HttpTransport::send_stream`].
pub async fn post_json_stream_with_headers<T: Serialize>(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    body: &T,
) -> Result<HttpStreamResponse, LLMError> {
    let payload = serde_json::to_vec(body).map_err(|err| LLMError::Validation {
        message: format!("failed to serialize request: {err}"),
    })?;
    let request = HttpRequest::post_json(url, payload).with_headers(headers);
    transport.send_stream(request).await
}

/// Issues a header-stamped GET request.
///
/// # Errors
///
/// Forwards any error raised by [`HttpTransport::send`].
pub async fn get_with_headers(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
) -> Result<HttpResponse, LLMError> {
    let request = HttpRequest::get(url).with_headers(headers);
    transport.send(request).await
}

pub mod reqwest;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::ser;

    /// Transport that panics if `send` or `send_stream` are invoked.
    ///
    /// The helper ensures serialization failures are surfaced before issuing real
    /// network requests.
    struct PanicTransport;

    #[async_trait]
    impl HttpTransport for PanicTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, LLMError> {
            panic!("send should not be called");
        }

        async fn send_stream(&self, _request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
            panic!("send_stream should not be called");
        }
    }

    /// Transport that echoes the request back for header assertions.
    struct EchoTransport;

    #[async_trait]
    impl HttpTransport for EchoTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
            Ok(HttpResponse {
                status: 200,
                headers: request.headers,
                body: request.body.unwrap_or_default(),
            })
        }

        async fn send_stream(&self, _request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
            panic!("streaming is not used in these tests");
        }
    }

    /// Body type that intentionally fails serialization to trigger validation errors.
    struct NonSerializableBody;

    impl Serialize for NonSerializableBody {
        fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            Err(ser::Error::custom(
                "intentional serialization failure for test",
            ))
        }
    }

    #[tokio::test]
    async fn post_json_with_headers_returns_validation_on_serde_error() {
        let transport = PanicTransport;
        let body = NonSerializableBody;
        let headers = HashMap::new();

        let result = post_json_with_headers(&transport, "http://example.com", headers, &body).await;

        match result {
            Err(LLMError::Validation { message }) => {
                assert!(
                    message.contains("failed to serialize request"),
                    "unexpected validation message: {message}"
                );
            }
            Ok(_) => panic!("expected validation error for non serializable body"),
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_with_headers_has_no_body_and_keeps_headers() {
        let transport = EchoTransport;
        let headers = HashMap::from([("x-api-key".to_string(), "secret".to_string())]);

        let response = get_with_headers(&transport, "http://example.com/v1/models", headers)
            .await
            .expect("echo transport always succeeds");

        assert_eq!(response.status, 200);
        assert_eq!(response.headers.get("x-api-key"), Some(&"secret".to_string()));
        assert!(response.body.is_empty());
    }
}
