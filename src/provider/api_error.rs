use std::collections::HashMap;
use std::time::Duration;

use crate::error::{LLMError, extract_model_identifier, looks_like_token_limit_error};

/// Classification buckets for vendor HTTP failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 400/422: the request payload was rejected.
    InvalidRequest,
    /// 401: missing or invalid credentials.
    Authentication,
    /// 403: valid credentials without access to the resource.
    Permission,
    /// 404: unknown route, resource, or model.
    NotFound,
    /// 429: the provider throttled the request.
    RateLimit,
    /// 5xx: upstream failure.
    ServerError,
    /// Anything else, including synthetic status 0 transport wrappers.
    Unknown,
}

impl ApiErrorKind {
    /// Machine-readable name of the bucket.
    pub fn as_str(self) -> &'static str {
        match self {
            ApiErrorKind::InvalidRequest => "invalid_request",
            ApiErrorKind::Authentication => "authentication",
            ApiErrorKind::Permission => "permission",
            ApiErrorKind::NotFound => "not_found",
            ApiErrorKind::RateLimit => "rate_limit",
            ApiErrorKind::ServerError => "server_error",
            ApiErrorKind::Unknown => "unknown",
        }
    }
}

/// Typed error constructed from a vendor HTTP response.
///
/// Every provider funnels its failure paths through this type before
/// converting into the crate-wide [`LLMError`] taxonomy, so classification,
/// retryability, and `Retry-After` handling behave identically across vendors.
/// Transport failures and unparseable bodies use the synthetic status `0`
/// rather than escaping as raw transport exceptions.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code; `0` for transport-level failures.
    pub status: u16,
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable error type reported by the vendor, when present.
    pub error_type: Option<String>,
    /// Offending request parameter, when the vendor names one.
    pub param: Option<String>,
    /// Vendor-specific machine code, when present.
    pub code: Option<String>,
    /// Response headers, kept for `Retry-After` and diagnostics.
    pub headers: HashMap<String, String>,
}

impl ApiError {
    /// Builds an error from a status code and message.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_type: None,
            param: None,
            code: None,
            headers: HashMap::new(),
        }
    }

    /// Wraps a transport-level failure with the synthetic status `0`.
    pub fn from_transport(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    /// Attaches the vendor's machine-readable error type.
    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    /// Attaches the offending parameter name.
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    /// Attaches the vendor-specific machine code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attaches the response headers.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Classifies the failure by HTTP status.
    pub fn kind(&self) -> ApiErrorKind {
        match self.status {
            400 | 422 => ApiErrorKind::InvalidRequest,
            401 => ApiErrorKind::Authentication,
            403 => ApiErrorKind::Permission,
            404 => ApiErrorKind::NotFound,
            429 => ApiErrorKind::RateLimit,
            status if (500..600).contains(&status) => ApiErrorKind::ServerError,
            _ => ApiErrorKind::Unknown,
        }
    }

    /// Whether the caller may reasonably retry: rate limits and 5xx only.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ApiErrorKind::RateLimit | ApiErrorKind::ServerError
        )
    }

    /// Extracts the numeric `Retry-After` header as a duration in seconds.
    ///
    /// HTTP-date values are ignored because vendors primarily use the numeric
    /// form.
    pub fn retry_after(&self) -> Option<Duration> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
            .and_then(|(_, value)| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Converts into the crate-wide error taxonomy.
    ///
    /// Token-limit phrasing is sniffed from the code and message before the
    /// status buckets apply, so context-window overflows keep their dedicated
    /// variant regardless of vendor status-code choices.
    pub fn into_llm_error(self, provider: &'static str) -> LLMError {
        let message = match (&self.code, &self.param) {
            (Some(code), Some(param)) => format!("{} ({code}, param {param})", self.message),
            (Some(code), None) => format!("{} ({code})", self.message),
            (None, Some(param)) => format!("{} (param {param})", self.message),
            (None, None) => self.message.clone(),
        };

        if looks_like_token_limit_error(self.code.as_deref(), &message) {
            return LLMError::TokenLimitExceeded {
                message,
                estimated: None,
                limit: None,
            };
        }

        match self.kind() {
            ApiErrorKind::Authentication | ApiErrorKind::Permission => LLMError::Auth { message },
            ApiErrorKind::RateLimit => LLMError::RateLimit {
                retry_after: self.retry_after(),
                message,
            },
            ApiErrorKind::InvalidRequest => LLMError::Validation { message },
            ApiErrorKind::NotFound => LLMError::ModelNotFound {
                model: extract_model_identifier(&message),
                message,
            },
            ApiErrorKind::ServerError => LLMError::Provider { provider, message },
            ApiErrorKind::Unknown => {
                if self.status == 0 {
                    LLMError::Transport { message }
                } else {
                    LLMError::Provider { provider, message }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_covers_every_bucket() {
        assert_eq!(ApiError::new(400, "x").kind(), ApiErrorKind::InvalidRequest);
        assert_eq!(ApiError::new(422, "x").kind(), ApiErrorKind::InvalidRequest);
        assert_eq!(ApiError::new(401, "x").kind(), ApiErrorKind::Authentication);
        assert_eq!(ApiError::new(403, "x").kind(), ApiErrorKind::Permission);
        assert_eq!(ApiError::new(404, "x").kind(), ApiErrorKind::NotFound);
        assert_eq!(ApiError::new(429, "x").kind(), ApiErrorKind::RateLimit);
        assert_eq!(ApiError::new(500, "x").kind(), ApiErrorKind::ServerError);
        assert_eq!(ApiError::new(503, "x").kind(), ApiErrorKind::ServerError);
        assert_eq!(ApiError::new(0, "x").kind(), ApiErrorKind::Unknown);
        assert_eq!(ApiError::new(302, "x").kind(), ApiErrorKind::Unknown);
    }

    #[test]
    fn only_rate_limit_and_server_errors_are_retryable() {
        assert!(ApiError::new(429, "x").is_retryable());
        assert!(ApiError::new(502, "x").is_retryable());
        assert!(!ApiError::new(400, "x").is_retryable());
        assert!(!ApiError::new(401, "x").is_retryable());
        assert!(!ApiError::new(0, "x").is_retryable());
    }

    #[test]
    fn retry_after_parses_numeric_header_case_insensitively() {
        let error = ApiError::new(429, "slow down")
            .with_headers(HashMap::from([("Retry-After".to_string(), "7".to_string())]));
        assert_eq!(error.retry_after(), Some(Duration::from_secs(7)));

        let error = ApiError::new(429, "slow down").with_headers(HashMap::from([(
            "retry-after".to_string(),
            " 12 ".to_string(),
        )]));
        assert_eq!(error.retry_after(), Some(Duration::from_secs(12)));

        let error = ApiError::new(429, "slow down").with_headers(HashMap::from([(
            "Retry-After".to_string(),
            "Wed, 21 Oct 2026 07:28:00 GMT".to_string(),
        )]));
        assert_eq!(error.retry_after(), None);
    }

    #[test]
    fn conversion_maps_buckets_into_llm_error_variants() {
        let err = ApiError::new(401, "bad key").into_llm_error("openai");
        assert!(matches!(err, LLMError::Auth { .. }));

        let err = ApiError::new(429, "throttled")
            .with_headers(HashMap::from([("Retry-After".to_string(), "3".to_string())]))
            .into_llm_error("openai");
        match err {
            LLMError::RateLimit { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(3)));
            }
            other => panic!("expected RateLimit, got {other:?}"),
        }

        let err = ApiError::new(404, "The model `claude-bogus` was not found")
            .into_llm_error("anthropic");
        match err {
            LLMError::ModelNotFound { model, .. } => {
                assert_eq!(model.as_deref(), Some("claude-bogus"));
            }
            other => panic!("expected ModelNotFound, got {other:?}"),
        }

        let err = ApiError::from_transport("connection reset").into_llm_error("openai");
        assert!(matches!(err, LLMError::Transport { .. }));
    }

    #[test]
    fn token_limit_sniffing_wins_over_status_bucket() {
        let err = ApiError::new(400, "Request prompt is too long for the context window")
            .with_code("context_length_exceeded")
            .into_llm_error("anthropic");
        assert!(matches!(err, LLMError::TokenLimitExceeded { .. }));
    }

    #[test]
    fn message_formatting_includes_code_and_param() {
        let error = ApiError::new(400, "unknown field")
            .with_code("invalid_value")
            .with_param("temperature");
        let err = error.into_llm_error("openai");
        match err {
            LLMError::Validation { message } => {
                assert!(message.contains("invalid_value"));
                assert!(message.contains("param temperature"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
