use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::LLMError;
use crate::provider::ApiError;

/// Parses error responses returned by the Anthropic API.
///
/// The vendor wraps failures as `{"type":"error","error":{"type","message"}}`;
/// the inner machine type (`authentication_error`, `rate_limit_error`, ...)
/// lands in [`ApiError::error_type`] while status drives classification.
pub(crate) fn parse_anthropic_error(
    status: u16,
    body: &str,
    headers: HashMap<String, String>,
) -> LLMError {
    anthropic_api_error(status, body, headers).into_llm_error("anthropic")
}

pub(crate) fn anthropic_api_error(
    status: u16,
    body: &str,
    headers: HashMap<String, String>,
) -> ApiError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        #[serde(rename = "type")]
        error_type: Option<String>,
        code: Option<Value>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(error) = parsed.error {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            let mut api_error = ApiError::new(status, message).with_headers(headers);
            if let Some(error_type) = error.error_type {
                api_error = api_error.with_error_type(error_type);
            }
            if let Some(code) = error.code {
                let code = match code {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                api_error = api_error.with_code(code);
            }
            return api_error;
        }
    }

    ApiError::new(status, format!("status {status}: {body}")).with_headers(headers)
}
