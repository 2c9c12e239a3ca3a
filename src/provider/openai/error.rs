use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::LLMError;
use crate::provider::ApiError;

/// Parses error responses returned by the OpenAI platform endpoints.
///
/// The vendor body shape is `{"error": {"message", "type", "param", "code"}}`
/// across chat, model, and image routes. Unparseable bodies fall back to the
/// raw text so nothing is silently dropped.
pub(crate) fn parse_openai_error(
    status: u16,
    body: &str,
    headers: HashMap<String, String>,
) -> LLMError {
    openai_api_error(status, body, headers).into_llm_error("openai")
}

pub(crate) fn openai_api_error(
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
        param: Option<String>,
        code: Option<Value>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(error) = parsed.error {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            let mut api_error = ApiError::new(status, message).with_headers(headers);
            if let Some(error_type) = error.error_type {
                api_error = api_error.with_error_type(error_type);
            }
            if let Some(param) = error.param {
                api_error = api_error.with_param(param);
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
