use serde_json::{Map, Value};

use crate::error::LLMError;
use crate::types::{GeneratedImage, ImagePayload, ImageRequest, ImageResponse, ProviderMetadata};

use super::types::OpenAiImageGenerationResponse;

/// Builds the `/v1/images/generations` request body.
pub(crate) fn build_image_body(request: &ImageRequest, model: &str) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert("prompt".to_string(), Value::String(request.prompt.clone()));
    if let Some(count) = request.count {
        body.insert("n".to_string(), Value::from(count));
    }
    if let Some(size) = &request.size {
        body.insert("size".to_string(), Value::String(size.clone()));
    }
    if let Some(quality) = &request.quality {
        body.insert("quality".to_string(), Value::String(quality.clone()));
    }
    for (k, v) in &request.extra {
        body.insert(k.clone(), v.clone());
    }
    Value::Object(body)
}

/// Maps the generation payload into the normalized response.
pub(crate) fn map_image_response(
    resp: OpenAiImageGenerationResponse,
    model: &str,
    provider: &'static str,
    endpoint: String,
) -> Result<ImageResponse, LLMError> {
    let raw = serde_json::to_value(&resp).ok();
    let mut images = Vec::new();
    for datum in resp.data {
        let payload = match (datum.url, datum.b64_json) {
            (Some(url), _) => ImagePayload::Url { url },
            (None, Some(data)) => ImagePayload::Base64 { data },
            (None, None) => {
                return Err(LLMError::Provider {
                    provider,
                    message: "image entry carries neither url nor b64_json".to_string(),
                });
            }
        };
        images.push(GeneratedImage {
            payload,
            revised_prompt: datum.revised_prompt,
        });
    }
    Ok(ImageResponse {
        images,
        model: Some(model.to_string()),
        provider: ProviderMetadata {
            provider: provider.to_string(),
            request_id: None,
            endpoint: Some(endpoint),
            raw,
        },
    })
}
