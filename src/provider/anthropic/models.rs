use crate::tokens::context_window;
use crate::types::ModelInfo;

use super::types::AnthropicModelList;

/// Maps the `/v1/models` payload into normalized entries.
///
/// Anthropic reports `created_at` as an RFC 3339 string, which does not fit
/// the normalized Unix-seconds field, so `created` stays empty; the display
/// name and the local context-window table carry the useful metadata.
pub(crate) fn map_model_list(list: AnthropicModelList) -> Vec<ModelInfo> {
    list.data
        .into_iter()
        .map(|entry| {
            let window = context_window(&entry.id);
            ModelInfo {
                context_window: window,
                id: entry.id,
                created: None,
                owned_by: Some("anthropic".to_string()),
                display_name: entry.display_name,
            }
        })
        .collect()
}
