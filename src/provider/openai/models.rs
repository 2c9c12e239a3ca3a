use crate::tokens::context_window;
use crate::types::ModelInfo;

use super::types::OpenAiModelList;

/// Maps the `/v1/models` payload into normalized entries.
///
/// Context windows come from the local model table, so unknown or freshly
/// launched ids simply carry `None` instead of a guess.
pub(crate) fn map_model_list(list: OpenAiModelList) -> Vec<ModelInfo> {
    list.data
        .into_iter()
        .map(|entry| {
            let window = context_window(&entry.id);
            ModelInfo {
                context_window: window,
                id: entry.id,
                created: entry.created,
                owned_by: entry.owned_by,
                display_name: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::OpenAiModelEntry;

    #[test]
    fn listing_keeps_order_and_annotates_known_windows() {
        let list = OpenAiModelList {
            data: vec![
                OpenAiModelEntry {
                    id: "gpt-4.1-mini".to_string(),
                    created: Some(1_700_000_000),
                    owned_by: Some("openai".to_string()),
                },
                OpenAiModelEntry {
                    id: "some-internal-model".to_string(),
                    created: None,
                    owned_by: None,
                },
            ],
        };

        let models = map_model_list(list);
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "gpt-4.1-mini");
        assert_eq!(models[0].context_window, Some(1_047_576));
        assert_eq!(models[1].id, "some-internal-model");
        assert_eq!(models[1].context_window, None);
    }
}
