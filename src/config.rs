use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::LLMClient;
use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::provider::DynProvider;
use crate::provider::anthropic::AnthropicProvider;
use crate::provider::openai::OpenAiProvider;

/// 模型配置 描述一个可调用后端
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// 自定义句柄 例如 `default-openai`
    pub handle: String,
    pub provider: ProviderKind,
    pub credential: Credential,
    pub default_model: Option<String>,
    pub base_url: Option<String>,
    /// 附加设置 例如 organization 或 version
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

/// 供应商类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

/// 鉴权信息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    /// 简单 API Key
    ApiKey {
        /// header 名称 留空时按 provider 默认
        header: Option<String>,
        /// 密钥
        key: String,
    },
    /// Bearer Token
    Bearer { token: String },
    /// 无需鉴权的本地 provider
    None,
}

/// 根据一组模型配置构建 LLMClient
pub fn build_client_from_configs(
    configs: &[ModelConfig],
    transport: DynHttpTransport,
) -> Result<LLMClient, LLMError> {
    let mut builder = LLMClient::builder();

    for config in configs {
        let provider = build_provider_from_config(config, transport.clone())?;
        builder = builder.register_handle(config.handle.clone(), provider);
    }

    Ok(builder.build())
}

fn build_provider_from_config(
    config: &ModelConfig,
    transport: DynHttpTransport,
) -> Result<DynProvider, LLMError> {
    let provider: DynProvider = match config.provider {
        ProviderKind::OpenAi => {
            let api_key = extract_api_key(&config.credential, "openai")?;
            let mut provider = OpenAiProvider::new(transport, api_key);

            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            if let Some(model) = &config.default_model {
                provider = provider.with_default_model(model.clone());
            }

            if let Some(Value::String(org)) = config.extra.get("organization") {
                provider = provider.with_organization(org.clone());
            }
            if let Some(Value::String(project)) = config.extra.get("project") {
                provider = provider.with_project(project.clone());
            }

            Arc::new(provider)
        }
        ProviderKind::Anthropic => {
            let api_key = extract_api_key(&config.credential, "anthropic")?;
            let mut provider = AnthropicProvider::new(transport, api_key);

            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            if let Some(model) = &config.default_model {
                provider = provider.with_default_model(model.clone());
            }

            if let Some(Value::String(version)) = config.extra.get("version") {
                provider = provider.with_version(version.clone());
            }
            if let Some(Value::String(beta)) = config.extra.get("beta") {
                provider = provider.with_beta(beta.clone());
            }

            Arc::new(provider)
        }
    };

    Ok(provider)
}

fn extract_api_key(credential: &Credential, provider: &'static str) -> Result<String, LLMError> {
    match credential {
        Credential::ApiKey { key, .. } => Ok(key.clone()),
        Credential::Bearer { token } => Ok(token.clone()),
        Credential::None => Err(LLMError::Auth {
            message: format!("provider {provider} requires credential"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::reqwest::default_dyn_transport;

    /// 验证所有 ProviderKind 分支都可以被构建并注册到 LLMClient
    #[test]
    fn build_client_from_configs_supports_all_providers() {
        let transport = default_dyn_transport().expect("transport");

        let configs = vec![
            ModelConfig {
                handle: "openai-default".to_string(),
                provider: ProviderKind::OpenAi,
                credential: Credential::ApiKey {
                    header: None,
                    key: "test-key-openai".to_string(),
                },
                default_model: Some("gpt-4.1-mini".to_string()),
                base_url: None,
                extra: HashMap::new(),
            },
            ModelConfig {
                handle: "anthropic-default".to_string(),
                provider: ProviderKind::Anthropic,
                credential: Credential::ApiKey {
                    header: None,
                    key: "test-key-anthropic".to_string(),
                },
                default_model: Some("claude-3-5-sonnet-20241022".to_string()),
                base_url: None,
                extra: HashMap::new(),
            },
        ];

        let client = build_client_from_configs(&configs, transport).expect("client");
        let mut handles = client.handles();
        handles.sort();

        assert_eq!(
            handles,
            vec![
                "anthropic-default".to_string(),
                "openai-default".to_string(),
            ]
        );
    }

    #[test]
    fn build_client_from_configs_requires_credential() {
        let transport = default_dyn_transport().expect("transport");

        let configs = vec![ModelConfig {
            handle: "openai-no-cred".to_string(),
            provider: ProviderKind::OpenAi,
            credential: Credential::None,
            default_model: None,
            base_url: None,
            extra: HashMap::new(),
        }];

        let result = build_client_from_configs(&configs, transport);
        let error = match result {
            Ok(_) => panic!("expected auth error"),
            Err(err) => err,
        };
        match error {
            LLMError::Auth { message } => {
                assert!(
                    message.contains("openai"),
                    "unexpected auth message: {message}"
                );
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    /// Bearer Token 凭证应当被接受并构建成功
    #[test]
    fn build_client_from_configs_accepts_bearer_token() {
        let transport = default_dyn_transport().expect("transport");

        let configs = vec![ModelConfig {
            handle: "openai-bearer".to_string(),
            provider: ProviderKind::OpenAi,
            credential: Credential::Bearer {
                token: "test-bearer-token".to_string(),
            },
            default_model: Some("gpt-4.1-mini".to_string()),
            base_url: None,
            extra: HashMap::new(),
        }];

        let result = build_client_from_configs(&configs, transport);
        if let Err(err) = result {
            panic!("expected ok for bearer token but got error: {err:?}");
        }
    }

    /// extra 中的 anthropic version/beta 应当被透传
    #[test]
    fn build_client_passes_anthropic_extras() {
        let transport = default_dyn_transport().expect("transport");

        let configs = vec![ModelConfig {
            handle: "anthropic-beta".to_string(),
            provider: ProviderKind::Anthropic,
            credential: Credential::ApiKey {
                header: None,
                key: "test-key".to_string(),
            },
            default_model: Some("claude-3-5-haiku-20241022".to_string()),
            base_url: None,
            extra: HashMap::from([
                ("version".to_string(), Value::String("2023-06-01".to_string())),
                (
                    "beta".to_string(),
                    Value::String("tools-2024-05-16".to_string()),
                ),
            ]),
        }];

        let client = build_client_from_configs(&configs, transport).expect("client");
        assert_eq!(client.handles(), vec!["anthropic-beta".to_string()]);
    }
}
