//! Anthropic 平台接入 覆盖 Messages / Models 两个端点
mod error;
mod models;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::AnthropicProvider;
