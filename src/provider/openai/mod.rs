//! OpenAI 平台接入 覆盖 Chat Completions / Models / Images 三个端点
mod error;
mod images;
mod models;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::OpenAiProvider;
