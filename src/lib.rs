//! LLM 多后端统一调用库 附带结构化抽取的运行时 Schema 层

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod provider;
pub mod schema;
pub mod stream;
pub mod tokens;
pub mod types;

pub use client::LLMClient;
pub use error::LLMError;
pub use extract::{ExtractOptions, extract_structured};
pub use provider::{ChatStream, LLMProvider};
pub use schema::{SchemaBuilder, SchemaInstance, SchemaType};
pub use types::*;
