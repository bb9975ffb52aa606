//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Ollama / Mock）
//!
//! 后端由配置在构造时显式选定（create_client_from_config），
//! 通信协议层只看到 LlmClient trait。

use std::sync::Arc;

pub mod deepseek;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod traits;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT};
pub use mock::MockLlmClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use traits::{CompletionOptions, LlmClient, LlmError};

use crate::config::AppConfig;

/// 根据配置创建 LLM 客户端；凭证缺失时退回 Mock（便于离线跑通流程）
pub fn create_client_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    match provider.as_str() {
        "deepseek" if std::env::var("DEEPSEEK_API_KEY").is_ok() => {
            tracing::info!("Using DeepSeek LLM ({})", cfg.llm.model);
            Arc::new(create_deepseek_client(Some(&cfg.llm.model)))
        }
        "openai" if std::env::var("OPENAI_API_KEY").is_ok() => {
            tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
            let mut client = OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                std::env::var("OPENAI_API_KEY").ok().as_deref(),
            );
            if let Some(search_model) = &cfg.llm.search_model {
                client = client.with_search_model(search_model);
            }
            Arc::new(client)
        }
        "ollama" => {
            tracing::info!("Using Ollama LLM ({})", cfg.llm.model);
            Arc::new(OllamaClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                cfg.llm.request_timeout_secs,
            ))
        }
        _ => {
            tracing::warn!("No API key set or provider unknown, using Mock LLM");
            Arc::new(MockLlmClient::new())
        }
    }
}
