//! 本地 Ollama 客户端
//!
//! POST {base_url}/api/generate，stream=false；支持 format 参数做结构化输出提示。
//! 不支持联网增强模式。

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::llm::{CompletionOptions, LlmClient, LlmError};
use crate::memory::Message;

pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Ollama 客户端：消息列表拼为单段 prompt 后走 generate 端点
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<&str>, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.unwrap_or(OLLAMA_DEFAULT_URL).to_string(),
            model: model.to_string(),
        }
    }

    fn render_prompt(messages: &[Message]) -> String {
        messages
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        if options.web_search {
            return Err(LlmError::Config(
                "web search not supported by the ollama backend".to_string(),
            ));
        }

        let url = format!("{}/api/generate", self.base_url);
        let mut body = json!({
            "model": self.model,
            "prompt": Self::render_prompt(messages),
            "stream": false,
        });
        if let Some(format) = &options.format {
            body["format"] = format.clone();
        }

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Api(format!("ollama request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(LlmError::Api(format!("ollama HTTP {}", resp.status())));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Api(format!("ollama response decode failed: {e}")))?;
        Ok(parsed.response)
    }
}
