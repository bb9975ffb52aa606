//! Twitter 发帖工具
//!
//! Bearer Token 从环境变量 TWITTER_BEARER_TOKEN 读取；
//! 发帖前检查非空与 280 字符上限。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

use crate::agency::tools::{Tool, ToolResult};
use crate::config::TwitterSection;

const MAX_TWEET_CHARS: usize = 280;

/// Twitter 发帖工具：POST {api_base}/tweets
pub struct TwitterPostTool {
    client: Client,
    api_base: String,
}

impl TwitterPostTool {
    pub fn new(cfg: &TwitterSection) -> Self {
        Self {
            client: Client::new(),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn validate_text(text: &str) -> Result<(), String> {
        if text.trim().is_empty() {
            return Err("Tweet text is empty".to_string());
        }
        let chars = text.chars().count();
        if chars > MAX_TWEET_CHARS {
            return Err(format!(
                "Tweet is {} chars, limit is {}",
                chars, MAX_TWEET_CHARS
            ));
        }
        Ok(())
    }

    async fn post(&self, text: &str) -> Result<Value, String> {
        Self::validate_text(text)?;
        let token = std::env::var("TWITTER_BEARER_TOKEN")
            .map_err(|_| "TWITTER_BEARER_TOKEN not set".to_string())?;

        let url = format!("{}/tweets", self.api_base);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({"text": text}))
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status, body));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| format!("Decode response: {}", e))
    }
}

#[async_trait]
impl Tool for TwitterPostTool {
    fn name(&self) -> &str {
        "twitter_post"
    }

    fn description(&self) -> &str {
        "Post a tweet (max 280 chars). Args: {\"text\": \"...\"}."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "Tweet body, 1-280 characters"}
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, args: &Map<String, Value>) -> ToolResult {
        let text = args.get("text").and_then(|v| v.as_str()).unwrap_or("");
        if let Err(e) = Self::validate_text(text) {
            return ToolResult::fail(e);
        }
        tracing::info!(chars = text.chars().count(), "posting tweet");
        match self.post(text).await {
            Ok(data) => ToolResult::ok(data),
            Err(e) => ToolResult::fail(e),
        }
    }
}
