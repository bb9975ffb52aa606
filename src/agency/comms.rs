//! 通信协议：Agent 与 LLM 后端之间的统一出口
//!
//! 每个 Agent 独占一个实例；人格字符串作为 system 消息，
//! 滚动历史在每次成功交互后追加。传输 / 配置错误统一归一为
//! CommsError（message + 面向客户端的状态码），调用方无需感知后端差异。

use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;

use crate::llm::{CompletionOptions, LlmClient, LlmError};
use crate::memory::{ConversationMemory, Message};

/// 统一通信错误：携带原始后端报错与面向客户端的状态码
#[derive(Error, Debug, Clone)]
#[error("communication error ({status_code}): {message}")]
pub struct CommsError {
    pub message: String,
    pub status_code: u16,
}

impl From<LlmError> for CommsError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Config(message) => CommsError {
                message,
                status_code: 400,
            },
            LlmError::Api(message) => CommsError {
                message,
                status_code: 502,
            },
        }
    }
}

/// 单次发送的选项
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    /// 联网增强模式；后端不支持时报配置错误而非静默降级
    pub enriched: bool,
    /// 结构化输出提示（透传给支持 format 的后端）
    pub format: Option<Value>,
}

/// 通信协议：人格 + 滚动历史 + 一个后端客户端
pub struct CommunicationProtocol {
    client: Arc<dyn LlmClient>,
    personality: String,
    history: Mutex<ConversationMemory>,
}

impl CommunicationProtocol {
    pub fn new(client: Arc<dyn LlmClient>, personality: impl Into<String>, history_turns: usize) -> Self {
        Self {
            client,
            personality: personality.into(),
            history: Mutex::new(ConversationMemory::new(history_turns)),
        }
    }

    /// 发送一条消息并返回模型回复文本
    ///
    /// 消息序：system(人格) + 滚动历史 + user(本条)。
    /// 成功后才把 (user, assistant) 追加进历史。
    pub async fn send_prompt(
        &self,
        message: &str,
        sender: &str,
        options: &PromptOptions,
    ) -> Result<String, CommsError> {
        if options.enriched && !self.client.supports_web_search() {
            return Err(CommsError {
                message: "enriched mode is not supported by the configured backend".to_string(),
                status_code: 400,
            });
        }

        let user_content = if sender.is_empty() {
            message.to_string()
        } else {
            format!("[{sender}] {message}")
        };

        let mut messages = vec![Message::system(&self.personality)];
        if let Ok(history) = self.history.lock() {
            messages.extend(history.messages().iter().cloned());
        }
        messages.push(Message::user(&user_content));

        let completion_options = CompletionOptions {
            web_search: options.enriched,
            format: options.format.clone(),
        };

        let reply = self
            .client
            .complete(&messages, &completion_options)
            .await
            .map_err(|e| {
                tracing::warn!(sender, "LLM call failed: {e}");
                CommsError::from(e)
            })?;

        if let Ok(mut history) = self.history.lock() {
            history.record_exchange(&user_content, &reply);
        }
        Ok(reply)
    }

    pub fn clear_history(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.clear();
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().map(|h| h.len()).unwrap_or(0)
    }

    /// 最近 n 条历史的文本快照
    pub fn history_transcript(&self, n: usize) -> String {
        self.history
            .lock()
            .map(|h| h.render_transcript(n))
            .unwrap_or_default()
    }
}
