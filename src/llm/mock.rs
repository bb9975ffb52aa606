//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 可预置一串回复按序吐出；队列耗尽后回显最后一条 User 消息。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionOptions, LlmClient, LlmError};
use crate::memory::{Message, Role};

/// Mock 客户端：按序返回预置回复，耗尽后回显用户输入
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    web_search: bool,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(reply.into());
        }
        self
    }

    /// 测试增强模式分支时声明支持联网
    pub fn with_web_search_support(mut self) -> Self {
        self.web_search = true;
        self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn supports_web_search(&self) -> bool {
        self.web_search
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        if options.web_search && !self.web_search {
            return Err(LlmError::Config(
                "web search not supported by the mock backend".to_string(),
            ));
        }

        if let Ok(mut q) = self.replies.lock() {
            if let Some(reply) = q.pop_front() {
                return Ok(reply);
            }
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(format!("Echo from Mock: {last_user}"))
    }
}
