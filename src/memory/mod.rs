//! 短期记忆：Agent 通信协议的滚动对话历史
//!
//! 保留最近 N 轮交互（user/assistant 对），超出时自动剪枝；
//! 每个 CommunicationProtocol 实例独占一份，不跨 Agent 共享。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// 滚动对话历史：最近 N 轮（每轮 user + assistant，故实际保留约 max_turns*2 条）
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    messages: Vec<Message>,
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_turns,
        }
    }

    /// 记录一次完整交互（先 user 后 assistant），保持调用序
    pub fn record_exchange(&mut self, prompt: impl Into<String>, reply: impl Into<String>) {
        self.messages.push(Message::user(prompt));
        self.messages.push(Message::assistant(reply));
        self.prune();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 最近 n 条消息的 `role: content` 文本，用于拼 prompt 上下文
    pub fn render_transcript(&self, n: usize) -> String {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..]
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// 超出 max_turns*2 时丢弃最旧的消息
    fn prune(&mut self) {
        let keep = self.max_turns * 2;
        if self.messages.len() > keep {
            self.messages.drain(..self.messages.len() - keep);
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_order_and_prune() {
        let mut mem = ConversationMemory::new(2);
        mem.record_exchange("q1", "a1");
        mem.record_exchange("q2", "a2");
        mem.record_exchange("q3", "a3");
        // 上限 2 轮：q1/a1 被剪枝
        assert_eq!(mem.len(), 4);
        assert_eq!(mem.messages()[0].content, "q2");
        assert_eq!(mem.messages()[3].content, "a3");
    }

    #[test]
    fn test_render_transcript() {
        let mut mem = ConversationMemory::new(5);
        mem.record_exchange("hello", "hi there");
        let transcript = mem.render_transcript(10);
        assert!(transcript.contains("user: hello"));
        assert!(transcript.contains("assistant: hi there"));
    }
}
