//! 会话：Agent 级别的命名对话上下文
//!
//! 与通信协议的滚动历史相互独立；会话保存完整交互记录与键值上下文，
//! 每个 Agent 同一时刻至多一个活跃会话。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// 会话内的一次完整交互
#[derive(Debug, Clone)]
pub struct Interaction {
    pub prompt: String,
    pub reply: String,
    pub at: DateTime<Utc>,
}

/// 命名会话：uuid 标识，保存交互历史与键值上下文
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub name: String,
    interactions: Vec<Interaction>,
    context: HashMap<String, Value>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            interactions: Vec::new(),
            context: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn add_interaction(&mut self, prompt: impl Into<String>, reply: impl Into<String>) {
        self.interactions.push(Interaction {
            prompt: prompt.into(),
            reply: reply.into(),
            at: Utc::now(),
        });
    }

    pub fn set_context(&mut self, key: impl Into<String>, value: Value) {
        self.context.insert(key.into(), value);
    }

    pub fn get_context(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// 最近 n 次交互（不足 n 时返回全部）
    pub fn recent_history(&self, n: usize) -> &[Interaction] {
        let start = self.interactions.len().saturating_sub(n);
        &self.interactions[start..]
    }

    pub fn interaction_count(&self) -> usize {
        self.interactions.len()
    }

    /// 一行摘要，用于日志与调试
    pub fn summary(&self) -> String {
        format!(
            "session '{}' ({}): {} interactions since {}, context keys: [{}]",
            self.name,
            self.id,
            self.interactions.len(),
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
            self.context.keys().cloned().collect::<Vec<_>>().join(", "),
        )
    }
}
