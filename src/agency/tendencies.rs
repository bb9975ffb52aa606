//! 性格倾向：注入到系统提示词的结构化人格配置
//!
//! 标量特质限定在 0–1 区间，触发词必须是单个单词；
//! 除范围与形状检查外不做语义校验。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TendencyError {
    #[error("trait '{name}' out of range: {value} (expected 0.0..=1.0)")]
    TraitOutOfRange { name: String, value: f64 },

    #[error("trigger word '{0}' must be a single word")]
    MultiWordTrigger(String),
}

/// 性格倾向集合：标量特质 + 自由文本列表 + 触发词
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tendencies {
    /// 0–1 标量特质（如 analytical、risk_tolerance）
    pub traits: BTreeMap<String, f64>,
    pub core_values: Vec<String>,
    pub goals: Vec<String>,
    pub fears: Vec<String>,
    /// 单个单词的触发词
    pub trigger_words: Vec<String>,
}

impl Tendencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trait(mut self, name: impl Into<String>, value: f64) -> Self {
        self.traits.insert(name.into(), value);
        self
    }

    pub fn with_core_values(mut self, values: &[&str]) -> Self {
        self.core_values = values.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_goals(mut self, goals: &[&str]) -> Self {
        self.goals = goals.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_fears(mut self, fears: &[&str]) -> Self {
        self.fears = fears.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_trigger_words(mut self, words: &[&str]) -> Self {
        self.trigger_words = words.iter().map(|s| s.to_string()).collect();
        self
    }

    /// 范围与形状检查：特质 0–1，触发词单词
    pub fn validate(&self) -> Result<(), TendencyError> {
        for (name, value) in &self.traits {
            if !(0.0..=1.0).contains(value) {
                return Err(TendencyError::TraitOutOfRange {
                    name: name.clone(),
                    value: *value,
                });
            }
        }
        for word in &self.trigger_words {
            if word.trim().is_empty() || word.trim().contains(char::is_whitespace) {
                return Err(TendencyError::MultiWordTrigger(word.clone()));
            }
        }
        Ok(())
    }

    /// 展平为提示词文本段（人格注入）
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.traits.is_empty() {
            let traits = self
                .traits
                .iter()
                .map(|(k, v)| format!("{k}: {v:.2}"))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("Personality traits (0-1 scale): {traits}."));
        }
        if !self.core_values.is_empty() {
            parts.push(format!("Core values: {}.", self.core_values.join(", ")));
        }
        if !self.goals.is_empty() {
            parts.push(format!("Goals: {}.", self.goals.join(", ")));
        }
        if !self.fears.is_empty() {
            parts.push(format!("Fears: {}.", self.fears.join(", ")));
        }
        if !self.trigger_words.is_empty() {
            parts.push(format!(
                "Trigger words: {}.",
                self.trigger_words.join(", ")
            ));
        }
        parts.join("\n")
    }
}
