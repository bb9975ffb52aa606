//! Twitter Agent：把预测写成推文并发出
//!
//! 持有 twitter_post 工具（Agency 的工具注册表由此而来）；
//! execute_task 先让模型写文案，超长时截断到 280 字符再发。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map};

use crate::agency::tools::{Tool, TwitterPostTool};
use crate::agency::{Agent, AgentCore, AgentRole, Instructions, PROMPT_ERROR};
use crate::agents::personalities::{
    twitter_tendencies, TWITTER_AGENT_NAME, TWITTER_INSTRUCTIONS,
};
use crate::config::AppConfig;
use crate::llm::LlmClient;

const MAX_TWEET_CHARS: usize = 280;

pub struct TwitterAgent {
    core: AgentCore,
}

impl TwitterAgent {
    pub fn new(
        client: Arc<dyn LlmClient>,
        cfg: &AppConfig,
    ) -> Result<Self, crate::agency::AgencyError> {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(TwitterPostTool::new(&cfg.tools.twitter))];
        let core = AgentCore::new(
            TWITTER_AGENT_NAME,
            Instructions::from(TWITTER_INSTRUCTIONS),
            AgentRole::Crew,
            Some(twitter_tendencies()),
            tools,
            client,
            cfg.comms.history_turns,
        )?;
        Ok(Self { core })
    }

    fn truncate_tweet(text: &str) -> String {
        let text = text.trim();
        if text.chars().count() <= MAX_TWEET_CHARS {
            return text.to_string();
        }
        let cut: String = text.chars().take(MAX_TWEET_CHARS - 3).collect();
        format!("{cut}...")
    }

    /// 写文案并发帖；返回面向编排层的结果描述
    pub async fn compose_and_post(&self, topic: &str) -> String {
        let prompt = format!(
            "Write one tweet (max 280 characters, plain text, no quotes around it) about: {topic}"
        );
        let draft = self.core.prompt(&prompt, "system").await;
        if draft == PROMPT_ERROR {
            return "could not draft a tweet: language model unavailable".to_string();
        }
        let text = Self::truncate_tweet(&draft);

        let tool = match self.core.tools().iter().find(|t| t.name() == "twitter_post") {
            Some(tool) => Arc::clone(tool),
            None => return "twitter_post tool is not configured".to_string(),
        };
        let mut args = Map::new();
        args.insert("text".into(), json!(text));
        let result = tool.execute(&args).await;
        if result.success {
            format!("posted tweet: {text}")
        } else {
            let reason = result.error.unwrap_or_else(|| "unknown error".to_string());
            tracing::warn!(%reason, "tweet failed");
            format!("failed to post tweet: {reason}")
        }
    }
}

#[async_trait]
impl Agent for TwitterAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn execute_task(self: Arc<Self>) -> String {
        self.compose_and_post("today's NBA predictions").await
    }
}
