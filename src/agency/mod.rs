//! Agency 编排层：Agent 注册表、消息路由与运行循环
//!
//! 构造时要求恰好一个 pilot；工具注册表取第一个非空工具列表
//! （单注册表简化，多 Agent 聚合留作扩展）。run 先让推理引擎决策，
//! 再驱动持有该工具的 worker 走一轮反馈协议；worker 失败以
//! gather 风格收进结果列表，不中断兄弟任务。

pub mod agent;
pub mod comms;
pub mod reasoning;
pub mod retrievers;
pub mod session;
pub mod tendencies;
pub mod tools;

pub use agent::{Agent, AgentCore, AgentRole, AgentRun, Instructions, RunState, PROMPT_ERROR};
pub use comms::{CommsError, CommunicationProtocol, PromptOptions};
pub use reasoning::{ActionPlan, ReasonOutcome, ReasonerContext, ReasoningEngine};
pub use retrievers::{RetrievalResult, Retriever};
pub use session::Session;
pub use tendencies::{Tendencies, TendencyError};
pub use tools::{Tool, ToolRegistry, ToolResult};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::future::join_all;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgencyError {
    #[error("agency requires exactly one pilot agent, found none")]
    NoPilot,

    #[error("agency requires exactly one pilot agent, found {0}")]
    MultiplePilots(usize),

    #[error("duplicate agent name: {0}")]
    DuplicateAgent(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("no agent owns tool: {0}")]
    NoAgentForTool(String),

    #[error("no plan: {0}")]
    NoPlan(String),

    #[error(transparent)]
    Tendencies(#[from] TendencyError),
}

/// Agency：按名索引的 Agent 注册表与共享上下文
pub struct Agency {
    agents: HashMap<String, Arc<dyn Agent>>,
    order: Vec<String>,
    pilot_name: String,
    registry: ToolRegistry,
    context: Mutex<HashMap<String, Value>>,
    feedback_rounds: u32,
}

impl Agency {
    /// 从 Agent 列表构造；零个或多个 pilot 都在此失败
    pub fn new(agents: Vec<Arc<dyn Agent>>) -> Result<Self, AgencyError> {
        let mut by_name: HashMap<String, Arc<dyn Agent>> = HashMap::new();
        let mut order = Vec::new();
        let mut pilots = Vec::new();

        for agent in agents {
            let name = agent.name().to_string();
            if by_name.contains_key(&name) {
                return Err(AgencyError::DuplicateAgent(name));
            }
            if agent.role() == AgentRole::Pilot {
                pilots.push(name.clone());
            }
            order.push(name.clone());
            by_name.insert(name, agent);
        }

        let pilot_name = match pilots.len() {
            0 => return Err(AgencyError::NoPilot),
            1 => pilots.remove(0),
            n => return Err(AgencyError::MultiplePilots(n)),
        };

        // 第一个非空工具列表作为引擎注册表
        let registry = order
            .iter()
            .filter_map(|name| by_name.get(name))
            .map(|a| a.tools())
            .find(|tools| !tools.is_empty())
            .map(ToolRegistry::from_tools)
            .unwrap_or_default();

        Ok(Self {
            agents: by_name,
            order,
            pilot_name,
            registry,
            context: Mutex::new(HashMap::new()),
            feedback_rounds: 1,
        })
    }

    pub fn with_feedback_rounds(mut self, rounds: u32) -> Self {
        self.feedback_rounds = rounds;
        self
    }

    pub fn pilot(&self) -> Arc<dyn Agent> {
        Arc::clone(&self.agents[&self.pilot_name])
    }

    pub fn agent(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn agent_names(&self) -> &[String] {
        &self.order
    }

    /// 路由消息：指定接收方未注册时返回显式提示文本；未指定时发给 pilot
    pub async fn send_message(
        &self,
        sender: &str,
        message: &str,
        receiver: Option<&str>,
    ) -> String {
        match receiver {
            Some(name) => match self.agents.get(name) {
                Some(agent) => agent.prompt(message, sender).await,
                None => format!("Agent {name} not found in agency."),
            },
            None => self.pilot().prompt(message, sender).await,
        }
    }

    /// 编排层草稿板；不会自动推入任何 Agent 的会话或历史
    pub fn update_context(&self, key: impl Into<String>, value: Value) {
        if let Ok(mut ctx) = self.context.lock() {
            ctx.insert(key.into(), value);
        }
    }

    pub fn context_value(&self, key: &str) -> Option<Value> {
        self.context.lock().ok()?.get(key).cloned()
    }

    /// 按注册顺序找到第一个持有指定工具的 Agent
    pub fn find_agent_by_tool(&self, tool_name: &str) -> Option<Arc<dyn Agent>> {
        self.order
            .iter()
            .filter_map(|name| self.agents.get(name))
            .find(|a| a.tools().iter().any(|t| t.name() == tool_name))
            .cloned()
    }

    /// 运行入口：pilot 决策 -> 解析 worker -> 驱动反馈协议
    ///
    /// 当前每次只解析出一个 worker；join_all 的执行形态为将来的
    /// 多 worker 并发保留，失败作为结果项返回而非中断。
    pub async fn run(&self, starting_prompt: &str) -> Vec<Result<String, AgencyError>> {
        let mut engine = ReasoningEngine::new(self.pilot(), self.registry.clone());
        let plan = match engine.reason(starting_prompt).await {
            ReasonOutcome::Plan { plan, reason } => {
                tracing::info!(tool = %plan.tool_name, priority = plan.priority, %reason, "pilot decided");
                plan
            }
            ReasonOutcome::NoPlan { message } => {
                tracing::warn!(%message, "pilot produced no plan");
                return vec![Err(AgencyError::NoPlan(message))];
            }
        };

        let worker = match self.find_agent_by_tool(&plan.tool_name) {
            Some(worker) => worker,
            None => return vec![Err(AgencyError::NoAgentForTool(plan.tool_name))],
        };

        let futures = vec![self.process_agent(worker)];
        join_all(futures).await
    }

    /// 驱动一个 worker：执行任务、把结果转给 pilot、回灌一轮反馈
    async fn process_agent(&self, agent: Arc<dyn Agent>) -> Result<String, AgencyError> {
        let worker_name = agent.name().to_string();
        let mut run = AgentRun::with_feedback_rounds(agent, self.feedback_rounds);

        let mut last = match run.step().await {
            Some(result) => result,
            None => return Ok(String::new()),
        };

        while !run.is_done() {
            let pilot_reply = self.send_message(&worker_name, &last, None).await;
            match run.feedback(&pilot_reply).await {
                Some(revised) => last = revised,
                None => break,
            }
        }
        Ok(last)
    }

    /// 工具注册表快照（主要用于诊断与测试）
    pub fn tool_names(&self) -> Vec<String> {
        self.registry.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use async_trait::async_trait;
    use serde_json::{json, Map};

    struct TestAgent {
        core: AgentCore,
        task_result: String,
    }

    #[async_trait]
    impl Agent for TestAgent {
        fn core(&self) -> &AgentCore {
            &self.core
        }

        async fn execute_task(self: Arc<Self>) -> String {
            self.task_result.clone()
        }
    }

    struct DummyTool;

    #[async_trait]
    impl Tool for DummyTool {
        fn name(&self) -> &str {
            "dummy"
        }

        fn description(&self) -> &str {
            "does nothing"
        }

        async fn execute(&self, _args: &Map<String, Value>) -> ToolResult {
            ToolResult::ok(json!(null))
        }
    }

    fn make_agent(
        name: &str,
        role: AgentRole,
        tools: Vec<Arc<dyn Tool>>,
        client: MockLlmClient,
    ) -> Arc<dyn Agent> {
        let core = AgentCore::new(
            name,
            Instructions::from("test agent"),
            role,
            None,
            tools,
            Arc::new(client),
            5,
        )
        .unwrap();
        Arc::new(TestAgent {
            core,
            task_result: format!("{name} result"),
        })
    }

    #[test]
    fn test_construction_requires_exactly_one_pilot() {
        let crew = make_agent("a", AgentRole::Crew, Vec::new(), MockLlmClient::new());
        assert!(matches!(
            Agency::new(vec![crew]),
            Err(AgencyError::NoPilot)
        ));

        let p1 = make_agent("p1", AgentRole::Pilot, Vec::new(), MockLlmClient::new());
        let p2 = make_agent("p2", AgentRole::Pilot, Vec::new(), MockLlmClient::new());
        assert!(matches!(
            Agency::new(vec![p1, p2]),
            Err(AgencyError::MultiplePilots(2))
        ));
    }

    #[test]
    fn test_registry_takes_first_non_empty_tool_list() {
        let pilot = make_agent("pilot", AgentRole::Pilot, Vec::new(), MockLlmClient::new());
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(DummyTool)];
        let crew = make_agent("crew", AgentRole::Crew, tools, MockLlmClient::new());
        let agency = Agency::new(vec![pilot, crew]).unwrap();
        assert_eq!(agency.tool_names(), vec!["dummy".to_string()]);
        assert_eq!(agency.find_agent_by_tool("dummy").unwrap().name(), "crew");
        assert!(agency.find_agent_by_tool("missing").is_none());
    }

    #[tokio::test]
    async fn test_send_message_unknown_receiver() {
        let pilot = make_agent("pilot", AgentRole::Pilot, Vec::new(), MockLlmClient::new());
        let agency = Agency::new(vec![pilot]).unwrap();
        let reply = agency.send_message("caller", "hi", Some("ghost")).await;
        assert_eq!(reply, "Agent ghost not found in agency.");
    }

    #[test]
    fn test_shared_context_scratchpad() {
        let pilot = make_agent("pilot", AgentRole::Pilot, Vec::new(), MockLlmClient::new());
        let agency = Agency::new(vec![pilot]).unwrap();
        agency.update_context("matchup", json!("LAL vs BOS"));
        assert_eq!(agency.context_value("matchup"), Some(json!("LAL vs BOS")));
        assert_eq!(agency.context_value("missing"), None);
    }

    #[tokio::test]
    async fn test_run_drives_one_worker_through_feedback() {
        // pilot 决策 + 对 worker 结果的点评，共两次 pilot 调用
        let pilot_client = MockLlmClient::new()
            .with_reply(
                "{\"tool_name\": \"dummy\", \"reason\": \"only option\", \"priority\": 1}",
            )
            .with_reply("looks good, ship it");
        let pilot = make_agent("pilot", AgentRole::Pilot, Vec::new(), pilot_client);

        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(DummyTool)];
        let crew_client = MockLlmClient::new().with_reply("revised result");
        let crew = make_agent("crew", AgentRole::Crew, tools, crew_client);

        let agency = Agency::new(vec![pilot, crew]).unwrap();
        let results = agency.run("post about tonight's game").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap(), "revised result");
    }

    #[tokio::test]
    async fn test_run_with_unparseable_decision_reports_no_plan() {
        let pilot_client = MockLlmClient::new().with_reply("no json here");
        let pilot = make_agent("pilot", AgentRole::Pilot, Vec::new(), pilot_client);
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(DummyTool)];
        let crew = make_agent("crew", AgentRole::Crew, tools, MockLlmClient::new());
        let agency = Agency::new(vec![pilot, crew]).unwrap();
        let results = agency.run("task").await;
        assert!(matches!(results[0], Err(AgencyError::NoPlan(_))));
    }
}
