//! Agent 基座：命名、角色、人格、通信协议与会话
//!
//! 具体 Agent 组合 AgentCore 并实现 execute_task；prompt 把通信层错误
//! 吞为哨兵文本，不向编排层抛原始后端异常。
//! 反馈回合由 AgentRun 显式状态机驱动，回合数可配置（默认 1）。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::agency::comms::{CommunicationProtocol, PromptOptions};
use crate::agency::retrievers::{RetrievalResult, Retriever};
use crate::agency::session::Session;
use crate::agency::tendencies::Tendencies;
use crate::agency::tools::Tool;
use crate::agency::AgencyError;
use crate::llm::LlmClient;

/// prompt 失败时返回的哨兵文本（编排层据此识别失败，而非捕获异常）
pub const PROMPT_ERROR: &str = "[prompt-error] unable to reach the language model";

/// 指令：静态文本或运行时生成
#[derive(Clone)]
pub enum Instructions {
    Static(String),
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Instructions {
    pub fn resolve(&self) -> String {
        match self {
            Instructions::Static(s) => s.clone(),
            Instructions::Dynamic(f) => f(),
        }
    }
}

impl std::fmt::Debug for Instructions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instructions::Static(s) => f.debug_tuple("Static").field(s).finish(),
            Instructions::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for Instructions {
    fn from(s: &str) -> Self {
        Instructions::Static(s.to_string())
    }
}

impl From<String> for Instructions {
    fn from(s: String) -> Self {
        Instructions::Static(s)
    }
}

/// Agent 角色：每个 Agency 恰好一个 Pilot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Pilot,
    Crew,
}

/// Agent 基座：名称、角色、人格、通信协议、工具、检索器与会话
pub struct AgentCore {
    name: String,
    role: AgentRole,
    tendencies: Option<Tendencies>,
    comms: CommunicationProtocol,
    tools: Vec<Arc<dyn Tool>>,
    retrievers: Vec<Arc<dyn Retriever>>,
    sessions: Mutex<HashMap<String, Session>>,
    active_session: Mutex<Option<String>>,
}

impl AgentCore {
    /// 构造时校验 tendencies 并合成人格字符串（指令 + 展平的倾向描述）
    pub fn new(
        name: impl Into<String>,
        instructions: Instructions,
        role: AgentRole,
        tendencies: Option<Tendencies>,
        tools: Vec<Arc<dyn Tool>>,
        client: Arc<dyn LlmClient>,
        history_turns: usize,
    ) -> Result<Self, AgencyError> {
        if let Some(t) = &tendencies {
            t.validate()?;
        }
        let mut personality = instructions.resolve();
        if let Some(t) = &tendencies {
            let described = t.describe();
            if !described.is_empty() {
                personality.push_str("\n\n");
                personality.push_str(&described);
            }
        }
        Ok(Self {
            name: name.into(),
            role,
            tendencies,
            comms: CommunicationProtocol::new(client, personality, history_turns),
            tools,
            retrievers: Vec::new(),
            sessions: Mutex::new(HashMap::new()),
            active_session: Mutex::new(None),
        })
    }

    /// 构造后挂载检索器（可选能力，默认无）
    pub fn with_retrievers(mut self, retrievers: Vec<Arc<dyn Retriever>>) -> Self {
        self.retrievers = retrievers;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn tendencies(&self) -> Option<&Tendencies> {
        self.tendencies.as_ref()
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn retrievers(&self) -> &[Arc<dyn Retriever>] {
        &self.retrievers
    }

    pub fn comms(&self) -> &CommunicationProtocol {
        &self.comms
    }

    /// 按挂载顺序查询检索器，返回第一个成功结果；
    /// 全部未命中或未挂载检索器时返回 None
    pub async fn query_with_retriever(&self, query: &str) -> Option<RetrievalResult> {
        for retriever in &self.retrievers {
            let result = retriever.query(query).await;
            if result.success {
                return Some(result);
            }
            tracing::debug!(
                agent = %self.name,
                retriever = %retriever.name(),
                "retriever query missed"
            );
        }
        None
    }

    /// 发送提示词；通信层错误吞为哨兵并记日志
    pub async fn prompt(&self, message: &str, sender: &str) -> String {
        self.prompt_with_options(message, sender, &PromptOptions::default())
            .await
    }

    pub async fn prompt_with_options(
        &self,
        message: &str,
        sender: &str,
        options: &PromptOptions,
    ) -> String {
        match self.comms.send_prompt(message, sender, options).await {
            Ok(reply) => {
                if let (Ok(mut sessions), Ok(active)) =
                    (self.sessions.lock(), self.active_session.lock())
                {
                    if let Some(id) = active.as_ref() {
                        if let Some(session) = sessions.get_mut(id) {
                            session.add_interaction(message, &reply);
                        }
                    }
                }
                reply
            }
            Err(e) => {
                tracing::error!(agent = %self.name, "prompt failed: {e}");
                PROMPT_ERROR.to_string()
            }
        }
    }

    /// 创建并激活新会话，返回会话 id
    pub fn start_session(&self, name: &str) -> String {
        let session = Session::new(name);
        let id = session.id.clone();
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(id.clone(), session);
        }
        if let Ok(mut active) = self.active_session.lock() {
            *active = Some(id.clone());
        }
        id
    }

    /// 按 id 激活已有会话；不存在时返回 false
    pub fn load_session(&self, id: &str) -> bool {
        let exists = self
            .sessions
            .lock()
            .map(|s| s.contains_key(id))
            .unwrap_or(false);
        if exists {
            if let Ok(mut active) = self.active_session.lock() {
                *active = Some(id.to_string());
            }
        }
        exists
    }

    /// 对活跃会话执行只读访问
    pub fn with_active_session<T>(&self, f: impl FnOnce(&Session) -> T) -> Option<T> {
        let active = self.active_session.lock().ok()?;
        let id = active.as_ref()?;
        let sessions = self.sessions.lock().ok()?;
        sessions.get(id).map(f)
    }
}

/// Agent trait：具体 Agent 实现 execute_task，其余走基座默认
#[async_trait]
pub trait Agent: Send + Sync {
    fn core(&self) -> &AgentCore;

    /// 领域任务入口；不得无限阻塞，周期性工作交给调度器
    async fn execute_task(self: Arc<Self>) -> String;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn role(&self) -> AgentRole {
        self.core().role()
    }

    fn tools(&self) -> &[Arc<dyn Tool>] {
        self.core().tools()
    }

    fn retrievers(&self) -> &[Arc<dyn Retriever>] {
        self.core().retrievers()
    }

    async fn prompt(&self, message: &str, sender: &str) -> String {
        self.core().prompt(message, sender).await
    }
}

/// 反馈回合状态机：AwaitingResult → AwaitingFeedback → Done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    AwaitingResult,
    AwaitingFeedback { rounds_left: u32 },
    Done,
}

/// 驱动单个 Agent 的一次运行：先出结果，再接收有限回合的反馈
pub struct AgentRun {
    agent: Arc<dyn Agent>,
    state: RunState,
    feedback_rounds: u32,
}

impl AgentRun {
    /// 默认一轮反馈
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self::with_feedback_rounds(agent, 1)
    }

    pub fn with_feedback_rounds(agent: Arc<dyn Agent>, rounds: u32) -> Self {
        Self {
            agent,
            state: RunState::AwaitingResult,
            feedback_rounds: rounds,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == RunState::Done
    }

    /// 执行任务并进入等待反馈态；非初始态调用返回 None
    pub async fn step(&mut self) -> Option<String> {
        if self.state != RunState::AwaitingResult {
            return None;
        }
        let result = Arc::clone(&self.agent).execute_task().await;
        self.state = if self.feedback_rounds > 0 {
            RunState::AwaitingFeedback {
                rounds_left: self.feedback_rounds,
            }
        } else {
            RunState::Done
        };
        Some(result)
    }

    /// 投递一条反馈，Agent 以 pilot 名义的 prompt 处理；回合耗尽后进入 Done
    pub async fn feedback(&mut self, feedback: &str) -> Option<String> {
        match self.state {
            RunState::AwaitingFeedback { rounds_left } if rounds_left > 0 => {
                let reply = self.agent.prompt(feedback, "pilot").await;
                self.state = if rounds_left == 1 {
                    RunState::Done
                } else {
                    RunState::AwaitingFeedback {
                        rounds_left: rounds_left - 1,
                    }
                };
                Some(reply)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    struct StubAgent {
        core: AgentCore,
    }

    #[async_trait]
    impl Agent for StubAgent {
        fn core(&self) -> &AgentCore {
            &self.core
        }

        async fn execute_task(self: Arc<Self>) -> String {
            "task done".to_string()
        }
    }

    fn stub_agent(client: MockLlmClient) -> Arc<StubAgent> {
        let core = AgentCore::new(
            "stub",
            Instructions::from("You are a stub."),
            AgentRole::Crew,
            None,
            Vec::new(),
            Arc::new(client),
            5,
        )
        .unwrap();
        Arc::new(StubAgent { core })
    }

    #[tokio::test]
    async fn test_run_state_machine_single_round() {
        let agent = stub_agent(MockLlmClient::new().with_reply("revised"));
        let mut run = AgentRun::new(agent);

        // 先 step 才能 feedback
        assert_eq!(run.feedback("too early").await, None);

        let first = run.step().await.unwrap();
        assert_eq!(first, "task done");
        assert_eq!(run.state(), RunState::AwaitingFeedback { rounds_left: 1 });

        let second = run.feedback("tighten the range").await.unwrap();
        assert_eq!(second, "revised");
        assert!(run.is_done());

        // 回合耗尽后不再接受反馈
        assert_eq!(run.feedback("one more").await, None);
        assert_eq!(run.step().await, None);
    }

    #[tokio::test]
    async fn test_run_zero_rounds_goes_straight_to_done() {
        let agent = stub_agent(MockLlmClient::new());
        let mut run = AgentRun::with_feedback_rounds(agent, 0);
        run.step().await.unwrap();
        assert!(run.is_done());
    }

    #[tokio::test]
    async fn test_prompt_swallows_comms_error_into_sentinel() {
        // Mock 不支持联网，增强模式必然失败
        let agent = stub_agent(MockLlmClient::new());
        let options = PromptOptions {
            enriched: true,
            ..Default::default()
        };
        let reply = agent
            .core()
            .prompt_with_options("hi", "pilot", &options)
            .await;
        assert_eq!(reply, PROMPT_ERROR);
    }

    #[tokio::test]
    async fn test_query_with_retriever_returns_first_hit() {
        use serde_json::json;

        struct KeywordRetriever {
            keyword: &'static str,
            doc: &'static str,
        }

        #[async_trait]
        impl Retriever for KeywordRetriever {
            fn name(&self) -> &str {
                self.keyword
            }

            fn description(&self) -> &str {
                "keyword-gated fixture store"
            }

            async fn query(&self, query: &str) -> RetrievalResult {
                if query.contains(self.keyword) {
                    RetrievalResult::ok(json!({"response": self.doc}))
                } else {
                    RetrievalResult::fail("no match")
                }
            }
        }

        let core = AgentCore::new(
            "reader",
            Instructions::from("You are a stub."),
            AgentRole::Crew,
            None,
            Vec::new(),
            Arc::new(MockLlmClient::new()),
            5,
        )
        .unwrap()
        .with_retrievers(vec![
            Arc::new(KeywordRetriever {
                keyword: "injury",
                doc: "ankle, questionable",
            }),
            Arc::new(KeywordRetriever {
                keyword: "odds",
                doc: "home -130",
            }),
        ]);

        // 第一个未命中时继续查后面的检索器
        let hit = core.query_with_retriever("tonight's odds").await.unwrap();
        assert_eq!(hit.data["response"], json!("home -130"));

        // 全部未命中返回 None
        assert!(core.query_with_retriever("weather").await.is_none());

        // 未挂载检索器的 Agent 同样返回 None
        let bare = stub_agent(MockLlmClient::new());
        assert!(bare.retrievers().is_empty());
        assert!(bare.core().query_with_retriever("anything").await.is_none());
    }

    #[tokio::test]
    async fn test_sessions_record_prompt_interactions() {
        let agent = stub_agent(MockLlmClient::new().with_reply("hello back"));
        let id = agent.core().start_session("warmup");
        agent.prompt("hello", "user").await;
        let count = agent
            .core()
            .with_active_session(|s| s.interaction_count())
            .unwrap();
        assert_eq!(count, 1);
        assert!(agent.core().load_session(&id));
        assert!(!agent.core().load_session("missing"));
    }
}
