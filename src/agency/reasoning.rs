//! 推理引擎：让 pilot 选择工具，再由编排层决定是否执行
//!
//! decide_action 用结构化决策提示词（schemars 生成的 JSON Schema 注入）
//! 向 pilot 要一个 {tool_name, reason, priority} 决策，走同一套 SchemaParser
//! 级联解析；决策与执行解耦，execute_plan 由 Agency 单独调用。

use std::sync::Arc;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agency::agent::Agent;
use crate::agency::tools::{ToolRegistry, ToolResult};
use crate::agency::AgencyError;
use crate::parser::{FieldSchema, SchemaParser};

/// pilot 的单次决策（仅用于 Schema 生成与结果承载）
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActionPlan {
    /// 可用工具之一的名称
    pub tool_name: String,
    /// 选择该工具的理由
    pub reason: String,
    /// 优先级 1-5
    pub priority: u8,
}

/// 上一次决策：任务 + 理由
#[derive(Debug, Clone)]
pub struct LastDecision {
    pub task: String,
    pub reason: String,
}

/// 一次已执行计划的记录
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub task: String,
    pub tool: String,
    pub result: String,
    pub reason: String,
}

/// 推理引擎的可变上下文；history 只由 execute_plan 追加
#[derive(Debug, Clone, Default)]
pub struct ReasonerContext {
    pub current_task: Option<String>,
    pub last_decision: Option<LastDecision>,
    pub available_tools: Vec<String>,
    pub history: Vec<HistoryEntry>,
}

/// reason 的显式结果（不抛异常）
#[derive(Debug, Clone)]
pub enum ReasonOutcome {
    Plan { plan: ActionPlan, reason: String },
    NoPlan { message: String },
}

/// 决策 Schema 字符串，拼入决策提示词
fn decision_schema_json() -> String {
    let schema = schema_for!(ActionPlan);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

fn decision_field_schema() -> Vec<FieldSchema> {
    vec![
        FieldSchema::string("tool_name", true),
        FieldSchema::string("reason", true),
        FieldSchema::number("priority", true),
    ]
}

pub struct ReasoningEngine {
    pilot: Arc<dyn Agent>,
    registry: ToolRegistry,
    parser: SchemaParser,
    context: ReasonerContext,
}

impl ReasoningEngine {
    pub fn new(pilot: Arc<dyn Agent>, registry: ToolRegistry) -> Self {
        let context = ReasonerContext {
            available_tools: registry.names(),
            ..Default::default()
        };
        Self {
            pilot,
            registry,
            parser: SchemaParser::new(decision_field_schema()),
            context,
        }
    }

    pub fn context(&self) -> &ReasonerContext {
        &self.context
    }

    fn build_decision_prompt(&self, task: &str) -> String {
        let tool_lines = self
            .registry
            .listing()
            .into_iter()
            .map(|(name, desc)| format!("- {name}: {desc}"))
            .collect::<Vec<_>>()
            .join("\n");
        let history = if self.context.history.is_empty() {
            "(none)".to_string()
        } else {
            self.context
                .history
                .iter()
                .rev()
                .take(5)
                .map(|h| format!("- task '{}' used {} -> {}", h.task, h.tool, h.result))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!(
            "Task: {task}\n\n\
             Available tools:\n{tool_lines}\n\n\
             Recent history:\n{history}\n\n\
             Choose exactly one tool for this task. Reply with JSON only, matching this schema:\n\
             {schema}\n\n\
             Fields: tool_name (one of the tools above), reason (short justification), priority (integer 1-5).",
            schema = decision_schema_json(),
        )
    }

    /// 构建决策提示词、问 pilot、解析为 ActionPlan；不可恢复的解析失败返回 None
    pub async fn decide_action(&self, task: &str) -> Option<ActionPlan> {
        if self.registry.is_empty() {
            tracing::warn!("no tools registered, cannot decide an action");
            return None;
        }
        let prompt = self.build_decision_prompt(task);
        let raw = self.pilot.prompt(&prompt, "reasoning-engine").await;
        let parsed = self.parser.parse(raw.as_str());

        let tool_name = match parsed.get("tool_name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                tracing::warn!(task, "decision parse failed, no tool_name recovered");
                return None;
            }
        };
        let reason = parsed
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("no reason given")
            .to_string();
        // 1-5 之外与缺失统一落到 3
        let priority = parsed
            .get("priority")
            .and_then(Value::as_f64)
            .map(|p| p.round() as i64)
            .filter(|p| (1..=5).contains(p))
            .unwrap_or(3) as u8;

        Some(ActionPlan {
            tool_name,
            reason,
            priority,
        })
    }

    /// 查找并执行计划中的工具，把结果追加进历史
    pub async fn execute_plan(
        &mut self,
        plan: &ActionPlan,
        args: &Map<String, Value>,
    ) -> Result<ToolResult, AgencyError> {
        let tool = self
            .registry
            .get(&plan.tool_name)
            .ok_or_else(|| AgencyError::ToolNotFound(plan.tool_name.clone()))?;
        let result = tool.execute(args).await;
        self.context.history.push(HistoryEntry {
            task: self.context.current_task.clone().unwrap_or_default(),
            tool: plan.tool_name.clone(),
            result: result.summary(),
            reason: plan.reason.clone(),
        });
        Ok(result)
    }

    /// 公共入口：决策并更新上下文，不执行工具
    pub async fn reason(&mut self, task: &str) -> ReasonOutcome {
        self.context.current_task = Some(task.to_string());
        match self.decide_action(task).await {
            Some(plan) => {
                self.context.last_decision = Some(LastDecision {
                    task: task.to_string(),
                    reason: plan.reason.clone(),
                });
                let reason = plan.reason.clone();
                ReasonOutcome::Plan { plan, reason }
            }
            None => ReasonOutcome::NoPlan {
                message: format!("no actionable plan could be derived for task: {task}"),
            },
        }
    }
}
