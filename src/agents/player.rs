//! 球员预测 Agent
//!
//! 固定管线：取上下文 → 错误短路 → 带 Schema 的提示词 → prompt →
//! SchemaParser 解析 → 事务落库（失败记日志、退默认载荷，不抛）→ 响应。
//! 每日定时跑当日盘口，单条失败最多重试 max_retries 次。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::agency::{Agent, AgentCore, AgentRole, Instructions};
use crate::agents::personalities::{
    default_player_prediction, player_prediction_schema, player_prediction_tendencies,
    PLAYER_AGENT_NAME, PLAYER_INSTRUCTIONS,
};
use crate::config::AppConfig;
use crate::db::{DbError, PlayerPredictionRecord, UnitOfWorkFactory};
use crate::llm::LlmClient;
use crate::parser::SchemaParser;
use crate::predictions::{
    PhaseTracker, PlayerContextProvider, PlayerPredictionResponse, RequestPhase,
};
use crate::scheduler::{JobFn, Scheduler};

pub struct PlayerPredictionAgent {
    core: AgentCore,
    parser: SchemaParser,
    context: Arc<dyn PlayerContextProvider>,
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    max_retries: u32,
}

impl PlayerPredictionAgent {
    pub fn new(
        client: Arc<dyn LlmClient>,
        context: Arc<dyn PlayerContextProvider>,
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        role: AgentRole,
        cfg: &AppConfig,
    ) -> Result<Self, crate::agency::AgencyError> {
        let core = AgentCore::new(
            PLAYER_AGENT_NAME,
            Instructions::from(PLAYER_INSTRUCTIONS),
            role,
            Some(player_prediction_tendencies()),
            Vec::new(),
            client,
            cfg.comms.history_turns,
        )?;
        Ok(Self {
            core,
            parser: SchemaParser::with_default(
                player_prediction_schema(),
                default_player_prediction(),
            ),
            context,
            uow_factory,
            max_retries: cfg.predictions.max_retries,
        })
    }

    fn build_prompt(&self, player: &str, stat: &str, matchup: &str, context: &Value) -> String {
        format!(
            "Predict {stat} for {player} in {matchup}.\n\n\
             Context data:\n{context}\n\n\
             Reply with JSON only, using exactly these fields:\n\
             {{\"value\": <number>, \"range_low\": <number>, \"range_high\": <number>, \
             \"confidence\": <number between 0 and 1>, \"explanation\": \"<short text>\", \
             \"prizepicks_line\": <number or null>, \"prizepicks_reason\": \"<over/under and why>\", \
             \"additional_context\": \"<anything worth noting>\"}}",
            context = serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string()),
        )
    }

    fn record_from_map(
        &self,
        player: &str,
        stat: &str,
        matchup: &str,
        prediction: &serde_json::Map<String, Value>,
    ) -> PlayerPredictionRecord {
        PlayerPredictionRecord {
            id: None,
            player_name: player.to_string(),
            stat: stat.to_string(),
            matchup: matchup.to_string(),
            value: prediction.get("value").and_then(Value::as_f64),
            range_low: prediction.get("range_low").and_then(Value::as_f64),
            range_high: prediction.get("range_high").and_then(Value::as_f64),
            confidence: prediction
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            explanation: prediction
                .get("explanation")
                .and_then(Value::as_str)
                .unwrap_or("Failed to parse prediction")
                .to_string(),
            prizepicks_line: prediction.get("prizepicks_line").and_then(Value::as_f64),
            prizepicks_reason: prediction
                .get("prizepicks_reason")
                .and_then(Value::as_str)
                .map(str::to_string),
            additional_context: prediction
                .get("additional_context")
                .and_then(Value::as_str)
                .map(str::to_string),
            created_at: Utc::now(),
            actual_value: None,
            was_correct: None,
        }
    }

    fn persist(&self, record: &PlayerPredictionRecord) -> Result<(), DbError> {
        let mut uow = self.uow_factory.begin()?;
        uow.player_predictions().add(record)?;
        uow.commit()
    }

    /// 单次预测请求；任何内部失败都收敛为成形的响应对象
    pub async fn predict(&self, player: &str, stat: &str, matchup: &str) -> PlayerPredictionResponse {
        let mut tracker = PhaseTracker::new(format!("{player}/{stat}/{matchup}"));
        let report = self.context.prepare(player, stat, matchup).await;
        tracker.advance(RequestPhase::ContextFetched);

        if report.is_error() {
            tracker.advance(RequestPhase::ContextError);
            return PlayerPredictionResponse {
                status: "error".into(),
                player_name: player.into(),
                stat: stat.into(),
                matchup: matchup.into(),
                prediction: default_player_prediction(),
                context_summary: None,
                message: report.message,
            };
        }

        let prompt = self.build_prompt(player, stat, matchup, &report.data);
        let raw = self.core.prompt(&prompt, "system").await;
        tracker.advance(RequestPhase::Prompted);

        let mut prediction = self.parser.parse(raw.as_str());
        tracker.advance(RequestPhase::Parsed);

        let record = self.record_from_map(player, stat, matchup, &prediction);
        match self.persist(&record) {
            Ok(()) => {
                tracker.advance(RequestPhase::Persisted);
            }
            Err(e) => {
                tracing::error!(player, stat, matchup, "failed to persist prediction: {e}");
                tracker.advance(RequestPhase::PersistFailed);
                prediction = default_player_prediction();
            }
        }

        tracker.advance(RequestPhase::Returned);
        PlayerPredictionResponse {
            status: "success".into(),
            player_name: player.into(),
            stat: stat.into(),
            matchup: matchup.into(),
            prediction,
            context_summary: Some(report.summary()),
            message: None,
        }
    }

    /// 跑当日所有盘口；单条失败重试，超过 max_retries 放弃并继续下一条
    pub async fn run_daily(&self) -> Vec<PlayerPredictionResponse> {
        let matchups = self.context.todays_matchups().await;
        tracing::info!(count = matchups.len(), "running daily player predictions");
        let mut responses = Vec::with_capacity(matchups.len());

        for m in matchups {
            let mut attempts = 0;
            let response = loop {
                let response = self.predict(&m.player, &m.stat, &m.matchup).await;
                if response.is_success() || attempts >= self.max_retries {
                    break response;
                }
                attempts += 1;
                tracing::warn!(
                    player = %m.player,
                    attempt = attempts,
                    "daily prediction failed, retrying"
                );
            };
            responses.push(response);
        }
        responses
    }

    /// 注册每日定时任务
    pub fn schedule_daily(
        self: &Arc<Self>,
        scheduler: &dyn Scheduler,
        hour: u32,
        minute: u32,
    ) -> String {
        let agent = Arc::clone(self);
        let job: JobFn = Arc::new(move || {
            let agent = Arc::clone(&agent);
            Box::pin(async move {
                agent.run_daily().await;
            })
        });
        scheduler.add_daily_job("daily-player-predictions", hour, minute, job)
    }
}

#[async_trait]
impl Agent for PlayerPredictionAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn execute_task(self: Arc<Self>) -> String {
        let responses = self.run_daily().await;
        serde_json::to_string(&responses).unwrap_or_else(|_| "[]".to_string())
    }
}
