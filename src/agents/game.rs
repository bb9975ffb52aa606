//! 比赛预测 Agent
//!
//! 与球员管线同构，另加两处领域容错：胜率接受 "55%" / 55 / 0.55
//! 三种写法并统一为 0-1 小数；confidence 解析不出时落到 0.5。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::agency::{Agent, AgentCore, AgentRole, Instructions};
use crate::agents::personalities::{
    default_game_prediction, game_prediction_schema, game_prediction_tendencies,
    GAME_AGENT_NAME, GAME_INSTRUCTIONS,
};
use crate::config::AppConfig;
use crate::db::{DbError, GamePredictionRecord, UnitOfWorkFactory};
use crate::llm::LlmClient;
use crate::parser::SchemaParser;
use crate::predictions::{
    GameContextProvider, GamePredictionResponse, PhaseTracker, RequestPhase,
};

pub struct GamePredictionAgent {
    core: AgentCore,
    parser: SchemaParser,
    context: Arc<dyn GameContextProvider>,
    uow_factory: Arc<dyn UnitOfWorkFactory>,
}

/// 把 "55%"、55、0.55 统一为 0-1 小数；无法解释时返回 None
fn coerce_percent(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    let fraction = if number > 1.0 { number / 100.0 } else { number };
    (0.0..=1.0).contains(&fraction).then_some(fraction)
}

impl GamePredictionAgent {
    pub fn new(
        client: Arc<dyn LlmClient>,
        context: Arc<dyn GameContextProvider>,
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        role: AgentRole,
        cfg: &AppConfig,
    ) -> Result<Self, crate::agency::AgencyError> {
        let core = AgentCore::new(
            GAME_AGENT_NAME,
            Instructions::from(GAME_INSTRUCTIONS),
            role,
            Some(game_prediction_tendencies()),
            Vec::new(),
            client,
            cfg.comms.history_turns,
        )?;
        Ok(Self {
            core,
            parser: SchemaParser::with_default(game_prediction_schema(), default_game_prediction()),
            context,
            uow_factory,
        })
    }

    fn build_prompt(&self, home_team: &str, away_team: &str, context: &Value) -> String {
        format!(
            "Predict the winner of {home_team} (home) vs {away_team} (away).\n\n\
             Context data:\n{context}\n\n\
             Reply with JSON only, using exactly these fields:\n\
             {{\"value\": \"<winning team name>\", \"confidence\": <number between 0 and 1>, \
             \"home_team_win_percentage\": <number between 0 and 1>, \
             \"opposing_team_win_percentage\": <number between 0 and 1>, \
             \"explanation\": \"<short text>\"}}",
            context = serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string()),
        )
    }

    /// 解析后的领域归一：胜率统一为 0-1，confidence 缺省 0.5
    fn normalize_prediction(prediction: &mut Map<String, Value>) {
        for key in ["home_team_win_percentage", "opposing_team_win_percentage"] {
            let coerced = prediction.get(key).and_then(coerce_percent);
            prediction.insert(
                key.to_string(),
                coerced.map(|f| json!(f)).unwrap_or(Value::Null),
            );
        }
        let confidence = prediction
            .get("confidence")
            .and_then(coerce_percent)
            .unwrap_or(0.5);
        prediction.insert("confidence".into(), json!(confidence));
    }

    fn record_from_map(
        &self,
        home_team: &str,
        away_team: &str,
        prediction: &Map<String, Value>,
    ) -> GamePredictionRecord {
        GamePredictionRecord {
            id: None,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            predicted_winner: prediction
                .get("value")
                .and_then(Value::as_str)
                .map(str::to_string),
            home_team_win_percentage: prediction
                .get("home_team_win_percentage")
                .and_then(Value::as_f64),
            opposing_team_win_percentage: prediction
                .get("opposing_team_win_percentage")
                .and_then(Value::as_f64),
            confidence: prediction
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.5),
            explanation: prediction
                .get("explanation")
                .and_then(Value::as_str)
                .unwrap_or("Failed to parse prediction")
                .to_string(),
            created_at: Utc::now(),
            actual_winner: None,
            was_correct: None,
        }
    }

    fn persist(&self, record: &GamePredictionRecord) -> Result<(), DbError> {
        let mut uow = self.uow_factory.begin()?;
        uow.game_predictions().add(record)?;
        uow.commit()
    }

    pub async fn predict(&self, home_team: &str, away_team: &str) -> GamePredictionResponse {
        let mut tracker = PhaseTracker::new(format!("{home_team} vs {away_team}"));
        let report = self.context.prepare(home_team, away_team).await;
        tracker.advance(RequestPhase::ContextFetched);

        if report.is_error() {
            tracker.advance(RequestPhase::ContextError);
            return GamePredictionResponse {
                status: "error".into(),
                home_team: home_team.into(),
                away_team: away_team.into(),
                prediction: default_game_prediction(),
                context_summary: None,
                message: report.message,
            };
        }

        let prompt = self.build_prompt(home_team, away_team, &report.data);
        let raw = self.core.prompt(&prompt, "system").await;
        tracker.advance(RequestPhase::Prompted);

        let mut prediction = self.parser.parse(raw.as_str());
        Self::normalize_prediction(&mut prediction);
        tracker.advance(RequestPhase::Parsed);

        let record = self.record_from_map(home_team, away_team, &prediction);
        match self.persist(&record) {
            Ok(()) => {
                tracker.advance(RequestPhase::Persisted);
            }
            Err(e) => {
                tracing::error!(home_team, away_team, "failed to persist prediction: {e}");
                tracker.advance(RequestPhase::PersistFailed);
                prediction = default_game_prediction();
            }
        }

        tracker.advance(RequestPhase::Returned);
        GamePredictionResponse {
            status: "success".into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            prediction,
            context_summary: Some(report.summary()),
            message: None,
        }
    }

    pub async fn run_daily(&self) -> Vec<GamePredictionResponse> {
        let games = self.context.todays_games().await;
        tracing::info!(count = games.len(), "running daily game predictions");
        let mut responses = Vec::with_capacity(games.len());
        for g in games {
            responses.push(self.predict(&g.home_team, &g.away_team).await);
        }
        responses
    }
}

#[async_trait]
impl Agent for GamePredictionAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn execute_task(self: Arc<Self>) -> String {
        let responses = self.run_daily().await;
        serde_json::to_string(&responses).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::SqliteUowFactory;
    use crate::llm::MockLlmClient;
    use crate::predictions::FixtureContextProvider;

    #[test]
    fn test_coerce_percent_accepts_all_spellings() {
        assert_eq!(coerce_percent(&json!("55%")), Some(0.55));
        assert_eq!(coerce_percent(&json!(55)), Some(0.55));
        assert_eq!(coerce_percent(&json!(0.55)), Some(0.55));
        assert_eq!(coerce_percent(&json!("0.55")), Some(0.55));
        assert_eq!(coerce_percent(&json!("not a number")), None);
        assert_eq!(coerce_percent(&json!(-5)), None);
        assert_eq!(coerce_percent(&json!(150)), None);
        assert_eq!(coerce_percent(&Value::Null), None);
    }

    fn agent_with(client: MockLlmClient, dir: &tempfile::TempDir) -> GamePredictionAgent {
        GamePredictionAgent::new(
            Arc::new(client),
            Arc::new(FixtureContextProvider::demo()),
            Arc::new(SqliteUowFactory::new(dir.path().join("test.db"))),
            AgentRole::Crew,
            &AppConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_predict_normalizes_percent_strings() {
        let dir = tempfile::tempdir().unwrap();
        let reply = "{\"value\": \"Lakers\", \"confidence\": \"high\", \
                     \"home_team_win_percentage\": \"55%\", \
                     \"opposing_team_win_percentage\": 45, \
                     \"explanation\": \"Home court edge\"}";
        let agent = agent_with(MockLlmClient::new().with_reply(reply), &dir);
        let response = agent.predict("Lakers", "Celtics").await;
        assert!(response.is_success());
        assert_eq!(response.prediction["home_team_win_percentage"], json!(0.55));
        assert_eq!(response.prediction["opposing_team_win_percentage"], json!(0.45));
        // confidence 解析不出时落到 0.5
        assert_eq!(response.prediction["confidence"], json!(0.5));
        assert_eq!(response.prediction["value"], json!("Lakers"));
    }

    #[tokio::test]
    async fn test_unknown_game_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let agent = agent_with(MockLlmClient::new(), &dir);
        let response = agent.predict("Knicks", "Heat").await;
        assert_eq!(response.status, "error");
        assert!(response.message.unwrap().contains("no fixture"));
    }
}
