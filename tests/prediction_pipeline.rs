//! 端到端：预测管线与 Agency 编排
//!
//! 全程使用 Mock LLM 与临时 SQLite，不触网。

use std::sync::Arc;

use serde_json::json;

use pluto::agency::{Agency, Agent, AgentRole};
use pluto::agents::{PlayerPredictionAgent, TwitterAgent};
use pluto::config::AppConfig;
use pluto::db::{SqliteUowFactory, UnitOfWorkFactory};
use pluto::llm::MockLlmClient;
use pluto::predictions::FixtureContextProvider;

#[tokio::test]
async fn player_prediction_pipeline_parses_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(SqliteUowFactory::new(dir.path().join("pluto-test.db")));
    let cfg = AppConfig::default();

    let reply = "Here is my analysis.\n```json\n{\"value\": 24.5, \"range_low\": 21.0, \
                 \"range_high\": 28.0, \"confidence\": 0.75, \"explanation\": \"Strong recent form\", \
                 \"prizepicks_line\": 26.5, \"prizepicks_reason\": \"under\"}\n```";
    let agent = PlayerPredictionAgent::new(
        Arc::new(MockLlmClient::new().with_reply(reply)),
        Arc::new(FixtureContextProvider::demo()),
        Arc::clone(&factory) as Arc<dyn UnitOfWorkFactory>,
        AgentRole::Crew,
        &cfg,
    )
    .unwrap();

    let response = agent.predict("LeBron James", "points", "LAL vs BOS").await;
    assert!(response.is_success());
    assert_eq!(response.prediction["value"], json!(24.5));
    assert_eq!(response.prediction["confidence"], json!(0.75));
    assert_eq!(response.prediction["prizepicks_reason"], json!("under"));
    assert!(response.context_summary.is_some());

    // 落库校验：同一事务内 add + commit
    let uow = factory.begin().unwrap();
    let rows = uow
        .player_predictions()
        .list_for_matchup("LAL vs BOS")
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].player_name, "LeBron James");
    assert_eq!(rows[0].range_high, Some(28.0));
    assert_eq!(rows[0].prizepicks_line, Some(26.5));
    assert!(rows[0].actual_value.is_none());
}

#[tokio::test]
async fn agency_routes_pilot_decision_to_tool_owner() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(SqliteUowFactory::new(dir.path().join("pluto-test.db")));
    let cfg = AppConfig::default();

    // pilot 两次调用：先出工具决策，再点评 worker 结果
    let pilot_client = MockLlmClient::new()
        .with_reply(
            "```json\n{\"tool_name\": \"twitter_post\", \"reason\": \"time to post\", \"priority\": 2}\n```",
        )
        .with_reply("good, keep it shorter next time");
    let pilot = Arc::new(
        PlayerPredictionAgent::new(
            Arc::new(pilot_client),
            Arc::new(FixtureContextProvider::demo()),
            Arc::clone(&factory) as Arc<dyn UnitOfWorkFactory>,
            AgentRole::Pilot,
            &cfg,
        )
        .unwrap(),
    );

    // worker：第一条回复是推文草稿，第二条是对 pilot 反馈的回应
    let twitter_client = MockLlmClient::new()
        .with_reply("Lakers by 12 tonight, book it.")
        .with_reply("noted, will tighten the copy");
    let twitter = Arc::new(TwitterAgent::new(Arc::new(twitter_client), &cfg).unwrap());

    let agents: Vec<Arc<dyn Agent>> = vec![pilot, twitter];
    let agency = Agency::new(agents).unwrap();
    assert_eq!(agency.tool_names(), vec!["twitter_post".to_string()]);

    let results = agency.run("share tonight's picks").await;
    assert_eq!(results.len(), 1);
    // 一轮反馈后的最终产出来自 worker 对 pilot 点评的回应
    assert_eq!(results[0].as_ref().unwrap(), "noted, will tighten the copy");
}

#[tokio::test]
async fn agency_with_zero_pilots_fails_construction() {
    let cfg = AppConfig::default();
    let twitter = Arc::new(
        TwitterAgent::new(Arc::new(MockLlmClient::new()), &cfg).unwrap(),
    );
    let agents: Vec<Arc<dyn Agent>> = vec![twitter];
    assert!(Agency::new(agents).is_err());
}
