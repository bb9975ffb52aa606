//! 各 Agent 的人格、输出 Schema 与默认预测载荷
//!
//! 字段名是半稳定的对外格式：解析器的逐字段回退策略按这些名字
//! 建正则，改名会破坏回退提取。

use serde_json::{json, Map, Value};

use crate::agency::Tendencies;
use crate::parser::FieldSchema;

pub const PLAYER_AGENT_NAME: &str = "player-prediction";
pub const GAME_AGENT_NAME: &str = "game-prediction";
pub const TWITTER_AGENT_NAME: &str = "twitter-poster";

pub const PLAYER_INSTRUCTIONS: &str = "You are an NBA player performance analyst. \
Given a player's recent games, season averages and the betting line, you predict a single \
stat for tonight's game. You always answer with JSON only, exactly matching the requested \
schema, with no commentary outside the JSON.";

pub const GAME_INSTRUCTIONS: &str = "You are an NBA game outcome analyst. Given two teams, \
their records and the betting odds, you predict the winner and win percentages. You always \
answer with JSON only, exactly matching the requested schema.";

pub const TWITTER_INSTRUCTIONS: &str = "You are the social voice of an NBA prediction service. \
You turn predictions into a single punchy tweet under 280 characters. No hashtags spam, \
no financial advice wording.";

pub fn player_prediction_tendencies() -> Tendencies {
    Tendencies::new()
        .with_trait("analytical", 0.95)
        .with_trait("risk_tolerance", 0.3)
        .with_trait("optimism", 0.5)
        .with_core_values(&["accuracy", "consistency"])
        .with_goals(&["beat the line", "calibrated confidence"])
        .with_fears(&["overconfident calls"])
}

pub fn game_prediction_tendencies() -> Tendencies {
    Tendencies::new()
        .with_trait("analytical", 0.9)
        .with_trait("risk_tolerance", 0.4)
        .with_core_values(&["accuracy"])
        .with_goals(&["pick winners", "honest win percentages"])
}

pub fn twitter_tendencies() -> Tendencies {
    Tendencies::new()
        .with_trait("humor", 0.7)
        .with_trait("formality", 0.2)
        .with_core_values(&["engagement"])
        .with_goals(&["grow the audience"])
        .with_trigger_words(&["guaranteed", "lock"])
}

/// 球员预测的输出 Schema（range/value/confidence/explanation 必填，
/// PrizePicks 相关与附加上下文可选）
pub fn player_prediction_schema() -> Vec<FieldSchema> {
    vec![
        FieldSchema::number("value", true),
        FieldSchema::number("range_low", true),
        FieldSchema::number("range_high", true),
        FieldSchema::number("confidence", true),
        FieldSchema::string("explanation", true),
        FieldSchema::number("prizepicks_line", false),
        FieldSchema::string("prizepicks_reason", false),
        FieldSchema::string("additional_context", false),
    ]
}

/// 球员预测的解析失败默认载荷
pub fn default_player_prediction() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("value".into(), Value::Null);
    map.insert("range_low".into(), Value::Null);
    map.insert("range_high".into(), Value::Null);
    map.insert("confidence".into(), json!(0));
    map.insert(
        "explanation".into(),
        json!("Failed to parse prediction"),
    );
    map.insert("prizepicks_line".into(), Value::Null);
    map.insert("prizepicks_reason".into(), Value::Null);
    map.insert("additional_context".into(), Value::Null);
    map
}

/// 比赛预测的输出 Schema：value 为获胜队名
pub fn game_prediction_schema() -> Vec<FieldSchema> {
    vec![
        FieldSchema::string("value", true),
        FieldSchema::number("confidence", true),
        FieldSchema::number("home_team_win_percentage", true),
        FieldSchema::number("opposing_team_win_percentage", true),
        FieldSchema::string("explanation", true),
    ]
}

/// 比赛预测的解析失败默认载荷
pub fn default_game_prediction() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("value".into(), Value::Null);
    map.insert("confidence".into(), json!(0.5));
    map.insert("home_team_win_percentage".into(), Value::Null);
    map.insert("opposing_team_win_percentage".into(), Value::Null);
    map.insert(
        "explanation".into(),
        json!("Failed to parse prediction"),
    );
    map
}
