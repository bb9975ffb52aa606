//! 预测记录：球员与比赛两类
//!
//! 评估字段（actual_value / was_correct 等）由落库后的独立评估流程回填，
//! 预测管线本身只写入 None。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 球员单项数据预测记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerPredictionRecord {
    pub id: Option<i64>,
    pub player_name: String,
    /// 预测的统计项，如 points、rebounds、assists
    pub stat: String,
    /// 对阵描述，如 "LAL vs BOS"
    pub matchup: String,
    pub value: Option<f64>,
    pub range_low: Option<f64>,
    pub range_high: Option<f64>,
    pub confidence: f64,
    pub explanation: String,
    pub prizepicks_line: Option<f64>,
    pub prizepicks_reason: Option<String>,
    pub additional_context: Option<String>,
    pub created_at: DateTime<Utc>,
    /// 赛后评估回填
    pub actual_value: Option<f64>,
    pub was_correct: Option<bool>,
}

/// 比赛胜负预测记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamePredictionRecord {
    pub id: Option<i64>,
    pub home_team: String,
    pub away_team: String,
    /// 预测的获胜方（队名）
    pub predicted_winner: Option<String>,
    pub home_team_win_percentage: Option<f64>,
    pub opposing_team_win_percentage: Option<f64>,
    pub confidence: f64,
    pub explanation: String,
    pub created_at: DateTime<Utc>,
    /// 赛后评估回填
    pub actual_winner: Option<String>,
    pub was_correct: Option<bool>,
}
