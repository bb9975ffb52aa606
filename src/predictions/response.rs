//! 预测响应：始终成形的返回对象
//!
//! 失败也返回结构化响应（status != "success" + 可读消息），绝不向
//! 调用方抛栈回溯。

use serde::Serialize;
use serde_json::{Map, Value};

/// 球员预测响应
#[derive(Debug, Clone, Serialize)]
pub struct PlayerPredictionResponse {
    pub status: String,
    pub player_name: String,
    pub stat: String,
    pub matchup: String,
    pub prediction: Map<String, Value>,
    pub context_summary: Option<String>,
    pub message: Option<String>,
}

impl PlayerPredictionResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// 比赛预测响应
#[derive(Debug, Clone, Serialize)]
pub struct GamePredictionResponse {
    pub status: String,
    pub home_team: String,
    pub away_team: String,
    pub prediction: Map<String, Value>,
    pub context_summary: Option<String>,
    pub message: Option<String>,
}

impl GamePredictionResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
