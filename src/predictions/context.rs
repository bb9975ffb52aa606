//! 预测上下文：数据适配层的接口与离线夹具实现
//!
//! 真实的统计 / 赔率 / PrizePicks 抓取是外部协作方，这里只定义
//! 管线需要的接口：状态标记的上下文报告与当日赛程列表。

use async_trait::async_trait;
use serde_json::{json, Value};

/// 上下文准备结果的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStatus {
    Success,
    Error,
}

/// 状态标记的上下文报告：成功带领域数据，失败带消息
#[derive(Debug, Clone)]
pub struct ContextReport {
    pub status: ContextStatus,
    pub data: Value,
    pub message: Option<String>,
}

impl ContextReport {
    pub fn success(data: Value) -> Self {
        Self {
            status: ContextStatus::Success,
            data,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ContextStatus::Error,
            data: Value::Null,
            message: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ContextStatus::Error
    }

    /// 嵌入提示词的一行摘要
    pub fn summary(&self) -> String {
        match self.status {
            ContextStatus::Success => {
                let text = self.data.to_string();
                if text.chars().count() > 200 {
                    format!("{}...", text.chars().take(200).collect::<String>())
                } else {
                    text
                }
            }
            ContextStatus::Error => format!(
                "context error: {}",
                self.message.as_deref().unwrap_or("unknown")
            ),
        }
    }
}

/// 当日球员盘口
#[derive(Debug, Clone)]
pub struct PlayerMatchup {
    pub player: String,
    pub stat: String,
    pub matchup: String,
}

/// 当日比赛
#[derive(Debug, Clone)]
pub struct GameFixture {
    pub home_team: String,
    pub away_team: String,
}

/// 球员预测的上下文提供方
#[async_trait]
pub trait PlayerContextProvider: Send + Sync {
    async fn prepare(&self, player: &str, stat: &str, matchup: &str) -> ContextReport;

    /// 每日定时任务要跑的当日盘口列表
    async fn todays_matchups(&self) -> Vec<PlayerMatchup>;
}

/// 比赛预测的上下文提供方
#[async_trait]
pub trait GameContextProvider: Send + Sync {
    async fn prepare(&self, home_team: &str, away_team: &str) -> ContextReport;

    async fn todays_games(&self) -> Vec<GameFixture>;
}

/// 离线夹具：内置一组示例数据，未命中时返回错误报告
pub struct FixtureContextProvider {
    matchups: Vec<PlayerMatchup>,
    games: Vec<GameFixture>,
}

impl Default for FixtureContextProvider {
    fn default() -> Self {
        Self::demo()
    }
}

impl FixtureContextProvider {
    pub fn new(matchups: Vec<PlayerMatchup>, games: Vec<GameFixture>) -> Self {
        Self { matchups, games }
    }

    /// 示例数据集
    pub fn demo() -> Self {
        Self {
            matchups: vec![
                PlayerMatchup {
                    player: "LeBron James".into(),
                    stat: "points".into(),
                    matchup: "LAL vs BOS".into(),
                },
                PlayerMatchup {
                    player: "Jayson Tatum".into(),
                    stat: "rebounds".into(),
                    matchup: "LAL vs BOS".into(),
                },
            ],
            games: vec![GameFixture {
                home_team: "Lakers".into(),
                away_team: "Celtics".into(),
            }],
        }
    }

    fn known_player(&self, player: &str) -> bool {
        self.matchups.iter().any(|m| m.player == player)
    }

    fn known_game(&self, home_team: &str, away_team: &str) -> bool {
        self.games
            .iter()
            .any(|g| g.home_team == home_team && g.away_team == away_team)
    }
}

#[async_trait]
impl PlayerContextProvider for FixtureContextProvider {
    async fn prepare(&self, player: &str, stat: &str, matchup: &str) -> ContextReport {
        if !self.known_player(player) {
            return ContextReport::error(format!("no data for player: {player}"));
        }
        ContextReport::success(json!({
            "player": player,
            "stat": stat,
            "matchup": matchup,
            "recent_games": [
                {"opponent": "GSW", "value": 28},
                {"opponent": "PHX", "value": 24},
                {"opponent": "DEN", "value": 31},
            ],
            "season_average": 26.4,
            "prizepicks_line": 26.5,
        }))
    }

    async fn todays_matchups(&self) -> Vec<PlayerMatchup> {
        self.matchups.clone()
    }
}

#[async_trait]
impl GameContextProvider for FixtureContextProvider {
    async fn prepare(&self, home_team: &str, away_team: &str) -> ContextReport {
        if !self.known_game(home_team, away_team) {
            return ContextReport::error(format!(
                "no fixture for game: {home_team} vs {away_team}"
            ));
        }
        ContextReport::success(json!({
            "home_team": home_team,
            "away_team": away_team,
            "home_record": "38-20",
            "away_record": "41-17",
            "moneyline": {"home": -130, "away": 110},
            "head_to_head_last_season": {"home_wins": 1, "away_wins": 2},
        }))
    }

    async fn todays_games(&self) -> Vec<GameFixture> {
        self.games.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_provider_reports() {
        let provider = FixtureContextProvider::demo();
        let ok = PlayerContextProvider::prepare(&provider, "LeBron James", "points", "LAL vs BOS")
            .await;
        assert_eq!(ok.status, ContextStatus::Success);
        assert_eq!(ok.data["season_average"], json!(26.4));

        let err =
            PlayerContextProvider::prepare(&provider, "Nobody", "points", "LAL vs BOS").await;
        assert!(err.is_error());
        assert!(err.summary().contains("no data for player"));
    }

    #[tokio::test]
    async fn test_fixture_game_report_carries_moneyline() {
        let provider = FixtureContextProvider::demo();
        let report = GameContextProvider::prepare(&provider, "Lakers", "Celtics").await;
        assert_eq!(report.status, ContextStatus::Success);
        assert_eq!(report.data["moneyline"]["home"], json!(-130));
        assert_eq!(report.data["moneyline"]["away"], json!(110));
    }
}
