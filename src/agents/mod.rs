//! 具体 Agent：球员预测、比赛预测与 Twitter 发帖

pub mod game;
pub mod personalities;
pub mod player;
pub mod twitter;

pub use game::GamePredictionAgent;
pub use player::PlayerPredictionAgent;
pub use twitter::TwitterAgent;
