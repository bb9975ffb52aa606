//! 预测域：上下文接口、请求阶段状态机与响应类型

pub mod context;
pub mod phase;
pub mod response;

pub use context::{
    ContextReport, ContextStatus, FixtureContextProvider, GameContextProvider, GameFixture,
    PlayerContextProvider, PlayerMatchup,
};
pub use phase::{PhaseTracker, RequestPhase};
pub use response::{GamePredictionResponse, PlayerPredictionResponse};
