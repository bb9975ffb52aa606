//! 持久化层：预测记录、SQLite 工作单元与仓储

pub mod records;
pub mod sqlite;

pub use records::{GamePredictionRecord, PlayerPredictionRecord};
pub use sqlite::{
    init_schema, DbError, GamePredictionRepo, PlayerPredictionRepo, SqliteUnitOfWork,
    SqliteUowFactory, UnitOfWorkFactory,
};
