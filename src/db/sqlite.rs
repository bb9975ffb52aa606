//! SQLite 持久化：单次使用的工作单元 + 仓储
//!
//! 工作单元包一个事务（BEGIN/COMMIT/ROLLBACK），同一实例第二次 begin
//! 必须确定性地报错（单次使用守卫）。每个事务从工厂取新实例，
//! 工厂以依赖注入的方式传入各 Agent。

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::db::records::{GamePredictionRecord, PlayerPredictionRecord};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("cannot use the same unit of work twice")]
    AlreadyUsed,

    #[error("no active transaction")]
    NotActive,

    #[error("db error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// 建表（幂等）
pub fn init_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS player_predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_name TEXT NOT NULL,
            stat TEXT NOT NULL,
            matchup TEXT NOT NULL,
            value REAL,
            range_low REAL,
            range_high REAL,
            confidence REAL NOT NULL,
            explanation TEXT NOT NULL,
            prizepicks_line REAL,
            prizepicks_reason TEXT,
            additional_context TEXT,
            created_at TEXT NOT NULL,
            actual_value REAL,
            was_correct INTEGER
        );
        CREATE TABLE IF NOT EXISTS game_predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            predicted_winner TEXT,
            home_team_win_percentage REAL,
            opposing_team_win_percentage REAL,
            confidence REAL NOT NULL,
            explanation TEXT NOT NULL,
            created_at TEXT NOT NULL,
            actual_winner TEXT,
            was_correct INTEGER
        );",
    )?;
    Ok(())
}

/// 单次使用的工作单元：一个连接、一个事务
pub struct SqliteUnitOfWork {
    conn: Connection,
    used: bool,
    active: bool,
}

impl SqliteUnitOfWork {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn,
            used: false,
            active: false,
        })
    }

    /// 开启事务；同一实例第二次调用报 AlreadyUsed
    pub fn begin(&mut self) -> Result<(), DbError> {
        if self.used {
            return Err(DbError::AlreadyUsed);
        }
        self.conn.execute_batch("BEGIN")?;
        self.used = true;
        self.active = true;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<(), DbError> {
        if !self.active {
            return Err(DbError::NotActive);
        }
        self.conn.execute_batch("COMMIT")?;
        self.active = false;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<(), DbError> {
        if !self.active {
            return Err(DbError::NotActive);
        }
        self.conn.execute_batch("ROLLBACK")?;
        self.active = false;
        Ok(())
    }

    pub fn player_predictions(&self) -> PlayerPredictionRepo<'_> {
        PlayerPredictionRepo { conn: &self.conn }
    }

    pub fn game_predictions(&self) -> GamePredictionRepo<'_> {
        GamePredictionRepo { conn: &self.conn }
    }
}

impl Drop for SqliteUnitOfWork {
    fn drop(&mut self) {
        if self.active {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

/// 球员预测仓储（借用工作单元的连接，随事务提交或回滚）
pub struct PlayerPredictionRepo<'a> {
    conn: &'a Connection,
}

impl PlayerPredictionRepo<'_> {
    pub fn add(&self, record: &PlayerPredictionRecord) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO player_predictions (
                player_name, stat, matchup, value, range_low, range_high,
                confidence, explanation, prizepicks_line, prizepicks_reason,
                additional_context, created_at, actual_value, was_correct
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.player_name,
                record.stat,
                record.matchup,
                record.value,
                record.range_low,
                record.range_high,
                record.confidence,
                record.explanation,
                record.prizepicks_line,
                record.prizepicks_reason,
                record.additional_context,
                record.created_at,
                record.actual_value,
                record.was_correct,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_for_matchup(&self, matchup: &str) -> Result<Vec<PlayerPredictionRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, player_name, stat, matchup, value, range_low, range_high,
                    confidence, explanation, prizepicks_line, prizepicks_reason,
                    additional_context, created_at, actual_value, was_correct
             FROM player_predictions WHERE matchup = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![matchup], |row| {
            Ok(PlayerPredictionRecord {
                id: row.get(0)?,
                player_name: row.get(1)?,
                stat: row.get(2)?,
                matchup: row.get(3)?,
                value: row.get(4)?,
                range_low: row.get(5)?,
                range_high: row.get(6)?,
                confidence: row.get(7)?,
                explanation: row.get(8)?,
                prizepicks_line: row.get(9)?,
                prizepicks_reason: row.get(10)?,
                additional_context: row.get(11)?,
                created_at: row.get(12)?,
                actual_value: row.get(13)?,
                was_correct: row.get(14)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> Result<i64, DbError> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM player_predictions", [], |row| {
                row.get(0)
            })
            .optional()?
            .unwrap_or(0);
        Ok(n)
    }
}

/// 比赛预测仓储
pub struct GamePredictionRepo<'a> {
    conn: &'a Connection,
}

impl GamePredictionRepo<'_> {
    pub fn add(&self, record: &GamePredictionRecord) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO game_predictions (
                home_team, away_team, predicted_winner, home_team_win_percentage,
                opposing_team_win_percentage, confidence, explanation, created_at,
                actual_winner, was_correct
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.home_team,
                record.away_team,
                record.predicted_winner,
                record.home_team_win_percentage,
                record.opposing_team_win_percentage,
                record.confidence,
                record.explanation,
                record.created_at,
                record.actual_winner,
                record.was_correct,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_for_teams(
        &self,
        home_team: &str,
        away_team: &str,
    ) -> Result<Vec<GamePredictionRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, home_team, away_team, predicted_winner, home_team_win_percentage,
                    opposing_team_win_percentage, confidence, explanation, created_at,
                    actual_winner, was_correct
             FROM game_predictions WHERE home_team = ?1 AND away_team = ?2
             ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![home_team, away_team], |row| {
            Ok(GamePredictionRecord {
                id: row.get(0)?,
                home_team: row.get(1)?,
                away_team: row.get(2)?,
                predicted_winner: row.get(3)?,
                home_team_win_percentage: row.get(4)?,
                opposing_team_win_percentage: row.get(5)?,
                confidence: row.get(6)?,
                explanation: row.get(7)?,
                created_at: row.get(8)?,
                actual_winner: row.get(9)?,
                was_correct: row.get(10)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// 工作单元工厂：每个事务取一个已 begin 的新实例
pub trait UnitOfWorkFactory: Send + Sync {
    fn begin(&self) -> Result<SqliteUnitOfWork, DbError>;
}

/// 按路径开库的工厂实现
pub struct SqliteUowFactory {
    path: PathBuf,
}

impl SqliteUowFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UnitOfWorkFactory for SqliteUowFactory {
    fn begin(&self) -> Result<SqliteUnitOfWork, DbError> {
        let mut uow = SqliteUnitOfWork::open(&self.path)?;
        uow.begin()?;
        Ok(uow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_player_record() -> PlayerPredictionRecord {
        PlayerPredictionRecord {
            id: None,
            player_name: "LeBron James".into(),
            stat: "points".into(),
            matchup: "LAL vs BOS".into(),
            value: Some(27.5),
            range_low: Some(24.0),
            range_high: Some(31.0),
            confidence: 0.8,
            explanation: "Strong recent form".into(),
            prizepicks_line: Some(26.5),
            prizepicks_reason: Some("over".into()),
            additional_context: None,
            created_at: Utc::now(),
            actual_value: None,
            was_correct: None,
        }
    }

    #[test]
    fn test_unit_of_work_single_use() {
        let dir = tempfile::tempdir().unwrap();
        let mut uow = SqliteUnitOfWork::open(dir.path().join("test.db")).unwrap();
        uow.begin().unwrap();
        uow.commit().unwrap();
        assert!(matches!(uow.begin(), Err(DbError::AlreadyUsed)));
    }

    #[test]
    fn test_add_and_list_within_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let factory = SqliteUowFactory::new(&path);

        let mut uow = factory.begin().unwrap();
        uow.player_predictions().add(&sample_player_record()).unwrap();
        uow.commit().unwrap();

        let uow2 = factory.begin().unwrap();
        let rows = uow2.player_predictions().list_for_matchup("LAL vs BOS").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].player_name, "LeBron James");
        assert_eq!(rows[0].value, Some(27.5));
        assert!(rows[0].actual_value.is_none());
    }

    #[test]
    fn test_rollback_discards_insert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let factory = SqliteUowFactory::new(&path);

        let mut uow = factory.begin().unwrap();
        uow.player_predictions().add(&sample_player_record()).unwrap();
        uow.rollback().unwrap();

        let uow2 = factory.begin().unwrap();
        assert_eq!(uow2.player_predictions().count().unwrap(), 0);
    }

    #[test]
    fn test_game_record_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let factory = SqliteUowFactory::new(dir.path().join("test.db"));
        let record = GamePredictionRecord {
            id: None,
            home_team: "Lakers".into(),
            away_team: "Celtics".into(),
            predicted_winner: Some("Lakers".into()),
            home_team_win_percentage: Some(0.55),
            opposing_team_win_percentage: Some(0.45),
            confidence: 0.7,
            explanation: "Home court edge".into(),
            created_at: Utc::now(),
            actual_winner: None,
            was_correct: None,
        };
        let mut uow = factory.begin().unwrap();
        uow.game_predictions().add(&record).unwrap();
        uow.commit().unwrap();

        let uow2 = factory.begin().unwrap();
        let rows = uow2
            .game_predictions()
            .list_for_teams("Lakers", "Celtics")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home_team_win_percentage, Some(0.55));
    }
}
