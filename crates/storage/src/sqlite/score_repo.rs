use quiz_core::model::{Difficulty, ScoreRecord};

use super::SqliteRepository;
use super::mapping::{conn, map_score_row};
use crate::repository::{ScoreRepository, StorageError};

const SCORE_COLUMNS: &str = "session_id, user_id, difficulty, outcome, score, streak, \
     best_streak, answered, total_questions, finished_at";

#[async_trait::async_trait]
impl ScoreRepository for SqliteRepository {
    async fn append_score(&self, record: &ScoreRecord) -> Result<(), StorageError> {
        let result = sqlx::query(
            r"
            INSERT INTO scores (
                session_id, user_id, difficulty, outcome, score, streak,
                best_streak, answered, total_questions, finished_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(record.session_id().to_string())
        .bind(record.user_id().map(|u| u.as_str().to_owned()))
        .bind(record.difficulty().as_str())
        .bind(record.outcome().as_str())
        .bind(i64::from(record.score()))
        .bind(i64::from(record.streak()))
        .bind(i64::from(record.best_streak()))
        .bind(i64::from(record.answered()))
        .bind(i64::from(record.total_questions()))
        .bind(record.finished_at())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StorageError::Conflict)
            }
            Err(e) => Err(conn(e)),
        }
    }

    async fn list_recent(
        &self,
        limit: u32,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<ScoreRecord>, StorageError> {
        let sql = format!(
            "SELECT {SCORE_COLUMNS} FROM scores \
             WHERE (?2 IS NULL OR difficulty = ?2) \
             ORDER BY finished_at DESC, session_id ASC \
             LIMIT ?1"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .bind(difficulty.map(Difficulty::as_str))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_score_row(&row)?);
        }
        Ok(out)
    }

    async fn best_score(
        &self,
        difficulty: Option<Difficulty>,
    ) -> Result<Option<ScoreRecord>, StorageError> {
        // ties go to the earliest finisher
        let sql = format!(
            "SELECT {SCORE_COLUMNS} FROM scores \
             WHERE (?1 IS NULL OR difficulty = ?1) \
             ORDER BY score DESC, finished_at ASC \
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(difficulty.map(Difficulty::as_str))
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_score_row).transpose()
    }
}
