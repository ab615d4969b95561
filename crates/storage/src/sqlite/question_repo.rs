use quiz_core::model::{Question, QuestionId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, map_question_row, question_id_columns, ser};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let (kind, id) = question_id_columns(question.id());
        let options = serde_json::to_string(question.options()).map_err(ser)?;
        let correct_index = i64::try_from(question.correct_index())
            .map_err(|_| StorageError::Serialization("correct_index overflow".into()))?;

        sqlx::query(
            r"
            INSERT INTO questions (id, id_kind, text, options, correct_index)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id_kind, id) DO UPDATE SET
                text = excluded.text,
                options = excluded.options,
                correct_index = excluded.correct_index
            ",
        )
        .bind(id)
        .bind(kind)
        .bind(question.text().to_owned())
        .bind(options)
        .bind(correct_index)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_question(&self, id: &QuestionId) -> Result<Question, StorageError> {
        let (kind, raw) = question_id_columns(id);
        let row = sqlx::query(
            r"
            SELECT id, id_kind, text, options, correct_index
            FROM questions
            WHERE id_kind = ?1 AND id = ?2
            ",
        )
        .bind(kind)
        .bind(raw)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Err(StorageError::NotFound);
        };
        map_question_row(&row)
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        // numeric ids sort before text ids, numerically among themselves
        let rows = sqlx::query(
            r"
            SELECT id, id_kind, text, options, correct_index
            FROM questions
            ORDER BY
                id_kind ASC,
                CASE WHEN id_kind = 'number' THEN CAST(id AS INTEGER) END ASC,
                id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }

    async fn count_questions(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM questions")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(ser)
    }
}
