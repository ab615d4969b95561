use quiz_core::model::{
    Difficulty, Question, QuestionId, ScoreRecord, SessionId, SessionOutcome, UserId,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// Splits an id into its `(id_kind, id)` column pair.
pub(crate) fn question_id_columns(id: &QuestionId) -> (&'static str, String) {
    match id {
        QuestionId::Number(n) => ("number", n.to_string()),
        QuestionId::Text(s) => ("text", s.clone()),
    }
}

pub(crate) fn question_id_from_columns(kind: &str, raw: String) -> Result<QuestionId, StorageError> {
    match kind {
        "number" => raw
            .parse::<u64>()
            .map(QuestionId::Number)
            .map_err(|_| StorageError::Serialization(format!("invalid numeric id: {raw}"))),
        "text" => Ok(QuestionId::Text(raw)),
        _ => Err(StorageError::Serialization(format!("invalid id kind: {kind}"))),
    }
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let kind: String = row.try_get("id_kind").map_err(ser)?;
    let id = question_id_from_columns(&kind, row.try_get("id").map_err(ser)?)?;
    let text: String = row.try_get("text").map_err(ser)?;
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: Vec<String> = serde_json::from_str(&options_json).map_err(ser)?;
    let correct_index = usize::try_from(row.try_get::<i64, _>("correct_index").map_err(ser)?)
        .map_err(ser)?;

    Question::new(id, text, options, correct_index).map_err(ser)
}

pub(crate) fn map_score_row(row: &sqlx::sqlite::SqliteRow) -> Result<ScoreRecord, StorageError> {
    let session_id: SessionId = row
        .try_get::<String, _>("session_id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let user_id = row
        .try_get::<Option<String>, _>("user_id")
        .map_err(ser)?
        .and_then(UserId::new);
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let outcome: SessionOutcome = row
        .try_get::<String, _>("outcome")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let score = u32_from_i64("score", row.try_get("score").map_err(ser)?)?;
    let streak = u32_from_i64("streak", row.try_get("streak").map_err(ser)?)?;
    let best_streak = u32_from_i64("best_streak", row.try_get("best_streak").map_err(ser)?)?;
    let answered = u32_from_i64("answered", row.try_get("answered").map_err(ser)?)?;
    let total_questions = u32_from_i64(
        "total_questions",
        row.try_get("total_questions").map_err(ser)?,
    )?;
    let finished_at = row.try_get("finished_at").map_err(ser)?;

    ScoreRecord::from_persisted(
        session_id,
        user_id,
        difficulty,
        outcome,
        score,
        streak,
        best_streak,
        answered,
        total_questions,
        finished_at,
    )
    .map_err(ser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_id_columns_round_trip() {
        for id in [QuestionId::number(12), QuestionId::text("12")] {
            let (kind, raw) = question_id_columns(&id);
            assert_eq!(question_id_from_columns(kind, raw).unwrap(), id);
        }
    }

    #[test]
    fn unknown_id_kind_is_a_serialization_error() {
        assert!(matches!(
            question_id_from_columns("uuid", "x".into()),
            Err(StorageError::Serialization(_))
        ));
    }
}
