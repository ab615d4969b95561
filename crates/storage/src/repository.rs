use async_trait::async_trait;
use quiz_core::model::{Difficulty, Question, QuestionId, ScoreRecord};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the question pool.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or replace a question by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Fetch a single question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_question(&self, id: &QuestionId) -> Result<Question, StorageError>;

    /// Every stored question, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the pool cannot be read.
    async fn list_questions(&self) -> Result<Vec<Question>, StorageError>;

    /// Number of stored questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the pool cannot be read.
    async fn count_questions(&self) -> Result<u64, StorageError>;
}

/// Repository contract for locally kept session results.
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Append a finished session. Each session id may be stored once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session was already recorded.
    async fn append_score(&self, record: &ScoreRecord) -> Result<(), StorageError>;

    /// Most recent records first, optionally limited to one difficulty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the history cannot be read.
    async fn list_recent(
        &self,
        limit: u32,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<ScoreRecord>, StorageError>;

    /// Highest-scoring record, optionally limited to one difficulty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the history cannot be read.
    async fn best_score(
        &self,
        difficulty: Option<Difficulty>,
    ) -> Result<Option<ScoreRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
    scores: Arc<Mutex<Vec<ScoreRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(question.id().clone(), question.clone());
        Ok(())
    }

    async fn get_question(&self, id: &QuestionId) -> Result<Question, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        Ok(guard.values().cloned().collect())
    }

    async fn count_questions(&self) -> Result<u64, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        Ok(guard.len() as u64)
    }
}

#[async_trait]
impl ScoreRepository for InMemoryRepository {
    async fn append_score(&self, record: &ScoreRecord) -> Result<(), StorageError> {
        let mut guard = self.scores.lock().map_err(poisoned)?;
        if guard
            .iter()
            .any(|r| r.session_id() == record.session_id())
        {
            return Err(StorageError::Conflict);
        }
        guard.push(record.clone());
        Ok(())
    }

    async fn list_recent(
        &self,
        limit: u32,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<ScoreRecord>, StorageError> {
        let guard = self.scores.lock().map_err(poisoned)?;
        let mut records: Vec<ScoreRecord> = guard
            .iter()
            .filter(|r| difficulty.is_none_or(|d| r.difficulty() == d))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.finished_at().cmp(&a.finished_at()));
        records.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(records)
    }

    async fn best_score(
        &self,
        difficulty: Option<Difficulty>,
    ) -> Result<Option<ScoreRecord>, StorageError> {
        let guard = self.scores.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|r| difficulty.is_none_or(|d| r.difficulty() == d))
            .max_by(|a, b| {
                a.score()
                    .cmp(&b.score())
                    .then_with(|| b.finished_at().cmp(&a.finished_at()))
            })
            .cloned())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub scores: Arc<dyn ScoreRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let scores: Arc<dyn ScoreRepository> = Arc::new(repo);
        Self { questions, scores }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{SessionId, SessionOutcome, UserId};
    use quiz_core::pool::builtin_questions;
    use quiz_core::time::fixed_now;

    fn build_record(score: u32, difficulty: Difficulty, minutes_ago: i64) -> ScoreRecord {
        ScoreRecord::from_persisted(
            SessionId::generate(),
            UserId::new("local"),
            difficulty,
            SessionOutcome::Completed,
            score,
            1,
            2,
            3,
            3,
            fixed_now() - Duration::minutes(minutes_ago),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn questions_round_trip_in_id_order() {
        let repo = InMemoryRepository::new();
        let pool = builtin_questions().unwrap();
        for q in pool.iter().rev() {
            repo.upsert_question(q).await.unwrap();
        }

        assert_eq!(repo.count_questions().await.unwrap(), pool.len() as u64);
        let listed = repo.list_questions().await.unwrap();
        assert_eq!(listed, pool);

        let first = repo.get_question(pool[0].id()).await.unwrap();
        assert_eq!(&first, &pool[0]);
        assert!(matches!(
            repo.get_question(&QuestionId::text("missing")).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn duplicate_session_is_a_conflict() {
        let repo = InMemoryRepository::new();
        let record = build_record(5, Difficulty::Easy, 0);
        repo.append_score(&record).await.unwrap();
        assert!(matches!(
            repo.append_score(&record).await,
            Err(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn recent_and_best_scores() {
        let repo = InMemoryRepository::new();
        repo.append_score(&build_record(3, Difficulty::Easy, 30))
            .await
            .unwrap();
        repo.append_score(&build_record(9, Difficulty::Hard, 20))
            .await
            .unwrap();
        repo.append_score(&build_record(4, Difficulty::Easy, 10))
            .await
            .unwrap();

        let recent = repo.list_recent(2, None).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].score(), 4);
        assert_eq!(recent[1].score(), 9);

        let easy = repo.list_recent(2, Some(Difficulty::Easy)).await.unwrap();
        let scores: Vec<u32> = easy.iter().map(ScoreRecord::score).collect();
        assert_eq!(scores, vec![4, 3]);

        let best = repo.best_score(None).await.unwrap().unwrap();
        assert_eq!(best.score(), 9);
        let best_easy = repo
            .best_score(Some(Difficulty::Easy))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(best_easy.score(), 4);
        assert!(
            repo.best_score(Some(Difficulty::Medium))
                .await
                .unwrap()
                .is_none()
        );
    }
}
