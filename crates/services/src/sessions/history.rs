use std::sync::Arc;

use quiz_core::model::{Difficulty, ScoreRecord};
use storage::repository::{ScoreRepository, StorageError};

/// Local score history plus the best result, for the `scores` screen.
///
/// Records are returned as stored; formatting is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOverview {
    pub recent: Vec<ScoreRecord>,
    pub best: Option<ScoreRecord>,
}

#[derive(Clone)]
pub struct ScoreHistoryService {
    scores: Arc<dyn ScoreRepository>,
}

impl ScoreHistoryService {
    #[must_use]
    pub fn new(scores: Arc<dyn ScoreRepository>) -> Self {
        Self { scores }
    }

    /// Latest `limit` records, newest first, and the best one overall or for
    /// a single difficulty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the history cannot be read.
    pub async fn overview(
        &self,
        limit: u32,
        difficulty: Option<Difficulty>,
    ) -> Result<ScoreOverview, StorageError> {
        let recent = self.scores.list_recent(limit, difficulty).await?;
        let best = self.scores.best_score(difficulty).await?;
        Ok(ScoreOverview { recent, best })
    }
}
