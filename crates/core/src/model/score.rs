use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{Difficulty, SessionId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreRecordError {
    #[error("final streak ({streak}) exceeds best streak ({best_streak})")]
    StreakAboveBest { streak: u32, best_streak: u32 },

    #[error("answered ({answered}) exceeds total questions ({total})")]
    AnsweredAboveTotal { answered: u32, total: u32 },

    #[error("unknown session outcome: {0}")]
    UnknownOutcome(String),
}

/// How a session reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    /// Every question was answered, timed out or skipped.
    Completed,
    /// Lives ran out before the last question.
    Exhausted,
}

impl SessionOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionOutcome::Completed => "completed",
            SessionOutcome::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionOutcome {
    type Err = ScoreRecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(SessionOutcome::Completed),
            "exhausted" => Ok(SessionOutcome::Exhausted),
            _ => Err(ScoreRecordError::UnknownOutcome(s.to_owned())),
        }
    }
}

/// Body of the score submission sent to the score API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub user_id: UserId,
    pub score: u32,
    pub streak: u32,
}

/// Final result of a session as kept in the local score history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    session_id: SessionId,
    user_id: Option<UserId>,
    difficulty: Difficulty,
    outcome: SessionOutcome,
    score: u32,
    streak: u32,
    best_streak: u32,
    answered: u32,
    total_questions: u32,
    finished_at: DateTime<Utc>,
}

impl ScoreRecord {
    /// Rehydrate or build a score record, checking its counters agree.
    ///
    /// # Errors
    ///
    /// Returns `ScoreRecordError` if `streak > best_streak` or
    /// `answered > total_questions`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        session_id: SessionId,
        user_id: Option<UserId>,
        difficulty: Difficulty,
        outcome: SessionOutcome,
        score: u32,
        streak: u32,
        best_streak: u32,
        answered: u32,
        total_questions: u32,
        finished_at: DateTime<Utc>,
    ) -> Result<Self, ScoreRecordError> {
        if streak > best_streak {
            return Err(ScoreRecordError::StreakAboveBest {
                streak,
                best_streak,
            });
        }
        if answered > total_questions {
            return Err(ScoreRecordError::AnsweredAboveTotal {
                answered,
                total: total_questions,
            });
        }

        Ok(Self {
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
        })
    }

    /// The payload to submit for this record, if a user was signed in.
    #[must_use]
    pub fn report(&self) -> Option<ScoreReport> {
        self.user_id.clone().map(|user_id| ScoreReport {
            user_id,
            score: self.score,
            streak: self.streak,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn outcome(&self) -> SessionOutcome {
        self.outcome
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    /// Questions that were answered or timed out (skips excluded).
    #[must_use]
    pub fn answered(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn record(streak: u32, best: u32, user: Option<&str>) -> Result<ScoreRecord, ScoreRecordError> {
        ScoreRecord::from_persisted(
            SessionId::generate(),
            user.and_then(UserId::new),
            Difficulty::Medium,
            SessionOutcome::Completed,
            7,
            streak,
            best,
            5,
            5,
            fixed_now(),
        )
    }

    #[test]
    fn rejects_streak_above_best() {
        let err = record(4, 2, None).unwrap_err();
        assert_eq!(
            err,
            ScoreRecordError::StreakAboveBest {
                streak: 4,
                best_streak: 2
            }
        );
    }

    #[test]
    fn report_requires_user() {
        assert!(record(1, 3, None).unwrap().report().is_none());

        let report = record(1, 3, Some("player-1")).unwrap().report().unwrap();
        assert_eq!(report.score, 7);
        assert_eq!(report.streak, 1);
        assert_eq!(report.user_id.as_str(), "player-1");
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = ScoreReport {
            user_id: UserId::new("u1").unwrap(),
            score: 7,
            streak: 4,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({"userId": "u1", "score": 7, "streak": 4}));
    }

    #[test]
    fn outcome_round_trips_through_str() {
        for outcome in [SessionOutcome::Completed, SessionOutcome::Exhausted] {
            assert_eq!(outcome.as_str().parse::<SessionOutcome>().unwrap(), outcome);
        }
        assert!("abandoned".parse::<SessionOutcome>().is_err());
    }
}
