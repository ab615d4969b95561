use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use quiz_core::model::Question;

use crate::error::QuestionBankError;

/// A validated question pool that sessions draw from.
///
/// Ids are unique across the pool, so a draw never repeats a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    pool: Vec<Question>,
}

impl QuestionBank {
    /// Wrap a loaded pool.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError::DuplicateQuestionId` if two questions share an id.
    pub fn new(pool: Vec<Question>) -> Result<Self, QuestionBankError> {
        let mut seen = HashSet::with_capacity(pool.len());
        for question in &pool {
            if !seen.insert(question.id()) {
                return Err(QuestionBankError::DuplicateQuestionId(question.id().clone()));
            }
        }
        Ok(Self { pool })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.pool
    }

    /// Draw `n` questions in a fresh uniformly random order.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError::InsufficientQuestions` when the pool holds
    /// fewer than `n` questions.
    pub fn draw<R>(&self, n: usize, rng: &mut R) -> Result<Vec<Question>, QuestionBankError>
    where
        R: Rng + ?Sized,
    {
        draw(&self.pool, n, rng)
    }
}

/// Shuffle a copy of `pool` and keep the first `n`.
///
/// Each call is independent of earlier ones. The pool itself is never reordered.
///
/// # Errors
///
/// Returns `QuestionBankError::InsufficientQuestions` when `pool.len() < n`.
pub fn draw<R>(pool: &[Question], n: usize, rng: &mut R) -> Result<Vec<Question>, QuestionBankError>
where
    R: Rng + ?Sized,
{
    if pool.len() < n {
        return Err(QuestionBankError::InsufficientQuestions {
            requested: n,
            available: pool.len(),
        });
    }

    let mut drawn = pool.to_vec();
    drawn.shuffle(rng);
    drawn.truncate(n);
    Ok(drawn)
}
