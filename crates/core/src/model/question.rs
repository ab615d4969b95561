use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} has empty text")]
    EmptyText { id: QuestionId },

    #[error("question {id} needs at least 2 options, got {len}")]
    TooFewOptions { id: QuestionId, len: usize },

    #[error("question {id} has an empty option at position {index}")]
    EmptyOption { id: QuestionId, index: usize },

    #[error("question {id} marks option {index} correct but only has {len} options")]
    CorrectIndexOutOfRange {
        id: QuestionId,
        index: usize,
        len: usize,
    },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Minimum number of options a multiple-choice question must offer.
pub const MIN_OPTIONS: usize = 2;

/// A multiple-choice question. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_index: usize,
}

impl Question {
    /// Validates and builds a question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text or an option is blank, fewer than
    /// two options are given, or `correct_index` does not point at an option.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, QuestionError> {
        let text = text.into().trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText { id });
        }
        if options.len() < MIN_OPTIONS {
            return Err(QuestionError::TooFewOptions {
                id,
                len: options.len(),
            });
        }
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { id, index });
        }
        if correct_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                id,
                index: correct_index,
                len: options.len(),
            });
        }

        Ok(Self {
            id,
            text,
            options,
            correct_index,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_index
    }

    /// Indices of every option except the correct one, in display order.
    #[must_use]
    pub fn wrong_indices(&self) -> Vec<usize> {
        (0..self.options.len())
            .filter(|i| *i != self.correct_index)
            .collect()
    }
}

/// Wire shape of a question; accepts the legacy `q`/`opts`/`ans` field names.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionRecord {
    id: QuestionId,
    #[serde(alias = "q", alias = "question")]
    text: String,
    #[serde(alias = "opts")]
    options: Vec<String>,
    #[serde(alias = "ans", alias = "correct")]
    correct_index: usize,
}

impl<'de> Deserialize<'de> for Question {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let record = QuestionRecord::deserialize(deserializer)?;
        Question::new(
            record.id,
            record.text,
            record.options,
            record.correct_index,
        )
        .map_err(serde::de::Error::custom)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
