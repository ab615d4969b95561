//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::SessionError;
use quiz_core::model::{ConfigError, QuestionError, QuestionId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `QuestionBank`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionBankError {
    #[error("requested {requested} questions but only {available} are available")]
    InsufficientQuestions { requested: usize, available: usize },
    #[error("question id {0} appears more than once in the pool")]
    DuplicateQuestionId(QuestionId),
}

/// Errors emitted while loading a question pool.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionSourceError {
    #[error("invalid question source url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("question source request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("could not read question file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed question pool: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while persisting a finished session's score.
///
/// Every variant is a `ScorePersistenceFailed` condition: non-fatal, logged
/// and shown as a notice.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoreReportError {
    #[error("invalid score endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("score endpoint answered with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("score request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("score report task ended early")]
    Aborted,
    #[error("score report still pending after {0:?}")]
    TimedOut(std::time::Duration),
    #[error("local score store failed: {0}")]
    Storage(#[from] StorageError),
}

/// Errors emitted by the quiz workflow and runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error(transparent)]
    Bank(#[from] QuestionBankError),
    #[error(transparent)]
    Source(#[from] QuestionSourceError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("score persistence failed: {0}")]
    ScorePersistenceFailed(#[from] ScoreReportError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Source(#[from] QuestionSourceError),
    #[error(transparent)]
    Report(#[from] ScoreReportError),
}
