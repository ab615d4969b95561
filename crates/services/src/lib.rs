#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod question_bank;
pub mod question_source;
pub mod score_reporter;
pub mod sessions;
pub mod timer;

pub use quiz_core::Clock;

pub use app_services::{AppServices, AppSettings};
pub use error::{
    AppServicesError, QuestionBankError, QuestionSourceError, QuizError, ScoreReportError,
};
pub use question_bank::QuestionBank;
pub use question_source::{
    FileQuestionSource, HttpQuestionSource, QuestionSource, QuestionSourceKind,
    RepositoryQuestionSource, StaticQuestionSource,
};
pub use score_reporter::{HttpScoreReporter, ScoreReporter, ScoreReporterConfig};
pub use sessions::{
    FinishedSession, PendingReport, PlayerInput, QuizRunner, QuizWorkflow, RunOutcome,
    ScoreHistoryService, ScoreOverview, SessionObserver, SessionProgress,
};
pub use timer::{QuestionTimer, Tick};
