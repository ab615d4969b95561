mod history;
mod progress;
mod runner;
mod workflow;

// Public API of the session subsystem.
pub use history::{ScoreHistoryService, ScoreOverview};
pub use progress::SessionProgress;
pub use runner::{ParseInputError, PlayerInput, QuizRunner, RunOutcome, SessionObserver};
pub use workflow::{FinishedSession, PendingReport, QuizWorkflow};
