mod config;
mod ids;
mod lifeline;
mod question;
mod score;

pub use config::{ConfigError, DEFAULT_TOTAL_QUESTIONS, Difficulty, SessionConfig};
pub use ids::{ParseIdError, QuestionId, SessionId, UserId};
pub use lifeline::{
    EXTRA_TIME_BONUS_SECS, FIFTY_ELIMINATES, Lifeline, LifelineSet, ParseLifelineError,
};
pub use question::{MIN_OPTIONS, Question, QuestionError};
pub use score::{ScoreRecord, ScoreRecordError, ScoreReport, SessionOutcome};
