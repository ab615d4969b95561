use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("time per question must be > 0")]
    InvalidTimePerQuestion,

    #[error("starting lives must be > 0")]
    InvalidStartingLives,

    #[error("total questions must be > 0")]
    InvalidTotalQuestions,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ConfigError::UnknownDifficulty(s.to_owned())),
        }
    }
}

//
// ─── SESSION CONFIG ────────────────────────────────────────────────────────────
//

/// Questions drawn per session unless configured otherwise.
pub const DEFAULT_TOTAL_QUESTIONS: u32 = 10;

/// Rules for one quiz session, derived once from a difficulty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    difficulty: Difficulty,
    time_per_question: u32,
    starting_lives: u32,
    total_questions: u32,
    timer_enabled: bool,
}

impl SessionConfig {
    /// Preset rules for a difficulty level.
    ///
    /// - Easy: 20 s per question, 5 lives
    /// - Medium: 15 s per question, 3 lives
    /// - Hard: 10 s per question, 2 lives
    #[must_use]
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        let (time_per_question, starting_lives) = match difficulty {
            Difficulty::Easy => (20, 5),
            Difficulty::Medium => (15, 3),
            Difficulty::Hard => (10, 2),
        };
        Self {
            difficulty,
            time_per_question,
            starting_lives,
            total_questions: DEFAULT_TOTAL_QUESTIONS,
            timer_enabled: true,
        }
    }

    /// Creates custom session rules.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any count is zero.
    pub fn new(
        difficulty: Difficulty,
        time_per_question: u32,
        starting_lives: u32,
        total_questions: u32,
    ) -> Result<Self, ConfigError> {
        if time_per_question == 0 {
            return Err(ConfigError::InvalidTimePerQuestion);
        }
        if starting_lives == 0 {
            return Err(ConfigError::InvalidStartingLives);
        }
        if total_questions == 0 {
            return Err(ConfigError::InvalidTotalQuestions);
        }
        Ok(Self {
            difficulty,
            time_per_question,
            starting_lives,
            total_questions,
            timer_enabled: true,
        })
    }

    /// Override how many questions are drawn.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidTotalQuestions` for zero.
    pub fn with_total_questions(mut self, total_questions: u32) -> Result<Self, ConfigError> {
        if total_questions == 0 {
            return Err(ConfigError::InvalidTotalQuestions);
        }
        self.total_questions = total_questions;
        Ok(self)
    }

    /// Turn the per-question countdown on or off.
    #[must_use]
    pub fn with_timer(mut self, enabled: bool) -> Self {
        self.timer_enabled = enabled;
        self
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn time_per_question(&self) -> u32 {
        self.time_per_question
    }

    #[must_use]
    pub fn starting_lives(&self) -> u32 {
        self.starting_lives
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    /// When false the runner never schedules a countdown.
    #[must_use]
    pub fn timer_enabled(&self) -> bool {
        self.timer_enabled
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_difficulty(Difficulty::default())
    }
}

#[derive(Debug, Deserialize)]
struct SessionConfigRecord {
    difficulty: Difficulty,
    time_per_question: u32,
    starting_lives: u32,
    total_questions: u32,
    #[serde(default = "timer_on")]
    timer_enabled: bool,
}

fn timer_on() -> bool {
    true
}

impl<'de> Deserialize<'de> for SessionConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let record = SessionConfigRecord::deserialize(deserializer)?;
        SessionConfig::new(
            record.difficulty,
            record.time_per_question,
            record.starting_lives,
            record.total_questions,
        )
        .map(|config| config.with_timer(record.timer_enabled))
        .map_err(serde::de::Error::custom)
    }
}
