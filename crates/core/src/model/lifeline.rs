use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seconds added by the extra-time lifeline.
pub const EXTRA_TIME_BONUS_SECS: u32 = 5;

/// Number of wrong options hidden by the fifty-fifty lifeline.
pub const FIFTY_ELIMINATES: usize = 2;

/// Single-use modifiers available once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lifeline {
    /// Hide two wrong options on the current question.
    Fifty,
    /// Move on without answering; neither right nor wrong.
    Skip,
    /// Add `EXTRA_TIME_BONUS_SECS` to the running countdown.
    ExtraTime,
}

impl Lifeline {
    pub const ALL: [Lifeline; 3] = [Lifeline::Fifty, Lifeline::Skip, Lifeline::ExtraTime];

    fn bit(self) -> u8 {
        match self {
            Lifeline::Fifty => 0b001,
            Lifeline::Skip => 0b010,
            Lifeline::ExtraTime => 0b100,
        }
    }
}

impl fmt::Display for Lifeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifeline::Fifty => "50-50",
            Lifeline::Skip => "skip",
            Lifeline::ExtraTime => "extra time",
        })
    }
}

/// Error type for parsing a lifeline name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLifelineError(String);

impl fmt::Display for ParseLifelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown lifeline: {}", self.0)
    }
}

impl std::error::Error for ParseLifelineError {}

impl FromStr for Lifeline {
    type Err = ParseLifelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "50" | "50-50" | "5050" | "fifty" => Ok(Lifeline::Fifty),
            "skip" => Ok(Lifeline::Skip),
            "time" | "extratime" | "extra-time" | "+5" => Ok(Lifeline::ExtraTime),
            _ => Err(ParseLifelineError(s.to_owned())),
        }
    }
}

/// Set of lifelines already consumed in a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifelineSet(u8);

impl LifelineSet {
    #[must_use]
    pub fn contains(self, lifeline: Lifeline) -> bool {
        self.0 & lifeline.bit() != 0
    }

    /// Marks `lifeline` used. Returns false when it already was.
    pub fn insert(&mut self, lifeline: Lifeline) -> bool {
        let fresh = !self.contains(lifeline);
        self.0 |= lifeline.bit();
        fresh
    }

    /// Lifelines still available, in display order.
    #[must_use]
    pub fn remaining(self) -> Vec<Lifeline> {
        Lifeline::ALL
            .into_iter()
            .filter(|l| !self.contains(*l))
            .collect()
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}
