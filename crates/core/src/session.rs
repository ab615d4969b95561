//! Pure quiz session state machine.
//!
//! A [`QuizSession`] owns the drawn questions and every counter that changes
//! during play. It performs no I/O and holds no timer: the caller feeds it
//! `tick`, `answer`, `timeout` and `use_lifeline` transitions and renders the
//! [`SessionEvent`]s each transition returns.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::model::{
    EXTRA_TIME_BONUS_SECS, FIFTY_ELIMINATES, Lifeline, LifelineSet, Question, ScoreRecord,
    ScoreRecordError, SessionConfig, SessionId, SessionOutcome, UserId,
};
use crate::scoring::compute_gain;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("a session needs at least one question")]
    NoQuestions,

    /// A transition was attempted after the session ended. Indicates a caller bug.
    #[error("cannot {action} once the session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionOutcome,
    },

    #[error("session is still in progress")]
    NotFinished,

    #[error("lifeline {0} was already used this session")]
    LifelineAlreadyUsed(Lifeline),

    #[error("option {selected} does not exist (question has {len} options)")]
    InvalidOption { selected: usize, len: usize },

    #[error("option {selected} was eliminated by 50-50")]
    OptionEliminated { selected: usize },

    #[error(transparent)]
    Record(#[from] ScoreRecordError),
}

//
// ─── STATE & EVENTS ────────────────────────────────────────────────────────────
//

/// Externally visible state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active {
        current_index: usize,
        time_remaining: u32,
    },
    Completed {
        score: u32,
    },
    Exhausted {
        score: u32,
    },
}

impl SessionState {
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active { .. })
    }
}

/// Something a transition did, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    QuestionStarted {
        index: usize,
        time_remaining: u32,
    },
    Answered {
        index: usize,
        selected: usize,
        correct: bool,
        gained: u32,
    },
    TimedOut {
        index: usize,
    },
    Ticked {
        time_remaining: u32,
    },
    LifelineUsed(Lifeline),
    OptionsEliminated {
        index: usize,
        options: Vec<usize>,
    },
    TimeAdded {
        bonus: u32,
        time_remaining: u32,
    },
    QuestionSkipped {
        index: usize,
    },
    Finished {
        outcome: SessionOutcome,
        score: u32,
        streak: u32,
    },
}

impl SessionEvent {
    /// True for events after which the current question is no longer the one on screen.
    #[must_use]
    pub fn ends_question(&self) -> bool {
        matches!(
            self,
            SessionEvent::Answered { .. }
                | SessionEvent::TimedOut { .. }
                | SessionEvent::QuestionSkipped { .. }
                | SessionEvent::Finished { .. }
        )
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One run through a fixed list of questions.
pub struct QuizSession {
    id: SessionId,
    config: SessionConfig,
    questions: Vec<Question>,
    current_index: usize,
    score: u32,
    lives: u32,
    streak: u32,
    best_streak: u32,
    answered: u32,
    time_remaining: u32,
    lifelines_used: LifelineSet,
    eliminated: Vec<usize>,
    outcome: Option<SessionOutcome>,
}

impl QuizSession {
    /// Starts a session at the first question with full lives and time.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestions` if `questions` is empty.
    pub fn new(config: SessionConfig, questions: Vec<Question>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        Ok(Self {
            id: SessionId::generate(),
            lives: config.starting_lives(),
            time_remaining: config.time_per_question(),
            config,
            questions,
            current_index: 0,
            score: 0,
            streak: 0,
            best_streak: 0,
            answered: 0,
            lifelines_used: LifelineSet::default(),
            eliminated: Vec::new(),
            outcome: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.outcome {
            None => SessionState::Active {
                current_index: self.current_index,
                time_remaining: self.time_remaining,
            },
            Some(SessionOutcome::Completed) => SessionState::Completed { score: self.score },
            Some(SessionOutcome::Exhausted) => SessionState::Exhausted { score: self.score },
        }
    }

    #[must_use]
    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The question on screen, or `None` once the session has ended.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.is_finished() {
            return None;
        }
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn lives(&self) -> u32 {
        self.lives
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn lifelines_used(&self) -> LifelineSet {
        self.lifelines_used
    }

    /// Options hidden by 50-50 on the current question.
    #[must_use]
    pub fn eliminated_options(&self) -> &[usize] {
        &self.eliminated
    }

    /// The `QuestionStarted` event for the question currently on screen.
    #[must_use]
    pub fn question_started(&self) -> Option<SessionEvent> {
        self.current_question()
            .map(|_| SessionEvent::QuestionStarted {
                index: self.current_index,
                time_remaining: self.time_remaining,
            })
    }

    /// Answer the current question with the option at `selected`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` once the session has ended,
    /// `InvalidOption` for an index past the options and `OptionEliminated`
    /// for an option hidden by 50-50. None of these change the state.
    pub fn answer(&mut self, selected: usize) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active("answer")?;
        let question = &self.questions[self.current_index];
        let len = question.options().len();
        if selected >= len {
            return Err(SessionError::InvalidOption { selected, len });
        }
        if self.eliminated.contains(&selected) {
            return Err(SessionError::OptionEliminated { selected });
        }

        let correct = question.is_correct(selected);
        let gained = if correct {
            let gained = compute_gain(self.streak);
            self.score = self.score.saturating_add(gained);
            self.streak += 1;
            self.best_streak = self.best_streak.max(self.streak);
            gained
        } else {
            self.lose_life();
            0
        };
        self.answered += 1;

        let mut events = vec![SessionEvent::Answered {
            index: self.current_index,
            selected,
            correct,
            gained,
        }];
        self.advance(&mut events);
        Ok(events)
    }

    /// The countdown for the current question ran out: a forced wrong answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` once the session has ended.
    pub fn timeout(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active("time out")?;
        self.lose_life();
        self.answered += 1;

        let mut events = vec![SessionEvent::TimedOut {
            index: self.current_index,
        }];
        self.advance(&mut events);
        Ok(events)
    }

    /// One second elapsed. Reaching zero times the question out in the same call.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` once the session has ended.
    pub fn tick(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_active("tick")?;
        self.time_remaining = self.time_remaining.saturating_sub(1);

        let mut events = vec![SessionEvent::Ticked {
            time_remaining: self.time_remaining,
        }];
        if self.time_remaining == 0 {
            events.extend(self.timeout()?);
        }
        Ok(events)
    }

    /// Spend a lifeline on the current question.
    ///
    /// `rng` picks which wrong options 50-50 hides.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LifelineAlreadyUsed` if `lifeline` was spent
    /// earlier (state untouched), or `InvalidTransition` once the session has ended.
    pub fn use_lifeline<R>(
        &mut self,
        lifeline: Lifeline,
        rng: &mut R,
    ) -> Result<Vec<SessionEvent>, SessionError>
    where
        R: Rng + ?Sized,
    {
        self.ensure_active("use a lifeline")?;
        if !self.lifelines_used.insert(lifeline) {
            return Err(SessionError::LifelineAlreadyUsed(lifeline));
        }

        let mut events = vec![SessionEvent::LifelineUsed(lifeline)];
        match lifeline {
            Lifeline::Fifty => {
                let wrong = self.questions[self.current_index].wrong_indices();
                let mut hidden: Vec<usize> = wrong
                    .choose_multiple(rng, FIFTY_ELIMINATES)
                    .copied()
                    .collect();
                hidden.sort_unstable();
                self.eliminated.clone_from(&hidden);
                events.push(SessionEvent::OptionsEliminated {
                    index: self.current_index,
                    options: hidden,
                });
            }
            Lifeline::Skip => {
                events.push(SessionEvent::QuestionSkipped {
                    index: self.current_index,
                });
                self.advance(&mut events);
            }
            Lifeline::ExtraTime => {
                self.time_remaining = self.time_remaining.saturating_add(EXTRA_TIME_BONUS_SECS);
                events.push(SessionEvent::TimeAdded {
                    bonus: EXTRA_TIME_BONUS_SECS,
                    time_remaining: self.time_remaining,
                });
            }
        }
        Ok(events)
    }

    /// Build the history record for a finished session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` while the session is still active.
    pub fn to_record(
        &self,
        user_id: Option<UserId>,
        finished_at: DateTime<Utc>,
    ) -> Result<ScoreRecord, SessionError> {
        let Some(outcome) = self.outcome else {
            return Err(SessionError::NotFinished);
        };
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        Ok(ScoreRecord::from_persisted(
            self.id,
            user_id,
            self.config.difficulty(),
            outcome,
            self.score,
            self.streak,
            self.best_streak,
            self.answered,
            total,
            finished_at,
        )?)
    }

    fn ensure_active(&self, action: &'static str) -> Result<(), SessionError> {
        match self.outcome {
            None => Ok(()),
            Some(state) => Err(SessionError::InvalidTransition { action, state }),
        }
    }

    fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        self.streak = 0;
    }

    fn advance(&mut self, events: &mut Vec<SessionEvent>) {
        self.current_index += 1;
        self.eliminated.clear();

        let outcome = if self.lives == 0 {
            Some(SessionOutcome::Exhausted)
        } else if self.current_index >= self.questions.len() {
            Some(SessionOutcome::Completed)
        } else {
            None
        };

        match outcome {
            Some(outcome) => {
                self.outcome = Some(outcome);
                self.time_remaining = 0;
                events.push(SessionEvent::Finished {
                    outcome,
                    score: self.score,
                    streak: self.streak,
                });
            }
            None => {
                self.time_remaining = self.config.time_per_question();
                events.push(SessionEvent::QuestionStarted {
                    index: self.current_index,
                    time_remaining: self.time_remaining,
                });
            }
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("id", &self.id)
            .field("questions_len", &self.questions.len())
            .field("current_index", &self.current_index)
            .field("score", &self.score)
            .field("lives", &self.lives)
            .field("streak", &self.streak)
            .field("time_remaining", &self.time_remaining)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
