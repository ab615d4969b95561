//! The per-session event loop: player input and countdown ticks in, session
//! events out.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use quiz_core::model::{Lifeline, SessionOutcome};
use quiz_core::{QuizSession, SessionError, SessionEvent};

use crate::error::QuizError;
use crate::timer::QuestionTimer;

/// One parsed line of player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    /// 0-based option index.
    Answer(usize),
    Lifeline(Lifeline),
    Quit,
    /// A line that did not parse; the observer is asked to explain the input.
    Unrecognized,
}

/// Error type for parsing player input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseInputError(String);

impl fmt::Display for ParseInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised input: {}", self.0)
    }
}

impl std::error::Error for ParseInputError {}

impl FromStr for PlayerInput {
    type Err = ParseInputError;

    /// `q`/`quit`, a lifeline name (`50`, `skip`, `time`), or a 1-based option number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("q") || s.eq_ignore_ascii_case("quit") {
            return Ok(PlayerInput::Quit);
        }
        if let Ok(lifeline) = s.parse::<Lifeline>() {
            return Ok(PlayerInput::Lifeline(lifeline));
        }
        match s.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(PlayerInput::Answer(n - 1)),
            _ => Err(ParseInputError(s.to_owned())),
        }
    }
}

/// Receives what the session did so it can be drawn.
pub trait SessionObserver {
    fn on_events(&mut self, session: &QuizSession, events: &[SessionEvent]);

    /// Input the session refused; its state is unchanged.
    fn on_rejected(&mut self, _session: &QuizSession, _error: &SessionError) {}

    fn on_unrecognized(&mut self, _session: &QuizSession) {}
}

/// How `QuizRunner::run` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Finished(SessionOutcome),
    /// The player quit or the input stream closed. Nothing gets reported.
    Abandoned,
}

/// Drives one session to a terminal state.
pub struct QuizRunner {
    tick_period: Duration,
    rng: StdRng,
}

impl Default for QuizRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizRunner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Fixed seed for the 50-50 choice.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Run `session` until it finishes or the player leaves.
    ///
    /// At most one countdown exists at a time. It is cancelled whenever the
    /// current question ends and restarted only for a next question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Session` for an invalid transition, which means
    /// the session was driven after it ended.
    pub async fn run<O>(
        &mut self,
        session: &mut QuizSession,
        inputs: &mut mpsc::Receiver<PlayerInput>,
        observer: &mut O,
    ) -> Result<RunOutcome, QuizError>
    where
        O: SessionObserver + ?Sized,
    {
        let (mut timer, mut ticks) = QuestionTimer::with_period(self.tick_period);
        let timed = session.config().timer_enabled();

        if let Some(started) = session.question_started() {
            observer.on_events(session, &[started]);
            if timed {
                timer.start();
            }
        }

        while !session.is_finished() {
            let result = tokio::select! {
                input = inputs.recv() => match input {
                    None | Some(PlayerInput::Quit) => {
                        info!(session = %session.id(), "session abandoned");
                        return Ok(RunOutcome::Abandoned);
                    }
                    Some(PlayerInput::Answer(selected)) => session.answer(selected),
                    Some(PlayerInput::Lifeline(lifeline)) => {
                        session.use_lifeline(lifeline, &mut self.rng)
                    }
                    Some(PlayerInput::Unrecognized) => {
                        observer.on_unrecognized(session);
                        continue;
                    }
                },
                Some(tick) = ticks.recv() => {
                    if !timer.is_current(tick) {
                        debug!(generation = tick.generation, "stale tick dropped");
                        continue;
                    }
                    session.tick()
                }
            };

            match result {
                Ok(events) => {
                    if events.iter().any(SessionEvent::ends_question) {
                        timer.cancel();
                        if timed && !session.is_finished() {
                            timer.start();
                        }
                    }
                    debug!(?events, "session transition");
                    observer.on_events(session, &events);
                }
                Err(err @ SessionError::InvalidTransition { .. }) => {
                    error!(error = %err, "invalid session transition");
                    return Err(err.into());
                }
                Err(err) => {
                    debug!(error = %err, "input rejected");
                    observer.on_rejected(session, &err);
                }
            }
        }

        timer.cancel();
        let outcome = session.outcome().ok_or(SessionError::NotFinished)?;
        Ok(RunOutcome::Finished(outcome))
    }
}
