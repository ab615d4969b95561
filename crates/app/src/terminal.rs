//! Plain-text rendering of session events and the stdin reader.

use std::io::{self, BufRead, Write};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use quiz_core::model::{Lifeline, Question, SessionOutcome};
use quiz_core::{QuizSession, SessionError, SessionEvent};
use services::{PlayerInput, SessionObserver, SessionProgress};

/// Countdown values worth printing; the rest would flood the input line.
fn announce_tick(time_remaining: u32) -> bool {
    time_remaining <= 3 || time_remaining % 5 == 0
}

fn lifeline_hint(lifeline: Lifeline) -> &'static str {
    match lifeline {
        Lifeline::Fifty => "50",
        Lifeline::Skip => "skip",
        Lifeline::ExtraTime => "time",
    }
}

/// What the player can type right now.
fn input_hint(session: &QuizSession) -> String {
    let options = session.current_question().map_or(0, |q| q.options().len());
    let lifelines: Vec<&str> = SessionProgress::of(session)
        .lifelines_left
        .iter()
        .map(|l| lifeline_hint(*l))
        .collect();
    if lifelines.is_empty() {
        format!("type 1-{options}, or q to quit")
    } else {
        format!("type 1-{options}, {}, or q to quit", lifelines.join(" / "))
    }
}

pub struct TerminalRenderer<W> {
    out: W,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    /// A line outside the event stream, e.g. a score-report notice.
    pub fn notice(&mut self, message: &str) {
        if let Err(err) = writeln!(self.out, "! {message}").and_then(|()| self.out.flush()) {
            warn!(error = %err, "could not write notice");
        }
    }

    fn draw_question(&mut self, session: &QuizSession, question: &Question) -> io::Result<()> {
        let progress = SessionProgress::of(session);
        writeln!(self.out)?;
        writeln!(
            self.out,
            "Question {}/{}: {}",
            progress.question_number,
            progress.total,
            question.text()
        )?;
        self.draw_options(session, question)?;

        let lifelines: Vec<&str> = progress
            .lifelines_left
            .iter()
            .map(|l| lifeline_hint(*l))
            .collect();
        let timer = if session.config().timer_enabled() {
            format!(" | time {}s", progress.time_remaining)
        } else {
            String::new()
        };
        writeln!(
            self.out,
            "score {} | lives {} | streak {}{timer} | lifelines: {}",
            progress.score,
            progress.lives,
            progress.streak,
            if lifelines.is_empty() {
                "none".to_owned()
            } else {
                lifelines.join(" ")
            }
        )?;
        write!(self.out, "> ")
    }

    fn draw_options(&mut self, session: &QuizSession, question: &Question) -> io::Result<()> {
        for (i, option) in question.options().iter().enumerate() {
            if session.eliminated_options().contains(&i) {
                writeln!(self.out, "  {}) ---", i + 1)?;
            } else {
                writeln!(self.out, "  {}) {option}", i + 1)?;
            }
        }
        Ok(())
    }

    fn draw(&mut self, session: &QuizSession, event: &SessionEvent) -> io::Result<()> {
        match event {
            SessionEvent::QuestionStarted { index, .. } => {
                if let Some(question) = session.questions().get(*index) {
                    self.draw_question(session, question)?;
                }
            }
            SessionEvent::Answered {
                index,
                correct: true,
                gained,
                ..
            } => {
                debug!(index, gained, "correct answer");
                writeln!(self.out, "Correct! +{gained}")?;
            }
            SessionEvent::Answered { index, .. } | SessionEvent::TimedOut { index } => {
                if matches!(event, SessionEvent::TimedOut { .. }) {
                    writeln!(self.out)?;
                    write!(self.out, "Time's up! ")?;
                } else {
                    write!(self.out, "Wrong. ")?;
                }
                if let Some(question) = session.questions().get(*index) {
                    let answer = question.correct_index();
                    writeln!(
                        self.out,
                        "The answer was {}) {}",
                        answer + 1,
                        question.options()[answer]
                    )?;
                }
            }
            SessionEvent::Ticked { time_remaining } => {
                if *time_remaining > 0 && announce_tick(*time_remaining) {
                    writeln!(self.out, "  [{time_remaining}s left]")?;
                }
            }
            SessionEvent::LifelineUsed(lifeline) => {
                writeln!(self.out, "Lifeline used: {lifeline}")?;
            }
            SessionEvent::OptionsEliminated { index, .. } => {
                if let Some(question) = session.questions().get(*index) {
                    self.draw_options(session, question)?;
                    write!(self.out, "> ")?;
                }
            }
            SessionEvent::TimeAdded {
                bonus,
                time_remaining,
            } => {
                writeln!(self.out, "+{bonus}s, {time_remaining}s left")?;
                write!(self.out, "> ")?;
            }
            SessionEvent::QuestionSkipped { .. } => {
                writeln!(self.out, "Skipped.")?;
            }
            SessionEvent::Finished {
                outcome,
                score,
                streak,
            } => {
                writeln!(self.out)?;
                match outcome {
                    SessionOutcome::Completed => writeln!(self.out, "Quiz complete!")?,
                    SessionOutcome::Exhausted => writeln!(self.out, "Out of lives. Game over.")?,
                }
                writeln!(
                    self.out,
                    "Final score {score}, streak {streak}, best streak {}",
                    session.best_streak()
                )?;
            }
        }
        Ok(())
    }
}

impl<W: Write> SessionObserver for TerminalRenderer<W> {
    fn on_events(&mut self, session: &QuizSession, events: &[SessionEvent]) {
        let result = events
            .iter()
            .try_for_each(|event| self.draw(session, event))
            .and_then(|()| self.out.flush());
        if let Err(err) = result {
            warn!(error = %err, "could not render session events");
        }
    }

    fn on_rejected(&mut self, _session: &QuizSession, error: &SessionError) {
        let message = match error {
            SessionError::LifelineAlreadyUsed(lifeline) => {
                format!("{lifeline} is already used")
            }
            SessionError::InvalidOption { len, .. } => format!("pick an option from 1 to {len}"),
            SessionError::OptionEliminated { selected } => {
                format!("option {} was removed by 50-50", selected + 1)
            }
            other => other.to_string(),
        };
        if let Err(err) = writeln!(self.out, "{message}")
            .and_then(|()| write!(self.out, "> "))
            .and_then(|()| self.out.flush())
        {
            warn!(error = %err, "could not render rejection");
        }
    }

    fn on_unrecognized(&mut self, session: &QuizSession) {
        if let Err(err) = writeln!(self.out, "{}", input_hint(session))
            .and_then(|()| write!(self.out, "> "))
            .and_then(|()| self.out.flush())
        {
            warn!(error = %err, "could not render input hint");
        }
    }
}

/// Read stdin on a plain thread and forward parsed lines.
///
/// The thread stops at end of input or once the receiver is gone. A blocked
/// read does not hold up process exit.
pub fn spawn_input_reader(tx: mpsc::Sender<PlayerInput>) {
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            let input = line.parse::<PlayerInput>().unwrap_or_else(|err| {
                debug!(error = %err, "unparsed input line");
                PlayerInput::Unrecognized
            });
            if tx.blocking_send(input).is_err() {
                break;
            }
        }
    });
}
