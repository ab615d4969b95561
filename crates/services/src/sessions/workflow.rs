use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use quiz_core::model::{ScoreRecord, SessionConfig, UserId};
use quiz_core::{Clock, QuizSession};
use storage::repository::ScoreRepository;

use crate::error::{QuizError, ScoreReportError};
use crate::question_bank::QuestionBank;
use crate::question_source::QuestionSource;
use crate::score_reporter::ScoreReporter;

/// A remote score report running on its own task.
#[derive(Debug)]
pub struct PendingReport {
    handle: JoinHandle<Result<(), ScoreReportError>>,
}

impl PendingReport {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the report to settle.
    ///
    /// # Errors
    ///
    /// Returns the report's `ScoreReportError`, or `ScoreReportError::Aborted`
    /// if the task did not run to completion.
    pub async fn outcome(self) -> Result<(), ScoreReportError> {
        match self.handle.await {
            Ok(result) => result,
            Err(_) => Err(ScoreReportError::Aborted),
        }
    }

    /// Like [`outcome`](Self::outcome), but gives up after `limit`. The
    /// request is aborted on expiry.
    ///
    /// # Errors
    ///
    /// Returns `ScoreReportError::TimedOut` if the report has not settled in
    /// time, otherwise the same errors as `outcome`.
    pub async fn outcome_within(mut self, limit: Duration) -> Result<(), ScoreReportError> {
        match tokio::time::timeout(limit, &mut self.handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ScoreReportError::Aborted),
            Err(_) => {
                self.handle.abort();
                warn!(?limit, "score report abandoned");
                Err(ScoreReportError::TimedOut(limit))
            }
        }
    }
}

/// What `finish` did with a terminal session's score.
#[derive(Debug)]
pub struct FinishedSession {
    record: ScoreRecord,
    local_error: Option<ScoreReportError>,
    report: Option<PendingReport>,
}

impl FinishedSession {
    #[must_use]
    pub fn record(&self) -> &ScoreRecord {
        &self.record
    }

    /// Set when the local history could not be written. Non-fatal.
    #[must_use]
    pub fn local_error(&self) -> Option<&ScoreReportError> {
        self.local_error.as_ref()
    }

    /// The in-flight remote report, present only for a signed-in user with
    /// a configured endpoint.
    pub fn take_report(&mut self) -> Option<PendingReport> {
        self.report.take()
    }
}

/// Builds sessions from a question source and settles their scores.
#[derive(Clone)]
pub struct QuizWorkflow {
    clock: Clock,
    source: Arc<dyn QuestionSource>,
    scores: Arc<dyn ScoreRepository>,
    reporter: Option<Arc<dyn ScoreReporter>>,
    user: Option<UserId>,
}

impl QuizWorkflow {
    #[must_use]
    pub fn new(
        clock: Clock,
        source: Arc<dyn QuestionSource>,
        scores: Arc<dyn ScoreRepository>,
    ) -> Self {
        Self {
            clock,
            source,
            scores,
            reporter: None,
            user: None,
        }
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ScoreReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: Option<UserId>) -> Self {
        self.user = user;
        self
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// Load the pool, draw `total_questions` of it and open a session.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Source` if the pool cannot be loaded and
    /// `QuizError::Bank` if it has duplicate ids or too few questions.
    pub async fn start(&self, config: SessionConfig) -> Result<QuizSession, QuizError> {
        let bank = QuestionBank::new(self.source.load().await?)?;
        let requested = usize::try_from(config.total_questions()).unwrap_or(usize::MAX);
        let questions = bank.draw(requested, &mut rand::rng())?;
        let session = QuizSession::new(config, questions)?;

        info!(
            session = %session.id(),
            difficulty = %session.config().difficulty(),
            questions = requested,
            pool = bank.len(),
            "session started"
        );
        Ok(session)
    }

    /// Record a terminal session.
    ///
    /// The result always goes to the local history. For a signed-in user
    /// with a reporter it is also posted on a spawned task, so this returns
    /// without waiting on the network. Persistence failures are logged and
    /// handed back as notices, never as errors.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Session` if the session is still active.
    pub async fn finish(&self, session: &QuizSession) -> Result<FinishedSession, QuizError> {
        let record = session.to_record(self.user.clone(), self.clock.now())?;
        info!(
            session = %record.session_id(),
            outcome = %record.outcome(),
            score = record.score(),
            streak = record.streak(),
            "session finished"
        );

        let local_error = match self.scores.append_score(&record).await {
            Ok(()) => None,
            Err(err) => {
                warn!(error = %err, "could not save score locally");
                Some(ScoreReportError::Storage(err))
            }
        };

        let report = match (record.report(), &self.reporter) {
            (Some(report), Some(reporter)) => {
                let reporter = Arc::clone(reporter);
                let handle = tokio::spawn(async move {
                    let result = reporter.report(&report).await;
                    if let Err(err) = &result {
                        warn!(error = %err, user = %report.user_id, "score persistence failed");
                    }
                    result
                });
                Some(PendingReport { handle })
            }
            _ => None,
        };

        Ok(FinishedSession {
            record,
            local_error,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::SessionError;
    use quiz_core::model::{Difficulty, ScoreReport, SessionOutcome};
    use quiz_core::time::fixed_now;
    use std::sync::Mutex;
    use storage::repository::InMemoryRepository;

    use crate::error::QuestionBankError;
    use crate::question_source::StaticQuestionSource;

    #[derive(Default)]
    struct RecordingReporter {
        reports: Mutex<Vec<ScoreReport>>,
        fail: bool,
    }

    #[async_trait]
    impl ScoreReporter for RecordingReporter {
        async fn report(&self, report: &ScoreReport) -> Result<(), ScoreReportError> {
            self.reports.lock().unwrap().push(report.clone());
            if self.fail {
                Err(ScoreReportError::Aborted)
            } else {
                Ok(())
            }
        }
    }

    struct HangingReporter;

    #[async_trait]
    impl ScoreReporter for HangingReporter {
        async fn report(&self, _report: &ScoreReport) -> Result<(), ScoreReportError> {
            std::future::pending().await
        }
    }

    fn workflow(repo: &InMemoryRepository) -> QuizWorkflow {
        QuizWorkflow::new(
            Clock::fixed(fixed_now()),
            Arc::new(StaticQuestionSource::builtin().unwrap()),
            Arc::new(repo.clone()),
        )
    }

    fn play_out(session: &mut QuizSession) {
        while let Some(q) = session.current_question() {
            let correct = q.correct_index();
            session.answer(correct).unwrap();
        }
    }

    #[tokio::test]
    async fn start_draws_configured_number_of_questions() {
        let repo = InMemoryRepository::new();
        let config = SessionConfig::for_difficulty(Difficulty::Hard)
            .with_total_questions(4)
            .unwrap();

        let session = workflow(&repo).start(config).await.unwrap();
        assert_eq!(session.questions().len(), 4);
        assert_eq!(session.lives(), 2);
        assert_eq!(session.time_remaining(), 10);
    }

    #[tokio::test]
    async fn start_fails_when_pool_is_too_small() {
        let repo = InMemoryRepository::new();
        let config = SessionConfig::for_difficulty(Difficulty::Easy)
            .with_total_questions(11)
            .unwrap();

        let err = workflow(&repo).start(config).await.unwrap_err();
        assert!(matches!(
            err,
            QuizError::Bank(QuestionBankError::InsufficientQuestions {
                requested: 11,
                available: 10
            })
        ));
    }

    #[tokio::test]
    async fn finish_rejects_active_session() {
        let repo = InMemoryRepository::new();
        let flow = workflow(&repo);
        let session = flow.start(SessionConfig::default()).await.unwrap();

        assert!(matches!(
            flow.finish(&session).await,
            Err(QuizError::Session(SessionError::NotFinished))
        ));
    }

    #[tokio::test]
    async fn anonymous_finish_stays_local() {
        let repo = InMemoryRepository::new();
        let reporter = Arc::new(RecordingReporter::default());
        let flow = workflow(&repo).with_reporter(reporter.clone());

        let mut session = flow.start(SessionConfig::default()).await.unwrap();
        play_out(&mut session);
        let mut finished = flow.finish(&session).await.unwrap();

        assert!(finished.take_report().is_none());
        assert!(finished.local_error().is_none());
        assert_eq!(finished.record().outcome(), SessionOutcome::Completed);
        assert!(reporter.reports.lock().unwrap().is_empty());

        let saved = repo.list_recent(5, None).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].finished_at(), fixed_now());
        assert!(saved[0].user_id().is_none());
    }

    #[tokio::test]
    async fn signed_in_finish_reports_and_saves() {
        let repo = InMemoryRepository::new();
        let reporter = Arc::new(RecordingReporter::default());
        let flow = workflow(&repo)
            .with_reporter(reporter.clone())
            .with_user(UserId::new("player-1"));

        let mut session = flow.start(SessionConfig::default()).await.unwrap();
        play_out(&mut session);
        let mut finished = flow.finish(&session).await.unwrap();

        let pending = finished.take_report().expect("report spawned");
        pending.outcome().await.unwrap();

        let reports = reporter.reports.lock().unwrap().clone();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].user_id.as_str(), "player-1");
        assert_eq!(reports[0].score, session.score());
        assert_eq!(reports[0].streak, session.streak());
        assert_eq!(repo.list_recent(5, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_report_is_a_notice() {
        let repo = InMemoryRepository::new();
        let reporter = Arc::new(RecordingReporter {
            fail: true,
            ..RecordingReporter::default()
        });
        let flow = workflow(&repo)
            .with_reporter(reporter)
            .with_user(UserId::new("player-2"));

        let mut session = flow.start(SessionConfig::default()).await.unwrap();
        play_out(&mut session);
        let mut finished = flow.finish(&session).await.unwrap();

        let outcome = finished.take_report().unwrap().outcome().await;
        assert!(matches!(outcome, Err(ScoreReportError::Aborted)));
        assert_eq!(repo.list_recent(5, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_finish_surfaces_local_error() {
        let repo = InMemoryRepository::new();
        let flow = workflow(&repo);

        let mut session = flow.start(SessionConfig::default()).await.unwrap();
        play_out(&mut session);
        flow.finish(&session).await.unwrap();
        let again = flow.finish(&session).await.unwrap();

        assert!(matches!(
            again.local_error(),
            Some(ScoreReportError::Storage(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_report_gives_up_after_limit() {
        let repo = InMemoryRepository::new();
        let flow = workflow(&repo)
            .with_reporter(Arc::new(HangingReporter))
            .with_user(UserId::new("player-3"));

        let mut session = flow.start(SessionConfig::default()).await.unwrap();
        play_out(&mut session);
        let mut finished = flow.finish(&session).await.unwrap();

        let limit = Duration::from_secs(3);
        let outcome = finished.take_report().unwrap().outcome_within(limit).await;
        assert!(matches!(outcome, Err(ScoreReportError::TimedOut(d)) if d == limit));
        assert_eq!(repo.list_recent(5, None).await.unwrap().len(), 1);
    }
}
