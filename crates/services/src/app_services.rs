use std::sync::Arc;

use tracing::info;

use quiz_core::model::UserId;
use quiz_core::pool::builtin_questions;
use storage::repository::{QuestionRepository, Storage};

use crate::Clock;
use crate::error::{AppServicesError, QuestionSourceError};
use crate::question_source::{
    FileQuestionSource, HttpQuestionSource, QuestionSource, QuestionSourceKind,
    RepositoryQuestionSource, StaticQuestionSource,
};
use crate::score_reporter::{HttpScoreReporter, ScoreReporterConfig};
use crate::sessions::{QuizWorkflow, ScoreHistoryService};

/// Everything the app resolves from env and flags before building services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub db_url: String,
    pub questions: QuestionSourceKind,
    pub user: Option<UserId>,
    pub score_endpoint: Option<ScoreReporterConfig>,
}

/// Assembles app-facing services on top of one `Storage`.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    workflow: Arc<QuizWorkflow>,
    history: Arc<ScoreHistoryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or question source
    /// setup fails.
    pub async fn new_sqlite(settings: &AppSettings, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&settings.db_url).await?;
        Self::with_storage(storage, settings, clock).await
    }

    /// Build services over an existing `Storage`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the question source cannot be set up.
    pub async fn with_storage(
        storage: Storage,
        settings: &AppSettings,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let source = build_source(&settings.questions, &storage).await?;

        let mut workflow = QuizWorkflow::new(clock, source, Arc::clone(&storage.scores))
            .with_user(settings.user.clone());
        if let Some(endpoint) = &settings.score_endpoint {
            workflow = workflow.with_reporter(Arc::new(HttpScoreReporter::new(endpoint.clone())?));
        }

        let history = Arc::new(ScoreHistoryService::new(Arc::clone(&storage.scores)));

        Ok(Self {
            storage,
            workflow: Arc::new(workflow),
            history,
        })
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn workflow(&self) -> Arc<QuizWorkflow> {
        Arc::clone(&self.workflow)
    }

    #[must_use]
    pub fn history(&self) -> Arc<ScoreHistoryService> {
        Arc::clone(&self.history)
    }
}

async fn build_source(
    kind: &QuestionSourceKind,
    storage: &Storage,
) -> Result<Arc<dyn QuestionSource>, AppServicesError> {
    let source: Arc<dyn QuestionSource> = match kind {
        QuestionSourceKind::Builtin => Arc::new(StaticQuestionSource::builtin()?),
        QuestionSourceKind::Repository => {
            ensure_seeded(storage.questions.as_ref()).await?;
            Arc::new(RepositoryQuestionSource::new(Arc::clone(&storage.questions)))
        }
        QuestionSourceKind::Http(url) => Arc::new(HttpQuestionSource::new(url.as_str())?),
        QuestionSourceKind::File(path) => Arc::new(FileQuestionSource::new(path.clone())),
    };
    Ok(source)
}

/// An empty question table gets the built-in pool.
async fn ensure_seeded(questions: &dyn QuestionRepository) -> Result<(), AppServicesError> {
    if questions.count_questions().await? > 0 {
        return Ok(());
    }

    let pool = builtin_questions().map_err(QuestionSourceError::from)?;
    for question in &pool {
        questions.upsert_question(question).await?;
    }
    info!(count = pool.len(), "seeded empty question table with built-in pool");
    Ok(())
}
