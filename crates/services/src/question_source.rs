//! Where a session's question pool comes from.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use quiz_core::model::Question;
use quiz_core::pool::builtin_questions;
use storage::repository::QuestionRepository;

use crate::error::QuestionSourceError;

/// Loads the full question pool. Validation happens while decoding.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch every available question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSourceError` if the pool cannot be read or decoded.
    async fn load(&self) -> Result<Vec<Question>, QuestionSourceError>;
}

/// A fixed list held in memory.
#[derive(Debug, Clone)]
pub struct StaticQuestionSource {
    questions: Vec<Question>,
}

impl StaticQuestionSource {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// The crane pool bundled with the game.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSourceError::Invalid` only if the bundled table is malformed.
    pub fn builtin() -> Result<Self, QuestionSourceError> {
        Ok(Self::new(builtin_questions()?))
    }
}

#[async_trait]
impl QuestionSource for StaticQuestionSource {
    async fn load(&self) -> Result<Vec<Question>, QuestionSourceError> {
        Ok(self.questions.clone())
    }
}

/// A JSON array of questions on disk.
#[derive(Debug, Clone)]
pub struct FileQuestionSource {
    path: PathBuf,
}

impl FileQuestionSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QuestionSource for FileQuestionSource {
    async fn load(&self) -> Result<Vec<Question>, QuestionSourceError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let questions: Vec<Question> = serde_json::from_str(&raw)?;
        debug!(path = %self.path.display(), count = questions.len(), "loaded question file");
        Ok(questions)
    }
}

/// `GET` on an endpoint answering with a JSON array of questions.
#[derive(Clone)]
pub struct HttpQuestionSource {
    client: Client,
    url: Url,
}

impl HttpQuestionSource {
    /// # Errors
    ///
    /// Returns `QuestionSourceError::InvalidUrl` if `url` does not parse.
    pub fn new(url: &str) -> Result<Self, QuestionSourceError> {
        Self::with_client(Client::new(), url)
    }

    /// # Errors
    ///
    /// Returns `QuestionSourceError::InvalidUrl` if `url` does not parse.
    pub fn with_client(client: Client, url: &str) -> Result<Self, QuestionSourceError> {
        Ok(Self {
            client,
            url: Url::parse(url)?,
        })
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    async fn load(&self) -> Result<Vec<Question>, QuestionSourceError> {
        let response = self.client.get(self.url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(QuestionSourceError::HttpStatus(response.status()));
        }

        let body = response.bytes().await?;
        let questions: Vec<Question> = serde_json::from_slice(&body)?;
        debug!(url = %self.url, count = questions.len(), "fetched question pool");
        Ok(questions)
    }
}

/// Questions previously stored through `storage`.
#[derive(Clone)]
pub struct RepositoryQuestionSource {
    repo: Arc<dyn QuestionRepository>,
}

impl RepositoryQuestionSource {
    #[must_use]
    pub fn new(repo: Arc<dyn QuestionRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl QuestionSource for RepositoryQuestionSource {
    async fn load(&self) -> Result<Vec<Question>, QuestionSourceError> {
        Ok(self.repo.list_questions().await?)
    }
}

/// Which source to build, as written in config: `builtin`, `db`, an
/// `http(s)://` URL, or anything else as a file path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QuestionSourceKind {
    #[default]
    Builtin,
    Repository,
    Http(Url),
    File(PathBuf),
}

impl fmt::Display for QuestionSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => f.write_str("builtin"),
            Self::Repository => f.write_str("db"),
            Self::Http(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl FromStr for QuestionSourceKind {
    type Err = QuestionSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "" | "builtin" => Ok(Self::Builtin),
            "db" => Ok(Self::Repository),
            _ if s.starts_with("http://") || s.starts_with("https://") => {
                Ok(Self::Http(Url::parse(s)?))
            }
            _ => Ok(Self::File(PathBuf::from(s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;
    use storage::repository::InMemoryRepository;

    #[test]
    fn kind_parses_each_form() {
        assert_eq!(
            "builtin".parse::<QuestionSourceKind>().unwrap(),
            QuestionSourceKind::Builtin
        );
        assert_eq!(
            " ".parse::<QuestionSourceKind>().unwrap(),
            QuestionSourceKind::Builtin
        );
        assert_eq!(
            "db".parse::<QuestionSourceKind>().unwrap(),
            QuestionSourceKind::Repository
        );
        assert!(matches!(
            "https://quiz.example/questions".parse::<QuestionSourceKind>(),
            Ok(QuestionSourceKind::Http(url)) if url.path() == "/questions"
        ));
        assert_eq!(
            "pool.json".parse::<QuestionSourceKind>().unwrap(),
            QuestionSourceKind::File(PathBuf::from("pool.json"))
        );
        assert!(matches!(
            "http://".parse::<QuestionSourceKind>(),
            Err(QuestionSourceError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn builtin_source_serves_the_crane_pool() {
        let source = StaticQuestionSource::builtin().unwrap();
        let questions = source.load().await.unwrap();
        assert_eq!(questions.len(), 10);
        assert_eq!(questions[0].id(), &QuestionId::number(1));
    }

    #[tokio::test]
    async fn file_source_reads_legacy_shape() {
        let path = std::env::temp_dir().join(format!(
            "quiz-pool-{}-{}.json",
            std::process::id(),
            line!()
        ));
        std::fs::write(
            &path,
            r#"[
                {"id": 1, "q": "Crane moves in which direction?", "opts": ["Up/Down", "Both"], "ans": 1},
                {"id": "load-chart", "question": "Read before lifting?", "options": ["Load chart", "Menu"], "correct": 0}
            ]"#,
        )
        .unwrap();

        let questions = FileQuestionSource::new(&path).load().await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].id(), &QuestionId::text("load-chart"));
        assert!(questions[0].is_correct(1));
    }

    #[tokio::test]
    async fn file_source_rejects_invalid_question() {
        let path = std::env::temp_dir().join(format!(
            "quiz-pool-{}-{}.json",
            std::process::id(),
            line!()
        ));
        std::fs::write(&path, r#"[{"id": 1, "text": "Only one?", "options": ["A"], "correctIndex": 0}]"#)
            .unwrap();

        let result = FileQuestionSource::new(&path).load().await;
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(QuestionSourceError::Parse(_))));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let result = FileQuestionSource::new("/nonexistent/quiz/pool.json")
            .load()
            .await;
        assert!(matches!(result, Err(QuestionSourceError::Io(_))));
    }

    #[tokio::test]
    async fn repository_source_lists_stored_questions() {
        let repo = InMemoryRepository::new();
        for q in builtin_questions().unwrap().iter().take(3) {
            repo.upsert_question(q).await.unwrap();
        }
        let source = RepositoryQuestionSource::new(Arc::new(repo));
        assert_eq!(source.load().await.unwrap().len(), 3);
    }
}
