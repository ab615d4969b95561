use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use quiz_core::model::ScoreReport;

use crate::error::ScoreReportError;

/// Sends a finished session's score to the remote score API.
#[async_trait]
pub trait ScoreReporter: Send + Sync {
    /// Deliver one report. A single attempt, no retries.
    ///
    /// # Errors
    ///
    /// Returns `ScoreReportError` if the report was not accepted.
    async fn report(&self, report: &ScoreReport) -> Result<(), ScoreReportError>;
}

/// Upper bound on one score request, connect included.
pub const DEFAULT_REPORT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreReporterConfig {
    pub endpoint: Url,
    pub timeout: Duration,
}

impl ScoreReporterConfig {
    /// # Errors
    ///
    /// Returns `ScoreReportError::InvalidEndpoint` if `endpoint` does not parse.
    pub fn new(endpoint: &str) -> Result<Self, ScoreReportError> {
        Ok(Self {
            endpoint: Url::parse(endpoint.trim())?,
            timeout: DEFAULT_REPORT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `QUIZ_SCORE_URL`. Unset or blank means reporting is off.
    ///
    /// # Errors
    ///
    /// Returns `ScoreReportError::InvalidEndpoint` if the variable is set but
    /// is not a URL.
    pub fn from_env() -> Result<Option<Self>, ScoreReportError> {
        match env::var("QUIZ_SCORE_URL") {
            Ok(raw) if !raw.trim().is_empty() => Self::new(&raw).map(Some),
            _ => Ok(None),
        }
    }
}

/// `POST {userId, score, streak}` as JSON; any 2xx counts as delivered.
#[derive(Clone)]
pub struct HttpScoreReporter {
    client: Client,
    config: ScoreReporterConfig,
}

impl HttpScoreReporter {
    /// # Errors
    ///
    /// Returns `ScoreReportError::Http` if the HTTP client cannot be built.
    pub fn new(config: ScoreReporterConfig) -> Result<Self, ScoreReportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Requests still carry `config.timeout`, whatever the client's own
    /// settings are.
    #[must_use]
    pub fn with_client(client: Client, config: ScoreReporterConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ScoreReporter for HttpScoreReporter {
    async fn report(&self, report: &ScoreReport) -> Result<(), ScoreReportError> {
        let response = self
            .client
            .post(self.config.endpoint.clone())
            .timeout(self.config.timeout)
            .json(report)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ScoreReportError::HttpStatus(response.status()));
        }

        debug!(
            endpoint = %self.config.endpoint,
            score = report.score,
            "score accepted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validates_endpoint() {
        let config = ScoreReporterConfig::new(" http://localhost:5000/update-score ").unwrap();
        assert_eq!(config.endpoint.path(), "/update-score");
        assert_eq!(config.timeout, DEFAULT_REPORT_TIMEOUT);
        assert!(matches!(
            ScoreReporterConfig::new("update-score"),
            Err(ScoreReportError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn reporter_builds_with_configured_timeout() {
        let config = ScoreReporterConfig::new("http://localhost:5000/update-score")
            .unwrap()
            .with_timeout(Duration::from_millis(250));
        let reporter = HttpScoreReporter::new(config).unwrap();
        assert_eq!(reporter.config.timeout, Duration::from_millis(250));
    }
}
