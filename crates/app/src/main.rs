use std::fmt;
use std::path::Path;
use std::time::Duration;

use quiz_core::model::{Difficulty, Question, SessionConfig, UserId};
use services::{
    AppServices, AppSettings, Clock, FileQuestionSource, QuestionSource, QuestionSourceKind,
    QuizRunner, RunOutcome, ScoreReporterConfig, StaticQuestionSource,
};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::{TerminalRenderer, spawn_input_reader};

/// How long the end screen waits for the score endpoint.
const REPORT_WAIT: Duration = Duration::from_secs(12);

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidDifficulty { raw: String },
    InvalidUser { raw: String },
    InvalidScoreUrl { raw: String },
    InvalidQuestions { raw: String },
    InvalidCount { raw: String },
    InvalidLimit { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDifficulty { raw } => {
                write!(f, "invalid --difficulty value (easy, medium, hard): {raw}")
            }
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw:?}"),
            ArgsError::InvalidScoreUrl { raw } => write!(f, "invalid --score-url value: {raw}"),
            ArgsError::InvalidQuestions { raw } => write!(f, "invalid --questions value: {raw}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  crane-quiz [play] [options]   Play one session (default)");
    eprintln!("  crane-quiz scores [options]   Show local score history");
    eprintln!("  crane-quiz seed [options]     Load questions into the database");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>        SQLite URL (default: sqlite://quiz.sqlite3)");
    eprintln!("  --difficulty <level>     easy | medium | hard (default: easy)");
    eprintln!("  --count <n>              Questions per session (default: 10)");
    eprintln!("  --user <id>              Signed-in user; enables score reporting");
    eprintln!("  --score-url <url>        Score API endpoint (POST {{userId, score, streak}})");
    eprintln!("  --questions <source>     builtin | db | http(s)://... | path/to/pool.json");
    eprintln!("  --no-timer               Play without the per-question countdown");
    eprintln!("  --limit <n>              scores: records to list (default: 10)");
    eprintln!("  --from <path>            seed: JSON pool to load (default: built-in)");
    eprintln!("  -h, --help               Show this help");
    eprintln!();
    eprintln!("In game: 1-4 answers, 50 / skip / time use a lifeline, q quits.");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_DIFFICULTY, QUIZ_COUNT, QUIZ_USER_ID, QUIZ_SCORE_URL,");
    eprintln!("  QUIZ_QUESTIONS, QUIZ_TIMER (0/false/off), QUIZ_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Scores,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "scores" => Some(Self::Scores),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    db_url: String,
    difficulty: Difficulty,
    count: Option<u32>,
    user: Option<UserId>,
    score_url: Option<ScoreReporterConfig>,
    questions: QuestionSourceKind,
    timer: bool,
    limit: u32,
    from: Option<String>,
}

fn env_flag_off(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "off" | "no"
    )
}

impl Args {
    /// Environment first, then flags on top.
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        Self::parse_with_env(args, |key| std::env::var(key).ok())
    }

    fn parse_with_env(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: env("QUIZ_DB_URL")
                .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url),
            difficulty: Difficulty::default(),
            count: None,
            user: env("QUIZ_USER_ID").and_then(UserId::new),
            score_url: None,
            questions: QuestionSourceKind::default(),
            timer: env("QUIZ_TIMER").is_none_or(|v| !env_flag_off(&v)),
            limit: 10,
            from: None,
        };
        if let Some(raw) = env("QUIZ_DIFFICULTY") {
            parsed.set_difficulty(raw)?;
        }
        if let Some(raw) = env("QUIZ_COUNT") {
            parsed.set_count(raw)?;
        }
        if let Some(raw) = env("QUIZ_SCORE_URL").filter(|v| !v.trim().is_empty()) {
            parsed.set_score_url(raw)?;
        }
        if let Some(raw) = env("QUIZ_QUESTIONS") {
            parsed.set_questions(raw)?;
        }

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--difficulty" => parsed.set_difficulty(require_value(args, "--difficulty")?)?,
                "--count" => parsed.set_count(require_value(args, "--count")?)?,
                "--user" => {
                    let value = require_value(args, "--user")?;
                    parsed.user = Some(
                        UserId::new(value.as_str())
                            .ok_or(ArgsError::InvalidUser { raw: value })?,
                    );
                }
                "--score-url" => parsed.set_score_url(require_value(args, "--score-url")?)?,
                "--questions" => parsed.set_questions(require_value(args, "--questions")?)?,
                "--no-timer" => parsed.timer = false,
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    parsed.limit = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
                "--from" => parsed.from = Some(require_value(args, "--from")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn set_difficulty(&mut self, raw: String) -> Result<(), ArgsError> {
        self.difficulty = raw
            .parse()
            .map_err(|_| ArgsError::InvalidDifficulty { raw })?;
        Ok(())
    }

    fn set_count(&mut self, raw: String) -> Result<(), ArgsError> {
        match raw.trim().parse::<u32>() {
            Ok(n) if n > 0 => {
                self.count = Some(n);
                Ok(())
            }
            _ => Err(ArgsError::InvalidCount { raw }),
        }
    }

    fn set_score_url(&mut self, raw: String) -> Result<(), ArgsError> {
        self.score_url =
            Some(ScoreReporterConfig::new(&raw).map_err(|_| ArgsError::InvalidScoreUrl { raw })?);
        Ok(())
    }

    fn set_questions(&mut self, raw: String) -> Result<(), ArgsError> {
        self.questions = raw
            .parse()
            .map_err(|_| ArgsError::InvalidQuestions { raw })?;
        Ok(())
    }

    fn session_config(&self) -> Result<SessionConfig, Box<dyn std::error::Error>> {
        let mut config = SessionConfig::for_difficulty(self.difficulty).with_timer(self.timer);
        if let Some(count) = self.count {
            config = config.with_total_questions(count)?;
        }
        Ok(config)
    }

    fn settings(&self) -> AppSettings {
        AppSettings {
            db_url: self.db_url.clone(),
            questions: self.questions.clone(),
            user: self.user.clone(),
            score_endpoint: self.score_url.clone(),
        }
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn play(args: &Args, services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let workflow = services.workflow();
    let mut session = workflow.start(args.session_config()?).await?;

    let (tx, mut rx) = mpsc::channel(16);
    spawn_input_reader(tx);

    let mut renderer = TerminalRenderer::new(std::io::stdout());
    let outcome = QuizRunner::new()
        .run(&mut session, &mut rx, &mut renderer)
        .await?;

    if outcome == RunOutcome::Abandoned {
        renderer.notice("Session abandoned; nothing was recorded.");
        return Ok(());
    }

    let mut finished = workflow.finish(&session).await?;
    if let Some(err) = finished.local_error() {
        renderer.notice(&format!("Score was not saved locally: {err}"));
    }
    match finished.take_report() {
        Some(report) => match report.outcome_within(REPORT_WAIT).await {
            Ok(()) => renderer.notice("Score submitted."),
            Err(err) => renderer.notice(&format!("Score was not submitted: {err}")),
        },
        None if workflow.user().is_none() => {
            renderer.notice("Playing as guest: score kept on this device only.");
        }
        None => renderer.notice("No score endpoint configured: score kept on this device only."),
    }
    Ok(())
}

async fn scores(args: &Args, services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let overview = services.history().overview(args.limit, None).await?;
    if overview.recent.is_empty() {
        println!("No scores yet.");
        return Ok(());
    }

    println!(
        "{:<20} {:<7} {:<10} {:>5} {:>6} {:>8}",
        "finished", "level", "outcome", "score", "streak", "answered"
    );
    for record in &overview.recent {
        println!(
            "{:<20} {:<7} {:<10} {:>5} {:>6} {:>5}/{}",
            record.finished_at().format("%Y-%m-%d %H:%M"),
            record.difficulty().as_str(),
            record.outcome().as_str(),
            record.score(),
            record.best_streak(),
            record.answered(),
            record.total_questions()
        );
    }
    if let Some(best) = overview.best {
        println!();
        println!(
            "Best: {} on {} ({})",
            best.score(),
            best.difficulty(),
            best.finished_at().format("%Y-%m-%d")
        );
    }
    Ok(())
}

async fn seed(args: &Args, services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let pool: Vec<Question> = match &args.from {
        Some(path) => FileQuestionSource::new(path).load().await?,
        None => StaticQuestionSource::builtin()?.load().await?,
    };
    let repo = &services.storage().questions;
    for question in &pool {
        repo.upsert_question(question).await?;
    }
    info!(count = pool.len(), "questions upserted");
    println!(
        "Seeded {} questions; {} stored in {}",
        pool.len(),
        repo.count_questions().await?,
        args.db_url
    );
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let args = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite here so the library crates never touch the filesystem layout.
    prepare_sqlite_file(&args.db_url)?;
    let services = AppServices::new_sqlite(&args.settings(), Clock::system()).await?;

    match cmd {
        Command::Play => play(&args, &services).await,
        Command::Scores => scores(&args, &services).await,
        Command::Seed => seed(&args, &services).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("QUIZ_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
