use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{Difficulty, Question, ScoreRecord, SessionId, SessionOutcome, UserId};
use quiz_core::pool::builtin_questions;
use storage::repository::Storage;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    from: Option<PathBuf>,
    scores: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidScores { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidScores { raw } => write!(f, "invalid --scores value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite://quiz.sqlite3?mode=rwc".into());
        let mut from: Option<PathBuf> = None;
        let mut scores = 0;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--from" => {
                    from = Some(PathBuf::from(require_value(&mut args, "--from")?));
                }
                "--scores" => {
                    let value = require_value(&mut args, "--scores")?;
                    scores = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidScores { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            from,
            scores,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>    SQLite URL (default: sqlite://quiz.sqlite3?mode=rwc)");
    eprintln!("  --from <path>        JSON array of questions (default: built-in pool)");
    eprintln!("  --scores <n>         Number of sample local scores to append (default: 0)");
    eprintln!("  --now <rfc3339>      Fixed current time for deterministic seeding");
    eprintln!("  -h, --help           Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_LOG");
}

fn load_questions(from: Option<&PathBuf>) -> Result<Vec<Question>, Box<dyn std::error::Error>> {
    match from {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(builtin_questions()?),
    }
}

fn sample_score(i: u32, now: DateTime<Utc>) -> Result<ScoreRecord, Box<dyn std::error::Error>> {
    let difficulty = match i % 3 {
        0 => Difficulty::Easy,
        1 => Difficulty::Medium,
        _ => Difficulty::Hard,
    };
    let answered = 10 - (i % 4);
    let outcome = if answered == 10 {
        SessionOutcome::Completed
    } else {
        SessionOutcome::Exhausted
    };
    let best_streak = 2 + i % 3;
    let record = ScoreRecord::from_persisted(
        SessionId::generate(),
        None::<UserId>,
        difficulty,
        outcome,
        answered + best_streak / 3,
        i % 2,
        best_streak,
        answered,
        10,
        now - Duration::days(i64::from(i)),
    )?;
    Ok(record)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let questions = load_questions(args.from.as_ref())?;
    if questions.is_empty() {
        warn!("no questions to seed");
    }
    for question in &questions {
        storage.questions.upsert_question(question).await?;
    }
    info!(count = questions.len(), "questions upserted");

    for i in 0..args.scores {
        storage.scores.append_score(&sample_score(i, now)?).await?;
    }

    println!(
        "Seeded {} questions and {} scores into {}",
        storage.questions.count_questions().await?,
        args.scores,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
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
