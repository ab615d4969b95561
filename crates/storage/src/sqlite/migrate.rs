use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::SqliteInitError;

/// Runs the consolidated migration for the current schema.
///
/// Creates the question pool and local score history tables plus indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: questions + scores.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id TEXT NOT NULL,
                    id_kind TEXT NOT NULL CHECK (id_kind IN ('number', 'text')),
                    text TEXT NOT NULL,
                    options TEXT NOT NULL,
                    correct_index INTEGER NOT NULL CHECK (correct_index >= 0),
                    PRIMARY KEY (id_kind, id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS scores (
                    session_id TEXT PRIMARY KEY,
                    user_id TEXT,
                    difficulty TEXT NOT NULL,
                    outcome TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score >= 0),
                    streak INTEGER NOT NULL CHECK (streak >= 0),
                    best_streak INTEGER NOT NULL CHECK (best_streak >= 0),
                    answered INTEGER NOT NULL CHECK (answered >= 0),
                    total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                    finished_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_scores_finished_at
                    ON scores (finished_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_scores_difficulty_score
                    ON scores (difficulty, score);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(version = 1, "applied schema migration");
    }

    Ok(())
}
