use chrono::Duration;
use quiz_core::model::{
    Difficulty, Question, QuestionId, ScoreRecord, SessionId, SessionOutcome, UserId,
};
use quiz_core::pool::builtin_questions;
use quiz_core::time::fixed_now;
use storage::repository::{QuestionRepository, ScoreRepository, Storage, StorageError};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!(
        "sqlite:file:{name}?mode=memory&cache=shared"
    ))
    .await
    .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn record(score: u32, difficulty: Difficulty, user: Option<&str>, minutes_ago: i64) -> ScoreRecord {
    ScoreRecord::from_persisted(
        SessionId::generate(),
        user.and_then(UserId::new),
        difficulty,
        SessionOutcome::Exhausted,
        score,
        0,
        3,
        4,
        10,
        fixed_now() - Duration::minutes(minutes_ago),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_questions_round_trip_with_mixed_ids() {
    let repo = connect("memdb_questions").await;

    let pool = builtin_questions().unwrap();
    for q in pool.iter().rev() {
        repo.upsert_question(q).await.unwrap();
    }
    let named = Question::new(
        QuestionId::text("crane-signal"),
        "Hand signal for stop?",
        vec!["Fist".into(), "Open palm".into(), "Thumbs up".into()],
        1,
    )
    .unwrap();
    repo.upsert_question(&named).await.unwrap();

    assert_eq!(repo.count_questions().await.unwrap(), 11);

    let listed = repo.list_questions().await.unwrap();
    assert_eq!(listed.len(), 11);
    assert_eq!(&listed[..10], &pool[..]);
    assert_eq!(listed[10], named);

    let fetched = repo
        .get_question(&QuestionId::text("crane-signal"))
        .await
        .unwrap();
    assert_eq!(fetched.options().len(), 3);
    assert_eq!(fetched.correct_index(), 1);

    // "10" as text is not the numeric id 10
    assert!(matches!(
        repo.get_question(&QuestionId::text("10")).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_upsert_replaces_question_content() {
    let repo = connect("memdb_upsert").await;

    let original = Question::new(
        QuestionId::number(1),
        "Old",
        vec!["A".into(), "B".into()],
        0,
    )
    .unwrap();
    repo.upsert_question(&original).await.unwrap();

    let replaced = Question::new(
        QuestionId::number(1),
        "New",
        vec!["A".into(), "B".into(), "C".into()],
        2,
    )
    .unwrap();
    repo.upsert_question(&replaced).await.unwrap();

    assert_eq!(repo.count_questions().await.unwrap(), 1);
    assert_eq!(
        repo.get_question(&QuestionId::number(1)).await.unwrap(),
        replaced
    );
}

#[tokio::test]
async fn sqlite_scores_keep_history_and_reject_duplicates() {
    let repo = connect("memdb_scores").await;

    let first = record(3, Difficulty::Easy, None, 30);
    repo.append_score(&first).await.unwrap();
    repo.append_score(&record(9, Difficulty::Hard, Some("u-7"), 20))
        .await
        .unwrap();
    repo.append_score(&record(5, Difficulty::Easy, None, 10))
        .await
        .unwrap();

    assert!(matches!(
        repo.append_score(&first).await,
        Err(StorageError::Conflict)
    ));

    let recent = repo.list_recent(10, None).await.unwrap();
    let scores: Vec<u32> = recent.iter().map(ScoreRecord::score).collect();
    assert_eq!(scores, vec![5, 9, 3]);
    assert_eq!(recent[1].user_id().map(UserId::as_str), Some("u-7"));
    assert_eq!(recent[2].session_id(), first.session_id());
    assert_eq!(recent[2].finished_at(), first.finished_at());

    let easy = repo.list_recent(2, Some(Difficulty::Easy)).await.unwrap();
    let scores: Vec<u32> = easy.iter().map(ScoreRecord::score).collect();
    assert_eq!(scores, vec![5, 3]);

    let best = repo.best_score(None).await.unwrap().unwrap();
    assert_eq!(best.score(), 9);
    let best_easy = repo
        .best_score(Some(Difficulty::Easy))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(best_easy.score(), 5);
    assert!(
        repo.best_score(Some(Difficulty::Medium))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn storage_sqlite_wires_both_repositories() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");

    for q in builtin_questions().unwrap() {
        storage.questions.upsert_question(&q).await.unwrap();
    }
    storage
        .scores
        .append_score(&record(4, Difficulty::Medium, None, 0))
        .await
        .unwrap();

    assert_eq!(storage.questions.count_questions().await.unwrap(), 10);
    assert_eq!(storage.scores.list_recent(1, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    assert_eq!(repo.count_questions().await.unwrap(), 0);
}
