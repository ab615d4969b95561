use std::sync::Arc;
use std::time::{Duration, Instant};

use quiz_core::model::{QuestionId, ScoreReport, SessionConfig, UserId};
use quiz_core::time::fixed_now;
use reqwest::{Client, StatusCode};
use services::{
    Clock, HttpQuestionSource, HttpScoreReporter, QuestionSource, QuestionSourceError,
    QuizWorkflow, ScoreReportError, ScoreReporter, ScoreReporterConfig, StaticQuestionSource,
};
use storage::repository::{InMemoryRepository, ScoreRepository};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct Captured {
    request_line: String,
    body: String,
}

fn client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// Accepts one connection, answers with `status` and `reply`, and hands back
/// what the client sent.
async fn serve_once(status: &'static str, reply: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 1024];

        let head_len = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = header_end(&buf) {
                break end;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_len]).into_owned();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_len + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{reply}",
            reply.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;

        Captured {
            request_line: head.lines().next().unwrap_or_default().to_owned(),
            body: String::from_utf8_lossy(&buf[head_len..head_len + content_length]).into_owned(),
        }
    });

    (format!("http://{addr}"), handle)
}

/// Accepts one connection and keeps it open without ever answering.
async fn accept_and_stall() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    (format!("http://{addr}"), handle)
}

fn reporter(base: &str) -> HttpScoreReporter {
    let config = ScoreReporterConfig::new(&format!("{base}/update-score")).unwrap();
    HttpScoreReporter::with_client(client(), config)
}

fn report(score: u32, streak: u32) -> ScoreReport {
    ScoreReport {
        user_id: UserId::new("u-1").unwrap(),
        score,
        streak,
    }
}

#[tokio::test]
async fn reporter_posts_camel_case_json() {
    let (base, server) = serve_once("200 OK", "{}").await;

    reporter(&base).report(&report(7, 2)).await.unwrap();

    let captured = server.await.unwrap();
    assert!(captured.request_line.starts_with("POST /update-score "));
    let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "userId": "u-1", "score": 7, "streak": 2 })
    );
}

#[tokio::test]
async fn any_success_status_is_accepted() {
    let (base, server) = serve_once("204 No Content", "").await;
    reporter(&base).report(&report(1, 0)).await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn server_error_is_score_persistence_failure() {
    let (base, server) = serve_once("500 Internal Server Error", r#"{"error":"db down"}"#).await;

    let err = reporter(&base).report(&report(3, 1)).await.unwrap_err();
    assert!(matches!(
        err,
        ScoreReportError::HttpStatus(StatusCode::INTERNAL_SERVER_ERROR)
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = reporter(&format!("http://{addr}"))
        .report(&report(0, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ScoreReportError::Http(_)));
}

#[tokio::test]
async fn silent_endpoint_times_out() {
    let (base, server) = accept_and_stall().await;
    let config = ScoreReporterConfig::new(&format!("{base}/update-score"))
        .unwrap()
        .with_timeout(Duration::from_millis(300));
    let reporter = HttpScoreReporter::with_client(client(), config);

    let started = Instant::now();
    let err = reporter.report(&report(4, 1)).await.unwrap_err();

    assert!(matches!(&err, ScoreReportError::Http(e) if e.is_timeout()));
    assert!(started.elapsed() < Duration::from_secs(5));
    server.abort();
}

#[tokio::test]
async fn stalled_report_does_not_hold_the_end_screen() {
    let (base, server) = accept_and_stall().await;
    let workflow = QuizWorkflow::new(
        Clock::fixed(fixed_now()),
        Arc::new(StaticQuestionSource::builtin().unwrap()),
        Arc::new(InMemoryRepository::new()),
    )
    .with_reporter(Arc::new(reporter(&base)))
    .with_user(UserId::new("crane-op"));

    let mut session = workflow.start(SessionConfig::default()).await.unwrap();
    while let Some(question) = session.current_question() {
        let correct = question.correct_index();
        session.answer(correct).unwrap();
    }

    let mut finished = workflow.finish(&session).await.unwrap();
    let outcome = finished
        .take_report()
        .unwrap()
        .outcome_within(Duration::from_millis(200))
        .await;

    assert!(matches!(outcome, Err(ScoreReportError::TimedOut(_))));
    server.abort();
}

#[tokio::test]
async fn http_source_fetches_question_pool() {
    let (base, server) = serve_once(
        "200 OK",
        r#"[
            {"id": 1, "q": "What decreases when you miss an error?", "opts": ["Score", "Lives"], "ans": 1},
            {"id": "chart", "text": "Check before lifting?", "options": ["Load chart", "Radio"], "correctIndex": 0}
        ]"#,
    )
    .await;

    let source = HttpQuestionSource::with_client(client(), &format!("{base}/questions")).unwrap();
    let questions = source.load().await.unwrap();

    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].id(), &QuestionId::number(1));
    assert_eq!(questions[1].id(), &QuestionId::text("chart"));
    assert!(server.await.unwrap().request_line.starts_with("GET /questions "));
}

#[tokio::test]
async fn http_source_rejects_error_status() {
    let (base, server) = serve_once("404 Not Found", "[]").await;

    let source = HttpQuestionSource::with_client(client(), &base).unwrap();
    assert!(matches!(
        source.load().await,
        Err(QuestionSourceError::HttpStatus(StatusCode::NOT_FOUND))
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn finished_session_is_reported_for_signed_in_user() {
    let (base, server) = serve_once("201 Created", "{}").await;
    let repo = InMemoryRepository::new();
    let workflow = QuizWorkflow::new(
        Clock::fixed(fixed_now()),
        Arc::new(StaticQuestionSource::builtin().unwrap()),
        Arc::new(repo.clone()),
    )
    .with_reporter(Arc::new(reporter(&base)))
    .with_user(UserId::new("crane-op"));

    let mut session = workflow.start(SessionConfig::default()).await.unwrap();
    while let Some(question) = session.current_question() {
        let correct = question.correct_index();
        session.answer(correct).unwrap();
    }

    let mut finished = workflow.finish(&session).await.unwrap();
    finished.take_report().unwrap().outcome().await.unwrap();

    let captured = server.await.unwrap();
    let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(body["userId"], "crane-op");
    assert_eq!(body["score"], session.score());
    assert_eq!(body["streak"], 10);
    assert_eq!(repo.list_recent(1, None).await.unwrap().len(), 1);
}
