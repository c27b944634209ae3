//! HTTP endpoint tests against a server bound to an ephemeral port.

mod common;

use std::sync::Arc;

use course_ta::config::Config;
use course_ta::server::{self, AnswerResponse, Link};
use course_ta::services::Services;
use course_ta_core::generation::GenerationProvider;
use course_ta_core::store::memory::InMemoryIndex;

use common::{corpus, BrokenGenerator, RecordingGenerator, WordEmbedder};

/// Build an indexed in-memory service set and serve it; returns the base URL.
async fn start(generator: Arc<dyn GenerationProvider>, indexed: bool) -> String {
    let services = Services::assemble(
        Config::minimal("unused.sqlite"),
        Arc::new(InMemoryIndex::new()),
        Arc::new(WordEmbedder),
        generator,
    );
    if indexed {
        let name = services.config().index.name.clone();
        services.indexer().rebuild(&name, &corpus()).await.unwrap();
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, Arc::new(services)));
    format!("http://{}", addr)
}

#[tokio::test]
async fn answers_with_links() {
    let base = start(Arc::new(RecordingGenerator::new("Due Sunday.")), true).await;
    let client = reqwest::Client::new();

    for path in ["/api/", "/api"] {
        let resp = client
            .post(format!("{}{}", base, path))
            .json(&serde_json::json!({"question": "When are graded assignments due?"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: AnswerResponse = resp.json().await.unwrap();
        assert_eq!(body.answer, "Due Sunday.");
        assert!(body.links.contains(&Link {
            url: "https://course/ga".to_string(),
            text: "Graded Assignments".to_string(),
        }));
    }
}

#[tokio::test]
async fn image_field_is_accepted() {
    let base = start(Arc::new(RecordingGenerator::new("ok")), true).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/", base))
        .json(&serde_json::json!({"question": "exam hall ticket", "image": "aGVsbG8="}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn empty_index_returns_canned_answer() {
    let base = start(Arc::new(RecordingGenerator::new("unused")), false).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/", base))
        .json(&serde_json::json!({"question": "When is the exam?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: AnswerResponse = resp.json().await.unwrap();
    assert_eq!(
        body.answer,
        course_ta_core::orchestrator::NO_INFORMATION_ANSWER
    );
    assert!(body.links.is_empty());
}

#[tokio::test]
async fn generation_failure_is_still_200() {
    let base = start(Arc::new(BrokenGenerator), true).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/", base))
        .json(&serde_json::json!({"question": "graded assignments due"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: AnswerResponse = resp.json().await.unwrap();
    assert!(!body.answer.is_empty());
    assert!(body.links.is_empty());
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let base = start(Arc::new(RecordingGenerator::new("ok")), true).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/api/", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());

    let resp = reqwest::Client::new()
        .post(format!("{}/api/", base))
        .json(&serde_json::json!({"image": null}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn root_and_health() {
    let base = start(Arc::new(RecordingGenerator::new("ok")), true).await;

    let root: serde_json::Value = reqwest::get(format!("{}/", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(root["status"], "ok");

    let health: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["documents"], 4);
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let base = start(Arc::new(RecordingGenerator::new("ok")), true).await;
    let resp = reqwest::Client::new()
        .get(format!("{}/", base))
        .header("origin", "https://example.org")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
