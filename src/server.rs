//! HTTP query endpoint.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/` (and `/api`) | Answer a question |
//! | `GET`  | `/` | Liveness message |
//! | `GET`  | `/health` | Version and indexed document count |
//!
//! # Query contract
//!
//! ```json
//! // request
//! { "question": "Should I use gpt-4o-mini or gpt-3.5-turbo?", "image": null }
//! // response
//! { "answer": "...", "links": [ { "url": "https://...", "text": "GA5 doubts" } ] }
//! ```
//!
//! Every well-formed request gets `200` with an answer, including when
//! retrieval or generation fails; the failure is described in `answer` and
//! `links` is empty. Malformed JSON is rejected by the extractor with a 4xx.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front-ends
//! can call the endpoint directly.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use course_ta_core::models::Answer;
use course_ta_core::store::IndexError;

use crate::services::Services;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    services: Arc<Services>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    /// Base64 image attachment. Accepted for compatibility; not used.
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub url: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AnswerResponse {
    pub answer: String,
    pub links: Vec<Link>,
}

impl From<Answer> for AnswerResponse {
    fn from(answer: Answer) -> Self {
        Self {
            answer: answer.text,
            links: answer
                .citations
                .into_iter()
                .map(|c| Link {
                    url: c.url,
                    text: c.title,
                })
                .collect(),
        }
    }
}

/// Build the router with all routes and layers.
pub fn router(services: Arc<Services>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
        tracing::info_span!(
            "request",
            id = %uuid::Uuid::new_v4(),
            method = %req.method(),
            path = %req.uri().path(),
        )
    });

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api", post(handle_question))
        .route("/api/", post(handle_question))
        .layer(trace)
        .layer(cors)
        .with_state(AppState { services })
}

/// Serve on an already-bound listener until the process receives Ctrl-C.
pub async fn serve(listener: tokio::net::TcpListener, services: Arc<Services>) -> anyhow::Result<()> {
    let app = router(services);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

/// Bind `[server].bind` and serve.
pub async fn run_server(services: Arc<Services>) -> anyhow::Result<()> {
    let bind_addr = services.config().server.bind.clone();
    services.check_index().await?;

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Course TA listening on http://{}", bind_addr);
    tracing::info!(addr = %bind_addr, "server started");

    serve(listener, services).await
}

// ============ Handlers ============

async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": "Course TA is running. POST a question to /api/."
    }))
}

async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let index = &state.services.config().index.name;
    let documents = match state.services.index().count(index).await {
        Ok(n) => Some(n),
        Err(IndexError::Missing(_)) => Some(0),
        Err(e) => {
            tracing::warn!(error = %e, "health: index count failed");
            None
        }
    };
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "documents": documents
    }))
}

async fn handle_question(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Json<AnswerResponse> {
    if req.image.is_some() {
        tracing::debug!("image attachment ignored");
    }
    let answer = state.services.orchestrator().answer(&req.question).await;
    Json(AnswerResponse::from(answer))
}
