use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::pipeline::{AnalysisPipeline, ErrorCode, Stage, StageError};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
}

/// Failure body for the full-analysis endpoint: machine-readable
/// `stage` and optional `code` drive the caller's fallback-offer
/// logic, `suggestion` is the human-readable counterpart.
#[derive(Debug, Serialize)]
struct StagedFailure {
    error: String,
    stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Failure body for the one-stage endpoints.
#[derive(Debug, Serialize)]
struct PlainFailure {
    error: String,
}

fn status_for(err: &StageError) -> StatusCode {
    if err.stage == Stage::InputValidation {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn staged_failure(err: StageError) -> Response {
    let status = status_for(&err);
    let body = StagedFailure {
        error: err.message,
        stage: err.stage,
        code: err.code,
        suggestion: err.suggestion,
        message: err.detail,
    };
    (status, Json(body)).into_response()
}

fn plain_failure(err: StageError) -> Response {
    (status_for(&err), Json(PlainFailure { error: err.message })).into_response()
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct FallbackRequest {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct SummarizeRequest {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    word_limit: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct QuizRequest {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    num_questions: u32,
    #[serde(default)]
    difficulty: String,
}

#[derive(Debug, Serialize)]
struct FallbackResponse {
    transcript: String,
}

#[derive(Debug, Serialize)]
struct SummarizeResponse {
    summary: String,
}

#[derive(Debug, Serialize)]
struct QuizResponse {
    quiz: String,
}

/// `GET /` - liveness banner
async fn root() -> &'static str {
    "quizscribe is running"
}

/// `POST /analyze` - full analysis: transcript fetch + classification
async fn analyze(State(state): State<AppState>, Json(req): Json<AnalyzeRequest>) -> Response {
    match state.pipeline.analyze(&req.url).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => staged_failure(err),
    }
}

/// `POST /api/fallback-transcript` - speech-to-text fallback
async fn fallback_transcript(
    State(state): State<AppState>,
    Json(req): Json<FallbackRequest>,
) -> Response {
    match state.pipeline.fallback_transcript(&req.url).await {
        Ok(transcript) => Json(FallbackResponse { transcript }).into_response(),
        Err(err) => plain_failure(err),
    }
}

/// `POST /api/summarize` - summarize transcript text
async fn summarize(State(state): State<AppState>, Json(req): Json<SummarizeRequest>) -> Response {
    match state
        .pipeline
        .summarize(&req.transcript, req.word_limit.as_ref())
        .await
    {
        Ok(summary) => Json(SummarizeResponse { summary }).into_response(),
        Err(err) => plain_failure(err),
    }
}

/// `POST /api/quiz` - generate raw quiz text from a summary
async fn quiz(State(state): State<AppState>, Json(req): Json<QuizRequest>) -> Response {
    match state
        .pipeline
        .quiz(&req.summary, req.num_questions, &req.difficulty)
        .await
    {
        Ok(quiz) => Json(QuizResponse { quiz }).into_response(),
        Err(err) => plain_failure(err),
    }
}

/// Build the application router.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/analyze", post(analyze))
        .route("/api/fallback-transcript", post(fallback_transcript))
        .route("/api/summarize", post(summarize))
        .route("/api/quiz", post(quiz))
        .with_state(state)
        .layer(cors)
}

/// CORS layer from configuration; any origin when none is configured.
pub fn cors_layer(allow_origin: Option<&str>) -> Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match allow_origin {
        Some(origin) if origin != "*" => {
            let origin = HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid CORS origin: {}", origin))?;
            Ok(layer.allow_origin(origin))
        }
        _ => Ok(layer.allow_origin(Any)),
    }
}

/// Bind and serve the HTTP API until the process is stopped.
pub async fn serve(config: &Config, pipeline: Arc<AnalysisPipeline>) -> Result<()> {
    let cors = cors_layer(config.server.allow_origin.as_deref())?;
    let app = router(AppState { pipeline }, cors);

    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("listening on http://{}", addr);
    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}
