//! HTTP front end for a [`RiskClassifier`].
//!
//! `POST /api/analyze` takes `{"prompt": "...", "type": "url|message|general"}`
//! and answers with `{verdict, risk_score, summary, details}`. Invalid input
//! is a 400, any other failure (including a panic in a handler) is a 500
//! carrying an ERROR verdict.

use crate::analysis::{AnalysisError, AnalysisRequest, AnalysisResult, InputKind};
use crate::classifier::RiskClassifier;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn RiskClassifier>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeBody {
    #[serde(alias = "text")]
    prompt: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/analyze",
            post(analyze).options(preflight).fallback(method_not_allowed),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "message": "Method Not Allowed" })),
    )
        .into_response()
}

async fn analyze(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match parse_body(&body) {
        Ok(request) => request,
        Err(e) => return error_response(e),
    };

    match state.classifier.classify(&request).await {
        Ok(result) => {
            log::info!(
                "Analyzed {} chars: {} ({})",
                request.text.chars().count(),
                result.verdict,
                result.risk_score
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => error_response(e),
    }
}

fn parse_body(body: &[u8]) -> Result<AnalysisRequest, AnalysisError> {
    let body: AnalyzeBody = serde_json::from_slice(body)
        .map_err(|e| AnalysisError::InvalidInput(format!("malformed JSON body: {e}")))?;

    let text = body.prompt.unwrap_or_default();
    let mut request = AnalysisRequest::new(text);
    request.validate()?;

    if let Some(kind) = body.kind.as_deref() {
        match kind.parse::<InputKind>() {
            Ok(kind) => request = request.with_kind(kind),
            Err(_) => log::debug!("Ignoring unknown input type '{kind}'"),
        }
    }

    Ok(request)
}

fn error_response(error: AnalysisError) -> Response {
    if error.is_client_error() {
        log::warn!("Rejected request: {error}");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": error.to_string() })),
        )
            .into_response();
    }

    log::error!("Analysis failed: {error}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(AnalysisResult::error(error.to_string())),
    )
        .into_response()
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error_response(AnalysisError::Internal(message))
}
