//! HTTP handlers.

use super::error::ApiError;
use super::types::{
    parse_count, GenerateFlashcardsRequest, GenerateFlashcardsResponse, HealthResponse,
    HealthServices, PdfInfo, ProcessPdfRequest, ProcessPdfResponse,
};
use super::AppState;
use crate::error::Pdf2CardsError;
use crate::language::text_direction;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::info;

const PROCESS_PDF_FAILURE: &str = "Failed to process PDF";
const GENERATE_FAILURE: &str = "Failed to generate flashcards";

/// Race `work` against the soft request deadline.
async fn with_deadline<T>(
    deadline: Option<Duration>,
    work: impl Future<Output = Result<T, Pdf2CardsError>>,
) -> Result<T, Pdf2CardsError> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .map_err(|_| Pdf2CardsError::DeadlineExceeded {
                secs: limit.as_secs(),
            })?,
        None => work.await,
    }
}

/// `POST /process-pdf`: base64 PDF in, flashcards out.
pub async fn process_pdf(
    State(state): State<AppState>,
    payload: Result<Json<ProcessPdfRequest>, JsonRejection>,
) -> Result<Json<ProcessPdfResponse>, ApiError> {
    let Json(request) = payload.map_err(ApiError::from_rejection)?;
    let service = &state.service;

    let count = parse_count(request.count.as_ref(), service.config().default_count);
    let prefs = request.card_preferences();
    info!(
        file_name = request.file_name().unwrap_or("<unnamed>"),
        %count,
        "process-pdf request"
    );

    let file_data = request.file_data.as_deref().unwrap_or_default();
    let result = with_deadline(
        service.config().request_deadline,
        service.generate_from_pdf(file_data, count, &prefs),
    )
    .await
    .map_err(|e| ApiError::from_pipeline(e, PROCESS_PDF_FAILURE))?;

    let extraction = result.extraction;
    let generation = result.generation;

    Ok(Json(ProcessPdfResponse {
        success: true,
        count: generation.flashcards.len(),
        pdf_info: PdfInfo {
            pages: extraction.page_count,
            pages_processed: extraction.pages_processed,
            text_length: extraction.text.chars().count(),
            text_direction: text_direction(&extraction.text),
            skipped_pages: extraction.skipped_pages,
        },
        flashcards: generation.flashcards,
        warnings: generation.warnings,
    }))
}

/// `POST /generate-flashcards`: plain text in, flashcards out.
pub async fn generate_flashcards(
    State(state): State<AppState>,
    payload: Result<Json<GenerateFlashcardsRequest>, JsonRejection>,
) -> Result<Json<GenerateFlashcardsResponse>, ApiError> {
    let Json(request) = payload.map_err(ApiError::from_rejection)?;
    let service = &state.service;

    let text = request
        .text()
        .ok_or_else(|| ApiError::bad_request("Text content is required"))?;
    let count = parse_count(request.count.as_ref(), service.config().default_count);
    let prefs = request.card_preferences();
    info!(chars = text.len(), %count, "generate-flashcards request");

    let output = with_deadline(
        service.config().request_deadline,
        service.generate_from_text(text, count, &prefs),
    )
    .await
    .map_err(|e| ApiError::from_pipeline(e, GENERATE_FAILURE))?;

    Ok(Json(GenerateFlashcardsResponse {
        success: true,
        count: output.flashcards.len(),
        flashcards: output.flashcards,
        warnings: output.warnings,
    }))
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Response {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    if !state.service.is_provider_configured() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthResponse {
                status: "error".into(),
                services: None,
                message: Some("Missing environment variables: OPENAI_API_KEY".into()),
                timestamp,
                version: None,
            }),
        )
            .into_response();
    }

    let pdf_engine = match state.service.pdf_engine_status() {
        Ok(()) => "available",
        Err(_) => "unavailable",
    };

    Json(HealthResponse {
        status: "healthy".into(),
        services: Some(HealthServices {
            openai: "configured".into(),
            pdf_engine: pdf_engine.into(),
        }),
        message: None,
        timestamp,
        version: Some(env!("CARGO_PKG_VERSION").into()),
    })
    .into_response()
}
