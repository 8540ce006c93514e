//! Mapping from pipeline errors to HTTP responses.
//!
//! Client mistakes answer 4xx with `{ "error": <message> }`. Server-side
//! failures answer 5xx with `{ "error": <summary>, "message": <cause>,
//! "details": <error kind> }`.

use crate::error::{ErrorKind, Pdf2CardsError};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// An error response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                message: None,
                details: None,
            },
        }
    }

    /// Map a pipeline error. `summary` heads 5xx bodies, e.g. "Failed to process PDF".
    pub fn from_pipeline(err: Pdf2CardsError, summary: &str) -> Self {
        let api_error = match (&err, err.kind()) {
            (Pdf2CardsError::PayloadTooLarge { .. }, _) => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
            }
            (_, ErrorKind::InputValidation | ErrorKind::FormatValidation) => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            (Pdf2CardsError::ProviderNotConfigured { .. }, _) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            (_, ErrorKind::Timeout) => Self {
                status: StatusCode::GATEWAY_TIMEOUT,
                body: ErrorBody {
                    error: "Request timed out".into(),
                    message: Some(err.to_string()),
                    details: None,
                },
            },
            (_, kind) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: ErrorBody {
                    error: summary.to_string(),
                    message: Some(err.to_string()),
                    details: Some(format!("{kind:?}")),
                },
            },
        };

        if api_error.status.is_server_error() {
            error!("{}: {}", summary, err);
        } else {
            warn!("Rejected request ({}): {}", api_error.status, err);
        }
        api_error
    }

    /// Map a body that failed to parse or exceeded the body limit.
    pub fn from_rejection(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        warn!("Rejected request body ({}): {}", status, rejection.body_text());
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(
                status,
                "PDF file is too large. Please use a smaller file or a PDF with fewer pages.",
            );
        }
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: "Invalid request body".into(),
                message: Some(rejection.body_text()),
                details: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
