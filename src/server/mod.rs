//! HTTP API.
//!
//! Three routes, each served both at the root and under `/api`:
//!
//! | Method | Path                   | Handler |
//! |--------|------------------------|---------|
//! | POST   | `/process-pdf`         | [`handlers::process_pdf`] |
//! | POST   | `/generate-flashcards` | [`handlers::generate_flashcards`] |
//! | GET    | `/health`              | [`handlers::health_check`] |

mod error;
mod handlers;
mod types;

pub use error::{ApiError, ErrorBody};
pub use handlers::{generate_flashcards, health_check, process_pdf};
pub use types::*;

use crate::generate::FlashcardService;
use crate::pipeline::input::encoded_len_limit;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// JSON envelope allowance on top of the base64 payload.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FlashcardService>,
}

impl AppState {
    pub fn new(service: FlashcardService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Build the router with all endpoints.
pub fn build_router(state: AppState) -> Router {
    let body_limit =
        encoded_len_limit(state.service.config().max_upload_bytes).saturating_add(BODY_OVERHEAD_BYTES);

    let routes: Router<AppState> = Router::new()
        .route("/health", get(health_check))
        .route("/process-pdf", post(process_pdf))
        .route("/generate-flashcards", post(generate_flashcards));

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn start_server(addr: &str, state: AppState) -> Result<(), std::io::Error> {
    tracing::info!("Starting API server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
}
