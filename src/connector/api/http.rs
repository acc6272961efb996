//! HTTP front door.
//!
//! | Method | Path             | Description                                     |
//! |--------|------------------|-------------------------------------------------|
//! | `POST` | `/ask`           | Form or JSON field `query`; plain-text answer   |
//! | `POST` | `/sync/{source}` | Run one sync cycle for a connector now          |
//! | `GET`  | `/status`        | Per-connector scheduler state                   |
//! | `GET`  | `/health`        | Liveness check                                  |

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{FromRequest, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{AskQuestionUseCase, DomainError, SyncScheduler};

use super::Container;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct AppState {
    ask: Arc<AskQuestionUseCase>,
    scheduler: Arc<SyncScheduler>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(ask: Arc<AskQuestionUseCase>, scheduler: Arc<SyncScheduler>) -> Self {
        Self {
            ask,
            scheduler,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// A token cancelled when the request timeout elapses.
    fn deadline(&self) -> CancellationToken {
        super::controller::cancel_after(self.request_timeout)
    }
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    #[serde(default)]
    query: String,
}

pub fn router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/ask", post(ask))
        .route("/sync/{source}", post(sync_source))
        .route("/status", get(status))
        .route("/health", get(health))
        .with_state(state)
}

/// Starts the scheduler, serves HTTP on `bind` until Ctrl-C, then stops the scheduler.
pub async fn serve(container: &Container, bind: &str) -> Result<()> {
    let scheduler = container.scheduler();
    scheduler.start().await?;

    let state = AppState::new(Arc::new(container.ask_use_case()), scheduler.clone());
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn ask(State(state): State<AppState>, request: Request) -> Response {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let parsed = if is_json {
        Json::<AskRequest>::from_request(request, &())
            .await
            .map(|Json(body)| body)
            .map_err(|e| e.body_text())
    } else {
        Form::<AskRequest>::from_request(request, &())
            .await
            .map(|Form(body)| body)
            .map_err(|e| e.body_text())
    };

    let body = match parsed {
        Ok(body) => body,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };
    if body.query.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Query is required").into_response();
    }

    let token = state.deadline();
    let _guard = token.clone().drop_guard();

    match state.ask.ask_with_cancel(&body.query, &token).await {
        Ok(answer) => (StatusCode::OK, answer).into_response(),
        Err(e) => {
            warn!("Ask failed: {}", e);
            (status_for(&e), e.to_string()).into_response()
        }
    }
}

async fn sync_source(State(state): State<AppState>, Path(source): Path<String>) -> Response {
    let token = state.deadline();
    let _guard = token.clone().drop_guard();

    match state.scheduler.trigger(&source, &token).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            warn!("Manual sync of {} failed: {}", source, e);
            (
                status_for(&e),
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn status(State(state): State<AppState>) -> Response {
    Json(state.scheduler.statuses().await).into_response()
}

async fn health() -> &'static str {
    "ok"
}

fn status_for(error: &DomainError) -> StatusCode {
    match error {
        DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Cancelled(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
