use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::Router;
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::validation::validate_session_id;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_session).delete(delete_session))
        .route("/:id/reset", post(reset_session))
        .route("/:id/events", get(session_events))
}

fn checked_id(id: &str) -> Result<(), AppError> {
    validate_session_id(id).map_err(|msg| AppError::bad_request("INVALID_SESSION_ID", msg))
}

async fn get_session(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    checked_id(&id)?;
    match state.sessions().snapshot(&id).await {
        Some(snapshot) => Ok(ok(snapshot)),
        None => Err(AppError::not_found("Session not found")),
    }
}

async fn reset_session(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    checked_id(&id)?;
    match state.sessions().reset(&id).await {
        Some(snapshot) => {
            tracing::info!(session_id = %id, "session reset");
            Ok(ok(snapshot))
        }
        None => Err(AppError::not_found("Session not found")),
    }
}

async fn delete_session(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    checked_id(&id)?;
    if state.sessions().remove(&id).await {
        tracing::info!(session_id = %id, "session removed");
        Ok(ok(serde_json::json!({"removed": true})))
    } else {
        Err(AppError::not_found("Session not found"))
    }
}

/// Streams every evaluated frame of one session, so a dashboard can raise the
/// alarm without polling.
async fn session_events(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    checked_id(&id)?;
    let slot = state
        .try_acquire_sse_slot()
        .ok_or_else(|| AppError::too_many_requests("Too many SSE connections"))?;

    let mut shutdown_rx = state.shutdown_rx();
    let mut frames = state.sessions().subscribe();
    let initial = state.sessions().snapshot(&id).await;

    let stream = async_stream::stream! {
        let _slot = slot;

        if let Some(snapshot) = initial {
            if let Ok(json) = serde_json::to_string(&snapshot) {
                yield Ok(Event::default().event("snapshot").data(json));
            }
        }

        loop {
            tokio::select! {
                received = frames.recv() => {
                    match received {
                        Ok(event) => {
                            if event.session_id == id {
                                if let Ok(json) = serde_json::to_string(&event) {
                                    yield Ok(Event::default().event("frame").data(json));
                                }
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(session_id = %id, skipped, "SSE subscriber lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}
