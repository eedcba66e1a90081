use axum::{extract::State, http::StatusCode, Json};

use crate::dto::document::SessionResponse;
use crate::errors::AppError;
use crate::middleware::session::SessionContext;
use crate::state::AppState;

pub async fn get_current(
    State(state): State<AppState>,
    session: SessionContext,
) -> Result<Json<SessionResponse>, AppError> {
    let analysis = state
        .store
        .get_chunks(&session.session_id)
        .ok_or_else(|| AppError::NotFound("No analyzed documents for this session".to_string()))?;

    Ok(Json(analysis.as_ref().into()))
}

/// End the session and drop its chunk sequence.
pub async fn end_current(
    State(state): State<AppState>,
    session: SessionContext,
) -> Result<StatusCode, AppError> {
    if !state.store.clear(&session.session_id) {
        return Err(AppError::NotFound("Session not found".to_string()));
    }

    tracing::info!("Session {} ended", session.session_id);
    Ok(StatusCode::NO_CONTENT)
}
