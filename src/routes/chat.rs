use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::middleware::session::SessionContext;
use crate::services::analysis::{self, AskPolicy};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    /// False when the model answered with the fallback phrase.
    pub found: bool,
    pub analysis_id: Uuid,
    pub context_chunks: usize,
}

pub async fn ask(
    State(state): State<AppState>,
    session: SessionContext,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let policy = ask_policy(&state);

    let outcome = analysis::ask(
        state.store.as_ref(),
        state.generator.as_ref(),
        &state.gate,
        &policy,
        &session.session_id,
        &payload.question,
    )
    .await?;

    Ok(Json(AskResponse {
        answer: outcome.answer,
        found: outcome.found,
        analysis_id: outcome.analysis_id,
        context_chunks: outcome.context_chunks,
    }))
}

fn ask_policy(state: &AppState) -> AskPolicy {
    let config = &state.config;
    AskPolicy {
        context_chunk_limit: config.chunking.context_chunk_limit,
        role: config.prompt.role.clone(),
        fallback_answer: config.prompt.fallback_answer.clone(),
        quota_backoff_secs: config.llm.quota_backoff_secs,
    }
}
