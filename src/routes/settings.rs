use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::services::generation::{GateStatus, SettingsUpdate};
use crate::services::llm_provider;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateLlmSettingsRequest {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

pub async fn get_llm_settings(State(state): State<AppState>) -> Json<GateStatus> {
    Json(state.gate.status())
}

/// Replace provider, model or API key. Lifts a halt caused by rejected credentials.
pub async fn update_llm_settings(
    State(state): State<AppState>,
    Json(payload): Json<UpdateLlmSettingsRequest>,
) -> Result<Json<GateStatus>, AppError> {
    if let Some(provider) = &payload.provider
        && !llm_provider::is_supported(provider)
    {
        return Err(AppError::Validation(format!(
            "Unsupported provider '{provider}'. Supported: {}",
            llm_provider::SUPPORTED_PROVIDERS.join(", ")
        )));
    }

    if payload.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
        return Err(AppError::Validation("Model cannot be empty".to_string()));
    }

    state.gate.reconfigure(SettingsUpdate {
        provider: payload.provider,
        model: payload.model.map(|m| m.trim().to_string()),
        api_key: payload.api_key.map(|k| k.trim().to_string()),
    });

    Ok(Json(state.gate.status()))
}
