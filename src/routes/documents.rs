use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::dto::document::AnalyzeResponse;
use crate::errors::AppError;
use crate::middleware::session::SessionContext;
use crate::services::analysis::{self, UploadedDocument};
use crate::state::AppState;

/// Upload a batch of documents and replace the session's chunk sequence.
pub async fn analyze(
    State(state): State<AppState>,
    session: SessionContext,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let upload = &state.config.upload;
    let mut documents = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart data: {e}")))?
    {
        // Plain form fields carry no file name
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        if documents.len() >= upload.max_files {
            return Err(AppError::Validation(format!(
                "Too many files. Maximum is {} per upload",
                upload.max_files
            )));
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read '{filename}': {e}")))?;

        if data.len() > upload.max_file_size_bytes {
            return Err(AppError::Validation(format!(
                "'{filename}' is too large. Maximum size is {} MB",
                upload.max_file_size_bytes / 1024 / 1024
            )));
        }

        documents.push(UploadedDocument {
            filename,
            content_type,
            bytes: data.to_vec(),
        });
    }

    tracing::info!(
        "Session {}: analyzing {} uploaded documents",
        session.session_id,
        documents.len()
    );

    let outcome = analysis::analyze(
        state.store.as_ref(),
        &state.chunker,
        &session.session_id,
        documents,
        Duration::from_secs(upload.extract_timeout_secs),
    )
    .await?;

    Ok(Json(outcome.into()))
}
