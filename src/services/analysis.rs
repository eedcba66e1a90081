use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::errors::AppError;
use crate::services::chunker::Chunker;
use crate::services::context::{build_prompt, context_chunk_count, is_fallback_answer, select_context};
use crate::services::generation::{GenerationGate, GenerationOutcome, Generator};
use crate::services::session_store::{Analysis, ChunkStore, DocumentSummary};
use crate::services::text_extract::{self, ExtractError};

/// One file from an upload batch.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SkippedDocument {
    pub filename: String,
    pub error: String,
}

#[derive(Debug)]
pub struct AnalyzeOutcome {
    pub analysis: Arc<Analysis>,
    pub skipped: Vec<SkippedDocument>,
}

/// Extract, concatenate and chunk a batch, then replace the session's analysis.
///
/// Documents that fail extraction are skipped. When none survive, the stored
/// analysis is left as it was.
pub async fn analyze(
    store: &dyn ChunkStore,
    chunker: &Chunker,
    session_id: &str,
    documents: Vec<UploadedDocument>,
    extract_timeout: Duration,
) -> Result<AnalyzeOutcome, AppError> {
    if documents.is_empty() {
        return Err(AppError::Validation(
            "Please upload at least one document".to_string(),
        ));
    }

    let mut text = String::new();
    let mut summaries = Vec::with_capacity(documents.len());
    let mut skipped = Vec::new();

    for doc in &documents {
        match text_extract::extract_pages(&doc.bytes, &doc.content_type, &doc.filename, extract_timeout).await {
            Ok(pages) => {
                let characters = append_pages(&mut text, &pages);
                summaries.push(DocumentSummary {
                    filename: doc.filename.clone(),
                    pages: pages.len(),
                    characters,
                });
            }
            Err(e) => {
                tracing::warn!("Skipping document: {e}");
                skipped.push(skipped_document(&doc.filename, e));
            }
        }
    }

    if summaries.is_empty() {
        let reasons: Vec<String> = skipped.iter().map(|s| s.error.clone()).collect();
        return Err(AppError::Unprocessable(format!(
            "No document could be read: {}",
            reasons.join("; ")
        )));
    }

    let chunks = chunker.split(&text);
    drop(text);

    let analysis = Arc::new(Analysis::new(chunks, summaries));
    tracing::info!(
        "Session {session_id}: analysis {} has {} chunks from {} documents ({} skipped)",
        analysis.analysis_id,
        analysis.chunks.len(),
        analysis.documents.len(),
        skipped.len()
    );

    if let Some(previous) = store.set_chunks(session_id, analysis.clone()) {
        tracing::debug!("Session {session_id}: replaced analysis {}", previous.analysis_id);
    }

    Ok(AnalyzeOutcome { analysis, skipped })
}

/// Append page texts without separators. Returns the number of characters added.
fn append_pages(text: &mut String, pages: &[String]) -> usize {
    pages
        .iter()
        .map(|page| {
            text.push_str(page);
            page.chars().count()
        })
        .sum()
}

fn skipped_document(filename: &str, err: ExtractError) -> SkippedDocument {
    SkippedDocument {
        filename: filename.to_string(),
        error: err.to_string(),
    }
}

/// Prompt policy applied to every question.
#[derive(Debug, Clone)]
pub struct AskPolicy {
    pub context_chunk_limit: usize,
    pub role: String,
    pub fallback_answer: String,
    pub quota_backoff_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskOutcome {
    pub answer: String,
    pub found: bool,
    pub analysis_id: Uuid,
    pub context_chunks: usize,
}

/// Answer one question from the session's current analysis.
///
/// Never writes to the store. If the session is re-analyzed while the
/// generation call is in flight, the answer is discarded.
pub async fn ask(
    store: &dyn ChunkStore,
    generator: &dyn Generator,
    gate: &GenerationGate,
    policy: &AskPolicy,
    session_id: &str,
    question: &str,
) -> Result<AskOutcome, AppError> {
    if question.trim().is_empty() {
        return Err(AppError::Validation("Question cannot be empty".to_string()));
    }

    if let Some(reason) = gate.halt_reason() {
        return Err(AppError::GenerationHalted(reason));
    }

    let analysis = store.get_chunks(session_id).ok_or_else(|| {
        AppError::NotFound("No analyzed documents for this session. Upload and analyze documents first.".to_string())
    })?;

    let context = select_context(&analysis.chunks, policy.context_chunk_limit);
    let context_chunks = context_chunk_count(analysis.chunks.len(), policy.context_chunk_limit);
    let prompt = build_prompt(&policy.role, &policy.fallback_answer, &context, question);

    let settings = gate.settings();
    let answer = match generator.generate(&settings, &prompt).await {
        GenerationOutcome::Answer(answer) => answer,
        GenerationOutcome::QuotaExceeded { message } => {
            return Err(AppError::QuotaExceeded {
                message,
                retry_after_secs: policy.quota_backoff_secs,
            });
        }
        GenerationOutcome::TransientFailure { message, timed_out } => {
            return Err(AppError::Upstream { message, timed_out });
        }
        GenerationOutcome::AuthFailure { message } => {
            gate.halt(&message);
            return Err(AppError::GenerationAuth(message));
        }
    };

    let current = store.get_chunks(session_id).map(|a| a.analysis_id);
    if current != Some(analysis.analysis_id) {
        tracing::info!(
            "Session {session_id}: discarding answer for superseded analysis {}",
            analysis.analysis_id
        );
        return Err(AppError::Conflict(
            "Documents changed while the answer was being generated. Please ask again.".to_string(),
        ));
    }

    let answer = answer.trim().to_string();
    Ok(AskOutcome {
        found: !is_fallback_answer(&answer, &policy.fallback_answer),
        answer,
        analysis_id: analysis.analysis_id,
        context_chunks,
    })
}
