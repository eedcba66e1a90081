use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::services::analysis::{AnalyzeOutcome, SkippedDocument};
use crate::services::session_store::{Analysis, DocumentSummary};

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis_id: Uuid,
    pub chunk_count: usize,
    pub documents: Vec<DocumentSummary>,
    pub skipped: Vec<SkippedDocument>,
}

impl From<AnalyzeOutcome> for AnalyzeResponse {
    fn from(outcome: AnalyzeOutcome) -> Self {
        Self {
            analysis_id: outcome.analysis.analysis_id,
            chunk_count: outcome.analysis.chunks.len(),
            documents: outcome.analysis.documents.clone(),
            skipped: outcome.skipped,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub analysis_id: Uuid,
    pub chunk_count: usize,
    pub documents: Vec<DocumentSummary>,
    pub analyzed_at: DateTime<Utc>,
}

impl From<&Analysis> for SessionResponse {
    fn from(analysis: &Analysis) -> Self {
        Self {
            analysis_id: analysis.analysis_id,
            chunk_count: analysis.chunks.len(),
            documents: analysis.documents.clone(),
            analyzed_at: analysis.analyzed_at,
        }
    }
}
