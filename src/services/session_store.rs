use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::services::chunker::Chunk;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub pages: usize,
    pub characters: usize,
}

/// The chunk sequence produced by one analyze action, immutable once stored.
#[derive(Debug)]
pub struct Analysis {
    pub analysis_id: Uuid,
    pub chunks: Arc<[Chunk]>,
    pub documents: Vec<DocumentSummary>,
    pub analyzed_at: DateTime<Utc>,
}

impl Analysis {
    pub fn new(chunks: Vec<Chunk>, documents: Vec<DocumentSummary>) -> Self {
        Self {
            analysis_id: Uuid::new_v4(),
            chunks: chunks.into(),
            documents,
            analyzed_at: Utc::now(),
        }
    }
}

/// Session-scoped storage for analyses. Writes replace the whole analysis.
pub trait ChunkStore: Send + Sync {
    fn get_chunks(&self, session_id: &str) -> Option<Arc<Analysis>>;

    /// Store `analysis` for the session, returning the one it replaced.
    fn set_chunks(&self, session_id: &str, analysis: Arc<Analysis>) -> Option<Arc<Analysis>>;

    /// End the session. Returns whether anything was stored.
    fn clear(&self, session_id: &str) -> bool;

    fn session_count(&self) -> usize;
}

/// Bounds on what the in-memory store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// A session not read or written for this long is dropped.
    pub idle_ttl: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(3600),
            max_sessions: 1000,
        }
    }
}

struct SessionEntry {
    analysis: Arc<Analysis>,
    last_used: Instant,
}

impl SessionEntry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_used) >= ttl
    }
}

/// Process-local store. Idle sessions expire, and when full the least
/// recently used session makes room for a new one.
#[derive(Default)]
pub struct InMemoryChunkStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    limits: SessionLimits,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: SessionLimits) -> Self {
        Self {
            sessions: RwLock::default(),
            limits,
        }
    }

    fn purge_expired(&self, sessions: &mut HashMap<String, SessionEntry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(now, self.limits.idle_ttl));
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::info!("Dropped {purged} idle sessions");
        }
    }

    fn evict_least_recently_used(sessions: &mut HashMap<String, SessionEntry>) {
        let oldest = sessions
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            tracing::info!("Session store full, evicting session {id}");
            sessions.remove(&id);
        }
    }
}

impl ChunkStore for InMemoryChunkStore {
    fn get_chunks(&self, session_id: &str) -> Option<Arc<Analysis>> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        let entry = sessions.get_mut(session_id)?;
        if entry.is_expired(now, self.limits.idle_ttl) {
            sessions.remove(session_id);
            return None;
        }
        entry.last_used = now;
        Some(entry.analysis.clone())
    }

    fn set_chunks(&self, session_id: &str, analysis: Arc<Analysis>) -> Option<Arc<Analysis>> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        self.purge_expired(&mut sessions, now);

        if !sessions.contains_key(session_id) {
            while !sessions.is_empty() && sessions.len() >= self.limits.max_sessions {
                Self::evict_least_recently_used(&mut sessions);
            }
        }

        sessions
            .insert(
                session_id.to_string(),
                SessionEntry {
                    analysis,
                    last_used: now,
                },
            )
            .map(|previous| previous.analysis)
    }

    fn clear(&self, session_id: &str) -> bool {
        let now = Instant::now();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .is_some_and(|entry| !entry.is_expired(now, self.limits.idle_ttl))
    }

    fn session_count(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entry| !entry.is_expired(now, self.limits.idle_ttl))
            .count()
    }
}
