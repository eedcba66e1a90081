use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::services::chunker::{ChunkError, Chunker};
use crate::services::generation::{GenerationGate, Generator, RigGenerator};
use crate::services::session_store::{ChunkStore, InMemoryChunkStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub chunker: Chunker,
    pub store: Arc<dyn ChunkStore>,
    pub generator: Arc<dyn Generator>,
    pub gate: Arc<GenerationGate>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, ChunkError> {
        let generator = RigGenerator::new(Duration::from_secs(config.llm.request_timeout_secs));
        Self::with_generator(config, Arc::new(generator))
    }

    /// Fails when the configured chunking policy could not make progress or
    /// would send no context with a question.
    pub fn with_generator(config: AppConfig, generator: Arc<dyn Generator>) -> Result<Self, ChunkError> {
        let chunker = Chunker::new(config.chunking_policy())?;
        if config.chunking.context_chunk_limit == 0 {
            return Err(ChunkError::Configuration(
                "context_chunk_limit must be greater than zero".to_string(),
            ));
        }
        let gate = GenerationGate::new(config.llm_settings());
        let store = InMemoryChunkStore::with_limits(config.session.limits());

        Ok(Self {
            config: Arc::new(config),
            chunker,
            store: Arc::new(store),
            generator,
            gate: Arc::new(gate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> AppConfig {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::load_with(
            "test",
            config::Environment::with_prefix("APP")
                .separator("__")
                .source(Some(source)),
        )
        .unwrap()
    }

    #[test]
    fn test_default_config_builds_state() {
        assert!(AppState::new(load(&[])).is_ok());
    }

    #[test]
    fn test_zero_context_chunk_limit_is_rejected() {
        let result = AppState::new(load(&[("APP__CHUNKING__CONTEXT_CHUNK_LIMIT", "0")]));
        assert!(matches!(result, Err(ChunkError::Configuration(msg)) if msg.contains("context_chunk_limit")));
    }

    #[test]
    fn test_overlap_not_below_chunk_size_is_rejected() {
        let result = AppState::new(load(&[
            ("APP__CHUNKING__CHUNK_SIZE", "200"),
            ("APP__CHUNKING__OVERLAP", "200"),
        ]));
        assert!(matches!(result, Err(ChunkError::Configuration(_))));
    }
}
