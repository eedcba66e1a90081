use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::services::chunker::ChunkingPolicy;
use crate::services::generation::LlmSettings;
use crate::services::session_store::SessionLimits;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chunking: ChunkingConfig,
    pub llm: LlmConfig,
    pub prompt: PromptConfig,
    pub upload: UploadConfig,
    pub session: SessionConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks. Must be below `chunk_size`.
    pub overlap: usize,
    /// Number of leading chunks joined into the context of each question.
    pub context_chunk_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
    pub quota_backoff_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    pub role: String,
    pub fallback_answer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub max_file_size_bytes: usize,
    pub max_files: usize,
    pub extract_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Seconds without any access after which a session's analysis is dropped.
    pub idle_ttl_secs: u64,
    /// Most sessions held at once. The least recently used one is evicted first.
    pub max_sessions: usize,
}

impl SessionConfig {
    pub fn limits(&self) -> SessionLimits {
        SessionLimits {
            idle_ttl: Duration::from_secs(self.idle_ttl_secs),
            max_sessions: self.max_sessions,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    /// Bearer token required to change LLM settings. Empty disables changes.
    pub token: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());
        Self::load_with(&environment, Environment::with_prefix("APP").separator("__"))
    }

    /// Load `config/default` overlaid with `config/{environment}` and `env`.
    pub fn load_with(environment: &str, env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    pub fn chunking_policy(&self) -> ChunkingPolicy {
        ChunkingPolicy {
            chunk_size: self.chunking.chunk_size,
            overlap: self.chunking.overlap,
        }
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            provider: crate::services::llm_provider::normalize_provider(&self.llm.provider),
            model: self.llm.model.clone(),
            api_key: self.llm.api_key.clone(),
        }
    }
}
