use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rig::completion::Prompt;
use serde::Serialize;

use crate::services::llm_provider;

/// Provider, model and credential handed to the generation service on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
    pub api_key: String,
}

/// Result of one generation call. Callers match on this instead of
/// inspecting error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Answer(String),
    /// Rate or quota limit hit. Retry after a cooldown.
    QuotaExceeded { message: String },
    /// Transient or unknown failure. Retry is allowed immediately.
    TransientFailure { message: String, timed_out: bool },
    /// Missing or rejected credential. Not retryable until reconfigured.
    AuthFailure { message: String },
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, settings: &LlmSettings, prompt: &str) -> GenerationOutcome;
}

/// Generation through a rig completion client, bounded by `timeout`.
pub struct RigGenerator {
    timeout: Duration,
}

impl RigGenerator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Generator for RigGenerator {
    async fn generate(&self, settings: &LlmSettings, prompt: &str) -> GenerationOutcome {
        if settings.api_key.trim().is_empty() && llm_provider::requires_api_key(&settings.provider) {
            return GenerationOutcome::AuthFailure {
                message: format!("No API key configured for provider '{}'", settings.provider),
            };
        }

        let client = match llm_provider::create_completion_client(&settings.provider, &settings.api_key) {
            Ok(client) => client,
            Err(e) => {
                return GenerationOutcome::AuthFailure {
                    message: format!("{e:#}"),
                };
            }
        };

        let agent = client.agent(&settings.model).build();

        tracing::debug!(
            "Sending prompt to {}/{} ({} chars)",
            settings.provider,
            settings.model,
            prompt.chars().count()
        );

        match tokio::time::timeout(self.timeout, agent.prompt(prompt)).await {
            Ok(Ok(answer)) => GenerationOutcome::Answer(answer),
            Ok(Err(e)) => classify_failure(&redact(&e.to_string(), &settings.api_key)),
            Err(_) => GenerationOutcome::TransientFailure {
                message: format!(
                    "Generation service did not respond within {}s",
                    self.timeout.as_secs()
                ),
                timed_out: true,
            },
        }
    }
}

/// Map a provider error message onto an outcome. Providers surface HTTP status
/// and error codes only inside the message text.
///
/// A status code counts only as a whole token right after an error prefix or a
/// `status`/`code`/`http` label, so digits in request ids or token counts are ignored.
pub fn classify_failure(message: &str) -> GenerationOutcome {
    let lower = message.to_lowercase();
    let message = message.to_string();

    match status_code(&lower) {
        Some(429) => return GenerationOutcome::QuotaExceeded { message },
        Some(401 | 403) => return GenerationOutcome::AuthFailure { message },
        Some(500..=599) => {
            return GenerationOutcome::TransientFailure {
                message,
                timed_out: false,
            };
        }
        _ => {}
    }

    const QUOTA_MARKERS: &[&str] = &["resource_exhausted", "resource exhausted", "quota", "rate limit", "too many requests"];
    const AUTH_MARKERS: &[&str] = &[
        "unauthorized",
        "unauthenticated",
        "permission_denied",
        "invalid api key",
        "api key not valid",
        "invalid_api_key",
        "incorrect api key",
    ];

    if QUOTA_MARKERS.iter().any(|m| lower.contains(m)) {
        GenerationOutcome::QuotaExceeded { message }
    } else if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
        GenerationOutcome::AuthFailure { message }
    } else {
        GenerationOutcome::TransientFailure {
            message,
            timed_out: false,
        }
    }
}

/// First HTTP status token in a lowercased provider message.
fn status_code(lower: &str) -> Option<u16> {
    let tokens: Vec<&str> = lower
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .collect();

    tokens.windows(2).find_map(|pair| {
        let (label, value) = (pair[0], pair[1]);
        let labelled = label.ends_with("error") || matches!(label, "status" | "code" | "http");
        if !labelled || value.len() != 3 {
            return None;
        }
        value
            .parse::<u16>()
            .ok()
            .filter(|code| (100..=599).contains(code))
    })
}

fn redact(message: &str, secret: &str) -> String {
    if secret.trim().is_empty() {
        return message.to_string();
    }
    message.replace(secret, "[REDACTED]")
}

/// Current generation settings plus the auth halt. An auth failure stops
/// further generation until the settings are replaced.
pub struct GenerationGate {
    settings: RwLock<LlmSettings>,
    halted: RwLock<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GateStatus {
    pub provider: String,
    pub model: String,
    pub api_key_configured: bool,
    pub generation_halted: bool,
    pub halt_reason: Option<String>,
}

/// Partial replacement of the settings. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

impl GenerationGate {
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
            halted: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> LlmSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn halt_reason(&self) -> Option<String> {
        self.halted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn halt(&self, reason: &str) {
        tracing::warn!("Generation halted until reconfigured: {reason}");
        *self.halted.write().unwrap_or_else(PoisonError::into_inner) = Some(reason.to_string());
    }

    /// Apply new settings and lift any halt.
    pub fn reconfigure(&self, update: SettingsUpdate) -> LlmSettings {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(provider) = update.provider {
            settings.provider = llm_provider::normalize_provider(&provider);
        }
        if let Some(model) = update.model {
            settings.model = model;
        }
        if let Some(api_key) = update.api_key {
            settings.api_key = api_key;
        }
        *self.halted.write().unwrap_or_else(PoisonError::into_inner) = None;

        tracing::info!("Generation reconfigured: {}/{}", settings.provider, settings.model);
        settings.clone()
    }

    pub fn status(&self) -> GateStatus {
        let settings = self.settings();
        let halt_reason = self.halt_reason();
        GateStatus {
            provider: settings.provider,
            model: settings.model,
            api_key_configured: !settings.api_key.trim().is_empty(),
            generation_halted: halt_reason.is_some(),
            halt_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(api_key: &str) -> LlmSettings {
        LlmSettings {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash-lite".to_string(),
            api_key: api_key.to_string(),
        }
    }

    #[test]
    fn test_classify_quota() {
        let outcome = classify_failure("ProviderError: 429 RESOURCE_EXHAUSTED: Quota exceeded for metric");
        assert!(matches!(outcome, GenerationOutcome::QuotaExceeded { .. }));
    }

    #[test]
    fn test_classify_auth() {
        let outcome = classify_failure("ProviderError: 400 API key not valid. Please pass a valid API key.");
        assert!(matches!(outcome, GenerationOutcome::AuthFailure { .. }));
        let outcome = classify_failure("HttpError: 401 Unauthorized");
        assert!(matches!(outcome, GenerationOutcome::AuthFailure { .. }));
    }

    #[test]
    fn test_classify_status_in_json_body() {
        let outcome = classify_failure(r#"ProviderError: {"error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}}"#);
        assert!(matches!(outcome, GenerationOutcome::QuotaExceeded { .. }));
        let outcome = classify_failure("HttpError: status 403 from provider");
        assert!(matches!(outcome, GenerationOutcome::AuthFailure { .. }));
    }

    #[test]
    fn test_classify_server_errors_ignore_incidental_digits() {
        let outcome = classify_failure("HttpError: 500 Internal Server Error (request id 7a4031bc)");
        assert!(matches!(outcome, GenerationOutcome::TransientFailure { timed_out: false, .. }));

        let outcome = classify_failure("ProviderError: 503 model overloaded, prompt had 14290 tokens");
        assert!(matches!(outcome, GenerationOutcome::TransientFailure { timed_out: false, .. }));

        let outcome = classify_failure("ProviderError: 502 bad gateway, trace 401403429");
        assert!(matches!(outcome, GenerationOutcome::TransientFailure { .. }));

        // Unlabelled numbers are not status codes.
        let outcome = classify_failure("HttpError: upstream closed after 401 ms");
        assert!(matches!(outcome, GenerationOutcome::TransientFailure { .. }));
    }

    #[test]
    fn test_classify_transient() {
        let outcome = classify_failure("HttpError: connection reset by peer");
        assert_eq!(
            outcome,
            GenerationOutcome::TransientFailure {
                message: "HttpError: connection reset by peer".to_string(),
                timed_out: false,
            }
        );
    }

    #[test]
    fn test_redact_hides_secret() {
        assert_eq!(redact("bad key sk-123 rejected", "sk-123"), "bad key [REDACTED] rejected");
        assert_eq!(redact("nothing here", ""), "nothing here");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let generator = RigGenerator::new(Duration::from_secs(1));
        let outcome = generator.generate(&settings(""), "prompt").await;
        assert!(matches!(outcome, GenerationOutcome::AuthFailure { .. }));
    }

    #[tokio::test]
    async fn test_unknown_provider_is_auth_failure() {
        let generator = RigGenerator::new(Duration::from_secs(1));
        let mut s = settings("key");
        s.provider = "watsonx".to_string();
        let outcome = generator.generate(&s, "prompt").await;
        assert!(matches!(outcome, GenerationOutcome::AuthFailure { .. }));
    }

    #[test]
    fn test_gate_halt_and_reconfigure() {
        let gate = GenerationGate::new(settings("old"));
        assert!(gate.halt_reason().is_none());

        gate.halt("API key not valid");
        let status = gate.status();
        assert!(status.generation_halted);
        assert_eq!(status.halt_reason.as_deref(), Some("API key not valid"));

        let updated = gate.reconfigure(SettingsUpdate {
            provider: Some("Google".to_string()),
            api_key: Some("new".to_string()),
            ..Default::default()
        });
        assert_eq!(updated.provider, "gemini");
        assert_eq!(updated.api_key, "new");
        assert_eq!(updated.model, "gemini-2.5-flash-lite");
        assert!(gate.halt_reason().is_none());
    }
}
