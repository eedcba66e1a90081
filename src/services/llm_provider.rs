use anyhow::{Context, Result};
use rig::client::completion::CompletionClientDyn;
use rig::client::{ProviderClient, ProviderValue};
use rig::providers::{anthropic, deepseek, gemini, groq, mistral, ollama, openai, openrouter};

/// Providers accepted by `create_completion_client`.
pub const SUPPORTED_PROVIDERS: &[&str] = &[
    "gemini",
    "openai",
    "anthropic",
    "groq",
    "deepseek",
    "mistral",
    "openrouter",
    "ollama",
];

/// Providers that run locally and accept requests without an API key.
const KEYLESS_PROVIDERS: &[&str] = &["ollama"];

pub fn normalize_provider(provider: &str) -> String {
    match provider.trim().to_lowercase().as_str() {
        "google" => "gemini".to_string(),
        other => other.to_string(),
    }
}

pub fn is_supported(provider: &str) -> bool {
    SUPPORTED_PROVIDERS.contains(&normalize_provider(provider).as_str())
}

pub fn requires_api_key(provider: &str) -> bool {
    !KEYLESS_PROVIDERS.contains(&normalize_provider(provider).as_str())
}

fn create_provider_boxed(provider: &str, api_key: &str) -> Result<Box<dyn ProviderClient>> {
    let value = ProviderValue::Simple(api_key.to_string());

    let boxed: Box<dyn ProviderClient> = match normalize_provider(provider).as_str() {
        "gemini" => {
            let c: gemini::Client<reqwest::Client> = gemini::Client::from_val(value);
            c.boxed()
        }
        "openai" => {
            let c: openai::Client<reqwest::Client> = openai::Client::from_val(value);
            c.boxed()
        }
        "anthropic" => {
            let c: anthropic::Client<reqwest::Client> = anthropic::Client::from_val(value);
            c.boxed()
        }
        "groq" => {
            let c: groq::Client<reqwest::Client> = groq::Client::from_val(value);
            c.boxed()
        }
        "deepseek" => {
            let c: deepseek::Client<reqwest::Client> = deepseek::Client::from_val(value);
            c.boxed()
        }
        "mistral" => {
            let c: mistral::Client<reqwest::Client> = mistral::Client::from_val(value);
            c.boxed()
        }
        "openrouter" => {
            let c: openrouter::Client<reqwest::Client> = openrouter::Client::from_val(value);
            c.boxed()
        }
        "ollama" => {
            let c: ollama::Client<reqwest::Client> = ollama::Client::from_val(value);
            c.boxed()
        }
        other => return Err(anyhow::anyhow!("Unsupported provider: {other}")),
    };

    Ok(boxed)
}

pub fn create_completion_client(
    provider: &str,
    api_key: &str,
) -> Result<Box<dyn CompletionClientDyn>> {
    let boxed = create_provider_boxed(provider, api_key)?;
    boxed
        .as_completion()
        .context(format!("Provider '{provider}' does not support completions"))
}
