use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use docforge_types::provider::{ModelInfo, ProviderInfo};

use crate::error::{classify_status, classify_transport_error, LlmError};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub url: Option<String>,
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    pub default_provider: Option<String>,
    /// Whether a zero-provider configuration is allowed to fall back to the
    /// local echo provider instead of leaving the manager with nothing to
    /// call. Off by default: a misconfigured deployment should surface as
    /// every stage failing with `AllProvidersFailed`, not a silent "success".
    #[serde(default)]
    pub allow_local_echo_fallback: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// A single upstream model provider. `complete` and `embed` are the only
/// two operations the pipeline actually drives; everything agent- and
/// chunking-related is built on top of these.
#[async_trait]
pub trait Provider: Send + Sync {
    fn info(&self) -> ProviderInfo;
    async fn complete(&self, prompt: &str, model_override: Option<&str>) -> Result<Completion, LlmError>;
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Err(LlmError::ClientError {
            status: 501,
            detail: format!("provider `{}` does not support embeddings", self.info().id),
        })
    }
}

pub fn build_providers(config: &AppConfig) -> Vec<std::sync::Arc<dyn Provider>> {
    let mut providers: Vec<std::sync::Arc<dyn Provider>> = Vec::new();

    add_openai_provider(
        config,
        &mut providers,
        "openai",
        "OpenAI",
        "https://api.openai.com/v1",
        "gpt-4o-mini",
    );
    add_openai_provider(
        config,
        &mut providers,
        "openrouter",
        "OpenRouter",
        "https://openrouter.ai/api/v1",
        "openai/gpt-4o-mini",
    );
    add_openai_provider(
        config,
        &mut providers,
        "groq",
        "Groq",
        "https://api.groq.com/openai/v1",
        "llama-3.1-8b-instant",
    );

    if let Some(anthropic) = config.providers.get("anthropic") {
        if let Some(api_key) = resolve_api_key(anthropic, "ANTHROPIC_API_KEY") {
            providers.push(std::sync::Arc::new(AnthropicProvider {
                api_key,
                default_model: anthropic
                    .default_model
                    .clone()
                    .unwrap_or_else(|| "claude-sonnet-4-6".to_string()),
                client: Client::new(),
            }));
        } else {
            tracing::warn!("anthropic provider configured but no credential was resolved; skipping registration");
        }
    }
    if let Some(cohere) = config.providers.get("cohere") {
        if let Some(api_key) = resolve_api_key(cohere, "COHERE_API_KEY") {
            providers.push(std::sync::Arc::new(CohereProvider {
                api_key,
                base_url: cohere
                    .url
                    .clone()
                    .unwrap_or_else(|| "https://api.cohere.com/v2".to_string()),
                default_model: cohere
                    .default_model
                    .clone()
                    .unwrap_or_else(|| "command-r-plus".to_string()),
                embed_model: "embed-english-v3.0".to_string(),
                client: Client::new(),
            }));
        } else {
            tracing::warn!("cohere provider configured but no credential was resolved; skipping registration");
        }
    }

    if providers.is_empty() {
        if config.allow_local_echo_fallback {
            tracing::warn!("no LLM providers configured; falling back to the local echo provider because allow_local_echo_fallback is set");
            providers.push(std::sync::Arc::new(LocalEchoProvider));
        } else {
            tracing::warn!("no LLM providers configured; the provider manager has zero providers and every call will fail over to nothing");
        }
    }

    providers
}

fn resolve_api_key(entry: &ProviderConfig, env_name: &str) -> Option<String> {
    entry
        .api_key
        .as_deref()
        .filter(|key| !is_placeholder_api_key(key))
        .map(|key| key.to_string())
        .or_else(|| std::env::var(env_name).ok().filter(|v| !v.trim().is_empty()))
}

/// Only registers the provider when a usable credential was actually
/// resolved; a configured-but-credential-less entry is silently skipped
/// rather than registered to fail every call.
fn add_openai_provider(
    config: &AppConfig,
    providers: &mut Vec<std::sync::Arc<dyn Provider>>,
    id: &str,
    name: &str,
    default_url: &str,
    default_model: &str,
) {
    let Some(entry) = config.providers.get(id) else {
        return;
    };
    let env_name = format!("{}_API_KEY", id.to_ascii_uppercase());
    let Some(api_key) = resolve_api_key(entry, &env_name) else {
        tracing::warn!(provider = id, "provider configured but no credential was resolved; skipping registration");
        return;
    };
    providers.push(std::sync::Arc::new(OpenAICompatibleProvider {
        id: id.to_string(),
        name: name.to_string(),
        base_url: entry.url.clone().unwrap_or_else(|| default_url.to_string()),
        api_key: Some(api_key),
        default_model: entry
            .default_model
            .clone()
            .unwrap_or_else(|| default_model.to_string()),
        client: Client::new(),
    }));
}

fn is_placeholder_api_key(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("x")
        || trimmed.eq_ignore_ascii_case("placeholder")
}

fn extract_openai_text(value: &serde_json::Value) -> Option<String> {
    value["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
}

fn extract_openai_error(value: &serde_json::Value) -> Option<String> {
    value["error"]["message"].as_str().map(str::to_string)
}

fn extract_usage(value: &serde_json::Value) -> Option<TokenUsage> {
    let usage = value.get("usage")?;
    Some(TokenUsage {
        prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or_default(),
        completion_tokens: usage["completion_tokens"].as_u64().unwrap_or_default(),
        total_tokens: usage["total_tokens"].as_u64().unwrap_or_default(),
    })
}

fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}

struct LocalEchoProvider;

#[async_trait]
impl Provider for LocalEchoProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: "local".to_string(),
            name: "Local Echo".to_string(),
            models: vec![ModelInfo {
                id: "echo-1".to_string(),
                provider_id: "local".to_string(),
                display_name: "Echo Model".to_string(),
                context_window: 8192,
            }],
        }
    }

    async fn complete(&self, prompt: &str, _model_override: Option<&str>) -> Result<Completion, LlmError> {
        Ok(Completion {
            text: format!("Echo: {prompt}"),
            usage: None,
        })
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
    }
}

struct OpenAICompatibleProvider {
    id: String,
    name: String,
    base_url: String,
    api_key: Option<String>,
    default_model: String,
    client: Client,
}

#[async_trait]
impl Provider for OpenAICompatibleProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            models: vec![ModelInfo {
                id: self.default_model.clone(),
                provider_id: self.id.clone(),
                display_name: self.default_model.clone(),
                context_window: 128_000,
            }],
        }
    }

    async fn complete(&self, prompt: &str, model_override: Option<&str>) -> Result<Completion, LlmError> {
        let model = model_override
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str());
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut req = self.client.post(url).json(&json!({
            "model": model,
            "messages": [{"role":"user","content": prompt}],
            "stream": false,
        }));
        if self.id == "openrouter" {
            req = req
                .header("HTTP-Referer", "https://docforge.dev")
                .header("X-Title", "docforge");
        }
        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key);
        }
        let response = req.send().await.map_err(classify_transport_error)?;
        let status = response.status();
        let value: serde_json::Value = response.json().await.map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        if !status.is_success() {
            let detail = extract_openai_error(&value)
                .unwrap_or_else(|| format!("provider request failed with status {}", status));
            return Err(classify_status(status, detail));
        }
        if let Some(detail) = extract_openai_error(&value) {
            return Err(LlmError::ClientError { status: status.as_u16(), detail });
        }
        let Some(text) = extract_openai_text(&value) else {
            let body_preview = truncate_for_error(&value.to_string(), 500);
            return Err(LlmError::MalformedResponse(format!(
                "provider returned no completion content for model `{}` (response: {})",
                model, body_preview
            )));
        };
        Ok(Completion {
            text,
            usage: extract_usage(&value),
        })
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let mut req = self.client.post(url).json(&json!({
            "model": "text-embedding-3-small",
            "input": texts,
        }));
        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key);
        }
        let response = req.send().await.map_err(classify_transport_error)?;
        let status = response.status();
        let value: serde_json::Value = response.json().await.map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        if let Some(detail) = extract_openai_error(&value) {
            return Err(classify_status(status, detail));
        }
        if !status.is_success() {
            return Err(classify_status(status, format!("embedding request failed with status {status}")));
        }
        let data = value["data"]
            .as_array()
            .ok_or_else(|| LlmError::MalformedResponse("embedding response missing `data` array".to_string()))?;
        data.iter()
            .map(|entry| {
                entry["embedding"]
                    .as_array()
                    .ok_or_else(|| LlmError::MalformedResponse("embedding entry missing `embedding` array".to_string()))
                    .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
            })
            .collect()
    }
}

struct AnthropicProvider {
    api_key: String,
    default_model: String,
    client: Client,
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: "anthropic".to_string(),
            name: "Anthropic".to_string(),
            models: vec![ModelInfo {
                id: self.default_model.clone(),
                provider_id: "anthropic".to_string(),
                display_name: self.default_model.clone(),
                context_window: 200_000,
            }],
        }
    }

    async fn complete(&self, prompt: &str, model_override: Option<&str>) -> Result<Completion, LlmError> {
        let model = model_override
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str());
        let req = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("anthropic-version", "2023-06-01")
            .header("x-api-key", &self.api_key)
            .json(&json!({
                "model": model,
                "max_tokens": 4096,
                "messages": [{"role":"user","content": prompt}],
            }));
        let response = req.send().await.map_err(classify_transport_error)?;
        let status = response.status();
        let value: serde_json::Value = response.json().await.map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        if let Some(message) = value["error"]["message"].as_str() {
            return Err(classify_status(status, message.to_string()));
        }
        if !status.is_success() {
            return Err(classify_status(status, format!("anthropic request failed with status {status}")));
        }
        let text = value["content"][0]["text"]
            .as_str()
            .ok_or_else(|| LlmError::MalformedResponse("anthropic response missing content".to_string()))?
            .to_string();
        Ok(Completion { text, usage: None })
    }
}

struct CohereProvider {
    api_key: String,
    base_url: String,
    default_model: String,
    embed_model: String,
    client: Client,
}

#[async_trait]
impl Provider for CohereProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: "cohere".to_string(),
            name: "Cohere".to_string(),
            models: vec![ModelInfo {
                id: self.default_model.clone(),
                provider_id: "cohere".to_string(),
                display_name: self.default_model.clone(),
                context_window: 128_000,
            }],
        }
    }

    async fn complete(&self, prompt: &str, model_override: Option<&str>) -> Result<Completion, LlmError> {
        let model = model_override
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str());
        let url = format!("{}/chat", self.base_url.trim_end_matches('/'));
        let req = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": model,
                "messages": [{"role":"user","content": prompt}],
            }));
        let response = req.send().await.map_err(classify_transport_error)?;
        let status = response.status();
        let value: serde_json::Value = response.json().await.map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        if let Some(message) = value["message"].as_str() {
            return Err(classify_status(status, message.to_string()));
        }
        if !status.is_success() {
            return Err(classify_status(status, format!("cohere request failed with status {status}")));
        }
        let text = value["message"]["content"][0]["text"]
            .as_str()
            .ok_or_else(|| LlmError::MalformedResponse("cohere response missing content".to_string()))?
            .to_string();
        Ok(Completion { text, usage: None })
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!("{}/embed", self.base_url.trim_end_matches('/'));
        let req = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.embed_model,
                "texts": texts,
                "input_type": "search_document",
                "embedding_types": ["float"],
            }));
        let response = req.send().await.map_err(classify_transport_error)?;
        let status = response.status();
        let value: serde_json::Value = response.json().await.map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        if !status.is_success() {
            let detail = value["message"].as_str().unwrap_or("embed request failed").to_string();
            return Err(classify_status(status, detail));
        }
        let embeddings = value["embeddings"]["float"]
            .as_array()
            .ok_or_else(|| LlmError::MalformedResponse("cohere embed response missing `embeddings.float`".to_string()))?;
        embeddings
            .iter()
            .map(|entry| {
                entry
                    .as_array()
                    .ok_or_else(|| LlmError::MalformedResponse("cohere embedding entry was not an array".to_string()))
                    .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_api_keys_are_rejected() {
        assert!(is_placeholder_api_key(""));
        assert!(is_placeholder_api_key("  "));
        assert!(is_placeholder_api_key("x"));
        assert!(is_placeholder_api_key("placeholder"));
        assert!(!is_placeholder_api_key("sk-real-looking-key"));
    }

    #[test]
    fn resolve_api_key_ignores_a_placeholder_and_falls_back_to_env() {
        let entry = ProviderConfig {
            api_key: Some("placeholder".to_string()),
            url: None,
            default_model: None,
        };
        std::env::set_var("DOCFORGE_TEST_RESOLVE_KEY", "sk-from-env");
        assert_eq!(resolve_api_key(&entry, "DOCFORGE_TEST_RESOLVE_KEY"), Some("sk-from-env".to_string()));
        std::env::remove_var("DOCFORGE_TEST_RESOLVE_KEY");
    }

    #[test]
    fn resolve_api_key_is_none_without_a_usable_credential() {
        let entry = ProviderConfig::default();
        std::env::remove_var("DOCFORGE_TEST_MISSING_KEY");
        assert_eq!(resolve_api_key(&entry, "DOCFORGE_TEST_MISSING_KEY"), None);
    }

    #[test]
    fn build_providers_skips_entries_with_no_resolved_credential() {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderConfig {
                api_key: Some("placeholder".to_string()),
                url: None,
                default_model: None,
            },
        );
        std::env::remove_var("OPENAI_API_KEY");
        let config = AppConfig {
            providers,
            default_provider: None,
            allow_local_echo_fallback: false,
        };
        let built = build_providers(&config);
        assert!(built.is_empty());
    }

    #[test]
    fn build_providers_registers_a_configured_credentialed_provider() {
        let mut providers = HashMap::new();
        providers.insert(
            "openai".to_string(),
            ProviderConfig {
                api_key: Some("sk-real-key".to_string()),
                url: None,
                default_model: None,
            },
        );
        let config = AppConfig {
            providers,
            default_provider: None,
            allow_local_echo_fallback: false,
        };
        let built = build_providers(&config);
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].info().id, "openai");
    }

    #[test]
    fn build_providers_is_empty_without_echo_fallback_enabled() {
        let config = AppConfig::default();
        assert!(build_providers(&config).is_empty());
    }

    #[tokio::test]
    async fn echo_provider_only_registers_when_fallback_is_enabled() {
        let config = AppConfig {
            allow_local_echo_fallback: true,
            ..AppConfig::default()
        };
        let built = build_providers(&config);
        assert_eq!(built.len(), 1);
        let completion = built[0].complete("hi", None).await.unwrap();
        assert_eq!(completion.text, "Echo: hi");
    }
}
