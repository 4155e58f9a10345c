use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use crate::breaker::{BreakerState, CircuitBreaker};
use crate::error::LlmError;
use crate::provider::{build_providers, AppConfig, Completion, Provider};
use crate::retry::with_retry;
use docforge_types::provider::ProviderInfo;

const BREAKER_FAILURE_THRESHOLD: u32 = 5;
const BREAKER_SUCCESS_THRESHOLD: u32 = 2;
const BREAKER_COOLDOWN: Duration = Duration::from_secs(30);

struct Entry {
    provider: Arc<dyn Provider>,
    breaker: CircuitBreaker,
}

/// Registry of configured providers with per-provider circuit breakers,
/// bounded retry on each call, and ordered failover across providers when
/// the caller doesn't pin one.
#[derive(Clone)]
pub struct ProviderManager {
    entries: Arc<RwLock<Vec<Arc<Entry>>>>,
    default_provider: Arc<RwLock<Option<String>>>,
}

impl ProviderManager {
    pub fn new(config: AppConfig) -> Self {
        let entries = build_entries(&config);
        Self {
            entries: Arc::new(RwLock::new(entries)),
            default_provider: Arc::new(RwLock::new(config.default_provider)),
        }
    }

    pub async fn reload(&self, config: AppConfig) {
        *self.entries.write().await = build_entries(&config);
        *self.default_provider.write().await = config.default_provider;
    }

    pub async fn list(&self) -> Vec<ProviderInfo> {
        self.entries
            .read()
            .await
            .iter()
            .map(|e| e.provider.info())
            .collect()
    }

    /// Per-provider breaker state, for the agents health endpoint. Does not
    /// itself probe anything or mutate breaker state, just reports it.
    pub async fn health(&self) -> Vec<ProviderHealth> {
        self.entries
            .read()
            .await
            .iter()
            .map(|e| ProviderHealth {
                id: e.provider.info().id,
                name: e.provider.info().name,
                state: e.breaker.state(),
            })
            .collect()
    }

    /// Completes against `provider_id` if given, else the configured
    /// default, else the first available provider. Each attempt is wrapped
    /// in bounded retry; the circuit breaker gates whether a call is even
    /// attempted.
    pub async fn complete(
        &self,
        provider_id: Option<&str>,
        prompt: &str,
        model_id: Option<&str>,
    ) -> Result<Completion, LlmError> {
        if let Some(id) = provider_id {
            return self.complete_with_breaker(id, prompt, model_id).await;
        }
        self.complete_with_failover(prompt, model_id).await
    }

    /// Tries every configured provider in order, skipping any whose
    /// breaker is open, returning the first success. Used when the caller
    /// has no provider preference, so an outage on one vendor doesn't fail
    /// the whole pipeline stage. Every provider's failure is kept, not just
    /// the last one, so the aggregate error is actually diagnosable.
    async fn complete_with_failover(
        &self,
        prompt: &str,
        model_id: Option<&str>,
    ) -> Result<Completion, LlmError> {
        let order = self.ordered_ids().await;
        if order.is_empty() {
            return Err(LlmError::NotConfigured("<default>".to_string(), String::new()));
        }
        let mut failures = Vec::with_capacity(order.len());
        for id in &order {
            match self.complete_with_breaker(id, prompt, model_id).await {
                Ok(completion) => return Ok(completion),
                Err(err) => {
                    warn!(provider = %id, error = %err, "provider failed, trying next");
                    failures.push(format!("{id}: {err}"));
                }
            }
        }
        Err(LlmError::AllProvidersFailed(failures.join("; ")))
    }

    async fn ordered_ids(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let default_id = self.default_provider.read().await.clone();
        let mut ids: Vec<String> = entries.iter().map(|e| e.provider.info().id).collect();
        if let Some(default_id) = default_id {
            if let Some(pos) = ids.iter().position(|id| id == &default_id) {
                let preferred = ids.remove(pos);
                ids.insert(0, preferred);
            }
        }
        ids
    }

    async fn find_entry(&self, id: &str) -> Result<Arc<Entry>, LlmError> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .find(|e| e.provider.info().id == id)
            .cloned()
            .ok_or_else(|| {
                let available = entries
                    .iter()
                    .map(|e| e.provider.info().id)
                    .collect::<Vec<_>>()
                    .join(", ");
                LlmError::NotConfigured(id.to_string(), available)
            })
    }

    async fn complete_with_breaker(
        &self,
        id: &str,
        prompt: &str,
        model_id: Option<&str>,
    ) -> Result<Completion, LlmError> {
        let entry = self.find_entry(id).await?;
        if !entry.breaker.allow_request() {
            return Err(LlmError::CircuitOpen(id.to_string()));
        }
        let result = with_retry(|| entry.provider.complete(prompt, model_id)).await;
        match &result {
            Ok(_) => entry.breaker.record_success(),
            Err(_) => entry.breaker.record_failure(),
        }
        result
    }

    pub async fn embed(&self, provider_id: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let entry = self.find_entry(provider_id).await?;
        if !entry.breaker.allow_request() {
            return Err(LlmError::CircuitOpen(provider_id.to_string()));
        }
        let provider = entry.provider.clone();
        let owned = texts.to_vec();
        let result = with_retry(|| {
            let provider = provider.clone();
            let owned = owned.clone();
            async move { provider.embed(&owned).await }
        })
        .await;
        match &result {
            Ok(_) => entry.breaker.record_success(),
            Err(_) => entry.breaker.record_failure(),
        }
        result
    }
}

fn build_entries(config: &AppConfig) -> Vec<Arc<Entry>> {
    build_providers(config)
        .into_iter()
        .map(|provider| {
            Arc::new(Entry {
                provider,
                breaker: CircuitBreaker::new(BREAKER_FAILURE_THRESHOLD, BREAKER_SUCCESS_THRESHOLD, BREAKER_COOLDOWN),
            })
        })
        .collect()
}

pub type ProviderMap = HashMap<String, Arc<dyn Provider>>;

#[derive(Debug, Clone)]
pub struct ProviderHealth {
    pub id: String,
    pub name: String,
    pub state: BreakerState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_configured_providers_and_no_echo_fallback_fails_with_not_configured() {
        let manager = ProviderManager::new(AppConfig::default());
        let err = manager.complete(None, "hello", None).await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured(_, _)));
    }

    #[tokio::test]
    async fn echo_fallback_answers_when_explicitly_enabled() {
        let config = AppConfig {
            allow_local_echo_fallback: true,
            ..AppConfig::default()
        };
        let manager = ProviderManager::new(config);
        let completion = manager.complete(None, "hello", None).await.unwrap();
        assert!(completion.text.contains("hello"));
    }

    #[tokio::test]
    async fn unknown_provider_id_returns_descriptive_error() {
        let manager = ProviderManager::new(AppConfig::default());
        let err = manager
            .complete(Some("not-configured"), "hi", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not-configured"));
    }
}
