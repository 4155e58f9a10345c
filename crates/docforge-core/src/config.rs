use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::fs;
use tokio::sync::RwLock;

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
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            burst: 10,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ConfigLayers {
    global: Value,
    tenant: Value,
    env: Value,
    runtime: Value,
}

/// Layered JSON config: `global < tenant < env < runtime`, later layers win.
/// Secrets present as an env var of the matching name are never persisted
/// back to disk, so restarting with the env var unset reveals the gap
/// rather than silently reusing a stale key.
#[derive(Clone)]
pub struct ConfigStore {
    tenant_path: PathBuf,
    global_path: PathBuf,
    layers: Arc<RwLock<ConfigLayers>>,
}

impl ConfigStore {
    pub async fn new(tenant_config_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let tenant_path = tenant_config_path.as_ref().to_path_buf();
        if let Some(parent) = tenant_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let global_path = resolve_global_config_path().await?;

        let mut global = read_json_file(&global_path)
            .await
            .unwrap_or_else(|_| empty_object());
        let mut tenant = read_json_file(&tenant_path)
            .await
            .unwrap_or_else(|_| empty_object());

        scrub_persisted_secrets(&mut global, Some(&global_path)).await?;
        scrub_persisted_secrets(&mut tenant, Some(&tenant_path)).await?;

        let layers = ConfigLayers {
            global,
            tenant,
            env: env_layer(),
            runtime: empty_object(),
        };

        let store = Self {
            tenant_path,
            global_path,
            layers: Arc::new(RwLock::new(layers)),
        };
        store.save_tenant().await?;
        store.save_global().await?;
        Ok(store)
    }

    pub async fn get(&self) -> AppConfig {
        let merged = self.get_effective_value().await;
        serde_json::from_value(merged).unwrap_or_default()
    }

    pub async fn get_effective_value(&self) -> Value {
        let layers = self.layers.read().await.clone();
        let mut merged = empty_object();
        deep_merge(&mut merged, &layers.global);
        deep_merge(&mut merged, &layers.tenant);
        deep_merge(&mut merged, &layers.env);
        deep_merge(&mut merged, &layers.runtime);
        merged
    }

    pub async fn patch_tenant(&self, patch: Value) -> anyhow::Result<Value> {
        {
            let mut layers = self.layers.write().await;
            deep_merge(&mut layers.tenant, &patch);
        }
        self.save_tenant().await?;
        Ok(self.get_effective_value().await)
    }

    pub async fn patch_runtime(&self, patch: Value) -> anyhow::Result<Value> {
        {
            let mut layers = self.layers.write().await;
            deep_merge(&mut layers.runtime, &patch);
        }
        Ok(self.get_effective_value().await)
    }

    async fn save_tenant(&self) -> anyhow::Result<()> {
        let snapshot = self.layers.read().await.tenant.clone();
        write_json_file(&self.tenant_path, &snapshot).await
    }

    async fn save_global(&self) -> anyhow::Result<()> {
        let snapshot = self.layers.read().await.global.clone();
        write_json_file(&self.global_path, &snapshot).await
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

async fn write_json_file(path: &Path, value: &Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut to_write = value.clone();
    strip_persisted_secrets(&mut to_write);
    let raw = serde_json::to_string_pretty(&to_write)?;
    fs::write(path, raw).await?;
    Ok(())
}

fn strip_persisted_secrets(value: &mut Value) {
    if let Value::Object(root) = value {
        let Some(providers) = root.get_mut("providers").and_then(|v| v.as_object_mut()) else {
            return;
        };
        for (provider_id, provider_cfg) in providers.iter_mut() {
            let Value::Object(cfg) = provider_cfg else {
                continue;
            };
            if !cfg.contains_key("api_key") {
                continue;
            }
            if provider_has_runtime_secret(provider_id) {
                cfg.remove("api_key");
            }
        }
    }
}

async fn scrub_persisted_secrets(value: &mut Value, path: Option<&Path>) -> anyhow::Result<()> {
    let before = value.clone();
    strip_persisted_secrets(value);
    if *value != before {
        if let Some(target) = path {
            write_json_file(target, value).await?;
        }
    }
    Ok(())
}

fn provider_has_runtime_secret(provider_id: &str) -> bool {
    provider_env_candidates(provider_id).into_iter().any(|key| {
        std::env::var(&key)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    })
}

fn provider_env_candidates(provider_id: &str) -> Vec<String> {
    let normalized = provider_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_ascii_uppercase();

    let mut out = vec![format!("{}_API_KEY", normalized)];

    match provider_id.to_ascii_lowercase().as_str() {
        "openai" => out.push("OPENAI_API_KEY".to_string()),
        "anthropic" => out.push("ANTHROPIC_API_KEY".to_string()),
        "cohere" => out.push("COHERE_API_KEY".to_string()),
        _ => {}
    }

    out.sort();
    out.dedup();
    out
}

async fn read_json_file(path: &Path) -> anyhow::Result<Value> {
    if !path.exists() {
        return Ok(empty_object());
    }
    let raw = fs::read_to_string(path).await?;
    Ok(serde_json::from_str::<Value>(&raw).unwrap_or_else(|_| empty_object()))
}

async fn resolve_global_config_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var("DOCFORGE_GLOBAL_CONFIG") {
        let path = PathBuf::from(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        return Ok(path);
    }
    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("docforge").join("config.json");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        return Ok(path);
    }
    Ok(PathBuf::from(".docforge/global_config.json"))
}

fn env_layer() -> Value {
    let mut root = empty_object();

    if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
        deep_merge(
            &mut root,
            &json!({
                "providers": {
                    "openai": {
                        "api_key": api_key,
                        "url": "https://api.openai.com/v1",
                        "default_model": "gpt-5.2"
                    }
                }
            }),
        );
    }
    if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
        deep_merge(
            &mut root,
            &json!({
                "providers": {
                    "anthropic": {
                        "api_key": api_key,
                        "url": "https://api.anthropic.com/v1",
                        "default_model": "claude-sonnet-4-6"
                    }
                }
            }),
        );
    }
    if let Ok(api_key) = std::env::var("COHERE_API_KEY") {
        deep_merge(
            &mut root,
            &json!({
                "providers": {
                    "cohere": {
                        "api_key": api_key,
                        "url": "https://api.cohere.com/v2",
                        "default_model": "command-r-plus"
                    }
                }
            }),
        );
    }

    root
}

fn deep_merge(base: &mut Value, overlay: &Value) {
    if overlay.is_null() {
        return;
    }
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    continue;
                }
                match base_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value.clone();
        }
    }
}

impl From<ProviderConfig> for docforge_providers::ProviderConfig {
    fn from(value: ProviderConfig) -> Self {
        Self {
            api_key: value.api_key,
            url: value.url,
            default_model: value.default_model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        path.push(format!("docforge-core-config-{name}-{ts}.json"));
        path
    }

    #[test]
    fn strip_persisted_secrets_keeps_keys_without_runtime_env() {
        let mut value = json!({
            "providers": {
                "openai": { "api_key": "sk-test", "url": "https://api.openai.com/v1" }
            }
        });

        strip_persisted_secrets(&mut value);

        assert!(value
            .get("providers")
            .and_then(|v| v.get("openai"))
            .and_then(Value::as_object)
            .is_some_and(|obj| obj.contains_key("api_key")));
    }

    #[test]
    fn strip_persisted_secrets_removes_keys_with_runtime_env() {
        std::env::set_var("OPENAI_API_KEY", "sk-runtime");

        let mut value = json!({
            "providers": {
                "openai": { "api_key": "sk-test" }
            }
        });

        strip_persisted_secrets(&mut value);

        assert!(value
            .get("providers")
            .and_then(|v| v.get("openai"))
            .and_then(Value::as_object)
            .is_some_and(|obj| !obj.contains_key("api_key")));

        std::env::remove_var("OPENAI_API_KEY");
    }

    #[tokio::test]
    async fn patch_tenant_round_trips_through_disk() {
        let path = unique_temp_file("patch");
        let store = ConfigStore::new(&path).await.expect("store");
        store
            .patch_tenant(json!({ "default_provider": "anthropic" }))
            .await
            .expect("patch");
        let effective = store.get().await;
        assert_eq!(effective.default_provider.as_deref(), Some("anthropic"));
        let _ = fs::remove_file(&path).await;
    }
}
