//! Process-wide configuration and the assembled `AppState` every handler
//! is given through axum's `State` extractor.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::AtomicI64;
use std::sync::Arc;

use docforge_agents::AgentExecutor;
use docforge_core::{ConfigStore, TokenIssuer};
use docforge_documents::DocumentRepository;
use docforge_export::{ExportRepository, ExportService};
use docforge_kv::{KvBackend, MemoryStore, RateLimiter, RedisStore, TokenBlacklist};
use docforge_orchestrator::{ExecutionLog, ProgressRegistry, WorkflowEngine};
use docforge_providers::ProviderManager;
use docforge_streaming::{BroadcastProgressSink, StreamRegistry};
use docforge_vector::{EmbeddingRoute, VectorStore};

use crate::accounts::AccountRepository;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub redis_url: Option<String>,
    pub embedding_provider_id: String,
    pub embedding_dimension: usize,
    pub allow_local_echo_fallback: bool,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = std::env::var("DOCFORGE_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()?;
        let data_dir = std::env::var("DOCFORGE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let jwt_secret = std::env::var("DOCFORGE_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("DOCFORGE_JWT_SECRET is unset, generating an ephemeral secret for this process only");
            uuid::Uuid::new_v4().to_string()
        });
        let redis_url = std::env::var("DOCFORGE_REDIS_URL").ok();
        let embedding_provider_id = std::env::var("DOCFORGE_EMBEDDING_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let embedding_dimension = std::env::var("DOCFORGE_EMBEDDING_DIMENSION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1536);
        let allow_local_echo_fallback = std::env::var("DOCFORGE_ALLOW_LOCAL_ECHO_FALLBACK")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);

        Ok(Self {
            bind_addr,
            data_dir,
            jwt_secret,
            redis_url,
            embedding_provider_id,
            embedding_dimension,
            allow_local_echo_fallback,
        })
    }
}

#[derive(Default)]
pub struct BlacklistStats {
    pub blacklisted_tokens: AtomicI64,
    pub blacklisted_users: AtomicI64,
}

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountRepository,
    pub documents: DocumentRepository,
    pub executions: ExecutionLog,
    pub exports: Arc<ExportService>,
    pub workflow: Arc<WorkflowEngine>,
    pub streaming: Arc<StreamRegistry>,
    pub progress: Arc<ProgressRegistry>,
    pub providers: Arc<ProviderManager>,
    pub config: ConfigStore,
    pub token_issuer: Arc<TokenIssuer>,
    pub token_blacklist: Arc<TokenBlacklist<KvBackend>>,
    pub rate_limiter: Arc<RateLimiter<KvBackend>>,
    pub blacklist_stats: Arc<BlacklistStats>,
}

impl AppState {
    pub async fn bootstrap(config: &ServerConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let exports_dir = config.data_dir.join("exports");
        std::fs::create_dir_all(&exports_dir)?;

        let config_store = ConfigStore::new(config.data_dir.join("tenant_config.json")).await?;
        let effective = config_store.get().await;
        let provider_config = docforge_providers::AppConfig {
            providers: effective
                .providers
                .into_iter()
                .map(|(id, cfg)| (id, cfg.into()))
                .collect(),
            default_provider: effective.default_provider,
            allow_local_echo_fallback: config.allow_local_echo_fallback,
        };
        let providers = ProviderManager::new(provider_config);

        let vectors = VectorStore::new(
            &config.data_dir.join("vectors.sqlite3"),
            config.embedding_dimension,
            Arc::new(providers.clone()),
            EmbeddingRoute {
                provider_id: config.embedding_provider_id.clone(),
            },
        )
        .await?;

        let documents = DocumentRepository::new(&config.data_dir.join("documents.sqlite3")).await?;
        let executions = ExecutionLog::new(&config.data_dir.join("executions.sqlite3"))?;
        let accounts = AccountRepository::new(&config.data_dir.join("accounts.sqlite3")).await?;
        let export_repository = Arc::new(ExportRepository::new(&config.data_dir.join("exports.sqlite3"))?);
        let exports = Arc::new(ExportService::new(
            export_repository,
            Arc::new(documents.clone()),
            exports_dir,
        ));

        let progress = Arc::new(ProgressRegistry::new());
        let streaming = Arc::new(StreamRegistry::new());
        progress.subscribe(Arc::new(BroadcastProgressSink::new(streaming.clone()))).await;

        let executor = AgentExecutor::new(providers.clone());
        let workflow = Arc::new(WorkflowEngine::new(executor, documents.clone(), vectors, executions.clone(), progress.clone()));

        let token_issuer = Arc::new(TokenIssuer::new(config.jwt_secret.as_bytes()));

        let kv_store: Arc<KvBackend> = match &config.redis_url {
            Some(url) => Arc::new(KvBackend::Redis(RedisStore::connect(url).await?)),
            None => {
                tracing::warn!("DOCFORGE_REDIS_URL is unset, using an in-process kv store that does not survive restarts");
                Arc::new(KvBackend::Memory(MemoryStore::new()))
            }
        };
        let token_blacklist = Arc::new(TokenBlacklist::new(kv_store.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(kv_store));

        Ok(Self {
            accounts,
            documents,
            executions,
            exports,
            workflow,
            streaming,
            progress,
            providers: Arc::new(providers),
            config: config_store,
            token_issuer,
            token_blacklist,
            rate_limiter,
            blacklist_stats: Arc::new(BlacklistStats::default()),
        })
    }
}
