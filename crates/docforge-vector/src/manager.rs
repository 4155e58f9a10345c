use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use docforge_providers::ProviderManager;
use docforge_types::execution::Stage;
use docforge_types::vector::{PointType, Visibility};
use docforge_types::CorrelationId;
use uuid::Uuid;

use crate::chunking::{chunk_text, ChunkingConfig};
use crate::db::VectorDatabase;
use crate::types::{SearchFilters, VectorError, VectorPoint, VectorResult, VectorSearchResult};

/// Which provider/model produces embeddings. Embeddings now always come
/// from a remote provider call batched through `ProviderManager`, never
/// from a locally loaded model.
#[derive(Clone)]
pub struct EmbeddingRoute {
    pub provider_id: String,
}

#[derive(Clone)]
pub struct VectorStore {
    db: VectorDatabase,
    providers: Arc<ProviderManager>,
    embedding_route: EmbeddingRoute,
    chunking: ChunkingConfig,
}

impl VectorStore {
    pub async fn new(
        db_path: &Path,
        embedding_dimension: usize,
        providers: Arc<ProviderManager>,
        embedding_route: EmbeddingRoute,
    ) -> VectorResult<Self> {
        let db = VectorDatabase::new(db_path, embedding_dimension).await?;
        Ok(Self {
            db,
            providers,
            embedding_route,
            chunking: ChunkingConfig::default(),
        })
    }

    /// Chunks `content`, embeds every chunk in one batched provider call,
    /// and inserts each as its own point under `(tenant_id, project_id)`.
    #[allow(clippy::too_many_arguments)]
    pub async fn ingest(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        point_type: PointType,
        visibility: Visibility,
        stage: Option<Stage>,
        correlation_id: Option<CorrelationId>,
        content: &str,
        lang: &str,
        version: i32,
    ) -> VectorResult<Vec<Uuid>> {
        let chunks = chunk_text(content, &self.chunking).map_err(|e| VectorError::Chunking(e.to_string()))?;
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self
            .providers
            .embed(&self.embedding_route.provider_id, &texts)
            .await
            .map_err(|e| VectorError::Embedding(e.to_string()))?;

        if embeddings.len() != chunks.len() {
            return Err(VectorError::Embedding(format!(
                "provider returned {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let mut ids = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            let point = VectorPoint {
                id: Uuid::new_v4(),
                tenant_id,
                project_id,
                point_type,
                visibility,
                stage,
                correlation_id: correlation_id.clone(),
                content: chunk.content.clone(),
                token_count: chunk.token_count as i64,
                lang: lang.to_string(),
                version,
                created_at: Utc::now(),
            };
            self.db.insert(&point, embedding).await?;
            ids.push(point.id);
        }
        Ok(ids)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn search(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        point_type: Option<PointType>,
        query: &str,
        limit: usize,
        score_threshold: Option<f64>,
        filters: Option<&SearchFilters>,
    ) -> VectorResult<Vec<VectorSearchResult>> {
        let embeddings = self
            .providers
            .embed(&self.embedding_route.provider_id, &[query.to_string()])
            .await
            .map_err(|e| VectorError::Embedding(e.to_string()))?;
        let Some(query_embedding) = embeddings.into_iter().next() else {
            return Err(VectorError::Embedding("embedding call returned no vectors".to_string()));
        };
        self.db
            .search(tenant_id, project_id, point_type, &query_embedding, limit, score_threshold, filters)
            .await
    }

    pub async fn delete_project(&self, tenant_id: Uuid, project_id: Uuid) -> VectorResult<i64> {
        self.db.delete_project(tenant_id, project_id).await
    }

    pub async fn delete(&self, tenant_id: Uuid, project_id: Uuid, point_ids: &[Uuid]) -> VectorResult<i64> {
        self.db.delete(tenant_id, project_id, point_ids).await
    }

    pub async fn count(&self, tenant_id: Uuid, project_id: Uuid) -> VectorResult<i64> {
        self.db.count(tenant_id, project_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_route_carries_provider_id() {
        let route = EmbeddingRoute {
            provider_id: "openai".to_string(),
        };
        assert_eq!(route.provider_id, "openai");
    }
}
