use std::sync::Arc;

use uuid::Uuid;

use docforge_agents::{AgentExecutor, StageContext, StageInput};
use docforge_documents::DocumentRepository;
use docforge_quality::ValidationResult;
use docforge_types::document::{DocumentType, DocumentVersion};
use docforge_types::execution::{AgentExecution, Stage};
use docforge_types::vector::{PointType, Visibility};
use docforge_types::CorrelationId;
use docforge_vector::VectorStore;

use crate::error::OrchestratorResult;
use crate::executions::ExecutionLog;
use crate::progress::ProgressRegistry;

const CONTEXT_RESULT_LIMIT: usize = 5;

pub struct StageRequest {
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub correlation_id: CorrelationId,
    pub stage: Stage,
    pub language: String,
    pub user_id: Uuid,
    pub input: StageInput,
    pub provider_id: Option<String>,
    pub model_id: Option<String>,
}

pub struct StageResult {
    pub document: DocumentVersion,
    pub epics: Vec<DocumentVersion>,
    pub execution: AgentExecution,
    pub validation: ValidationResult,
}

/// Drives one stage from typed input to a persisted document version,
/// following `validate → gather context → call agent → persist → store
/// memory → record execution` with progress emitted at each checkpoint.
pub struct WorkflowEngine {
    executor: AgentExecutor,
    documents: DocumentRepository,
    vectors: VectorStore,
    executions: ExecutionLog,
    progress: Arc<ProgressRegistry>,
}

impl WorkflowEngine {
    pub fn new(
        executor: AgentExecutor,
        documents: DocumentRepository,
        vectors: VectorStore,
        executions: ExecutionLog,
        progress: Arc<ProgressRegistry>,
    ) -> Self {
        Self {
            executor,
            documents,
            vectors,
            executions,
            progress,
        }
    }

    pub async fn execute_stage(&self, request: StageRequest) -> OrchestratorResult<StageResult> {
        let StageRequest {
            tenant_id,
            project_id,
            correlation_id,
            stage,
            language,
            user_id,
            input,
            provider_id,
            model_id,
        } = request;

        self.progress.emit(correlation_id, stage, 0.0, "starting").await;

        let context_excerpts = self.gather_context(tenant_id, project_id, stage).await;

        let execution = self
            .executions
            .start(tenant_id, project_id, stage, correlation_id, serde_json::to_value(&input).unwrap_or_default(), user_id)
            .await?;

        self.progress.emit(correlation_id, stage, 0.2, "executing").await;

        let ctx = StageContext {
            tenant_id,
            project_id,
            correlation_id,
            stage,
            language,
            user_id,
        };

        let output = match self
            .executor
            .execute(&ctx, &input, &context_excerpts, provider_id.as_deref(), model_id.as_deref())
            .await
        {
            Ok(output) => output,
            Err(err) => {
                self.progress.emit(correlation_id, stage, 0.0, format!("failed: {err}")).await;
                self.executions.fail(execution.id, &err.to_string()).await?;
                return Err(err.into());
            }
        };

        let document_type = stage_document_type(stage);
        let title = format!("{} — {}", stage.display_name(), project_id);
        let metadata = serde_json::json!({
            "correlation_id": correlation_id.to_string(),
            "confidence_score": output.confidence_score,
            "key_facts": output.parsed.key_facts,
        });

        let document = self
            .documents
            .create_version(tenant_id, project_id, document_type, &title, &output.parsed.content, None, None, metadata, user_id)
            .await?;

        let epics = self.persist_epics(tenant_id, project_id, stage, &output.parsed, user_id).await?;

        self.progress.emit(correlation_id, stage, 0.8, "storing").await;
        if let Err(err) = self
            .vectors
            .ingest(
                tenant_id,
                project_id,
                PointType::Memory,
                Visibility::Private,
                Some(stage),
                Some(correlation_id),
                &output.parsed.content,
                "en",
                document.version as i32,
            )
            .await
        {
            tracing::warn!(error = %err, stage = ?stage, "failed to store stage output in vector memory");
        }

        self.executions
            .complete(
                execution.id,
                serde_json::json!({
                    "document_id": document.id,
                    "confidence_score": output.confidence_score,
                    "epic_count": epics.len(),
                }),
            )
            .await?;

        self.progress.emit(correlation_id, stage, 1.0, "completed").await;

        Ok(StageResult {
            document,
            epics,
            execution,
            validation: output.validation,
        })
    }

    async fn persist_epics(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        stage: Stage,
        parsed: &docforge_agents::ParsedOutput,
        user_id: Uuid,
    ) -> OrchestratorResult<Vec<DocumentVersion>> {
        if stage != Stage::Planner {
            return Ok(Vec::new());
        }
        let Some(items) = parsed.list_sections.get("epic_breakdown") else {
            return Ok(Vec::new());
        };

        let mut epics = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let epic_number = (index + 1) as i64;
            let epic = self
                .documents
                .create_version(
                    tenant_id,
                    project_id,
                    DocumentType::PlanEpic,
                    &format!("Epic {epic_number:02}"),
                    item,
                    Some(epic_number),
                    Some(item.clone()),
                    serde_json::Value::Null,
                    user_id,
                )
                .await?;
            epics.push(epic);
        }
        Ok(epics)
    }

    async fn gather_context(&self, tenant_id: Uuid, project_id: Uuid, stage: Stage) -> Vec<String> {
        let Some(query) = stage_context_query(stage) else {
            return Vec::new();
        };
        match self
            .vectors
            .search(tenant_id, project_id, None, query, CONTEXT_RESULT_LIMIT, None, None)
            .await
        {
            Ok(results) => results.into_iter().map(|r| r.point.content).collect(),
            Err(err) => {
                tracing::warn!(error = %err, stage = ?stage, "context gathering failed, continuing without it");
                Vec::new()
            }
        }
    }
}

fn stage_document_type(stage: Stage) -> DocumentType {
    match stage {
        Stage::Analyst => DocumentType::About,
        Stage::Standards => DocumentType::Specs,
        Stage::Architect => DocumentType::Architecture,
        Stage::Planner => DocumentType::PlanOverview,
    }
}

/// Canned per-stage retrieval query against prior-stage memory. Stage 1
/// never has prior context.
fn stage_context_query(stage: Stage) -> Option<&'static str> {
    match stage {
        Stage::Analyst => None,
        Stage::Standards => Some("business requirements problem statement target audience success metrics"),
        Stage::Architect => Some("engineering standards code quality testing security guidelines"),
        Stage::Planner => Some("solution architecture technology stack system components deployment"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_document_type_maps_every_stage() {
        assert_eq!(stage_document_type(Stage::Analyst), DocumentType::About);
        assert_eq!(stage_document_type(Stage::Standards), DocumentType::Specs);
        assert_eq!(stage_document_type(Stage::Architect), DocumentType::Architecture);
        assert_eq!(stage_document_type(Stage::Planner), DocumentType::PlanOverview);
    }

    #[test]
    fn analyst_has_no_context_query() {
        assert!(stage_context_query(Stage::Analyst).is_none());
    }

    #[test]
    fn later_stages_have_a_context_query() {
        assert!(stage_context_query(Stage::Standards).is_some());
        assert!(stage_context_query(Stage::Architect).is_some());
        assert!(stage_context_query(Stage::Planner).is_some());
    }
}
