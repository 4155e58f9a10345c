use std::path::PathBuf;
use std::sync::Arc;

use docforge_documents::DocumentRepository;
use docforge_types::export::Export;
use uuid::Uuid;

use crate::archive;
use crate::error::ExportResult;
use crate::repository::ExportRepository;

/// Ties the export lifecycle (create -> generate -> download -> expire)
/// together for the server layer. `output_dir` is where generated archives
/// are written; the sweeper removes them again once they expire.
pub struct ExportService {
    exports: Arc<ExportRepository>,
    documents: Arc<DocumentRepository>,
    output_dir: PathBuf,
}

impl ExportService {
    pub fn new(exports: Arc<ExportRepository>, documents: Arc<DocumentRepository>, output_dir: PathBuf) -> Self {
        Self {
            exports,
            documents,
            output_dir,
        }
    }

    pub fn exports(&self) -> Arc<ExportRepository> {
        Arc::clone(&self.exports)
    }

    pub async fn create_export(&self, tenant_id: Uuid, project_id: Uuid, requested_by: Uuid, expires_in_hours: i64) -> ExportResult<Export> {
        self.exports.create(tenant_id, project_id, requested_by, expires_in_hours).await
    }

    pub async fn generate_export(&self, export_id: Uuid) -> ExportResult<Export> {
        archive::generate_export(export_id, &self.exports, &self.documents, &self.output_dir).await
    }

    pub async fn get(&self, export_id: Uuid) -> ExportResult<Export> {
        self.exports.get(export_id).await
    }
}
