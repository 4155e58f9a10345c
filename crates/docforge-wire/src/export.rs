use chrono::{DateTime, Utc};
use docforge_types::export::ExportManifest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateExportRequest {
    #[serde(default)]
    pub document_types: Option<Vec<String>>,
    #[serde(default = "default_expires_in_hours")]
    pub expires_in_hours: i64,
}

fn default_expires_in_hours() -> i64 {
    24
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResponse {
    pub export_id: Uuid,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub manifest: Option<ExportManifest>,
}
