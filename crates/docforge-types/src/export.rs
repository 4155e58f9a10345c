use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportStatus {
    Pending,
    Generating,
    Completed,
    Failed,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Zip,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat::Zip
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifestEntry {
    #[serde(rename = "type")]
    pub document_type: String,
    pub version: i64,
    pub title: String,
    pub path_in_zip: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportManifest {
    pub project_id: Uuid,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub documents: Vec<ExportManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Uuid,
    pub requested_by: Uuid,
    pub status: ExportStatus,
    pub file_path: Option<String>,
    pub manifest: ExportManifest,
    pub error: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Export {
    /// `is_downloadable = (status=Completed and now <= expires_at and file_path exists)`.
    pub fn is_downloadable(&self, now: DateTime<Utc>) -> bool {
        if self.status != ExportStatus::Completed || now > self.expires_at {
            return false;
        }
        match &self.file_path {
            Some(path) => std::path::Path::new(path).exists(),
            None => false,
        }
    }
}
