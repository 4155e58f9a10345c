use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use uuid::Uuid;
use zip::write::FileOptions;
use zip::ZipWriter;

use docforge_documents::DocumentRepository;
use docforge_types::document::DocumentVersion;
use docforge_types::export::{Export, ExportManifest, ExportManifestEntry};

use crate::error::ExportResult;
use crate::repository::ExportRepository;

/// Assembles the latest non-deleted version of each document type (and each
/// epic) in a project into a ZIP archive under `output_dir`, transitioning
/// the export through Generating -> Completed (or Failed on any error).
pub async fn generate_export(
    export_id: Uuid,
    exports: &ExportRepository,
    documents: &DocumentRepository,
    output_dir: &Path,
) -> ExportResult<Export> {
    let export = exports.get(export_id).await?;
    exports.mark_generating(export_id).await?;

    match assemble(&export, documents, output_dir).await {
        Ok((file_path, manifest)) => {
            exports.mark_completed(export_id, &file_path, &manifest).await?;
            exports.get(export_id).await
        }
        Err(err) => {
            let _ = exports.mark_failed(export_id, &err.to_string()).await;
            Err(err)
        }
    }
}

async fn assemble(export: &Export, documents: &DocumentRepository, output_dir: &Path) -> ExportResult<(String, ExportManifest)> {
    let all = documents.list_by_project(export.tenant_id, export.project_id).await?;
    let latest = latest_per_document(all);

    tokio::fs::create_dir_all(output_dir).await?;
    let file_path = output_dir.join(format!("{}.zip", export.id));
    let (manifest_entries, zip_bytes) = write_zip(&latest)?;
    tokio::fs::write(&file_path, zip_bytes).await?;

    let manifest = ExportManifest {
        project_id: export.project_id,
        created_at: Some(Utc::now()),
        documents: manifest_entries,
    };
    Ok((path_to_string(&file_path), manifest))
}

/// `list_by_project` orders by `created_at DESC`, so the first occurrence of
/// each `(document_type, epic_number)` key encountered is its latest version.
fn latest_per_document(versions: Vec<DocumentVersion>) -> Vec<DocumentVersion> {
    let mut seen = HashSet::new();
    let mut latest = Vec::new();
    for doc in versions {
        let key = (doc.document_type, doc.epic_number);
        if seen.insert(key) {
            latest.push(doc);
        }
    }
    latest
}

fn write_zip(versions: &[DocumentVersion]) -> ExportResult<(Vec<ExportManifestEntry>, Vec<u8>)> {
    let buffer = Vec::new();
    let mut writer = ZipWriter::new(std::io::Cursor::new(buffer));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut entries = Vec::with_capacity(versions.len());
    for doc in versions {
        let path_in_zip = document_file_name(doc);
        writer.start_file(&path_in_zip, options)?;
        writer.write_all(doc.content.as_bytes())?;
        entries.push(ExportManifestEntry {
            document_type: doc.document_type.as_str().to_string(),
            version: doc.version,
            title: doc.title.clone(),
            path_in_zip,
        });
    }

    let cursor = writer.finish()?;
    Ok((entries, cursor.into_inner()))
}

fn document_file_name(doc: &DocumentVersion) -> String {
    match doc.epic_number {
        Some(n) => format!("plan_epic_{n}.md"),
        None => format!("{}.md", doc.document_type.as_str()),
    }
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_types::document::DocumentType;

    fn doc(document_type: DocumentType, version: i64, epic_number: Option<i64>) -> DocumentVersion {
        DocumentVersion {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            document_type,
            version,
            title: "Title".to_string(),
            content: "content".to_string(),
            epic_number,
            epic_name: None,
            metadata: serde_json::json!({}),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            is_deleted: false,
        }
    }

    #[test]
    fn latest_per_document_keeps_first_occurrence_per_key() {
        let versions = vec![
            doc(DocumentType::About, 3, None),
            doc(DocumentType::About, 2, None),
            doc(DocumentType::PlanEpic, 1, Some(1)),
            doc(DocumentType::PlanEpic, 1, Some(2)),
        ];
        let latest = latest_per_document(versions);
        assert_eq!(latest.len(), 3);
        assert_eq!(latest[0].version, 3);
    }

    #[test]
    fn write_zip_names_epics_and_plain_documents_distinctly() {
        let versions = vec![doc(DocumentType::Specs, 1, None), doc(DocumentType::PlanEpic, 1, Some(2))];
        let (entries, bytes) = write_zip(&versions).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(entries[0].path_in_zip, "specs.md");
        assert_eq!(entries[1].path_in_zip, "plan_epic_2.md");
    }
}
