use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::repository::ExportRepository;

const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Periodically marks past-expiry `Completed` exports as `Expired` and
/// removes the archive they point at. Runs for the lifetime of the spawned
/// task; callers hold the `JoinHandle` to shut it down with the rest of the
/// server's background work.
pub async fn run(exports: Arc<ExportRepository>) {
    loop {
        tokio::time::sleep(SWEEP_INTERVAL).await;
        if let Err(err) = sweep_once(&exports, Utc::now()).await {
            warn!(error = %err, "export sweep failed");
        }
    }
}

async fn sweep_once(exports: &ExportRepository, now: chrono::DateTime<Utc>) -> crate::error::ExportResult<()> {
    let expired = exports.expired_completed(now).await?;
    for export in expired {
        if let Some(path) = export.file_path.as_deref() {
            if let Err(err) = tokio::fs::remove_file(PathBuf::from(path)).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(export_id = %export.id, error = %err, "failed to remove expired export archive");
                }
            }
        }
        exports.mark_expired(export.id).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_types::export::ExportStatus;
    use uuid::Uuid;

    #[tokio::test]
    async fn sweep_once_expires_completed_exports_past_their_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ExportRepository::new(&dir.path().join("exports.db")).unwrap();
        let export = repo.create(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 1).await.unwrap();

        let archive_path = dir.path().join("archive.zip");
        tokio::fs::write(&archive_path, b"pk").await.unwrap();
        let manifest = export.manifest.clone();
        repo.mark_completed(export.id, archive_path.to_str().unwrap(), &manifest).await.unwrap();

        sweep_once(&repo, Utc::now()).await.unwrap();
        let reloaded = repo.get(export.id).await.unwrap();
        assert_eq!(reloaded.status, ExportStatus::Completed);
        assert!(archive_path.exists());

        sweep_once(&repo, Utc::now() + chrono::Duration::hours(2)).await.unwrap();
        let reloaded = repo.get(export.id).await.unwrap();
        assert_eq!(reloaded.status, ExportStatus::Expired);
        assert!(!archive_path.exists());
    }
}
