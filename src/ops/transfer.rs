//! Operator-facing flows around the core: sending a fresh backup and staging
//! a received archive for a confirmed restore.

use super::restore::{RestoreOrchestrator, RestoreReport};
use crate::archive::{create_full_backup, preview, ArchivePreview, BackupReport};
use crate::collaborators::DocumentTransport;
use crate::config::VaultContext;
use crate::constants::{ARCHIVE_EXTENSION, STAGED_FILE_PREFIX, TIMESTAMP_FORMAT};
use crate::errors::{AppResult, ArchiveError};
use crate::fs_ops::atomic_copy;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Builds a full backup, delivers it, then deletes the local archive whether
/// or not delivery worked.
pub async fn backup_and_send(
    ctx: &VaultContext,
    transport: &dyn DocumentTransport,
) -> AppResult<BackupReport> {
    let report = create_full_backup(ctx)?;
    let sent = transport.send(&report.archive_path).await;

    if let Err(e) = fs::remove_file(&report.archive_path) {
        warn!("Failed to remove sent archive {:?}: {}", report.archive_path, e);
    }

    sent?;
    info!("Backup sent: {}", report.summary());
    Ok(report)
}

/// A received archive copied into the backup directory, waiting for the
/// operator to apply or discard it.
#[derive(Debug, Clone)]
pub struct StagedArchive {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub preview: ArchivePreview,
}

fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// Receives an archive, checks its extension, copies it to
/// `<backup_dir>/restore-<ts>.tgz` and previews it.
///
/// # Errors
///
/// Fails if the transport fails, the file is not a `.tgz`, copying fails, or
/// the staged copy cannot be listed (in which case it is removed again).
pub async fn stage_restore(
    ctx: &VaultContext,
    transport: &dyn DocumentTransport,
) -> AppResult<StagedArchive> {
    let received = transport.receive().await?;
    if !has_archive_extension(&received) {
        return Err(ArchiveError::WrongExtension {
            path: received,
            expected: ARCHIVE_EXTENSION,
        }
        .into());
    }

    let staged = ctx.backup_dir.join(format!(
        "{}{}.{}",
        STAGED_FILE_PREFIX,
        Local::now().format(TIMESTAMP_FORMAT),
        ARCHIVE_EXTENSION
    ));
    atomic_copy(&received, &staged)?;

    match preview(&staged) {
        Ok(listing) => {
            info!(
                "Backup received ({} bytes), staged at {:?}",
                listing.size_bytes, staged
            );
            Ok(StagedArchive {
                path: staged,
                size_bytes: listing.size_bytes,
                preview: listing,
            })
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&staged) {
                warn!(
                    "Failed to remove unreadable staged archive {:?}: {}",
                    staged, cleanup
                );
            }
            Err(e.into())
        }
    }
}

impl StagedArchive {
    /// Operator cancelled: delete the staged copy.
    pub fn discard(self) -> AppResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Operator confirmed: restore, then delete the staged copy.
    pub async fn apply(self, orchestrator: &RestoreOrchestrator<'_>) -> RestoreReport {
        let report = orchestrator.restore_with_progress(&self.path).await;
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove staged archive {:?}: {}", self.path, e);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_extension_check() {
        assert!(has_archive_extension(Path::new("/tmp/ranet-backup-1.tgz")));
        assert!(has_archive_extension(Path::new("/tmp/BACKUP.TGZ")));
        assert!(!has_archive_extension(Path::new("/tmp/backup.tar.gz")));
        assert!(!has_archive_extension(Path::new("/tmp/backup")));
    }
}
