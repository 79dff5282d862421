//! Building the backup archive.
//!
//! One gzip-compressed tar holds the settings store under
//! `opt/ranet-bot/speedtest.db` and the vnstat database directory under
//! `var/lib/vnstat`. A missing payload is a warning, not a failure.

use crate::config::VaultContext;
use crate::constants::{
    ARCHIVE_DAEMON_STATE_ENTRY, ARCHIVE_EXTENSION, ARCHIVE_SETTINGS_ENTRY, BACKUP_FILE_PREFIX,
    TIMESTAMP_FORMAT,
};
use crate::errors::{AppError, AppResult};
use crate::restore_log::{LogTag, RestoreLog};
use blake3::Hasher;
use chrono::Local;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Report of a completed backup operation.
#[derive(Debug, Clone)]
pub struct BackupReport {
    /// Where the archive was written
    pub archive_path: PathBuf,
    /// Size of the archive in bytes
    pub archive_size: u64,
    /// BLAKE3 checksum of the archive
    pub checksum: String,
    /// Duration taken to create the backup
    pub duration: Duration,
    /// `ADD`, `WARN` and `ERR` records produced while building
    pub log: RestoreLog,
}

impl BackupReport {
    /// `"OK"` when nothing went wrong, otherwise the rendered log.
    pub fn summary(&self) -> String {
        if self.log.has_problems() {
            self.log.render()
        } else {
            "OK".to_string()
        }
    }
}

/// Creates a timestamped full backup in the context's backup directory.
///
/// The archive is named `ranet-backup-<YYYYmmdd-HHMMSS>.tgz`; the directory
/// is created if needed.
pub fn create_full_backup(ctx: &VaultContext) -> AppResult<BackupReport> {
    fs::create_dir_all(&ctx.backup_dir)?;
    let ts = Local::now().format(TIMESTAMP_FORMAT);
    let output = ctx.backup_dir.join(format!(
        "{}{}.{}",
        BACKUP_FILE_PREFIX, ts, ARCHIVE_EXTENSION
    ));
    build_archive(&ctx.live.settings_db, &ctx.live.daemon_state_dir, &output)
}

/// Serializes the settings store and the daemon-state directory into one
/// `.tgz` at `output_path`.
///
/// # Flow
///
/// 1. Check which payloads exist, warning about the missing ones
/// 2. Stream a tar.gz into a temporary sibling of `output_path`
/// 3. Rename the finished archive onto `output_path`
/// 4. Checksum the archive for the report
///
/// # Errors
///
/// Returns an error only when the archive file itself cannot be written or
/// finalized. Failing to add one payload is logged as `ERR` and the backup
/// still completes with whatever else was added.
pub fn build_archive(
    settings_db: &Path,
    daemon_state_dir: &Path,
    output_path: &Path,
) -> AppResult<BackupReport> {
    let start_time = Instant::now();
    info!("Creating backup archive at {:?}", output_path);

    let mut log = RestoreLog::new();
    let include_settings = settings_db.is_file();
    if !include_settings {
        log.push(
            LogTag::Warn,
            format!("settings store not found: {}", settings_db.display()),
        );
    }
    let include_daemon_state = daemon_state_dir.is_dir();
    if !include_daemon_state {
        log.push(
            LogTag::Warn,
            format!(
                "daemon-state directory not found: {}",
                daemon_state_dir.display()
            ),
        );
    }

    let parent = match output_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| {
        AppError::Io(io::Error::new(
            e.kind(),
            format!("Failed to create output directory: {}", e),
        ))
    })?;

    let tmp = NamedTempFile::new_in(&parent)?;
    let encoder = GzEncoder::new(tmp, Compression::default());
    let mut tar = tar::Builder::new(encoder);
    tar.follow_symlinks(false);

    if include_settings {
        debug!("Adding settings store to archive");
        match tar.append_path_with_name(settings_db, ARCHIVE_SETTINGS_ENTRY) {
            Ok(()) => log.push(
                LogTag::Add,
                format!("{} -> {}", settings_db.display(), ARCHIVE_SETTINGS_ENTRY),
            ),
            Err(e) => log.push(
                LogTag::Err,
                format!("add {}: {}", settings_db.display(), e),
            ),
        }
    }

    if include_daemon_state {
        debug!("Adding daemon-state directory to archive");
        match tar.append_dir_all(ARCHIVE_DAEMON_STATE_ENTRY, daemon_state_dir) {
            Ok(()) => log.push(
                LogTag::Add,
                format!(
                    "{} -> {}",
                    daemon_state_dir.display(),
                    ARCHIVE_DAEMON_STATE_ENTRY
                ),
            ),
            Err(e) => log.push(
                LogTag::Err,
                format!("add {}: {}", daemon_state_dir.display(), e),
            ),
        }
    }

    let encoder = tar.into_inner().map_err(|e| {
        AppError::Io(io::Error::new(
            e.kind(),
            format!("Failed to finalize tar archive: {}", e),
        ))
    })?;
    let tmp = encoder.finish().map_err(|e| {
        AppError::Io(io::Error::new(
            e.kind(),
            format!("Failed to finish gzip compression: {}", e),
        ))
    })?;
    tmp.as_file().sync_all()?;
    tmp.persist(output_path).map_err(|e| {
        AppError::Io(io::Error::new(
            e.error.kind(),
            format!("Failed to write backup file: {}", e.error),
        ))
    })?;

    let (archive_size, checksum) = checksum_file(output_path)?;
    let duration = start_time.elapsed();
    info!(
        "Backup completed: {} bytes, {} warnings, {} ms",
        archive_size,
        log.count(LogTag::Warn),
        duration.as_millis()
    );

    Ok(BackupReport {
        archive_path: output_path.to_path_buf(),
        archive_size,
        checksum,
        duration,
        log,
    })
}

fn checksum_file(path: &Path) -> io::Result<(u64, String)> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)?;
    let size = io::copy(&mut file, &mut hasher)?;
    Ok((size, hasher.finalize().to_hex().to_string()))
}
