//! Listing, extracting and validating backup archives.

use crate::constants::{ARCHIVE_DAEMON_STATE_ENTRY, ARCHIVE_SETTINGS_ENTRY, PREVIEW_ENTRY_LIMIT};
use crate::errors::{AppResult, ArchiveError};
use crate::restore_log::{LogTag, RestoreLog};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// The first entry names of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePreview {
    /// Entry names in archive order, at most `limit` of them
    pub entries: Vec<String>,
    /// Whether the archive has more entries than were listed
    pub truncated: bool,
    /// Size of the archive file in bytes
    pub size_bytes: u64,
}

impl ArchivePreview {
    /// One entry per line, `(empty)` for an archive without entries.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "(empty)".to_string();
        }
        let mut out = self.entries.join("\n");
        if self.truncated {
            out.push_str("\n...");
        }
        out
    }
}

/// Payloads located in an extracted workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadCheck {
    pub settings_db: Option<PathBuf>,
    pub daemon_state: Option<PathBuf>,
}

impl PayloadCheck {
    pub fn has_any(&self) -> bool {
        self.settings_db.is_some() || self.daemon_state.is_some()
    }

    /// Fails with [`ArchiveError::NoRecognizedPayload`] when nothing was found.
    pub fn require_any(&self) -> Result<(), ArchiveError> {
        if self.has_any() {
            Ok(())
        } else {
            Err(ArchiveError::NoRecognizedPayload {
                settings: ARCHIVE_SETTINGS_ENTRY,
                daemon_state: ARCHIVE_DAEMON_STATE_ENTRY,
            })
        }
    }
}

fn open_archive(path: &Path) -> Result<tar::Archive<GzDecoder<File>>, ArchiveError> {
    if !path.is_file() {
        return Err(ArchiveError::Missing(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|source| ArchiveError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(tar::Archive::new(GzDecoder::new(file)))
}

/// Lists up to `limit` entry names without extracting anything.
///
/// Reading stops as soon as one entry past the limit has been seen.
pub fn preview_archive(path: &Path, limit: usize) -> Result<ArchivePreview, ArchiveError> {
    let unreadable = |source| ArchiveError::Unreadable {
        path: path.to_path_buf(),
        source,
    };
    let size_bytes = std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|_| ArchiveError::Missing(path.to_path_buf()))?;
    let mut archive = open_archive(path)?;

    let mut entries = Vec::new();
    let mut truncated = false;
    for entry in archive.entries().map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        if entries.len() == limit {
            truncated = true;
            break;
        }
        entries.push(String::from_utf8_lossy(&entry.path_bytes()).into_owned());
    }

    debug!(archive = %path.display(), listed = entries.len(), truncated, "Archive preview");
    Ok(ArchivePreview {
        entries,
        truncated,
        size_bytes,
    })
}

/// Preview with the default entry limit.
pub fn preview(path: &Path) -> Result<ArchivePreview, ArchiveError> {
    preview_archive(path, PREVIEW_ENTRY_LIMIT)
}

/// Unpacks the whole archive into `dest`, keeping modes and mtimes.
///
/// Entries that would escape `dest` (absolute paths, `..`) are refused by the
/// tar reader.
pub fn extract_archive(path: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let mut archive = open_archive(path)?;
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_overwrite(true);
    archive
        .unpack(dest)
        .map_err(|source| ArchiveError::Extract {
            path: path.to_path_buf(),
            source,
        })
}

enum Payload {
    Usable,
    Absent,
    Rejected(&'static str),
}

fn classify_payload(workspace: &Path, path: &Path, want_dir: bool) -> Payload {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(_) => return Payload::Absent,
    };
    if meta.file_type().is_symlink() {
        return Payload::Rejected("is a symbolic link");
    }
    if want_dir && !meta.is_dir() {
        return Payload::Rejected("not a directory");
    }
    if !want_dir && !meta.is_file() {
        return Payload::Rejected("not a regular file");
    }
    // A symlinked ancestor directory would place the payload outside the workspace.
    let inside = match (
        path.parent().map(std::fs::canonicalize),
        std::fs::canonicalize(workspace),
    ) {
        (Some(Ok(parent)), Ok(root)) => parent.starts_with(&root),
        _ => false,
    };
    if inside {
        Payload::Usable
    } else {
        Payload::Rejected("resolves outside the workspace")
    }
}

/// Looks for the two payloads under an extracted workspace, recording one
/// `FOUND` or `MISS` line per payload.
///
/// Only a regular file and a real directory count. Symbolic links are never
/// accepted, so a crafted archive cannot point a restore at arbitrary paths.
pub fn check_payloads(workspace: &Path, log: &mut RestoreLog) -> PayloadCheck {
    let mut check = PayloadCheck::default();

    let settings = workspace.join(ARCHIVE_SETTINGS_ENTRY);
    match classify_payload(workspace, &settings, false) {
        Payload::Usable => {
            log.push(LogTag::Found, settings.display().to_string());
            check.settings_db = Some(settings);
        }
        Payload::Absent => log.push(LogTag::Miss, ARCHIVE_SETTINGS_ENTRY),
        Payload::Rejected(reason) => log.push(
            LogTag::Miss,
            format!("{} ({})", ARCHIVE_SETTINGS_ENTRY, reason),
        ),
    }

    let daemon_state = workspace.join(ARCHIVE_DAEMON_STATE_ENTRY);
    match classify_payload(workspace, &daemon_state, true) {
        Payload::Usable => {
            log.push(LogTag::Found, daemon_state.display().to_string());
            check.daemon_state = Some(daemon_state);
        }
        Payload::Absent => log.push(
            LogTag::Miss,
            format!("{} directory", ARCHIVE_DAEMON_STATE_ENTRY),
        ),
        Payload::Rejected(reason) => log.push(
            LogTag::Miss,
            format!("{} directory ({})", ARCHIVE_DAEMON_STATE_ENTRY, reason),
        ),
    }

    check
}

/// Result of a stand-alone inspection.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub preview: ArchivePreview,
    pub payloads: PayloadCheck,
    pub log: RestoreLog,
}

/// Previews, extracts into a throwaway directory and checks the payloads.
///
/// Nothing outside the throwaway directory is touched; the returned payload
/// paths point into a directory that no longer exists.
pub fn inspect_archive(path: &Path, scratch_root: &Path) -> AppResult<Inspection> {
    let preview = preview(path)?;
    std::fs::create_dir_all(scratch_root)?;
    let scratch = TempDir::new_in(scratch_root)?;
    extract_archive(path, scratch.path())?;

    let mut log = RestoreLog::new();
    let payloads = check_payloads(scratch.path(), &mut log);
    scratch.close()?;

    Ok(Inspection {
        preview,
        payloads,
        log,
    })
}
