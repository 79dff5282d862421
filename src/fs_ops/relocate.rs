//! Moving a file or directory, across filesystems if need be.
//!
//! A plain rename is tried first. When it fails with `EXDEV` the payload is
//! copied into place ([`atomic_copy`] for files, [`merge_tree`] for
//! directories) and only then is the source removed, so an interruption
//! between the two steps leaves a redundant source rather than lost data.

use super::atomic::atomic_copy;
use super::merge::{merge_tree, MergeStats};
use crate::errors::RelocateError;
use crate::restore_log::{LogTag, RestoreLog};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// How a relocation was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    /// Single rename on one filesystem.
    Renamed,
    /// File copied atomically, source removed.
    CopiedFile,
    /// Directory merged into the destination, source removed.
    MergedDir(MergeStats),
}

/// Moves `src` to `dst` with `fs::rename`, falling back to copy+delete.
///
/// Every outcome is recorded in `log` (`MOVE`, `COPY`, `WARN` or `ERR`); the
/// returned error is for callers that branch on success.
pub fn relocate(src: &Path, dst: &Path, log: &mut RestoreLog) -> Result<Relocation, RelocateError> {
    relocate_with(src, dst, log, |from, to| fs::rename(from, to))
}

/// [`relocate`] with the rename step supplied by the caller.
///
/// Lets callers (and tests) substitute the rename, e.g. to force the
/// cross-device path on a single filesystem.
pub fn relocate_with<R>(
    src: &Path,
    dst: &Path,
    log: &mut RestoreLog,
    rename: R,
) -> Result<Relocation, RelocateError>
where
    R: FnOnce(&Path, &Path) -> io::Result<()>,
{
    if let Some(parent) = dst.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            let err = RelocateError::Io {
                from: src.to_path_buf(),
                to: dst.to_path_buf(),
                source: e,
            };
            log.push(LogTag::Err, err.to_string());
            return Err(err);
        }
    }

    let err = match rename(src, dst) {
        Ok(()) => {
            log.push(
                LogTag::Move,
                format!("{} -> {}", src.display(), dst.display()),
            );
            return Ok(Relocation::Renamed);
        }
        Err(e) => RelocateError::classify(e, src, dst),
    };

    match err {
        RelocateError::CrossDevice { .. } => {
            debug!(src = %src.display(), dst = %dst.display(), "Rename crossed devices, copying");
            copy_then_remove(src, dst, log, "EXDEV fallback")
        }
        RelocateError::DestinationOccupied { .. } if is_real_dir(src) => {
            debug!(dst = %dst.display(), "Destination directory occupied, merging");
            copy_then_remove(src, dst, log, "merge fallback")
        }
        err => {
            log.push(LogTag::Err, err.to_string());
            Err(err)
        }
    }
}

fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false)
}

fn copy_then_remove(
    src: &Path,
    dst: &Path,
    log: &mut RestoreLog,
    note: &str,
) -> Result<Relocation, RelocateError> {
    let fallback_err = |source: io::Error| RelocateError::Io {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source,
    };

    if is_real_dir(src) {
        let stats = match merge_tree(src, dst, log) {
            Ok(stats) => stats,
            Err(e) => {
                let err = fallback_err(e);
                log.push(LogTag::Err, format!("copy-fallback {}", err));
                return Err(err);
            }
        };
        if let Err(e) = fs::remove_dir_all(src) {
            log.push(LogTag::Warn, format!("cleanup src dir {}: {}", src.display(), e));
        }
        log.push(
            LogTag::Copy,
            format!("{} => {} (dir, {})", src.display(), dst.display(), note),
        );
        Ok(Relocation::MergedDir(stats))
    } else {
        if let Err(e) = atomic_copy(src, dst) {
            let err = fallback_err(e);
            log.push(LogTag::Err, format!("copy-fallback {}", err));
            return Err(err);
        }
        if let Err(e) = fs::remove_file(src) {
            log.push(LogTag::Warn, format!("cleanup src file {}: {}", src.display(), e));
        }
        log.push(
            LogTag::Copy,
            format!("{} => {} (file, {})", src.display(), dst.display(), note),
        );
        Ok(Relocation::CopiedFile)
    }
}
