//! Best-effort recursive merge of one directory tree into another.

use super::atomic::atomic_copy;
use crate::restore_log::{LogTag, RestoreLog};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Counters describing one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub dirs_created: usize,
    pub files_copied: usize,
    pub failures: usize,
}

/// Copies every file under `src` to the same relative path under `dst`.
///
/// Missing destination directories are created and same-named destination
/// files are overwritten through [`atomic_copy`]. Files that only exist under
/// `dst` are left alone: this is a merge, not a mirror.
///
/// Failures on individual files or directories are recorded in `log` and the
/// walk carries on. Only a failure to create `dst` itself is returned.
pub fn merge_tree(src: &Path, dst: &Path, log: &mut RestoreLog) -> io::Result<MergeStats> {
    fs::create_dir_all(dst)?;
    let mut stats = MergeStats::default();

    for entry in WalkDir::new(src)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                stats.failures += 1;
                log.push(LogTag::Warn, format!("walk {}: {}", src.display(), e));
                continue;
            }
        };

        let rel = match entry.path().strip_prefix(src) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            if target.is_dir() {
                continue;
            }
            match fs::create_dir_all(&target) {
                Ok(()) => stats.dirs_created += 1,
                Err(e) => {
                    stats.failures += 1;
                    log.push(LogTag::Warn, format!("mkdir {}: {}", target.display(), e));
                }
            }
        } else {
            match atomic_copy(entry.path(), &target) {
                Ok(()) => stats.files_copied += 1,
                Err(e) => {
                    stats.failures += 1;
                    log.push(
                        LogTag::Err,
                        format!(
                            "copy {} -> {}: {}",
                            entry.path().display(),
                            target.display(),
                            e
                        ),
                    );
                }
            }
        }
    }

    debug!(
        src = %src.display(),
        dst = %dst.display(),
        files = stats.files_copied,
        failures = stats.failures,
        "Tree merge finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, bytes: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_merge_keeps_destination_only_files() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write(&src.join("interfaces/eth0.db"), b"DEADBEEF");
        write(&src.join("vnstat.db"), b"new");
        write(&dst.join("vnstat.db"), b"old");
        write(&dst.join("local-only/keep.me"), b"untouched");

        let mut log = RestoreLog::new();
        let stats = merge_tree(&src, &dst, &mut log).unwrap();

        assert_eq!(stats.files_copied, 2);
        assert_eq!(stats.failures, 0);
        assert!(log.is_empty());
        assert_eq!(fs::read(dst.join("interfaces/eth0.db")).unwrap(), b"DEADBEEF");
        assert_eq!(fs::read(dst.join("vnstat.db")).unwrap(), b"new");
        assert_eq!(fs::read(dst.join("local-only/keep.me")).unwrap(), b"untouched");
    }

    #[test]
    fn test_merge_creates_empty_directories() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("empty/nested")).unwrap();
        let dst = dir.path().join("dst");

        let mut log = RestoreLog::new();
        let stats = merge_tree(&src, &dst, &mut log).unwrap();

        assert!(dst.join("empty/nested").is_dir());
        assert_eq!(stats.dirs_created, 2);
    }

    #[test]
    fn test_merge_continues_past_a_failing_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write(&src.join("a.db"), b"a");
        write(&src.join("b/blocked.db"), b"b");
        write(&src.join("c.db"), b"c");
        // A regular file where the merge needs a directory.
        write(&dst.join("b"), b"not a directory");

        let mut log = RestoreLog::new();
        let stats = merge_tree(&src, &dst, &mut log).unwrap();

        assert_eq!(fs::read(dst.join("a.db")).unwrap(), b"a");
        assert_eq!(fs::read(dst.join("c.db")).unwrap(), b"c");
        assert!(stats.failures >= 1);
        assert!(log.has_problems());
    }
}
