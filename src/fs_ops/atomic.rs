//! Atomic placement of a single file.
//!
//! The source is copied into a temporary sibling of the destination and then
//! renamed over it. Because the sibling sits in the destination directory the
//! rename never crosses a filesystem, so readers of the destination see either
//! the old bytes or the complete new bytes.

use crate::constants::ATOMIC_TEMP_PREFIX;
use chrono::Utc;
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Copies `src` onto `dst` atomically, preserving permission bits and
/// access/modification times.
///
/// Parent directories of `dst` are created when missing. If the copy fails
/// the destination is untouched and the partially written temporary file is
/// left where it is; its path is part of the returned error. A failed rename
/// is returned as-is without cleanup.
///
/// # Examples
///
/// ```no_run
/// use ranet_vault::fs_ops::atomic_copy;
/// use std::path::Path;
///
/// atomic_copy(Path::new("/tmp/stage/speedtest.db"), Path::new("/opt/ranet-bot/speedtest.db"))?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn atomic_copy(src: &Path, dst: &Path) -> io::Result<()> {
    atomic_copy_with(src, dst, copy_with_times)
}

/// Same as [`atomic_copy`] with the copy step supplied by the caller.
pub(crate) fn atomic_copy_with<F>(src: &Path, dst: &Path, copy: F) -> io::Result<()>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let parent = match dst.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let tmp = parent.join(temp_name());
    copy(src, &tmp).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!(
                "copy {} -> {} failed: {}",
                src.display(),
                tmp.display(),
                e
            ),
        )
    })?;

    fs::rename(&tmp, dst)?;
    debug!(src = %src.display(), dst = %dst.display(), "Atomic copy completed");
    Ok(())
}

/// `.__tmp.<pid>.<millis>`; unique within one process for sequential calls.
fn temp_name() -> String {
    format!(
        "{}{}.{}",
        ATOMIC_TEMP_PREFIX,
        std::process::id(),
        Utc::now().timestamp_millis()
    )
}

fn copy_with_times(src: &Path, tmp: &Path) -> io::Result<()> {
    // fs::copy carries the permission bits over; timestamps need a second pass.
    fs::copy(src, tmp)?;
    let meta = fs::metadata(src)?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    // Read-only handle: the copied mode may forbid writing.
    File::open(tmp)?.set_times(times)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_copy_creates_parents_and_content() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.db");
        fs::write(&src, b"speedtest-rows=42").unwrap();
        let dst = dir.path().join("a/b/c/dst.db");

        atomic_copy(&src, &dst).unwrap();

        assert_eq!(fs::read(&dst).unwrap(), b"speedtest-rows=42");
        assert!(src.exists(), "source must be left in place");
    }

    #[test]
    fn test_copy_replaces_existing_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::write(&src, b"new").unwrap();
        fs::write(&dst, b"old content that is longer").unwrap();

        atomic_copy(&src, &dst).unwrap();

        assert_eq!(fs::read(&dst).unwrap(), b"new");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(ATOMIC_TEMP_PREFIX))
            .collect();
        assert!(leftovers.is_empty(), "temporary sibling must be renamed away");
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::write(&src, b"x").unwrap();
        let past = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        File::options()
            .write(true)
            .open(&src)
            .unwrap()
            .set_times(FileTimes::new().set_modified(past).set_accessed(past))
            .unwrap();
        let dst = dir.path().join("dst");

        atomic_copy(&src, &dst).unwrap();

        assert_eq!(fs::metadata(&dst).unwrap().modified().unwrap(), past);
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_preserves_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::write(&src, b"x").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o600)).unwrap();
        let dst = dir.path().join("dst");

        atomic_copy(&src, &dst).unwrap();

        let mode = fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_fault_mid_copy_leaves_destination_untouched() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::write(&src, b"0123456789").unwrap();
        fs::write(&dst, b"previous").unwrap();

        let result = atomic_copy_with(&src, &dst, |s, tmp| {
            let bytes = fs::read(s)?;
            let mut f = File::create(tmp)?;
            f.write_all(&bytes[..bytes.len() / 2])?;
            Err(io::Error::other("disk full"))
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert_eq!(fs::read(&dst).unwrap(), b"previous");
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("dst");
        fs::write(&dst, b"keep").unwrap();

        assert!(atomic_copy(&dir.path().join("nope"), &dst).is_err());
        assert_eq!(fs::read(&dst).unwrap(), b"keep");
    }
}
