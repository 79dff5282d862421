//! Error handling utilities for the ranet-vault application.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions that might occur in the application, as well as the
//! convenience type alias `AppResult` for functions that can return these errors.
//!
//! Most backup and restore failures never reach `AppError`: the file movers
//! return them to the restore pipeline, which records them as log lines. Only
//! structural failures (unreadable archive, missing workspace) propagate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Outcome of a failed rename, classified so the relocator can decide on a
/// fallback with a `match` instead of inspecting raw OS errors.
///
/// # Examples
///
/// ```
/// use ranet_vault::errors::RelocateError;
/// use std::io::{self, ErrorKind};
/// use std::path::Path;
///
/// let err = RelocateError::classify(
///     io::Error::from(ErrorKind::CrossesDevices),
///     Path::new("/tmp/a"),
///     Path::new("/srv/a"),
/// );
/// assert!(matches!(err, RelocateError::CrossDevice { .. }));
/// ```
#[derive(Debug, Error)]
pub enum RelocateError {
    /// Source and destination live on different filesystems (`EXDEV`).
    #[error("cannot rename {from} -> {to} across filesystems: {source}")]
    CrossDevice {
        /// Rename source
        from: PathBuf,
        /// Rename destination
        to: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The source path does not exist.
    #[error("source not found: {from}")]
    NotFound {
        /// Missing source path
        from: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The destination is a directory that still has content (`ENOTEMPTY`).
    #[error("destination directory {to} is not empty: {source}")]
    DestinationOccupied {
        /// Occupied destination
        to: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Any other rename failure (permissions, missing parent, ...).
    #[error("move {from} -> {to}: {source}")]
    Io {
        /// Rename source
        from: PathBuf,
        /// Rename destination
        to: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl RelocateError {
    /// Classifies a rename error by its `ErrorKind`.
    pub fn classify(source: io::Error, from: &std::path::Path, to: &std::path::Path) -> Self {
        match source.kind() {
            io::ErrorKind::CrossesDevices => RelocateError::CrossDevice {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            },
            io::ErrorKind::NotFound if !from.exists() => RelocateError::NotFound {
                from: from.to_path_buf(),
                source,
            },
            io::ErrorKind::DirectoryNotEmpty => RelocateError::DestinationOccupied {
                to: to.to_path_buf(),
                source,
            },
            // Some platforms report EEXIST for a non-empty target directory.
            io::ErrorKind::AlreadyExists if to.is_dir() => RelocateError::DestinationOccupied {
                to: to.to_path_buf(),
                source,
            },
            _ => RelocateError::Io {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            },
        }
    }
}

/// Failures reading, extracting or validating a backup archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file does not exist.
    #[error("archive not found: {0}")]
    Missing(PathBuf),

    /// The archive cannot be opened or listed.
    #[error("cannot read archive {path}: {source}")]
    Unreadable {
        /// Archive path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The archive could not be unpacked into the workspace.
    #[error("cannot extract archive {path}: {source}")]
    Extract {
        /// Archive path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Neither payload was found after extraction.
    #[error("archive does not contain the expected content (no {settings} or {daemon_state})")]
    NoRecognizedPayload {
        /// Settings store entry name
        settings: &'static str,
        /// Daemon-state entry name
        daemon_state: &'static str,
    },

    /// The file handed in is not a `.tgz` archive.
    #[error("archive must have a .{expected} extension: {path}")]
    WrongExtension {
        /// Offending path
        path: PathBuf,
        /// Expected extension
        expected: &'static str,
    },
}

/// Failures running the dependent service's control commands.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The control command could not be spawned.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        /// Command line that failed
        command: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The control command exited unsuccessfully.
    #[error("'{command}' exited with status {status}: {output}")]
    Failed {
        /// Command line that failed
        command: String,
        /// Exit status code, -1 when killed by a signal
        status: i32,
        /// Combined stdout/stderr
        output: String,
    },

    /// The control command did not finish in time.
    #[error("'{command}' timed out after {secs}s")]
    Timeout {
        /// Command line that timed out
        command: String,
        /// Timeout in seconds
        secs: u64,
    },
}

/// Represents all possible errors that can occur in the ranet-vault application.
///
/// # Examples
///
/// ```
/// use ranet_vault::errors::AppError;
///
/// let error = AppError::Config("Backup directory must be absolute".to_string());
/// assert_eq!(
///     format!("{}", error),
///     "Configuration error: Backup directory must be absolute"
/// );
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors reading or validating an archive.
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Errors moving a payload into place.
    #[error("Relocation error: {0}")]
    Relocate(#[from] RelocateError),

    /// Errors controlling the dependent service.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Errors receiving or sending archive documents.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Errors posting or editing operator progress messages.
    #[error("Progress error: {0}")]
    Progress(String),
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
pub type AppResult<T> = Result<T, AppError>;
