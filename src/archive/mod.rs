//! The backup archive: building it and reading it back.
//!
//! Layout is fixed: `opt/ranet-bot/speedtest.db` (file) and
//! `var/lib/vnstat` (directory tree) inside one gzip-compressed tar.

pub mod builder;
pub mod inspect;

pub use self::builder::{build_archive, create_full_backup, BackupReport};
pub use self::inspect::{
    check_payloads, extract_archive, inspect_archive, preview, preview_archive, ArchivePreview,
    Inspection, PayloadCheck,
};
