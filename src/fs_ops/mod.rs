//! Filesystem primitives used to put restored payloads into place.
//!
//! - `atomic`: copy a single file onto its destination with one rename
//! - `merge`: best-effort recursive merge of a directory tree
//! - `relocate`: rename with a copy+delete fallback across filesystems

pub mod atomic;
pub mod merge;
pub mod relocate;

pub use self::atomic::atomic_copy;
pub use self::merge::{merge_tree, MergeStats};
pub use self::relocate::{relocate, relocate_with, Relocation};
