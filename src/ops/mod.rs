//! High-level backup and restore operations.
//!
//! This module provides the user-facing operations that orchestrate the
//! archive and filesystem primitives: the restore state machine and the
//! operator flows around it (send a backup, stage a received archive).

pub mod restore;
pub mod transfer;

// Re-export commonly used items
pub use restore::{RestoreOrchestrator, RestoreOutcome, RestoreReport, RestoreState};
pub use transfer::{backup_and_send, stage_restore, StagedArchive};
