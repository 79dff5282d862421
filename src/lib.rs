/*!
# ranet-vault

ranet-vault backs up and restores the persistent state of a ranet bot host:
the bot's settings/history store and the vnstat traffic database directory.
Both travel together in one gzip-compressed tar archive.

## Core Features

- Build a full backup archive of the settings store and the vnstat state
- Preview and validate an archive without touching live data
- Restore an archive onto the live system: stop vnstat, move the payloads
  into place (falling back to copy+delete across filesystems), fix
  permissions, start vnstat again
- Stream restore progress to the operator and keep a tagged log of every step

## Architecture

- `archive`: building, listing, extracting and validating archives
- `fs_ops`: atomic single-file copy, tree merge, cross-device relocation
- `ops`: the restore state machine and the send/stage flows around it
- `collaborators`: service control, progress sink and document transport seams
- `restore_log`: the `[TAG] message` log collected during a run
- `config`: configuration loading and validation
- `cli`: command-line interface using clap
- `errors`: error handling infrastructure

## Usage Example

```rust,no_run
use ranet_vault::collaborators::{InitScriptService, SpinnerProgress};
use ranet_vault::ops::RestoreOrchestrator;
use ranet_vault::Config;
use std::path::Path;

#[tokio::main]
async fn main() -> ranet_vault::AppResult<()> {
    let config = Config::load()?;
    config.validate()?;
    let ctx = config.context();

    let service = InitScriptService::new(&config.init_dir);
    let progress = SpinnerProgress::new();
    let orchestrator = RestoreOrchestrator::new(&ctx, &service, &progress);

    let report = orchestrator
        .restore_with_progress(Path::new("/tmp/ranet-backup-20240101-120000.tgz"))
        .await;
    println!("{}", report.render());
    Ok(())
}
```
*/

/// Building, listing and extracting backup archives
pub mod archive;
/// Command-line interface for parsing and handling user arguments
pub mod cli;
/// Service control, progress and transport seams
pub mod collaborators;
/// Configuration loading and management
pub mod config;
/// Application-wide constants
pub mod constants;
/// Error types and utilities for error handling
pub mod errors;
/// Filesystem primitives for moving restored data into place
pub mod fs_ops;
/// Backup and restore operations
pub mod ops;
/// Tagged log collected during backup and restore runs
pub mod restore_log;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::{Config, LivePaths, QuiescePolicy, VaultContext};
pub use errors::{AppError, AppResult};
pub use restore_log::{LogTag, RestoreLog};
