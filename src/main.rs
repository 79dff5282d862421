/*!
# ranet-vault

Command-line front end for backing up and restoring a ranet bot host's
settings store and vnstat database.

## Usage

```
ranet-vault [OPTIONS] <COMMAND>

Commands:
  backup   Build a full backup archive of the settings store and vnstat state
  inspect  List an archive and check it carries a recognized payload
  restore  Restore an archive onto the live system

Options:
  -v, --verbose              Print verbose output
      --log-format <FORMAT>  Log output format [default: text] [possible values: text, json]
  -h, --help                 Print help
  -V, --version              Print version
```

## Configuration

- `RANET_DB_PATH`: live settings store (defaults to `/opt/ranet-bot/speedtest.db`)
- `VNSTAT_DB_DIR`: live vnstat database directory (defaults to `/etc/vnstat`)
- `RANET_BACKUP_DIR`: where archives are written and staged (defaults to `/tmp`)
- `RANET_SCRATCH_DIR`: parent of restore workspaces (defaults to the system temp dir)
- `RANET_SERVICE_NAME` / `RANET_INIT_DIR`: service stopped around a restore (`vnstat` in `/etc/init.d`)
- `RANET_SETTLE_MS`: pause after stopping and starting the service (defaults to 1000)
- `RANET_QUIESCE`: `always` or `daemon-state`
*/

use clap::Parser;
use ranet_vault::archive::{create_full_backup, inspect_archive};
use ranet_vault::cli::{CliArgs, Command};
use ranet_vault::collaborators::{InitScriptService, LocalTransport, SpinnerProgress};
use ranet_vault::config::{Config, VaultContext};
use ranet_vault::constants::{
    DEFAULT_LOG_LEVEL, LOG_FORMAT_JSON, TRACING_ROOT_SPAN_NAME, TRACING_SERVICE_NAME,
    VERBOSE_LOG_LEVEL,
};
use ranet_vault::errors::AppResult;
use ranet_vault::ops::{backup_and_send, stage_restore, RestoreOrchestrator, RestoreOutcome};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool, log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_LOG_LEVEL
        } else {
            DEFAULT_LOG_LEVEL
        })
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if log_format == LOG_FORMAT_JSON {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// The main entry point for the ranet-vault application.
///
/// Exits 0 on success, 1 when a restore or inspection found problems, and 2
/// when the command could not run at all.
#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.verbose, &args.log_format);

    let span = info_span!(TRACING_ROOT_SPAN_NAME, service = TRACING_SERVICE_NAME);
    match run(args).instrument(span).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: CliArgs) -> AppResult<bool> {
    debug!("CLI arguments: {:?}", args);

    info!("Loading configuration");
    let config = Config::load()?;
    config.validate()?;
    let ctx = config.context();

    match args.command {
        Command::Backup { out_dir } => run_backup(&ctx, out_dir).await,
        Command::Inspect { archive } => run_inspect(&ctx, &archive),
        Command::Restore { archive, yes, json } => {
            run_restore(&config, &ctx, archive, yes, json).await
        }
    }
}

async fn run_backup(ctx: &VaultContext, out_dir: Option<PathBuf>) -> AppResult<bool> {
    let report = match out_dir {
        Some(dir) => {
            let transport = LocalTransport::new(None, &dir);
            let report = backup_and_send(ctx, &transport).await?;
            println!("Backup delivered to {}", dir.display());
            report
        }
        None => {
            let report = create_full_backup(ctx)?;
            println!("Backup written to {}", report.archive_path.display());
            report
        }
    };

    println!("Size: {} bytes", report.archive_size);
    println!("BLAKE3: {}", report.checksum);
    println!("Took: {:.2?}", report.duration);
    println!("{}", report.summary());
    Ok(!report.log.has_problems())
}

fn run_inspect(ctx: &VaultContext, archive: &Path) -> AppResult<bool> {
    let inspection = inspect_archive(archive, &ctx.scratch_root)?;
    println!(
        "{} ({} bytes)",
        archive.display(),
        inspection.preview.size_bytes
    );
    println!("{}", inspection.preview.render());
    println!();
    println!("{}", inspection.log.render());
    Ok(inspection.payloads.has_any())
}

async fn run_restore(
    config: &Config,
    ctx: &VaultContext,
    archive: PathBuf,
    yes: bool,
    json: bool,
) -> AppResult<bool> {
    let transport = LocalTransport::new(Some(archive), &ctx.backup_dir);
    let staged = stage_restore(ctx, &transport).await?;
    println!(
        "Backup received ({} bytes). Contents:\n{}",
        staged.size_bytes,
        staged.preview.render()
    );

    if !yes {
        staged.discard()?;
        println!("Nothing restored. Re-run with --yes to apply this archive.");
        return Ok(true);
    }

    let service = InitScriptService::new(&config.init_dir);
    let progress = SpinnerProgress::new();
    let orchestrator = RestoreOrchestrator::new(ctx, &service, &progress);
    let report = staged.apply(&orchestrator).await;

    if json {
        let rendered = serde_json::to_string_pretty(&report.log).map_err(std::io::Error::from)?;
        println!("{}", rendered);
    } else {
        println!("{}", report.render());
    }

    if let RestoreOutcome::Aborted { state, reason } = &report.outcome {
        eprintln!("Restore aborted while {}: {}", state, reason);
    }
    Ok(report.is_clean())
}
