use crate::constants::{APP_DESCRIPTION, APP_NAME, LOG_FORMAT_JSON, LOG_FORMAT_TEXT};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Backup and restore for the ranet bot database and vnstat state
#[derive(Parser, Debug)]
#[command(name = APP_NAME, about = APP_DESCRIPTION)]
#[command(author, version, long_about = None)]
pub struct CliArgs {
    /// Print verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, default_value = LOG_FORMAT_TEXT, value_parser = [LOG_FORMAT_TEXT, LOG_FORMAT_JSON])]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Build a full backup archive of the settings store and vnstat state
    Backup {
        /// Deliver the archive into this directory and delete the local copy
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// List an archive and check it carries a recognized payload
    Inspect {
        /// Archive to inspect (.tgz)
        archive: PathBuf,
    },
    /// Restore an archive onto the live system
    Restore {
        /// Archive to restore (.tgz)
        archive: PathBuf,
        /// Apply the restore; without it the archive is only previewed
        #[arg(short = 'y', long)]
        yes: bool,
        /// Print the restore log as JSON
        #[arg(long)]
        json: bool,
    },
}
