//! Constants used throughout the application.
//!
//! Archive entry names, default live paths, environment variable names and
//! permission modes live here so the builder, the inspector and the restore
//! pipeline agree on them.

// Application Metadata
/// The name of the application.
pub const APP_NAME: &str = "ranet-vault";
/// The description of the application used in CLI help text.
pub const APP_DESCRIPTION: &str = "Backup and restore for the ranet bot database and vnstat state";

// Archive layout
/// Archive entry holding the settings/history store file.
pub const ARCHIVE_SETTINGS_ENTRY: &str = "opt/ranet-bot/speedtest.db";
/// Archive entry holding the daemon-state directory tree.
pub const ARCHIVE_DAEMON_STATE_ENTRY: &str = "var/lib/vnstat";
/// Maximum number of entry names shown in an archive preview.
pub const PREVIEW_ENTRY_LIMIT: usize = 50;
/// File extension accepted for archives handed in for restore.
pub const ARCHIVE_EXTENSION: &str = "tgz";
/// Prefix of archives produced by a full backup.
pub const BACKUP_FILE_PREFIX: &str = "ranet-backup-";
/// Prefix of received archives staged for restore.
pub const STAGED_FILE_PREFIX: &str = "restore-";
/// Prefix of scratch workspaces created by a restore run.
pub const SCRATCH_DIR_PREFIX: &str = "ranet-restore-";
/// Prefix of temporary siblings written by the atomic file mover.
pub const ATOMIC_TEMP_PREFIX: &str = ".__tmp.";
/// Timestamp format used in archive, staging and workspace names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

// Defaults
/// Default location of the live settings/history store.
pub const DEFAULT_SETTINGS_DB_PATH: &str = "/opt/ranet-bot/speedtest.db";
/// Default location of the live vnstat database directory.
pub const DEFAULT_DAEMON_STATE_DIR: &str = "/etc/vnstat";
/// Default directory for produced and staged archives.
pub const DEFAULT_BACKUP_DIR: &str = "/tmp";
/// Default dependent service name.
pub const DEFAULT_SERVICE_NAME: &str = "vnstat";
/// Default directory containing init scripts.
pub const DEFAULT_INIT_DIR: &str = "/etc/init.d";
/// Default pause after stopping or starting the service, in milliseconds.
pub const DEFAULT_SETTLE_MS: u64 = 1000;
/// Per-command timeout for service control, in seconds.
pub const SERVICE_COMMAND_TIMEOUT_SECS: u64 = 10;

// Environment Variables
/// Environment variable overriding the live settings store path.
pub const ENV_VAR_DB_PATH: &str = "RANET_DB_PATH";
/// Environment variable overriding the live daemon-state directory.
pub const ENV_VAR_DAEMON_STATE_DIR: &str = "VNSTAT_DB_DIR";
/// Environment variable overriding the backup directory.
pub const ENV_VAR_BACKUP_DIR: &str = "RANET_BACKUP_DIR";
/// Environment variable overriding the scratch root.
pub const ENV_VAR_SCRATCH_DIR: &str = "RANET_SCRATCH_DIR";
/// Environment variable overriding the dependent service name.
pub const ENV_VAR_SERVICE_NAME: &str = "RANET_SERVICE_NAME";
/// Environment variable overriding the init script directory.
pub const ENV_VAR_INIT_DIR: &str = "RANET_INIT_DIR";
/// Environment variable overriding the settle pause.
pub const ENV_VAR_SETTLE_MS: &str = "RANET_SETTLE_MS";
/// Environment variable selecting the quiesce policy.
pub const ENV_VAR_QUIESCE: &str = "RANET_QUIESCE";

// Permissions applied after restore
/// Mode applied to the restored settings store.
#[cfg(unix)]
pub const SETTINGS_DB_MODE: u32 = 0o640;
/// Mode applied to directories under the restored daemon state.
#[cfg(unix)]
pub const DAEMON_STATE_DIR_MODE: u32 = 0o755;
/// Mode applied to files under the restored daemon state.
#[cfg(unix)]
pub const DAEMON_STATE_FILE_MODE: u32 = 0o644;

// Logging Configuration
/// Log format identifier for plain text.
pub const LOG_FORMAT_TEXT: &str = "text";
/// Log format identifier for JSON.
pub const LOG_FORMAT_JSON: &str = "json";
/// Default log level; restore records are mirrored at info and would
/// interleave with the progress spinner.
pub const DEFAULT_LOG_LEVEL: &str = "warn";
/// Log level used with `--verbose`.
pub const VERBOSE_LOG_LEVEL: &str = "debug";
/// Service name used in tracing spans and structured logs.
pub const TRACING_SERVICE_NAME: &str = "ranet-vault";
/// Name for the root tracing span covering an application invocation.
pub const TRACING_ROOT_SPAN_NAME: &str = "app_invocation";
