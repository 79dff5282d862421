//! Configuration management for the ranet-vault application.
//!
//! This module handles loading and validating configuration settings from environment
//! variables, with defaults matching the deployed router layout.
//!
//! # Environment Variables
//!
//! - `RANET_DB_PATH`: live settings/history store (defaults to /opt/ranet-bot/speedtest.db)
//! - `VNSTAT_DB_DIR`: live vnstat database directory (defaults to /etc/vnstat)
//! - `RANET_BACKUP_DIR`: where archives are written and staged (defaults to /tmp)
//! - `RANET_SCRATCH_DIR`: root for restore workspaces (defaults to the system temp dir)
//! - `RANET_SERVICE_NAME`: service stopped during restore (defaults to vnstat)
//! - `RANET_INIT_DIR`: directory holding the service's init script (defaults to /etc/init.d)
//! - `RANET_SETTLE_MS`: pause after stopping/starting the service (defaults to 1000)
//! - `RANET_QUIESCE`: `always` or `daemon-state`

use crate::constants::{
    DEFAULT_BACKUP_DIR, DEFAULT_DAEMON_STATE_DIR, DEFAULT_INIT_DIR, DEFAULT_SERVICE_NAME,
    DEFAULT_SETTINGS_DB_PATH, DEFAULT_SETTLE_MS, ENV_VAR_BACKUP_DIR, ENV_VAR_DAEMON_STATE_DIR,
    ENV_VAR_DB_PATH, ENV_VAR_INIT_DIR, ENV_VAR_QUIESCE, ENV_VAR_SCRATCH_DIR,
    ENV_VAR_SERVICE_NAME, ENV_VAR_SETTLE_MS,
};
use crate::errors::{AppError, AppResult};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// When the dependent service is stopped around relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuiescePolicy {
    /// Stop and restart on every restore that passes validation.
    #[default]
    Always,
    /// Only when the archive carries the daemon-state payload.
    WhenDaemonStatePresent,
}

impl FromStr for QuiescePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(QuiescePolicy::Always),
            "daemon-state" | "daemon_state" => Ok(QuiescePolicy::WhenDaemonStatePresent),
            other => Err(AppError::Config(format!(
                "Unknown quiesce policy '{}'. Use 'always' or 'daemon-state'",
                other
            ))),
        }
    }
}

impl fmt::Display for QuiescePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuiescePolicy::Always => f.write_str("always"),
            QuiescePolicy::WhenDaemonStatePresent => f.write_str("daemon-state"),
        }
    }
}

/// The two live locations a backup reads and a restore replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivePaths {
    /// The settings/history store file.
    pub settings_db: PathBuf,
    /// The vnstat database directory.
    pub daemon_state_dir: PathBuf,
}

/// Everything one backup or restore call needs, passed explicitly.
#[derive(Debug, Clone)]
pub struct VaultContext {
    pub live: LivePaths,
    /// Produced archives and staged incoming archives.
    pub backup_dir: PathBuf,
    /// Parent of per-restore scratch workspaces.
    pub scratch_root: PathBuf,
    /// Dependent service stopped while payloads are moved.
    pub service_name: String,
    /// Pause after stopping and after starting the service.
    pub settle: Duration,
    pub quiesce: QuiescePolicy,
}

impl VaultContext {
    /// A context rooted in `root`, with no settle pause. Handy for tests and
    /// for restoring into an alternate tree.
    pub fn rooted_at(root: &Path) -> Self {
        VaultContext {
            live: LivePaths {
                settings_db: root.join("live/opt/ranet-bot/speedtest.db"),
                daemon_state_dir: root.join("live/etc/vnstat"),
            },
            backup_dir: root.join("backups"),
            scratch_root: root.join("scratch"),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            settle: Duration::ZERO,
            quiesce: QuiescePolicy::Always,
        }
    }
}

/// Configuration for the ranet-vault application.
#[derive(Debug, Clone)]
pub struct Config {
    pub settings_db: PathBuf,
    pub daemon_state_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub scratch_root: PathBuf,
    pub service_name: String,
    /// Directory holding the service's init script.
    pub init_dir: PathBuf,
    pub settle_ms: u64,
    pub quiesce: QuiescePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            settings_db: PathBuf::from(DEFAULT_SETTINGS_DB_PATH),
            daemon_state_dir: PathBuf::from(DEFAULT_DAEMON_STATE_DIR),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            scratch_root: env::temp_dir(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            init_dir: PathBuf::from(DEFAULT_INIT_DIR),
            settle_ms: DEFAULT_SETTLE_MS,
            quiesce: QuiescePolicy::Always,
        }
    }
}

fn expand_path(raw: &str, var: &str) -> AppResult<PathBuf> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| AppError::Config(format!("Failed to expand {}: {}", var, e)))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

fn path_from_env(var: &str, default: &Path) -> AppResult<PathBuf> {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => expand_path(raw.trim(), var),
        _ => Ok(default.to_path_buf()),
    }
}

impl Config {
    /// Loads configuration from environment variables with defaults.
    ///
    /// Paths go through `shellexpand`, so `~` and `$VAR` references work.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if path expansion fails, `RANET_SETTLE_MS`
    /// is not a number, or `RANET_QUIESCE` names an unknown policy.
    pub fn load() -> AppResult<Self> {
        let defaults = Config::default();

        let settle_ms = match env::var(ENV_VAR_SETTLE_MS) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                AppError::Config(format!("Invalid {} '{}': {}", ENV_VAR_SETTLE_MS, raw, e))
            })?,
            Err(_) => defaults.settle_ms,
        };

        let quiesce = match env::var(ENV_VAR_QUIESCE) {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.quiesce,
        };

        let service_name = env::var(ENV_VAR_SERVICE_NAME)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.service_name);

        Ok(Config {
            settings_db: path_from_env(ENV_VAR_DB_PATH, &defaults.settings_db)?,
            daemon_state_dir: path_from_env(ENV_VAR_DAEMON_STATE_DIR, &defaults.daemon_state_dir)?,
            backup_dir: path_from_env(ENV_VAR_BACKUP_DIR, &defaults.backup_dir)?,
            scratch_root: path_from_env(ENV_VAR_SCRATCH_DIR, &defaults.scratch_root)?,
            service_name,
            init_dir: path_from_env(ENV_VAR_INIT_DIR, &defaults.init_dir)?,
            settle_ms,
            quiesce,
        })
    }

    /// Validates that the configuration is usable.
    ///
    /// Every path must be non-empty and absolute, and the service name must be
    /// a plain name (it is joined onto the init directory).
    pub fn validate(&self) -> AppResult<()> {
        let paths = [
            ("Settings store path", &self.settings_db),
            ("Daemon-state directory", &self.daemon_state_dir),
            ("Backup directory", &self.backup_dir),
            ("Scratch directory", &self.scratch_root),
            ("Init script directory", &self.init_dir),
        ];
        for (label, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(AppError::Config(format!("{} is empty", label)));
            }
            if !path.is_absolute() {
                return Err(AppError::Config(format!(
                    "{} must be an absolute path: {}",
                    label,
                    path.display()
                )));
            }
        }

        if self.service_name.is_empty()
            || self.service_name.contains('/')
            || self.service_name.contains(char::is_whitespace)
        {
            return Err(AppError::Config(format!(
                "Invalid service name '{}'",
                self.service_name
            )));
        }

        Ok(())
    }

    /// The explicit context handed to backup and restore calls.
    pub fn context(&self) -> VaultContext {
        VaultContext {
            live: LivePaths {
                settings_db: self.settings_db.clone(),
                daemon_state_dir: self.daemon_state_dir.clone(),
            },
            backup_dir: self.backup_dir.clone(),
            scratch_root: self.scratch_root.clone(),
            service_name: self.service_name.clone(),
            settle: Duration::from_millis(self.settle_ms),
            quiesce: self.quiesce,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        ENV_VAR_DB_PATH,
        ENV_VAR_DAEMON_STATE_DIR,
        ENV_VAR_BACKUP_DIR,
        ENV_VAR_SCRATCH_DIR,
        ENV_VAR_SERVICE_NAME,
        ENV_VAR_INIT_DIR,
        ENV_VAR_SETTLE_MS,
        ENV_VAR_QUIESCE,
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        clear_env();
        let config = Config::load().unwrap();

        assert_eq!(config.settings_db, PathBuf::from("/opt/ranet-bot/speedtest.db"));
        assert_eq!(config.daemon_state_dir, PathBuf::from("/etc/vnstat"));
        assert_eq!(config.backup_dir, PathBuf::from("/tmp"));
        assert_eq!(config.service_name, "vnstat");
        assert_eq!(config.settle_ms, 1000);
        assert_eq!(config.quiesce, QuiescePolicy::Always);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_load_overrides() {
        clear_env();
        env::set_var(ENV_VAR_DB_PATH, "/srv/bot/speedtest.db");
        env::set_var(ENV_VAR_DAEMON_STATE_DIR, "/var/lib/vnstat");
        env::set_var(ENV_VAR_SETTLE_MS, "0");
        env::set_var(ENV_VAR_QUIESCE, "daemon-state");

        let config = Config::load().unwrap();
        clear_env();

        assert_eq!(config.settings_db, PathBuf::from("/srv/bot/speedtest.db"));
        assert_eq!(config.daemon_state_dir, PathBuf::from("/var/lib/vnstat"));
        assert_eq!(config.quiesce, QuiescePolicy::WhenDaemonStatePresent);
        assert_eq!(config.context().settle, Duration::ZERO);
    }

    #[test]
    #[serial]
    fn test_invalid_settle_ms() {
        clear_env();
        env::set_var(ENV_VAR_SETTLE_MS, "soon");
        let result = Config::load();
        clear_env();

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_relative_paths() {
        let config = Config {
            backup_dir: PathBuf::from("backups"),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(format!("{}", err).contains("Backup directory must be an absolute path"));
    }

    #[test]
    fn test_validate_rejects_service_with_slash() {
        let config = Config {
            service_name: "../vnstat".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_quiesce_policy_parse() {
        assert_eq!("ALWAYS".parse::<QuiescePolicy>().unwrap(), QuiescePolicy::Always);
        assert!("sometimes".parse::<QuiescePolicy>().is_err());
    }
}
