//! Controlling the dependent service (vnstat) around a restore.

use crate::constants::SERVICE_COMMAND_TIMEOUT_SECS;
use crate::errors::ServiceError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Stop/start/status for a named service. Each call returns the command's
/// output as status text.
#[async_trait]
pub trait ServiceController: Send + Sync {
    async fn stop(&self, name: &str) -> Result<String, ServiceError>;
    async fn start(&self, name: &str) -> Result<String, ServiceError>;
    async fn query(&self, name: &str) -> Result<String, ServiceError>;
}

/// Runs `<init_dir>/<name> stop|start|status`, as on OpenWrt-style systems.
#[derive(Debug, Clone)]
pub struct InitScriptService {
    init_dir: PathBuf,
    timeout: Duration,
}

impl InitScriptService {
    pub fn new(init_dir: impl Into<PathBuf>) -> Self {
        InitScriptService {
            init_dir: init_dir.into(),
            timeout: Duration::from_secs(SERVICE_COMMAND_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, name: &str, action: &str) -> Result<String, ServiceError> {
        let script = self.init_dir.join(name);
        let command = format!("{} {}", script.display(), action);
        debug!(%command, "Running service command");

        let mut cmd = Command::new(&script);
        cmd.arg(action)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(ServiceError::Spawn { command, source }),
            Err(_) => {
                return Err(ServiceError::Timeout {
                    command,
                    secs: self.timeout.as_secs(),
                })
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let text = text.trim_end().to_string();

        if output.status.success() {
            Ok(text)
        } else {
            Err(ServiceError::Failed {
                command,
                status: output.status.code().unwrap_or(-1),
                output: text,
            })
        }
    }
}

#[async_trait]
impl ServiceController for InitScriptService {
    async fn stop(&self, name: &str) -> Result<String, ServiceError> {
        self.run(name, "stop").await
    }

    async fn start(&self, name: &str) -> Result<String, ServiceError> {
        self.run(name, "start").await
    }

    async fn query(&self, name: &str) -> Result<String, ServiceError> {
        self.run(name, "status").await
    }
}
