//! Getting archives from, and handing archives back to, the operator.

use crate::errors::{AppError, AppResult};
use crate::fs_ops::atomic_copy;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Source of incoming archives and sink for outgoing ones.
#[async_trait]
pub trait DocumentTransport: Send + Sync {
    /// Produces a local path holding the operator's archive.
    async fn receive(&self) -> AppResult<PathBuf>;
    /// Delivers a local archive to the operator.
    async fn send(&self, path: &Path) -> AppResult<()>;
}

/// Transport backed by the local filesystem: incoming archives are given by
/// path, outgoing ones are copied into an outbox directory.
#[derive(Debug, Clone)]
pub struct LocalTransport {
    incoming: Option<PathBuf>,
    outbox: PathBuf,
}

impl LocalTransport {
    pub fn new(incoming: Option<PathBuf>, outbox: impl Into<PathBuf>) -> Self {
        LocalTransport {
            incoming,
            outbox: outbox.into(),
        }
    }
}

#[async_trait]
impl DocumentTransport for LocalTransport {
    async fn receive(&self) -> AppResult<PathBuf> {
        let path = self
            .incoming
            .as_ref()
            .ok_or_else(|| AppError::Transport("no incoming archive was given".to_string()))?;
        if !path.is_file() {
            return Err(AppError::Transport(format!(
                "incoming archive not found: {}",
                path.display()
            )));
        }
        Ok(path.clone())
    }

    async fn send(&self, path: &Path) -> AppResult<()> {
        let name = path.file_name().ok_or_else(|| {
            AppError::Transport(format!("not a file path: {}", path.display()))
        })?;
        let target = self.outbox.join(name);
        atomic_copy(path, &target)
            .map_err(|e| AppError::Transport(format!("copy to {}: {}", target.display(), e)))?;
        info!("Archive delivered to {:?}", target);
        Ok(())
    }
}
