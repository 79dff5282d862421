//! Streaming restore progress to the operator.

use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

/// Opaque reference to a posted progress message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub u64);

/// Where progress text goes (a chat message, a terminal spinner, ...).
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn post(&self, text: &str) -> AppResult<MessageHandle>;
    async fn edit(&self, handle: MessageHandle, text: &str) -> AppResult<()>;
    async fn delete(&self, handle: MessageHandle) -> AppResult<()>;
}

/// Keeps one progress message up to date and swallows sink failures.
///
/// The first update posts a message, later ones edit it. If the sink errors
/// the failure is logged and the caller carries on.
pub struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    handle: Option<MessageHandle>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        ProgressReporter { sink, handle: None }
    }

    pub async fn update(&mut self, text: &str) {
        match self.handle {
            Some(handle) => {
                if let Err(e) = self.sink.edit(handle, text).await {
                    warn!("Progress edit failed: {}", e);
                }
            }
            None => match self.sink.post(text).await {
                Ok(handle) => self.handle = Some(handle),
                Err(e) => warn!("Progress post failed: {}", e),
            },
        }
    }

    /// Removes the progress message, if one was posted.
    pub async fn clear(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.sink.delete(handle).await {
                warn!("Progress delete failed: {}", e);
            }
        }
    }
}

/// Terminal spinner per posted message.
#[derive(Default)]
pub struct SpinnerProgress {
    next: AtomicU64,
    bars: Mutex<HashMap<u64, ProgressBar>>,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_bar<T>(&self, handle: MessageHandle, f: impl FnOnce(&ProgressBar) -> T) -> AppResult<T> {
        let bars = self
            .bars
            .lock()
            .map_err(|_| AppError::Progress("spinner registry poisoned".to_string()))?;
        let bar = bars
            .get(&handle.0)
            .ok_or_else(|| AppError::Progress(format!("unknown message {}", handle.0)))?;
        Ok(f(bar))
    }
}

#[async_trait]
impl ProgressSink for SpinnerProgress {
    async fn post(&self, text: &str) -> AppResult<MessageHandle> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .map_err(|e| AppError::Progress(e.to_string()))?
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
        bar.set_style(style);
        bar.set_message(text.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.bars
            .lock()
            .map_err(|_| AppError::Progress("spinner registry poisoned".to_string()))?
            .insert(id, bar);
        Ok(MessageHandle(id))
    }

    async fn edit(&self, handle: MessageHandle, text: &str) -> AppResult<()> {
        self.with_bar(handle, |bar| bar.set_message(text.to_string()))
    }

    async fn delete(&self, handle: MessageHandle) -> AppResult<()> {
        let bar = self
            .bars
            .lock()
            .map_err(|_| AppError::Progress("spinner registry poisoned".to_string()))?
            .remove(&handle.0);
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        Ok(())
    }
}
