//! End-to-end restore of a backup archive onto the live system.
//!
//! The run walks a fixed sequence of states:
//!
//! Preparing -> Inspecting -> Extracting -> Validating -> Quiescing ->
//! Relocating -> Resuming -> CleaningUp -> Done
//!
//! A failure up to and including Validating aborts the run before any live
//! path is touched; the scratch workspace is still removed. From Quiescing on
//! nothing aborts: relocation failures are logged per payload and the service
//! is always started again.

use crate::archive::{check_payloads, extract_archive, preview, PayloadCheck};
use crate::collaborators::{ProgressReporter, ProgressSink, ServiceController};
use crate::config::{QuiescePolicy, VaultContext};
use crate::constants::{SCRATCH_DIR_PREFIX, TIMESTAMP_FORMAT};
use crate::errors::ArchiveError;
use crate::fs_ops::relocate;
use crate::restore_log::{LogTag, RestoreLog};
use chrono::Local;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::{info, info_span, Instrument};

/// States of one restore run, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RestoreState {
    Preparing,
    Inspecting,
    Extracting,
    Validating,
    Quiescing,
    Relocating,
    Resuming,
    CleaningUp,
    Done,
}

impl fmt::Display for RestoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Every state ran; check the log for per-payload errors.
    Completed,
    /// The run stopped in `state` before touching live paths.
    Aborted { state: RestoreState, reason: String },
}

/// What a restore run hands back to its caller.
#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub log: RestoreLog,
    pub outcome: RestoreOutcome,
    /// States entered, in order.
    pub states: Vec<RestoreState>,
}

impl RestoreReport {
    /// Completed without any `ERR` record.
    pub fn is_clean(&self) -> bool {
        self.outcome == RestoreOutcome::Completed && self.log.count(LogTag::Err) == 0
    }

    /// The accumulated log as one string.
    pub fn render(&self) -> String {
        self.log.render()
    }
}

/// Drives a restore against the live paths of a [`VaultContext`].
pub struct RestoreOrchestrator<'a> {
    ctx: &'a VaultContext,
    service: &'a dyn ServiceController,
    progress: &'a dyn ProgressSink,
}

struct Run<'a> {
    log: RestoreLog,
    states: Vec<RestoreState>,
    reporter: ProgressReporter<'a>,
}

impl<'a> Run<'a> {
    /// Records the transition in both logs, then updates the operator.
    async fn enter(&mut self, state: RestoreState, progress: &str) {
        info!(state = %state, "Restore state transition");
        self.log.push(LogTag::Ok, format!("state {}", state));
        self.states.push(state);
        self.reporter.update(progress).await;
    }

    /// Removes the progress message and hands the log back.
    async fn finish(mut self, outcome: RestoreOutcome) -> RestoreReport {
        self.reporter.clear().await;
        RestoreReport {
            log: self.log,
            outcome,
            states: self.states,
        }
    }
}

impl<'a> RestoreOrchestrator<'a> {
    pub fn new(
        ctx: &'a VaultContext,
        service: &'a dyn ServiceController,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        RestoreOrchestrator {
            ctx,
            service,
            progress,
        }
    }

    /// Restores `archive` onto the live paths, streaming progress.
    ///
    /// Never fails: every problem ends up in the returned log, and the
    /// outcome tells whether the run was aborted before relocation.
    pub async fn restore_with_progress(&self, archive: &Path) -> RestoreReport {
        let span = info_span!("restore", archive = %archive.display());
        self.run(archive).instrument(span).await
    }

    async fn run(&self, archive: &Path) -> RestoreReport {
        let mut run = Run {
            log: RestoreLog::new(),
            states: Vec::new(),
            reporter: ProgressReporter::new(self.progress),
        };

        if !archive.is_file() {
            let reason = ArchiveError::Missing(archive.to_path_buf()).to_string();
            run.log.push(LogTag::Err, reason.clone());
            return run
                .finish(RestoreOutcome::Aborted {
                    state: RestoreState::Preparing,
                    reason,
                })
                .await;
        }

        run.enter(RestoreState::Preparing, "⏳ Preparing restore…").await;
        let workspace = match self.create_workspace() {
            Ok(ws) => {
                run.log.push(
                    LogTag::Ok,
                    format!("workspace {}", ws.path().display()),
                );
                ws
            }
            Err(e) => {
                let reason = format!("cannot create workspace: {}", e);
                run.log.push(LogTag::Err, reason.clone());
                run.reporter.update("❌ Could not create a workspace.").await;
                return run
                    .finish(RestoreOutcome::Aborted {
                        state: RestoreState::Preparing,
                        reason,
                    })
                    .await;
            }
        };

        let payloads = match self.stage(&mut run, archive, workspace.path()).await {
            Ok(payloads) => payloads,
            Err((state, reason)) => {
                self.clean_up(&mut run, workspace).await;
                return run.finish(RestoreOutcome::Aborted { state, reason }).await;
            }
        };

        let quiesce = match self.ctx.quiesce {
            QuiescePolicy::Always => true,
            QuiescePolicy::WhenDaemonStatePresent => payloads.daemon_state.is_some(),
        };

        let name = &self.ctx.service_name;
        if quiesce {
            run.enter(
                RestoreState::Quiescing,
                &format!("🛑 Stopping service {}…", name),
            )
            .await;
            self.stop_service(&mut run).await;
        } else {
            run.enter(
                RestoreState::Quiescing,
                &format!("⏭ Leaving service {} running…", name),
            )
            .await;
            run.log.push(
                LogTag::Ok,
                format!("service {} left running (no daemon-state payload)", name),
            );
        }

        run.enter(RestoreState::Relocating, "🚚 Moving files into place…")
            .await;
        if let Some(src) = &payloads.settings_db {
            self.restore_settings(&mut run.log, src);
        }
        if let Some(src) = &payloads.daemon_state {
            self.restore_daemon_state(&mut run.log, src);
        }

        if quiesce {
            run.enter(
                RestoreState::Resuming,
                &format!("🔁 Starting service {}…", name),
            )
            .await;
            self.start_service(&mut run).await;
        } else {
            run.enter(
                RestoreState::Resuming,
                &format!("🔁 Service {} was not stopped.", name),
            )
            .await;
        }

        self.clean_up(&mut run, workspace).await;

        run.enter(RestoreState::Done, "✅ Restore finished.").await;
        run.finish(RestoreOutcome::Completed).await
    }

    fn create_workspace(&self) -> std::io::Result<TempDir> {
        fs::create_dir_all(&self.ctx.scratch_root)?;
        let prefix = format!(
            "{}{}-",
            SCRATCH_DIR_PREFIX,
            Local::now().format(TIMESTAMP_FORMAT)
        );
        tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(&self.ctx.scratch_root)
    }

    /// Inspecting, Extracting and Validating. An `Err` names the state that
    /// failed and why; no live path has been touched at that point.
    async fn stage(
        &self,
        run: &mut Run<'_>,
        archive: &Path,
        workspace: &Path,
    ) -> Result<PayloadCheck, (RestoreState, String)> {
        run.enter(RestoreState::Inspecting, "🔍 Inspecting archive…")
            .await;
        let listing = match preview(archive) {
            Ok(listing) => listing,
            Err(e) => {
                let reason = e.to_string();
                run.log.push(LogTag::Err, reason.clone());
                run.reporter.update("❌ Could not read the archive.").await;
                return Err((RestoreState::Inspecting, reason));
            }
        };
        run.log.push(
            LogTag::Ok,
            format!(
                "archive {} ({} bytes, {}{} entries)",
                archive.display(),
                listing.size_bytes,
                listing.entries.len(),
                if listing.truncated { "+" } else { "" }
            ),
        );
        run.reporter
            .update(&format!("🔍 Inspecting archive…\n{}", listing.render()))
            .await;

        run.enter(RestoreState::Extracting, "📦 Extracting archive…")
            .await;
        if let Err(e) = extract_archive(archive, workspace) {
            let reason = e.to_string();
            run.log.push(LogTag::Err, format!("extract: {}", reason));
            run.reporter.update("❌ Extracting the archive failed.").await;
            return Err((RestoreState::Extracting, reason));
        }
        run.log
            .push(LogTag::Ok, format!("Extracted to {}", workspace.display()));

        run.enter(RestoreState::Validating, "🧪 Validating content…")
            .await;
        let payloads = check_payloads(workspace, &mut run.log);
        run.reporter
            .update(&format!("🧪 Validating content…\n{}", run.log.tail(4)))
            .await;
        if let Err(e) = payloads.require_any() {
            let reason = e.to_string();
            run.log.push(LogTag::Err, reason.clone());
            run.reporter
                .update("❌ Archive does not contain the expected content.")
                .await;
            return Err((RestoreState::Validating, reason));
        }

        Ok(payloads)
    }

    async fn stop_service(&self, run: &mut Run<'_>) {
        let name = &self.ctx.service_name;
        match self.service.stop(name).await {
            Ok(status) => run
                .log
                .push(LogTag::Ok, with_status(format!("service {} stopped", name), &status)),
            Err(e) => run.log.push(LogTag::Warn, format!("service stop: {}", e)),
        }
        self.settle().await;
    }

    async fn start_service(&self, run: &mut Run<'_>) {
        let name = &self.ctx.service_name;
        match self.service.start(name).await {
            Ok(status) => run
                .log
                .push(LogTag::Ok, with_status(format!("service {} started", name), &status)),
            Err(e) => run.log.push(LogTag::Warn, format!("service start: {}", e)),
        }
        self.settle().await;
        match self.service.query(name).await {
            Ok(status) => run
                .log
                .push(LogTag::Ok, format!("service {} status: {}", name, status)),
            Err(e) => run.log.push(LogTag::Warn, format!("service status: {}", e)),
        }
    }

    async fn settle(&self) {
        if !self.ctx.settle.is_zero() {
            tokio::time::sleep(self.ctx.settle).await;
        }
    }

    fn restore_settings(&self, log: &mut RestoreLog, src: &Path) {
        let dst = &self.ctx.live.settings_db;
        if let Some(parent) = dst.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log.push(LogTag::Err, format!("restore settings-db: {}", e));
                return;
            }
        }
        if relocate(src, dst, log).is_err() {
            return;
        }
        #[cfg(unix)]
        if let Err(e) = set_mode(dst, crate::constants::SETTINGS_DB_MODE) {
            log.push(LogTag::Warn, format!("chmod settings-db: {}", e));
        }
    }

    fn restore_daemon_state(&self, log: &mut RestoreLog, src: &Path) {
        let dst = &self.ctx.live.daemon_state_dir;
        if let Err(e) = fs::create_dir_all(dst) {
            log.push(LogTag::Err, format!("restore daemon-state: {}", e));
            return;
        }
        if relocate(src, dst, log).is_err() {
            return;
        }
        #[cfg(unix)]
        {
            let failures = normalize_tree_modes(dst);
            if failures > 0 {
                log.push(
                    LogTag::Warn,
                    format!("chmod daemon-state: {} entries not updated", failures),
                );
            }
        }
    }

    async fn clean_up(&self, run: &mut Run<'_>, workspace: TempDir) {
        run.enter(RestoreState::CleaningUp, "🧹 Cleaning up…").await;
        let path = workspace.path().to_path_buf();
        match workspace.close() {
            Ok(()) => run
                .log
                .push(LogTag::Clean, format!("workspace {} removed", path.display())),
            Err(e) => run.log.push(LogTag::Warn, format!("cleanup: {}", e)),
        }
    }
}

fn with_status(mut line: String, status: &str) -> String {
    let status = status.trim();
    if !status.is_empty() {
        line.push_str(": ");
        line.push_str(status);
    }
    line
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Directories to 0o755, files to 0o644. Returns how many entries failed.
#[cfg(unix)]
fn normalize_tree_modes(root: &Path) -> usize {
    use crate::constants::{DAEMON_STATE_DIR_MODE, DAEMON_STATE_FILE_MODE};

    let mut failures = 0;
    for entry in walkdir::WalkDir::new(root).min_depth(1).follow_links(false) {
        let result = match &entry {
            Ok(e) if e.file_type().is_dir() => set_mode(e.path(), DAEMON_STATE_DIR_MODE),
            Ok(e) if e.file_type().is_file() => set_mode(e.path(), DAEMON_STATE_FILE_MODE),
            Ok(_) => Ok(()),
            Err(_) => Err(std::io::Error::other("walk failed")),
        };
        if result.is_err() {
            failures += 1;
        }
    }
    failures
}
