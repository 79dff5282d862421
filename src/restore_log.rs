//! Ordered, tagged log of one backup or restore run.
//!
//! The log is the only user-visible record of what a run did. Records are
//! append-only; rendering produces one `[TAG] message` line per record.

use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

/// Tag attached to each log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogTag {
    Ok,
    Warn,
    Err,
    Found,
    Miss,
    Move,
    Copy,
    Clean,
    Add,
}

impl LogTag {
    /// The bracketed label used when rendering.
    pub fn label(self) -> &'static str {
        match self {
            LogTag::Ok => "OK",
            LogTag::Warn => "WARN",
            LogTag::Err => "ERR",
            LogTag::Found => "FOUND",
            LogTag::Miss => "MISS",
            LogTag::Move => "MOVE",
            LogTag::Copy => "COPY",
            LogTag::Clean => "CLEAN",
            LogTag::Add => "ADD",
        }
    }

    /// Whether this tag signals that something went wrong.
    pub fn is_problem(self) -> bool {
        matches!(self, LogTag::Warn | LogTag::Err)
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One line of the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub tag: LogTag,
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.tag, self.message)
    }
}

/// Append-only sequence of tagged records.
///
/// # Examples
///
/// ```
/// use ranet_vault::restore_log::{LogTag, RestoreLog};
///
/// let mut log = RestoreLog::new();
/// log.push(LogTag::Found, "opt/ranet-bot/speedtest.db");
/// log.push(LogTag::Miss, "var/lib/vnstat directory");
/// assert_eq!(log.count(LogTag::Found), 1);
/// assert_eq!(
///     log.render(),
///     "[FOUND] opt/ranet-bot/speedtest.db\n[MISS] var/lib/vnstat directory"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RestoreLog {
    records: Vec<LogRecord>,
}

impl RestoreLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and mirrors it to `tracing`.
    pub fn push(&mut self, tag: LogTag, message: impl Into<String>) {
        let message = message.into();
        match tag {
            LogTag::Err => error!(tag = tag.label(), "{}", message),
            LogTag::Warn | LogTag::Miss => warn!(tag = tag.label(), "{}", message),
            _ => info!(tag = tag.label(), "{}", message),
        }
        self.records.push(LogRecord { tag, message });
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records carrying `tag`, in order.
    pub fn with_tag(&self, tag: LogTag) -> impl Iterator<Item = &LogRecord> {
        self.records.iter().filter(move |r| r.tag == tag)
    }

    pub fn count(&self, tag: LogTag) -> usize {
        self.with_tag(tag).count()
    }

    /// True when any `WARN` or `ERR` record was appended.
    pub fn has_problems(&self) -> bool {
        self.records.iter().any(|r| r.tag.is_problem())
    }

    /// The last `n` records rendered, used for progress snippets.
    pub fn tail(&self, n: usize) -> String {
        let start = self.records.len().saturating_sub(n);
        join_lines(&self.records[start..])
    }

    /// Renders every record as `[TAG] message`, one per line.
    pub fn render(&self) -> String {
        join_lines(&self.records)
    }
}

impl fmt::Display for RestoreLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn join_lines(records: &[LogRecord]) -> String {
    records
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
