//! Collaborators the backup/restore core talks to but does not own.
//!
//! - `service`: stopping and starting the daemon whose state is restored
//! - `progress`: operator-facing progress messages
//! - `transport`: receiving archives and handing built ones back

pub mod progress;
pub mod service;
pub mod transport;

pub use self::progress::{MessageHandle, ProgressReporter, ProgressSink, SpinnerProgress};
pub use self::service::{InitScriptService, ServiceController};
pub use self::transport::{DocumentTransport, LocalTransport};
