//! Scheduler layer for the poller
//!
//! Owns the repeating tasks: the status poll loop over pending jobs and
//! the Horde heartbeat. Each task has an explicit start and stop instead of
//! living implicitly for the process lifetime.

pub mod heartbeat;
pub mod poller;

pub use heartbeat::spawn_heartbeat;
pub use poller::{PollConfig, PollLoop};
