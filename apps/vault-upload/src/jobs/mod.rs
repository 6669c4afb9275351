//! Job Polling Module
//!
//! Archive and inventory retrievals run as asynchronous jobs on the vault
//! service and typically take hours. A [`PollingStrategy`] waits for such a
//! job to reach a terminal state before its output is fetched.

pub mod poller;
pub mod types;

pub use poller::{PollingStrategy, ScheduledPoller};
pub use types::*;
