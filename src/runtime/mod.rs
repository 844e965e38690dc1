//! Reactor runtime for the Gopher server.
//!
//! Scheduling is single-threaded and cooperative per worker: every session
//! on a worker is multiplexed on one mio poll loop, so session-local state
//! is never touched concurrently and needs no locking. The only suspension
//! point is waiting for the next readiness notification.
//!
//! Shared abstractions:
//! - `Session`: per-connection state machine and buffers
//! - `event_loop`: accept/readable/writable dispatch and teardown

mod event_loop;
mod session;

pub(crate) use session::{Phase, Session};

use crate::config::Config;

/// Run the server event loops until a fatal listener-level error.
pub fn run(config: Config) -> std::io::Result<()> {
    event_loop::run(config)
}
