//! Server lifecycle state machine
//!
//! ```text
//! Stopped ──start()──► Starting ──bind ok──► Running ──stop()──► Stopping ──► Stopped
//!                          │
//!                          └──bind failed──► Stopped
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

/// Server lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    /// Not listening
    Stopped = 0,
    /// Binding the listening socket
    Starting = 1,
    /// Accepting viewers and broadcasting frames
    Running = 2,
    /// Workers are being shut down
    Stopping = 3,
}

impl ServerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ServerState::Starting,
            2 => ServerState::Running,
            3 => ServerState::Stopping,
            _ => ServerState::Stopped,
        }
    }
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServerState::Stopped => "stopped",
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Atomically observed lifecycle state owned by one server instance
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub fn new(state: ServerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> ServerState {
        ServerState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ServerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move from `from` to `to`; fails with the actual state otherwise
    pub fn transition(&self, from: ServerState, to: ServerState) -> Result<(), ServerState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ServerState::from_u8)
    }
}
