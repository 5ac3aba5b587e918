//! Server lifecycle state shared between the owner and worker threads.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a server instance.
///
/// `Stopped -> Starting -> Running -> Stopping -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
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

/// Atomic cell holding a `ServerState`.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: ServerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ServerState {
        ServerState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: ServerState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move from `from` to `to`, returning false if the current state was
    /// not `from`.
    pub fn transition(&self, from: ServerState, to: ServerState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.load() == ServerState::Running
    }
}
