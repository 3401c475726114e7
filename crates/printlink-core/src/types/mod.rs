//! Value types shared by the engine and its observers.
//!
//! ## Modules
//!
//! - [`command`]: compiled G-code commands, framing styles, queue statistics
//! - [`temperature`]: telemetry readings keyed by sensor code

pub mod command;
pub mod temperature;

pub use command::{Command, CommandQueueStatistics, CommandStyle};
pub use temperature::{Temperature, Temperatures};

use serde::{Deserialize, Serialize};

/// Lifecycle state of a printer engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    /// Scanning the link for signs of life
    Offline,
    /// The firmware is responding; commands are being executed
    Online,
    /// Terminal: closed or failed
    Stopped,
}

impl EngineState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            EngineState::Offline => 0,
            EngineState::Online => 1,
            EngineState::Stopped => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => EngineState::Offline,
            1 => EngineState::Online,
            _ => EngineState::Stopped,
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Offline => write!(f, "offline"),
            EngineState::Online => write!(f, "online"),
            EngineState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Atomic cell holding an [`EngineState`]
///
/// Written only by the engine worker, read from any thread.
#[derive(Debug)]
pub struct AtomicEngineState(std::sync::atomic::AtomicU8);

impl AtomicEngineState {
    /// Create a cell holding the given state
    pub fn new(state: EngineState) -> Self {
        Self(std::sync::atomic::AtomicU8::new(state.as_u8()))
    }

    /// Read the current state
    pub fn load(&self) -> EngineState {
        EngineState::from_u8(self.0.load(std::sync::atomic::Ordering::SeqCst))
    }

    /// Replace the state, returning the previous one
    pub fn swap(&self, state: EngineState) -> EngineState {
        EngineState::from_u8(self.0.swap(state.as_u8(), std::sync::atomic::Ordering::SeqCst))
    }
}

impl Default for AtomicEngineState {
    fn default() -> Self {
        Self::new(EngineState::Offline)
    }
}
