//! Error handling for PrintLink
//!
//! Two layers, both built with `thiserror`:
//! - [`TransportError`]: failures of the line-oriented link to the printer
//! - [`PrinterError`]: everything the printer engine and its command queue
//!   report, either synchronously to callers or through fatal-error events

use thiserror::Error;

/// Transport error type
///
/// Represents a failure reading from or writing to the line-oriented link.
/// Only [`TransportError::TimedOut`] is considered recoverable; the engine
/// treats it as the printer going offline rather than as a broken link.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The transport did not complete the operation in time
    #[error("Transport operation timed out")]
    TimedOut,

    /// The link went away
    #[error("Transport disconnected: {reason}")]
    Disconnected {
        /// The reason the link was lost.
        reason: String,
    },

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Create a disconnection error from a message
    pub fn disconnected(reason: impl Into<String>) -> Self {
        TransportError::Disconnected {
            reason: reason.into(),
        }
    }

    /// Check if the engine may recover from this error by rescanning the link
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransportError::TimedOut => true,
            TransportError::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            TransportError::Disconnected { .. } => false,
        }
    }
}

/// Main error type for the printer engine
#[derive(Error, Debug)]
pub enum PrinterError {
    /// The command queue is at capacity
    #[error("Command queue is full (capacity {capacity})")]
    QueueFull {
        /// The fixed capacity of the queue.
        capacity: usize,
    },

    /// The requested command queue flavor is not provided by this printer
    #[error("Unsupported command queue: requested {requested}, this printer provides {supported}")]
    UnsupportedCapability {
        /// The requested queue flavor.
        requested: String,
        /// The queue flavor the printer provides.
        supported: String,
    },

    /// A command could not be delivered within the send budget
    #[error("Command resubmission failure: {command} not accepted after {attempts} attempts")]
    ResendExhausted {
        /// The compiled command text.
        command: String,
        /// Number of send attempts made.
        attempts: u32,
    },

    /// Transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The engine worker thread could not be started
    #[error("Failed to start printer engine: {0}")]
    Spawn(#[source] std::io::Error),
}

impl PrinterError {
    /// Check if this is a transport error
    pub fn is_transport_error(&self) -> bool {
        matches!(self, PrinterError::Transport(_))
    }

    /// Check if this error only concerns the caller (capacity or capability)
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            PrinterError::QueueFull { .. } | PrinterError::UnsupportedCapability { .. }
        )
    }
}

/// Result type using PrinterError
pub type Result<T> = std::result::Result<T, PrinterError>;
