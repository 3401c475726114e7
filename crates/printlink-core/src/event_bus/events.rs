//! Printer event definitions.
//!
//! Every event is immutable and carries the engine clock's timestamp at the
//! moment it was published.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::PrinterError;
use crate::types::{Command, Temperatures};

/// Events published by a printer engine
#[derive(Debug, Clone)]
pub enum PrinterEvent {
    /// The printer came online or went offline
    OnlineStateChanged {
        /// When the change was observed.
        timestamp: DateTime<Utc>,
        /// Whether the printer is now online.
        online: bool,
    },
    /// A command was accepted into the command queue
    CommandSubmitted {
        /// When the command was enqueued.
        timestamp: DateTime<Utc>,
        /// The compiled command.
        command: Command,
    },
    /// The firmware acknowledged a command without error
    CommandSucceeded {
        /// When the acknowledgment arrived.
        timestamp: DateTime<Utc>,
        /// The acknowledged command.
        command: Command,
    },
    /// The firmware rejected a command
    CommandFailed {
        /// When the rejection arrived.
        timestamp: DateTime<Utc>,
        /// The rejected command.
        command: Command,
        /// The raw firmware response line.
        message: String,
    },
    /// The firmware reported temperatures
    TemperaturesChanged {
        /// When the report arrived.
        timestamp: DateTime<Utc>,
        /// The readings from the report.
        temperatures: Temperatures,
    },
    /// The engine failed and has stopped for good
    FatalError {
        /// When the failure happened.
        timestamp: DateTime<Utc>,
        /// What went wrong.
        cause: Arc<PrinterError>,
    },
}

impl PrinterEvent {
    /// When the event was published
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PrinterEvent::OnlineStateChanged { timestamp, .. }
            | PrinterEvent::CommandSubmitted { timestamp, .. }
            | PrinterEvent::CommandSucceeded { timestamp, .. }
            | PrinterEvent::CommandFailed { timestamp, .. }
            | PrinterEvent::TemperaturesChanged { timestamp, .. }
            | PrinterEvent::FatalError { timestamp, .. } => *timestamp,
        }
    }

    /// The command an event refers to, if any
    pub fn command(&self) -> Option<&Command> {
        match self {
            PrinterEvent::CommandSubmitted { command, .. }
            | PrinterEvent::CommandSucceeded { command, .. }
            | PrinterEvent::CommandFailed { command, .. } => Some(command),
            _ => None,
        }
    }

    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            PrinterEvent::OnlineStateChanged { .. } => EventCategory::Connection,
            PrinterEvent::CommandSubmitted { .. }
            | PrinterEvent::CommandSucceeded { .. }
            | PrinterEvent::CommandFailed { .. } => EventCategory::Command,
            PrinterEvent::TemperaturesChanged { .. } => EventCategory::Telemetry,
            PrinterEvent::FatalError { .. } => EventCategory::Error,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            PrinterEvent::OnlineStateChanged { online, .. } => format!(
                "Printer {}",
                if *online { "online" } else { "offline" }
            ),
            PrinterEvent::CommandSubmitted { command, .. } => {
                format!("Command submitted: {}", command)
            }
            PrinterEvent::CommandSucceeded { command, .. } => {
                format!("Command succeeded: {}", command)
            }
            PrinterEvent::CommandFailed {
                command, message, ..
            } => format!("Command failed: {} ({})", command, message),
            PrinterEvent::TemperaturesChanged { temperatures, .. } => {
                let mut codes: Vec<String> = temperatures
                    .readings()
                    .values()
                    .map(|t| match t.target_celsius() {
                        Some(target) => {
                            format!("{}:{:.1}/{:.1}", t.code(), t.current_celsius(), target)
                        }
                        None => format!("{}:{:.1}", t.code(), t.current_celsius()),
                    })
                    .collect();
                codes.sort();
                format!("Temperatures: {}", codes.join(" "))
            }
            PrinterEvent::FatalError { cause, .. } => format!("Fatal error: {}", cause),
        }
    }
}

impl std::fmt::Display for PrinterEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Online/offline transitions.
    Connection,
    /// Command submission and completion.
    Command,
    /// Temperature reports.
    Telemetry,
    /// Fatal failures.
    Error,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Connection => write!(f, "Connection"),
            EventCategory::Command => write!(f, "Command"),
            EventCategory::Telemetry => write!(f, "Telemetry"),
            EventCategory::Error => write!(f, "Error"),
        }
    }
}
