//! Compiled commands and command queue statistics

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How a command body is framed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStyle {
    /// Body sent verbatim
    WithoutLine,
    /// `N<line> <body>`
    #[default]
    WithLine,
    /// `N<line> <body>*<checksum>`
    WithLineAndChecksum,
}

impl CommandStyle {
    /// Check if commands of this style consume a line number
    pub fn has_line_number(self) -> bool {
        !matches!(self, CommandStyle::WithoutLine)
    }
}

impl fmt::Display for CommandStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandStyle::WithoutLine => write!(f, "without_line"),
            CommandStyle::WithLine => write!(f, "with_line"),
            CommandStyle::WithLineAndChecksum => write!(f, "with_line_and_checksum"),
        }
    }
}

/// A compiled G-code command, ready to be written to the link
///
/// Commands are immutable once compiled. A command carrying a line number
/// always has text starting with `N`, and a command with a checksum always
/// contains `*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    id: Uuid,
    line_number: Option<u32>,
    text: String,
    checksum: bool,
}

impl Command {
    /// Assemble a command from already-framed wire text
    pub fn new(id: Uuid, line_number: Option<u32>, text: impl Into<String>, checksum: bool) -> Self {
        Self {
            id,
            line_number,
            text: text.into(),
            checksum,
        }
    }

    /// Unique identity of this command
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Line number, if the command was framed with one
    pub fn line_number(&self) -> Option<u32> {
        self.line_number
    }

    /// The framed text written to the link
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the text carries a `*<checksum>` suffix
    pub fn has_checksum(&self) -> bool {
        self.checksum
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}]", &self.id.to_string()[..8], self.text)
    }
}

/// Running totals kept by the command queue
///
/// Values are snapshots: the queue replaces its statistics wholesale on every
/// increment, so a copy held by a caller never changes underneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandQueueStatistics {
    submissions: u64,
    errors: u64,
    resends: u64,
}

impl CommandQueueStatistics {
    /// Commands accepted into the queue
    pub fn command_submissions(&self) -> u64 {
        self.submissions
    }

    /// Error responses received from the firmware
    pub fn command_errors(&self) -> u64 {
        self.errors
    }

    /// Resend requests received from the firmware
    pub fn command_resends(&self) -> u64 {
        self.resends
    }

    /// Copy with the submission counter replaced
    pub fn with_command_submissions(self, submissions: u64) -> Self {
        Self {
            submissions,
            ..self
        }
    }

    /// Copy with the error counter replaced
    pub fn with_command_errors(self, errors: u64) -> Self {
        Self { errors, ..self }
    }

    /// Copy with the resend counter replaced
    pub fn with_command_resends(self, resends: u64) -> Self {
        Self { resends, ..self }
    }
}
