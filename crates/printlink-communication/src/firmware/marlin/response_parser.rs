//! Marlin response classification
//!
//! Firmware replies are free-form text. Each line is sorted into one of a
//! handful of kinds; everything the engine does not act on is
//! [`ResponseKind::Unrecognized`].

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Line the firmware prints after a reset
pub const RESET_SENTINEL: &str = "INT4";

/// Prefixes (uppercased) that mark a line as an error report
///
/// Besides the `Error:`/`fatal:`/`!!` forms, the Prusa fork reports unknown
/// commands with a bare `Unknown M code: ...` style line.
const ERROR_PREFIXES: &[&str] = &[
    "ERROR",
    "FATAL",
    "!!",
    "INVALID M CODE",
    "UNKNOWN M CODE",
    "INVALID G CODE",
    "UNKNOWN G CODE",
    "INVALID D CODE",
    "UNKNOWN D CODE",
];

/// Classified firmware response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Acknowledgment, possibly carrying telemetry
    Ok,
    /// The command was rejected
    Error,
    /// The firmware asks for a line to be sent again
    Resend {
        /// The line number the firmware asked for
        line: u64,
    },
    /// The firmware restarted
    ResetSentinel,
    /// Anything else (banners, echo lines, busy notices)
    Unrecognized,
}

impl ResponseKind {
    /// Classify one response line
    ///
    /// Checks run sentinel, resend, error, ok; the first match wins.
    pub fn classify(line: &str) -> Self {
        let line = line.trim();
        if is_reset_sentinel(line) {
            ResponseKind::ResetSentinel
        } else if let Some(requested) = resend_line(line) {
            ResponseKind::Resend { line: requested }
        } else if is_error(line) {
            ResponseKind::Error
        } else if is_ok(line) {
            ResponseKind::Ok
        } else {
            ResponseKind::Unrecognized
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseKind::Ok => write!(f, "ok"),
            ResponseKind::Error => write!(f, "error"),
            ResponseKind::Resend { line } => write!(f, "resend:{}", line),
            ResponseKind::ResetSentinel => write!(f, "reset"),
            ResponseKind::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Check for the reset sentinel
pub fn is_reset_sentinel(line: &str) -> bool {
    line.trim() == RESET_SENTINEL
}

/// Extract the line number from an `RS:`/`Resend:` request
///
/// Returns `None` for anything that is not a well-formed resend request,
/// including numbers too large to represent.
pub fn resend_line(line: &str) -> Option<u64> {
    static RESEND_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = RESEND_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^(?:RS|RESEND):\s*([0-9]+)$").expect("invalid regex pattern")
    });
    regex
        .captures(line.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Check for an error report
pub fn is_error(line: &str) -> bool {
    let upper = line.trim().to_uppercase();
    ERROR_PREFIXES.iter().any(|prefix| upper.starts_with(prefix))
}

/// Check for an acknowledgment
pub fn is_ok(line: &str) -> bool {
    line.trim()
        .get(..2)
        .is_some_and(|head| head.eq_ignore_ascii_case("ok"))
}
