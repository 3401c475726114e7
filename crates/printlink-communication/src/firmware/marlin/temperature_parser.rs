//! Temperature report parsing
//!
//! Marlin reports temperatures in `M105` replies and in autoreports, e.g.
//! `ok T:201.3 /210.0 B:60.1 /60.0 @:127 B@:0`. Tokens look like
//! `code:current` or `code:current/target`; anything else is skipped.

use printlink_core::{Temperature, Temperatures};
use regex::Regex;
use std::sync::OnceLock;

fn slash_regex() -> &'static Regex {
    static SLASH_REGEX: OnceLock<Regex> = OnceLock::new();
    SLASH_REGEX.get_or_init(|| Regex::new(r"\s+/").expect("invalid regex pattern"))
}

fn reading_regex() -> &'static Regex {
    static READING_REGEX: OnceLock<Regex> = OnceLock::new();
    READING_REGEX.get_or_init(|| {
        Regex::new(r"^([a-zA-Z0-9@]+):([0-9.]+)(?:/([0-9.]+))?$").expect("invalid regex pattern")
    })
}

/// Parser for temperature reports
#[derive(Debug, Clone, Copy, Default)]
pub struct TemperatureParser;

impl TemperatureParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self
    }

    /// Parse a bare temperature report
    ///
    /// Returns `None` for a blank line. A line with no recognizable readings
    /// yields an empty set.
    pub fn parse(&self, line: &str) -> Option<Temperatures> {
        if line.trim().is_empty() {
            return None;
        }

        let normalized = slash_regex().replace_all(line, "/");
        let mut temperatures = Temperatures::new();
        for token in normalized.split_whitespace() {
            if let Some(reading) = parse_reading(token) {
                temperatures.insert(reading);
            }
        }
        Some(temperatures)
    }

    /// Parse the telemetry carried by an `ok` acknowledgment
    pub fn parse_ok(&self, line: &str) -> Option<Temperatures> {
        let line = line.trim_start();
        let rest = match line.get(..2) {
            Some(head) if head.eq_ignore_ascii_case("ok") => &line[2..],
            _ => line,
        };
        self.parse(rest.trim())
    }
}

fn parse_reading(token: &str) -> Option<Temperature> {
    let caps = reading_regex().captures(token)?;
    let code = caps.get(1)?.as_str();
    let current = caps.get(2)?.as_str().parse::<f64>().ok()?;
    let target = match caps.get(3) {
        Some(m) => Some(m.as_str().parse::<f64>().ok()?),
        None => None,
    };
    Some(Temperature::new(code, current, target))
}
