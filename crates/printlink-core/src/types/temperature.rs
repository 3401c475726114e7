//! Temperature telemetry
//!
//! Sensor codes follow the firmware conventions: `T`/`T<n>` for extruders,
//! `B` for the bed, `C` for the chamber, `A` for ambient and `P` for an
//! auxiliary probe. Anything else the firmware reports (`@`, `B@`, `W`, ...)
//! is kept under its own code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    code: String,
    current_celsius: f64,
    target_celsius: Option<f64>,
}

impl Temperature {
    /// Create a reading
    pub fn new(code: impl Into<String>, current_celsius: f64, target_celsius: Option<f64>) -> Self {
        Self {
            code: code.into(),
            current_celsius,
            target_celsius,
        }
    }

    /// Sensor code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Current reading in degrees Celsius
    pub fn current_celsius(&self) -> f64 {
        self.current_celsius
    }

    /// Target reading in degrees Celsius, when the firmware reports one
    pub fn target_celsius(&self) -> Option<f64> {
        self.target_celsius
    }
}

/// All readings from one telemetry line
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Temperatures {
    readings: HashMap<String, Temperature>,
}

impl Temperatures {
    /// Create an empty set of readings
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading, replacing any earlier reading with the same code
    pub fn insert(&mut self, temperature: Temperature) {
        self.readings
            .insert(temperature.code().to_string(), temperature);
    }

    /// Look up a reading by sensor code
    pub fn get(&self, code: &str) -> Option<&Temperature> {
        self.readings.get(code)
    }

    /// Number of sensors reported
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// True if no sensor was reported
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// All readings, keyed by sensor code
    pub fn readings(&self) -> &HashMap<String, Temperature> {
        &self.readings
    }

    /// The active extruder: `T`, falling back to `T0`
    pub fn extruder(&self) -> Option<&Temperature> {
        self.get("T").or_else(|| self.get("T0"))
    }

    /// Every extruder reading (`T`, `T0`, `T1`, ...), ordered by code
    pub fn extruders(&self) -> Vec<&Temperature> {
        let mut extruders: Vec<&Temperature> = self
            .readings
            .values()
            .filter(|t| is_extruder_code(t.code()))
            .collect();
        extruders.sort_by(|a, b| a.code().cmp(b.code()));
        extruders
    }

    /// Heated bed
    pub fn bed(&self) -> Option<&Temperature> {
        self.get("B")
    }

    /// Heated chamber
    pub fn chamber(&self) -> Option<&Temperature> {
        self.get("C")
    }

    /// Ambient sensor
    pub fn ambient(&self) -> Option<&Temperature> {
        self.get("A")
    }

    /// Auxiliary probe sensor
    pub fn probe(&self) -> Option<&Temperature> {
        self.get("P")
    }
}

impl FromIterator<Temperature> for Temperatures {
    fn from_iter<I: IntoIterator<Item = Temperature>>(iter: I) -> Self {
        let mut temperatures = Temperatures::new();
        for t in iter {
            temperatures.insert(t);
        }
        temperatures
    }
}

fn is_extruder_code(code: &str) -> bool {
    code.strip_prefix('T')
        .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
}
