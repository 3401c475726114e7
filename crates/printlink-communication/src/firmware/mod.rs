//! Firmware implementations for 3D printer controllers
//!
//! Supported controllers:
//! - Marlin: the common RepRap-derived firmware, including the Prusa fork
//!   and other dialects that speak the same line-numbered G-code protocol

pub mod marlin;

pub use marlin::{EngineConfig, GCodeCommandQueue, Printer, QueueFlavor};
