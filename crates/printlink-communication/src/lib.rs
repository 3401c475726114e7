//! # PrintLink Communication
//!
//! Line-oriented transports and the firmware engine that drives them.
//! Supports serial/USB links to Marlin and RepRap-style 3D printer firmware.

pub mod communication;
pub mod firmware;

pub use communication::{
    serial::{list_ports, SerialConfig, SerialPortInfo, SerialTransport},
    LineTransport, LoggingTransport,
};

pub use firmware::marlin::{
    EngineConfig, GCodeCommandQueue, Printer, QueueFlavor, ResponseKind, TemperatureParser,
};
