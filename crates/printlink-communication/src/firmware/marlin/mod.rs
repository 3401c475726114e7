//! Marlin/RepRap printer support
//!
//! ## Modules
//!
//! - [`gcode`]: line-number and checksum framing of command bodies
//! - [`response_parser`]: classification of firmware response lines
//! - [`temperature_parser`]: `T:`/`B:` telemetry parsing
//! - [`timeout`]: deadline tracking over the engine clock
//! - [`command_queue`]: the bounded G-code queue and its statistics
//! - [`config`]: engine tuning parameters
//! - [`engine`]: the online/offline state machine
//! - [`printer`]: the owner handle that runs the engine on its own thread

pub mod command_queue;
pub mod config;
pub mod engine;
pub mod gcode;
pub mod printer;
pub mod response_parser;
pub mod temperature_parser;
pub mod timeout;

pub use command_queue::GCodeCommandQueue;
pub use config::EngineConfig;
pub use engine::Step;
pub use gcode::{checksum, compile};
pub use printer::{Printer, QueueFlavor};
pub use response_parser::ResponseKind;
pub use temperature_parser::TemperatureParser;
pub use timeout::TimeoutGate;
