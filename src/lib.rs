//! # PrintLink
//!
//! A serial link engine for 3D printers running Marlin or a RepRap-compatible
//! firmware dialect:
//! - Online/offline tracking with keep-alive probes
//! - Line-numbered, checksummed G-code framing
//! - Bounded command queue with retry/resend handling
//! - Temperature telemetry parsing
//! - Ordered event stream for any number of observers
//!
//! ## Architecture
//!
//! PrintLink is organized as a workspace with multiple crates:
//!
//! 1. **printlink-core** - Errors, clock, value types, events, event bus
//! 2. **printlink-communication** - Transports and the Marlin printer engine
//! 3. **printlink-settings** - Configuration files
//! 4. **printlink** - Logging setup and the demonstration binary

pub use printlink_communication::firmware;

pub use printlink_core::{
    Clock, Command, CommandQueueStatistics, CommandStyle, EngineState, EventBus, EventCategory,
    EventFilter, EventStream, ManualClock, PrinterError, PrinterEvent, Result, SubscriptionId,
    SystemClock, Temperature, Temperatures, TransportError,
};

pub use printlink_communication::{
    list_ports, EngineConfig, GCodeCommandQueue, LineTransport, LoggingTransport, Printer,
    QueueFlavor, SerialConfig, SerialPortInfo, SerialTransport,
};

pub use printlink_settings::{default_config_path, Config, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output on stderr, leaving stdout to the program
/// - RUST_LOG environment variable support (INFO when unset)
/// - Thread names, so engine threads are easy to tell apart
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
