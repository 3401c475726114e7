//! # PrintLink Core
//!
//! Core types, errors, and the event bus for PrintLink.
//! Provides the value types shared between the printer engine and its
//! observers: compiled commands, queue statistics, temperature readings,
//! printer events, and the clock abstraction the engine timestamps with.

pub mod clock;
pub mod error;
pub mod event_bus;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};

pub use error::{PrinterError, Result, TransportError};

pub use event_bus::{
    EventBus, EventCategory, EventFilter, EventStream, PrinterEvent, PublicationGuard,
    SubscriptionId,
};

pub use types::{
    AtomicEngineState, Command, CommandQueueStatistics, CommandStyle, EngineState, Temperature,
    Temperatures,
};
