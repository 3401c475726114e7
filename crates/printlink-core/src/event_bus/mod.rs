//! # Event Bus Module
//!
//! Ordered multicast of [`PrinterEvent`]s from a printer engine to any number
//! of observers.
//!
//! ## Overview
//!
//! - Publication is serialized; [`EventBus::lock_publication`] lets a
//!   publisher make its own bookkeeping part of the same step
//! - Synchronous handlers run on the publishing thread, in publication order
//! - Asynchronous observers hold an [`EventStream`] with its own unbounded
//!   buffer, so a slow observer falls behind but never misses an event
//! - Completing the bus is terminal: streams drain and then end, handlers are
//!   dropped, and later publications are discarded
//!
//! ## Usage
//!
//! ```rust,ignore
//! use printlink_core::event_bus::{EventBus, EventCategory, EventFilter};
//!
//! let bus = EventBus::new();
//! let id = bus.subscribe(
//!     EventFilter::Categories(vec![EventCategory::Connection]),
//!     |event| println!("{}", event),
//! );
//!
//! let mut stream = bus.receiver();
//! while let Some(event) = stream.next().await {
//!     println!("{}", event);
//! }
//! bus.unsubscribe(id);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
