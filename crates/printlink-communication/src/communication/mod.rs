//! Line-oriented transports
//!
//! The printer engine only ever exchanges whole ASCII lines with the
//! firmware. [`LineTransport`] is the seam it consumes; [`serial`] provides
//! the hardware implementation and [`logging`] a recording decorator.

pub mod logging;
pub mod serial;

pub use logging::LoggingTransport;

use printlink_core::TransportError;

/// A duplex link that exchanges lines of text
///
/// `read_line` returning `Ok(None)` means nothing arrived yet and is not an
/// error; implementations wait up to a short read timeout before giving up.
/// Lines are returned without their terminator and with trailing whitespace
/// removed; `write_line` appends a single `\n`.
pub trait LineTransport: Send {
    /// Read the next complete line, if one is available
    fn read_line(&mut self) -> Result<Option<String>, TransportError>;

    /// Write one line
    fn write_line(&mut self, text: &str) -> Result<(), TransportError>;

    /// Release the link
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Human readable name for log lines
    fn name(&self) -> String {
        "transport".to_string()
    }
}

impl<T: LineTransport + ?Sized> LineTransport for Box<T> {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        (**self).read_line()
    }

    fn write_line(&mut self, text: &str) -> Result<(), TransportError> {
        (**self).write_line(text)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }

    fn name(&self) -> String {
        (**self).name()
    }
}
