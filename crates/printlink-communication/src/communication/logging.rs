//! Recording transport decorator
//!
//! Wraps any [`LineTransport`], timestamps every line that crosses it with
//! the supplied clock, and mirrors it to `tracing` and to optional sinks
//! (one for received lines, one for sent lines). Sink failures are logged
//! and never reach the engine.

use super::LineTransport;
use chrono::SecondsFormat;
use printlink_core::{Clock, TransportError};
use std::io::Write;
use std::sync::Arc;

type Sink = Box<dyn Write + Send>;

/// Transport decorator that records traffic
pub struct LoggingTransport<T: LineTransport> {
    inner: T,
    clock: Arc<dyn Clock>,
    read_sink: Option<Sink>,
    write_sink: Option<Sink>,
    lines_read: u64,
    lines_written: u64,
}

impl<T: LineTransport> LoggingTransport<T> {
    /// Wrap a transport, logging to `tracing` only
    pub fn new(inner: T, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            clock,
            read_sink: None,
            write_sink: None,
            lines_read: 0,
            lines_written: 0,
        }
    }

    /// Also record received lines to a sink
    pub fn with_read_sink(mut self, sink: impl Write + Send + 'static) -> Self {
        self.read_sink = Some(Box::new(sink));
        self
    }

    /// Also record sent lines to a sink
    pub fn with_write_sink(mut self, sink: impl Write + Send + 'static) -> Self {
        self.write_sink = Some(Box::new(sink));
        self
    }

    /// Number of lines received so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Number of lines sent so far
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Unwrap the decorated transport
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn record(sink: &mut Option<Sink>, stamp: &str, line: &str) {
        if let Some(out) = sink.as_mut() {
            if let Err(e) = writeln!(out, "{} {}", stamp, line).and_then(|_| out.flush()) {
                tracing::warn!("Failed to record transport line: {}", e);
            }
        }
    }

    fn stamp(&self) -> String {
        self.clock.now().to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl<T: LineTransport> LineTransport for LoggingTransport<T> {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        match self.inner.read_line() {
            Ok(Some(line)) => {
                self.lines_read += 1;
                tracing::trace!("{} <<< [{}] {}", self.inner.name(), self.lines_read, line);
                let stamp = self.stamp();
                Self::record(&mut self.read_sink, &stamp, &line);
                Ok(Some(line))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::warn!("{} read failed: {}", self.inner.name(), e);
                Err(e)
            }
        }
    }

    fn write_line(&mut self, text: &str) -> Result<(), TransportError> {
        let stamp = self.stamp();
        match self.inner.write_line(text) {
            Ok(()) => {
                self.lines_written += 1;
                tracing::trace!("{} >>> [{}] {}", self.inner.name(), self.lines_written, text);
                Self::record(&mut self.write_sink, &stamp, text);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("{} write failed: {}", self.inner.name(), e);
                Err(e)
            }
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        for sink in [&mut self.read_sink, &mut self.write_sink] {
            if let Some(out) = sink.as_mut() {
                if let Err(e) = out.flush() {
                    tracing::warn!("Failed to flush transport log: {}", e);
                }
            }
        }
        self.inner.close()
    }

    fn name(&self) -> String {
        self.inner.name()
    }
}
