//! Printer handle
//!
//! [`Printer`] owns the engine thread and the transport. It is the only
//! surface callers need: observe events, submit commands through the
//! command queue, and close.

use super::command_queue::GCodeCommandQueue;
use super::config::EngineConfig;
use super::engine::{Engine, EngineStatus, SharedTransport};
use crate::communication::serial::{SerialConfig, SerialTransport};
use crate::communication::{LineTransport, LoggingTransport};
use parking_lot::Mutex;
use printlink_core::{
    Clock, EngineState, EventBus, EventFilter, EventStream, PrinterError,
    PrinterEvent, Result, SubscriptionId, SystemClock,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

static ENGINE_COUNT: AtomicUsize = AtomicUsize::new(0);

/// How long close waits for an in-flight transport call to finish
const TRANSPORT_CLOSE_WAIT: Duration = Duration::from_secs(1);

/// Kinds of command queue a printer may provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueFlavor {
    /// Text G-code, line numbered
    GCode,
    /// Binary G-code
    Binary,
}

impl fmt::Display for QueueFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueFlavor::GCode => write!(f, "gcode"),
            QueueFlavor::Binary => write!(f, "binary"),
        }
    }
}

struct Worker {
    handle: JoinHandle<()>,
    finished: mpsc::Receiver<()>,
}

/// A printer driven by its own engine thread
pub struct Printer {
    events: Arc<EventBus>,
    queue: Arc<GCodeCommandQueue>,
    status: Arc<EngineStatus>,
    transport: SharedTransport,
    worker: Mutex<Option<Worker>>,
    join_timeout: Duration,
    closed: AtomicBool,
}

impl Printer {
    /// Start an engine over `transport`
    ///
    /// The engine starts offline and timestamps everything with `clock`.
    pub fn spawn(
        transport: impl LineTransport + 'static,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Result<Self> {
        let events = Arc::new(EventBus::new());
        let queue = Arc::new(GCodeCommandQueue::new(
            config.queue_capacity,
            events.clone(),
            clock.clone(),
        ));
        let status = Arc::new(EngineStatus::default());
        let transport: SharedTransport = Arc::new(Mutex::new(Box::new(transport)));
        let join_timeout = config.join_timeout();

        let engine = Engine::new(
            transport.clone(),
            clock,
            queue.clone(),
            events.clone(),
            status.clone(),
            config,
        );

        let (done, finished) = mpsc::channel();
        let name = format!(
            "printlink-engine-{}",
            ENGINE_COUNT.fetch_add(1, Ordering::Relaxed)
        );
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                engine.run();
                let _ = done.send(());
            })
            .map_err(PrinterError::Spawn)?;

        tracing::debug!("Spawned {}", name);

        Ok(Self {
            events,
            queue,
            status,
            transport,
            worker: Mutex::new(Some(Worker { handle, finished })),
            join_timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Open a serial printer with traffic logging and the system clock
    pub fn open(serial: &SerialConfig, config: EngineConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let port = SerialTransport::open(serial)?;
        tracing::info!("Opened printer on {} at {} baud", serial.device, serial.baud_rate);
        Self::spawn(LoggingTransport::new(port, clock.clone()), clock, config)
    }

    /// Stream of events published from now on
    pub fn events(&self) -> EventStream {
        self.events.receiver()
    }

    /// Register a handler run on the engine thread for every matching event
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(&PrinterEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(filter, handler)
    }

    /// Remove a handler
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// The event bus the engine publishes on
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Check whether the firmware is currently answering
    pub fn is_online(&self) -> bool {
        self.status.is_online()
    }

    /// Current engine state
    pub fn state(&self) -> EngineState {
        self.status.state()
    }

    /// Get the command queue of the requested flavor
    pub fn command_queue(&self, flavor: QueueFlavor) -> Result<Arc<GCodeCommandQueue>> {
        match flavor {
            QueueFlavor::GCode => Ok(self.queue.clone()),
            other => Err(PrinterError::UnsupportedCapability {
                requested: other.to_string(),
                supported: QueueFlavor::GCode.to_string(),
            }),
        }
    }

    /// Stop the engine and release the transport
    ///
    /// Waits up to the configured join timeout for the engine thread. Close
    /// failures are logged. Calling close again does nothing.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::debug!("Closing printer");
        self.status.request_stop();
        self.events.complete();

        if let Some(worker) = self.worker.lock().take() {
            if worker.handle.thread().id() == std::thread::current().id() {
                // closed from an event handler; the engine exits on its own
                tracing::debug!("Printer closed from its engine thread");
                return;
            }
            match worker.finished.recv_timeout(self.join_timeout) {
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        "Engine thread did not stop within {:?}, abandoning it",
                        self.join_timeout
                    );
                }
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                    if worker.handle.join().is_err() {
                        tracing::error!("Engine thread panicked");
                    }
                }
            }
        }

        match self.transport.try_lock_for(TRANSPORT_CLOSE_WAIT) {
            Some(mut transport) => {
                if let Err(e) = transport.close() {
                    tracing::warn!("Failed to close {}: {}", transport.name(), e);
                }
            }
            None => tracing::warn!("Transport still in use, not closed"),
        }
    }

    /// Check whether close has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for Printer {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Printer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Printer")
            .field("state", &self.state())
            .field("queue", &self.queue)
            .field("closed", &self.is_closed())
            .finish()
    }
}
