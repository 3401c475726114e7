//! Event Bus implementation.
//!
//! Provides the EventBus struct a printer engine publishes through, and the
//! EventStream handle asynchronous observers read from.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use uuid::Uuid;

use super::events::{EventCategory, PrinterEvent};

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new unique subscription ID
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Filter to receive only specific event types
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    /// Receive all events.
    #[default]
    All,
    /// Receive events matching any of these categories.
    Categories(Vec<EventCategory>),
}

impl EventFilter {
    /// Check if an event matches this filter
    pub fn matches(&self, event: &PrinterEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
        }
    }
}

/// Type alias for event handler functions
type EventHandler = Arc<dyn Fn(&PrinterEvent) + Send + Sync>;

#[derive(Default)]
struct Streams {
    completed: bool,
    senders: Vec<mpsc::UnboundedSender<PrinterEvent>>,
}

/// Ordered multicast of printer events
///
/// Publication is serialized, so handlers and streams all observe the same
/// total order. Every stream has its own unbounded buffer: a slow reader
/// never loses events. A handler may publish on its own bus; the nested
/// event is delivered in full before the outer event reaches any stream.
pub struct EventBus {
    /// Publication lock and the live streams
    streams: ReentrantMutex<RefCell<Streams>>,
    /// Registered synchronous handlers
    handlers: RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>,
}

/// Exclusive right to publish on an [`EventBus`]
///
/// While a thread holds this guard no other thread can publish, so work
/// done under it and the events it publishes appear as one step to every
/// observer. The holder itself may still publish.
pub struct PublicationGuard<'a> {
    _guard: ReentrantMutexGuard<'a, RefCell<Streams>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            streams: ReentrantMutex::new(RefCell::new(Streams::default())),
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Handlers run first, so a stream never observes an event before every
    /// handler has seen it. Returns the number of streams and handlers the
    /// event was delivered to. Events published after completion are
    /// discarded.
    pub fn publish(&self, event: PrinterEvent) -> usize {
        let guard = self.streams.lock();

        if guard.borrow().completed {
            tracing::trace!("Discarding event after completion: {}", event);
            return 0;
        }

        let handlers: Vec<EventHandler> = self
            .handlers
            .read()
            .values()
            .filter(|(filter, _)| filter.matches(&event))
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in &handlers {
            handler(&event);
        }

        let mut streams = guard.borrow_mut();
        // dropped streams are forgotten here
        streams
            .senders
            .retain(|sender| sender.send(event.clone()).is_ok());

        streams.senders.len() + handlers.len()
    }

    /// Hold off publication from every other thread
    pub fn lock_publication(&self) -> PublicationGuard<'_> {
        PublicationGuard {
            _guard: self.streams.lock(),
        }
    }

    /// Subscribe to events with a synchronous handler
    ///
    /// The handler will be called on the publishing thread, so it should
    /// return quickly to avoid stalling the engine. Subscribing to a
    /// completed bus registers nothing.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(&PrinterEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        let guard = self.streams.lock();
        if guard.borrow().completed {
            tracing::debug!("Subscription {} ignored: bus completed", id);
            return id;
        }
        self.handlers.write().insert(id, (filter, Arc::new(handler)));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Get a stream for manual event polling
    ///
    /// The stream sees every event published from now on. A stream obtained
    /// after completion ends immediately.
    pub fn receiver(&self) -> EventStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let guard = self.streams.lock();
        let mut streams = guard.borrow_mut();
        if !streams.completed {
            streams.senders.push(sender);
        }
        EventStream { receiver }
    }

    /// Unsubscribe a handler
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Complete the bus
    ///
    /// Idempotent. Returns true only for the call that completed the bus.
    /// Streams still yield what they buffered, then end.
    pub fn complete(&self) -> bool {
        let guard = self.streams.lock();
        let senders = {
            let mut streams = guard.borrow_mut();
            if streams.completed {
                return false;
            }
            streams.completed = true;
            std::mem::take(&mut streams.senders)
        };

        drop(senders);
        self.handlers.write().clear();
        tracing::debug!("Event bus completed");
        true
    }

    /// Check whether the bus has completed
    pub fn is_completed(&self) -> bool {
        self.streams.lock().borrow().completed
    }

    /// Get the number of active handlers
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Get the number of live streams
    pub fn stream_count(&self) -> usize {
        self.streams
            .lock()
            .borrow()
            .senders
            .iter()
            .filter(|sender| !sender.is_closed())
            .count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("streams", &self.stream_count())
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// Receiving end of an [`EventBus`]
///
/// Yields events in publication order and `None` once the bus has completed
/// and every buffered event has been read.
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<PrinterEvent>,
}

impl EventStream {
    /// Wait for the next event
    pub async fn next(&mut self) -> Option<PrinterEvent> {
        self.receiver.recv().await
    }

    /// Block the current thread until the next event
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_next(&mut self) -> Option<PrinterEvent> {
        self.receiver.blocking_recv()
    }

    /// Take every event that is already buffered
    ///
    /// The flag is true once the bus has completed and the buffer is drained.
    pub fn drain(&mut self) -> (Vec<PrinterEvent>, bool) {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => return (events, false),
                Err(TryRecvError::Disconnected) => return (events, true),
            }
        }
    }
}
