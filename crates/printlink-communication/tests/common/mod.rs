//! Shared fixtures for printer integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use printlink_communication::{EngineConfig, LineTransport, Printer};
use printlink_core::{
    Clock, EventFilter, EventStream, ManualClock, PrinterEvent, TransportError,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Line that makes the fake port fail the read or write it appears in
pub const FAIL: &str = "X";

#[derive(Default)]
struct PortState {
    lines: VecDeque<String>,
    writes: Vec<String>,
    tick: Option<(Arc<ManualClock>, Duration)>,
}

/// In-memory printer link
///
/// Reads pop lines queued with [`FakePort::add_line`]; writes are recorded.
/// The line `X` fails the operation with a disconnect. Clones share state,
/// so a test keeps one clone while the printer owns another.
#[derive(Clone, Default)]
pub struct FakePort {
    state: Arc<Mutex<PortState>>,
}

impl FakePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_line(&self, line: &str) {
        self.state.lock().lines.push_back(line.to_string());
    }

    pub fn add_lines<'a>(&self, lines: impl IntoIterator<Item = &'a str>) {
        let mut state = self.state.lock();
        state.lines.extend(lines.into_iter().map(str::to_string));
    }

    pub fn pending_lines(&self) -> usize {
        self.state.lock().lines.len()
    }

    pub fn writes(&self) -> Vec<String> {
        self.state.lock().writes.clone()
    }

    /// Advance `clock` by `by` on every read (including empty ones) and write
    pub fn tick_on_io(&self, clock: Arc<ManualClock>, by: Duration) {
        self.state.lock().tick = Some((clock, by));
    }

    fn tick(state: &PortState) {
        if let Some((clock, by)) = &state.tick {
            clock.advance(*by);
        }
    }
}

impl LineTransport for FakePort {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        std::thread::sleep(Duration::from_millis(1));
        let mut state = self.state.lock();
        let line = state.lines.pop_front();
        if line.as_deref() == Some(FAIL) {
            return Err(TransportError::disconnected("Fatal read error"));
        }
        Self::tick(&state);
        Ok(line)
    }

    fn write_line(&mut self, text: &str) -> Result<(), TransportError> {
        std::thread::sleep(Duration::from_millis(1));
        let mut state = self.state.lock();
        if text == FAIL {
            return Err(TransportError::disconnected("Fatal write error"));
        }
        state.writes.push(text.to_string());
        Self::tick(&state);
        Ok(())
    }

    fn name(&self) -> String {
        "fake".to_string()
    }
}

/// A printer over a fake port, with every event recorded
pub struct Harness {
    pub port: FakePort,
    pub clock: Arc<ManualClock>,
    pub printer: Printer,
    pub stream: EventStream,
    recorded: Arc<Mutex<Vec<PrinterEvent>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let port = FakePort::new();
        let clock = Arc::new(ManualClock::new());
        let printer = Printer::spawn(port.clone(), clock.clone() as Arc<dyn Clock>, config)
            .expect("spawn printer");

        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = recorded.clone();
        printer.subscribe(EventFilter::All, move |event| sink.lock().push(event.clone()));
        let stream = printer.events();

        Self {
            port,
            clock,
            printer,
            stream,
            recorded,
        }
    }

    /// Advance the clock a minute whenever a command succeeds
    pub fn tick_on_success(&self) {
        let clock = self.clock.clone();
        self.printer.subscribe(EventFilter::All, move |event| {
            if let PrinterEvent::CommandSucceeded { .. } = event {
                clock.advance(Duration::from_secs(60));
            }
        });
    }

    /// Feed `start` and wait for the printer to come online
    pub async fn bring_online(&mut self) {
        self.port.add_line("start");
        let event = self.wait_for(is_online_change).await;
        assert!(matches!(event, PrinterEvent::OnlineStateChanged { online: true, .. }));
        assert!(self.printer.is_online());
    }

    /// Wait for the next event matching `predicate`
    pub async fn wait_for(&mut self, predicate: impl Fn(&PrinterEvent) -> bool) -> PrinterEvent {
        loop {
            let next = tokio::time::timeout(Duration::from_secs(10), self.stream.next())
                .await
                .expect("timed out waiting for event");
            match next {
                Some(event) if predicate(&event) => return event,
                Some(_) => continue,
                None => panic!("event stream completed"),
            }
        }
    }

    /// Wait until the stream completes
    pub async fn wait_for_completion(&mut self) {
        loop {
            let next = tokio::time::timeout(Duration::from_secs(10), self.stream.next())
                .await
                .expect("timed out waiting for completion");
            if next.is_none() {
                return;
            }
        }
    }

    /// Every event published so far, in order
    pub fn events(&self) -> Vec<PrinterEvent> {
        self.recorded.lock().clone()
    }
}

pub fn is_online_change(event: &PrinterEvent) -> bool {
    matches!(event, PrinterEvent::OnlineStateChanged { .. })
}

pub fn is_success(event: &PrinterEvent) -> bool {
    matches!(event, PrinterEvent::CommandSucceeded { .. })
}

pub fn is_failure(event: &PrinterEvent) -> bool {
    matches!(event, PrinterEvent::CommandFailed { .. })
}

pub fn is_fatal(event: &PrinterEvent) -> bool {
    matches!(event, PrinterEvent::FatalError { .. })
}

/// Poll `condition` until it holds or a few seconds pass
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
