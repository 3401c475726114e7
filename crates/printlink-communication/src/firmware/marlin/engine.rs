//! Marlin printer engine
//!
//! A single worker drives the printer through three states:
//!
//! - **offline**: scan the link for any sign of life, writing an `M105`
//!   probe whenever the offline gate expires
//! - **online**: drain the command queue one command at a time, framing each
//!   onto the link and waiting for the firmware to accept it
//! - **stopped**: terminal, after close or an unrecoverable failure
//!
//! A reset sentinel, a silent link or a timed-out transport call takes the
//! engine back offline and clears the command queue. Any other transport
//! failure, or a command the firmware refuses to accept within the send
//! budget, stops the engine for good.

use super::command_queue::GCodeCommandQueue;
use super::config::EngineConfig;
use super::gcode::compile;
use super::response_parser::{is_reset_sentinel, ResponseKind};
use super::temperature_parser::TemperatureParser;
use super::timeout::TimeoutGate;
use crate::communication::LineTransport;
use parking_lot::Mutex;
use printlink_core::{
    AtomicEngineState, Clock, Command, CommandStyle, EngineState, EventBus, PrinterError,
    PrinterEvent, TransportError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) type SharedTransport = Arc<Mutex<Box<dyn LineTransport>>>;

const FIRMWARE_INFO: &str = "M115";
const REPORT_TEMPERATURES: &str = "M105";

/// Engine state visible to the owning handle
#[derive(Debug, Default)]
pub(crate) struct EngineStatus {
    state: AtomicEngineState,
    stop: AtomicBool,
}

impl EngineStatus {
    pub(crate) fn state(&self) -> EngineState {
        self.state.load()
    }

    pub(crate) fn is_online(&self) -> bool {
        self.state() == EngineState::Online
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn enter(&self, state: EngineState) {
        let previous = self.state.swap(state);
        if previous != state {
            tracing::debug!("Engine state {} -> {}", previous, state);
        }
    }
}

/// Outcome of executing one command
#[derive(Debug)]
pub enum Step {
    /// Carry on with the next command
    Continue,
    /// The printer stopped answering; rescan the link
    WentOffline,
    /// The engine cannot continue
    Fatal(PrinterError),
}

/// The state machine run by the engine thread
pub(crate) struct Engine {
    transport: SharedTransport,
    clock: Arc<dyn Clock>,
    queue: Arc<GCodeCommandQueue>,
    events: Arc<EventBus>,
    status: Arc<EngineStatus>,
    config: EngineConfig,
    temperatures: TemperatureParser,
    offline_gate: TimeoutGate,
    online_gate: TimeoutGate,
}

impl Engine {
    pub(crate) fn new(
        transport: SharedTransport,
        clock: Arc<dyn Clock>,
        queue: Arc<GCodeCommandQueue>,
        events: Arc<EventBus>,
        status: Arc<EngineStatus>,
        config: EngineConfig,
    ) -> Self {
        let offline_gate = TimeoutGate::new(clock.clone(), config.offline_timeout());
        let online_gate = TimeoutGate::new(clock.clone(), config.online_timeout());
        Self {
            transport,
            clock,
            queue,
            events,
            status,
            config,
            temperatures: TemperatureParser::new(),
            offline_gate,
            online_gate,
        }
    }

    /// Run until stopped or failed
    pub(crate) fn run(mut self) {
        tracing::debug!("Printer engine started");

        let failure = loop {
            if self.stopping() {
                break None;
            }

            self.run_offline();
            if self.stopping() {
                break None;
            }

            if let Err(error) = self.run_online() {
                break Some(error);
            }
        };

        match failure {
            Some(error) => self.fail(error),
            None => self.status.enter(EngineState::Stopped),
        }

        tracing::debug!("Printer engine finished");
    }

    fn stopping(&self) -> bool {
        self.status.stop_requested()
    }

    fn fail(&mut self, error: PrinterError) {
        tracing::error!("Printer engine failed: {}", error);
        self.status.request_stop();
        if self.status.is_online() {
            self.went_offline();
        }
        self.events.publish(PrinterEvent::FatalError {
            timestamp: self.clock.now(),
            cause: Arc::new(error),
        });
        self.status.enter(EngineState::Stopped);
        self.events.complete();
    }

    /// Scan the link until the firmware says anything
    fn run_offline(&mut self) {
        self.status.enter(EngineState::Offline);
        self.offline_gate.reset();

        while !self.stopping() {
            match self.read_line() {
                Ok(Some(line)) if is_reset_sentinel(&line) => {
                    tracing::debug!("Reset sentinel while offline, ignoring");
                }
                Ok(Some(_)) => {
                    self.went_online();
                    return;
                }
                Ok(None) => {
                    if self.offline_gate.is_timed_out() {
                        self.probe_offline();
                    }
                }
                Err(e) => {
                    tracing::warn!("Read failed while offline: {}", e);
                    std::thread::sleep(self.config.poll_interval());
                }
            }
        }
    }

    fn probe_offline(&mut self) {
        tracing::debug!(
            "Nothing received in {:?}, probing with {}",
            self.offline_gate.duration(),
            REPORT_TEMPERATURES
        );
        match self.write_line(REPORT_TEMPERATURES) {
            Ok(()) => self.offline_gate.reset(),
            Err(e) => {
                tracing::warn!("Probe write failed while offline: {}", e);
                std::thread::sleep(self.config.poll_interval());
            }
        }
    }

    /// Execute queued commands until the printer goes offline or the
    /// engine stops
    fn run_online(&mut self) -> Result<(), PrinterError> {
        self.online_gate.reset();

        while !self.stopping() {
            match self.queue.poll(self.config.poll_interval()) {
                Some(command) => {
                    self.online_gate.reset();
                    match self.execute(&command) {
                        Step::Continue => {}
                        Step::WentOffline => {
                            self.went_offline();
                            return Ok(());
                        }
                        Step::Fatal(error) => return Err(error),
                    }
                }
                None if self.online_gate.is_timed_out() => {
                    tracing::debug!(
                        "No commands sent in {:?}, requesting temperatures",
                        self.online_gate.duration()
                    );
                    self.enqueue_probe(REPORT_TEMPERATURES);
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Send one command until the firmware accepts it
    ///
    /// A resend request restarts the send cycle with the same text. The
    /// requested line number is not used to rewind the queue.
    pub(crate) fn execute(&mut self, command: &Command) -> Step {
        tracing::debug!("Executing {}", command);

        for attempt in 0..self.config.max_send_attempts {
            if self.stopping() {
                return Step::Continue;
            }

            tracing::debug!(attempt, "Sending {}", command);
            if let Err(e) = self.write_line(command.text()) {
                return transport_failure(e);
            }
            self.online_gate.reset();

            let mut resend = false;
            let mut failed = false;

            loop {
                if self.stopping() {
                    return Step::Continue;
                }

                let line = match self.read_line() {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        if self.online_gate.is_timed_out() {
                            tracing::debug!(
                                "Nothing received in {:?}, printer must be offline",
                                self.online_gate.duration()
                            );
                            return Step::WentOffline;
                        }
                        continue;
                    }
                    Err(e) => return transport_failure(e),
                };

                let kind = ResponseKind::classify(&line);
                if kind == ResponseKind::ResetSentinel {
                    tracing::debug!("Reset sentinel received");
                    return Step::WentOffline;
                }

                self.online_gate.reset();

                match kind {
                    ResponseKind::Resend { line: requested } => {
                        tracing::debug!(requested, "Firmware requested resend of {}", command);
                        self.queue.increment_resends();
                        resend = true;
                    }
                    ResponseKind::Error => {
                        self.queue.increment_errors();
                        tracing::warn!("Command {} failed: {}", command, line);
                        self.events.publish(PrinterEvent::CommandFailed {
                            timestamp: self.clock.now(),
                            command: command.clone(),
                            message: line.clone(),
                        });
                        failed = true;
                    }
                    ResponseKind::Ok => {
                        self.publish_temperatures(&line);
                        if resend {
                            break;
                        }
                        if !failed {
                            tracing::debug!("Command {} done", command);
                            self.events.publish(PrinterEvent::CommandSucceeded {
                                timestamp: self.clock.now(),
                                command: command.clone(),
                            });
                        }
                        return Step::Continue;
                    }
                    ResponseKind::Unrecognized | ResponseKind::ResetSentinel => {
                        tracing::trace!("Ignoring response: {}", line);
                    }
                }
            }
        }

        tracing::error!("Command {} could not be re-sent", command);
        Step::Fatal(PrinterError::ResendExhausted {
            command: command.text().to_string(),
            attempts: self.config.max_send_attempts,
        })
    }

    fn publish_temperatures(&self, line: &str) {
        if let Some(temperatures) = self.temperatures.parse_ok(line) {
            if !temperatures.is_empty() {
                self.events.publish(PrinterEvent::TemperaturesChanged {
                    timestamp: self.clock.now(),
                    temperatures,
                });
            }
        }
    }

    fn went_online(&mut self) {
        tracing::info!("Printer came online");
        let timestamp = self.clock.now();
        self.status.enter(EngineState::Online);
        self.online_gate.reset();
        self.events.publish(PrinterEvent::OnlineStateChanged {
            timestamp,
            online: true,
        });
        self.enqueue_probe(FIRMWARE_INFO);
        self.enqueue_probe(REPORT_TEMPERATURES);
    }

    fn went_offline(&mut self) {
        tracing::info!("Printer went offline");
        self.queue.reset();
        self.status.enter(EngineState::Offline);
        self.events.publish(PrinterEvent::OnlineStateChanged {
            timestamp: self.clock.now(),
            online: false,
        });
    }

    fn enqueue_probe(&self, text: &str) {
        let probe = compile(0, text, CommandStyle::WithoutLine);
        if let Err(e) = self.queue.enqueue(probe) {
            tracing::warn!("Could not queue {}: {}", text, e);
        }
    }

    fn read_line(&self) -> Result<Option<String>, TransportError> {
        self.transport.lock().read_line()
    }

    fn write_line(&self, text: &str) -> Result<(), TransportError> {
        self.transport.lock().write_line(text)
    }
}

fn transport_failure(error: TransportError) -> Step {
    if error.is_recoverable() {
        tracing::warn!("Transport timed out: {}", error);
        Step::WentOffline
    } else {
        Step::Fatal(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printlink_core::ManualClock;
    use std::collections::VecDeque;

    /// Transport that replays scripted responses and records writes
    struct Script {
        responses: VecDeque<Result<Option<String>, TransportError>>,
        written: Arc<Mutex<Vec<String>>>,
    }

    impl LineTransport for Script {
        fn read_line(&mut self) -> Result<Option<String>, TransportError> {
            self.responses.pop_front().unwrap_or(Ok(None))
        }

        fn write_line(&mut self, text: &str) -> Result<(), TransportError> {
            self.written.lock().push(text.to_string());
            Ok(())
        }
    }

    struct Fixture {
        engine: Engine,
        queue: Arc<GCodeCommandQueue>,
        bus: Arc<EventBus>,
        written: Arc<Mutex<Vec<String>>>,
    }

    fn fixture(lines: &[&str], config: EngineConfig) -> Fixture {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
        let bus = Arc::new(EventBus::new());
        let queue = Arc::new(GCodeCommandQueue::new(
            config.queue_capacity,
            bus.clone(),
            clock.clone(),
        ));
        let written = Arc::new(Mutex::new(Vec::new()));
        let script = Script {
            responses: lines.iter().map(|l| Ok(Some(l.to_string()))).collect(),
            written: written.clone(),
        };
        let transport: SharedTransport = Arc::new(Mutex::new(Box::new(script)));
        let engine = Engine::new(
            transport,
            clock,
            queue.clone(),
            bus.clone(),
            Arc::new(EngineStatus::default()),
            config,
        );
        Fixture {
            engine,
            queue,
            bus,
            written,
        }
    }

    fn m1000() -> Command {
        compile(1, "M1000", CommandStyle::WithLine)
    }

    #[test]
    fn test_ok_publishes_success_and_temperatures() {
        let mut f = fixture(&["echo:busy", "ok T:25.0 A:30.0"], EngineConfig::default());
        let mut stream = f.bus.receiver();

        assert!(matches!(f.engine.execute(&m1000()), Step::Continue));

        let (events, _) = stream.drain();
        assert!(matches!(events[0], PrinterEvent::TemperaturesChanged { .. }));
        assert!(matches!(events[1], PrinterEvent::CommandSucceeded { .. }));
        assert_eq!(*f.written.lock(), vec!["N1 M1000".to_string()]);
    }

    #[test]
    fn test_errors_then_resend() {
        let mut f = fixture(
            &[
                "Error:What?",
                "fatal:What?",
                "!!:What?",
                "Resend: 1",
                "ok",
                "ok",
            ],
            EngineConfig::default(),
        );
        let mut stream = f.bus.receiver();

        assert!(matches!(f.engine.execute(&m1000()), Step::Continue));

        let (events, _) = stream.drain();
        let kinds: Vec<&str> = events
            .iter()
            .map(|e| match e {
                PrinterEvent::CommandFailed { .. } => "failed",
                PrinterEvent::CommandSucceeded { .. } => "succeeded",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["failed", "failed", "failed", "succeeded"]);

        let messages: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                PrinterEvent::CommandFailed { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(messages, vec!["Error:What?", "fatal:What?", "!!:What?"]);

        let stats = f.queue.statistics();
        assert_eq!(stats.command_errors(), 3);
        assert_eq!(stats.command_resends(), 1);
        assert_eq!(f.written.lock().len(), 2);
    }

    #[test]
    fn test_error_without_resend_is_not_success() {
        let mut f = fixture(&["Error:Unknown command", "ok"], EngineConfig::default());
        let mut stream = f.bus.receiver();

        assert!(matches!(f.engine.execute(&m1000()), Step::Continue));

        let (events, _) = stream.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], PrinterEvent::CommandFailed { .. }));
    }

    #[test]
    fn test_reset_sentinel_goes_offline() {
        let mut f = fixture(&["INT4"], EngineConfig::default());
        assert!(matches!(f.engine.execute(&m1000()), Step::WentOffline));
    }

    #[test]
    fn test_send_budget_exhausted() {
        let lines: Vec<&str> = std::iter::repeat(["Resend: 1", "ok"])
            .take(5)
            .flatten()
            .collect();
        let mut f = fixture(&lines, EngineConfig::default().with_max_send_attempts(3));

        match f.engine.execute(&m1000()) {
            Step::Fatal(PrinterError::ResendExhausted { command, attempts }) => {
                assert_eq!(command, "N1 M1000");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert_eq!(f.queue.statistics().command_resends(), 3);
        assert_eq!(f.written.lock().len(), 3);
    }

    #[test]
    fn test_transport_failures() {
        assert!(matches!(
            transport_failure(TransportError::TimedOut),
            Step::WentOffline
        ));
        assert!(matches!(
            transport_failure(TransportError::disconnected("unplugged")),
            Step::Fatal(PrinterError::Transport(_))
        ));
    }
}
