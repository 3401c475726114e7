//! Bounded G-code command queue
//!
//! Callers on any thread enqueue commands; the engine thread drains them one
//! at a time. The queue also owns the line-number counter used when
//! compiling command bodies and the running [`CommandQueueStatistics`].
//!
//! Submissions and resets run under the event bus's publication lock, so a
//! command's line number, its `CommandSubmitted` event and its place in the
//! queue are one step to every observer. The bus lock is the only lock held
//! across a publish, so a handler on any thread may enqueue.

use super::gcode::compile;
use parking_lot::{Condvar, Mutex, RwLock};
use printlink_core::{
    Clock, Command, CommandQueueStatistics, CommandStyle, EventBus, PrinterError, PrinterEvent,
    Result,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Pending {
    commands: VecDeque<Command>,
    /// Slots claimed by submissions that have not pushed yet
    reserved: usize,
    next_line: u32,
}

/// Queue of G-code commands awaiting execution
pub struct GCodeCommandQueue {
    capacity: usize,
    pending: Mutex<Pending>,
    available: Condvar,
    statistics: RwLock<CommandQueueStatistics>,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl GCodeCommandQueue {
    /// Create an empty queue publishing submissions on `events`
    pub fn new(capacity: usize, events: Arc<EventBus>, clock: Arc<dyn Clock>) -> Self {
        Self {
            capacity,
            pending: Mutex::new(Pending::default()),
            available: Condvar::new(),
            statistics: RwLock::new(CommandQueueStatistics::default()),
            events,
            clock,
        }
    }

    /// Compile a command body with the current line number and enqueue it
    ///
    /// The line counter only advances when the style carries a line number
    /// and the command was accepted.
    pub fn enqueue_compile(&self, text: &str, style: CommandStyle) -> Result<Command> {
        let _order = self.events.lock_publication();
        let command = {
            let mut pending = self.pending.lock();
            self.reserve(&mut pending)?;
            let command = compile(pending.next_line, text, style);
            if style.has_line_number() {
                pending.next_line = pending.next_line.wrapping_add(1);
            }
            command
        };
        self.submit_accepted(command)
    }

    /// Enqueue an already compiled command
    pub fn enqueue(&self, command: Command) -> Result<Command> {
        let _order = self.events.lock_publication();
        self.reserve(&mut self.pending.lock())?;
        self.submit_accepted(command)
    }

    /// Point-in-time copy of the statistics
    pub fn statistics(&self) -> CommandQueueStatistics {
        *self.statistics.read()
    }

    /// Number of commands waiting
    pub fn len(&self) -> usize {
        self.pending.lock().commands.len()
    }

    /// Check if no commands are waiting
    pub fn is_empty(&self) -> bool {
        self.pending.lock().commands.is_empty()
    }

    /// Maximum number of waiting commands
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Line number the next compiled command will carry
    pub fn line_number(&self) -> u32 {
        self.pending.lock().next_line
    }

    /// Drop every waiting command and restart line numbering at zero
    ///
    /// Statistics are kept.
    pub(crate) fn reset(&self) {
        let _order = self.events.lock_publication();
        let mut pending = self.pending.lock();
        let dropped = pending.commands.len();
        pending.commands.clear();
        pending.next_line = 0;
        tracing::debug!("Command queue reset, {} pending commands dropped", dropped);
    }

    pub(crate) fn increment_errors(&self) {
        let mut statistics = self.statistics.write();
        *statistics = statistics.with_command_errors(statistics.command_errors() + 1);
    }

    pub(crate) fn increment_resends(&self) {
        let mut statistics = self.statistics.write();
        *statistics = statistics.with_command_resends(statistics.command_resends() + 1);
    }

    /// Take the next command, waiting up to `timeout` for one to arrive
    pub(crate) fn poll(&self, timeout: Duration) -> Option<Command> {
        let mut pending = self.pending.lock();
        if pending.commands.is_empty() {
            let _ = self.available.wait_for(&mut pending, timeout);
        }
        pending.commands.pop_front()
    }

    fn reserve(&self, pending: &mut Pending) -> Result<()> {
        if pending.commands.len() + pending.reserved >= self.capacity {
            tracing::warn!("Command queue full ({} commands)", self.capacity);
            return Err(PrinterError::QueueFull {
                capacity: self.capacity,
            });
        }
        pending.reserved += 1;
        Ok(())
    }

    /// Count, announce and queue a command whose slot has been reserved
    fn submit_accepted(&self, command: Command) -> Result<Command> {
        {
            let mut statistics = self.statistics.write();
            *statistics =
                statistics.with_command_submissions(statistics.command_submissions() + 1);
        }

        tracing::debug!("Command submitted: {}", command);
        self.events.publish(PrinterEvent::CommandSubmitted {
            timestamp: self.clock.now(),
            command: command.clone(),
        });

        {
            let mut pending = self.pending.lock();
            pending.reserved -= 1;
            pending.commands.push_back(command.clone());
        }
        self.available.notify_one();
        Ok(command)
    }
}

impl std::fmt::Debug for GCodeCommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GCodeCommandQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("statistics", &self.statistics())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printlink_core::ManualClock;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn queue(capacity: usize) -> (GCodeCommandQueue, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new());
        let queue = GCodeCommandQueue::new(capacity, bus.clone(), Arc::new(ManualClock::new()));
        (queue, bus)
    }

    #[test]
    fn test_line_numbers_advance_per_style() {
        let (queue, _bus) = queue(10);
        let a = queue.enqueue_compile("G28", CommandStyle::WithLine).unwrap();
        let b = queue.enqueue_compile("M105", CommandStyle::WithoutLine).unwrap();
        let c = queue
            .enqueue_compile("M115", CommandStyle::WithLineAndChecksum)
            .unwrap();

        assert_eq!(a.text(), "N0 G28");
        assert_eq!(b.text(), "M105");
        assert_eq!(c.line_number(), Some(1));
        assert_eq!(queue.line_number(), 2);
        assert_eq!(queue.statistics().command_submissions(), 3);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_full_queue_rejects_without_consuming_line() {
        let (queue, _bus) = queue(1);
        queue.enqueue_compile("G28", CommandStyle::WithLine).unwrap();

        let err = queue
            .enqueue_compile("G1 X10", CommandStyle::WithLine)
            .unwrap_err();
        assert!(matches!(err, PrinterError::QueueFull { capacity: 1 }));
        assert_eq!(queue.line_number(), 1);
        assert_eq!(queue.statistics().command_submissions(), 1);

        let probe = compile(0, "M105", CommandStyle::WithoutLine);
        assert!(queue.enqueue(probe).is_err());
    }

    #[test]
    fn test_submission_events_in_queue_order() {
        let (queue, bus) = queue(10);
        let mut stream = bus.receiver();

        let first = queue.enqueue_compile("G28", CommandStyle::WithLine).unwrap();
        let second = queue.enqueue_compile("G29", CommandStyle::WithLine).unwrap();

        let (events, completed) = stream.drain();
        assert!(!completed);
        let submitted: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                PrinterEvent::CommandSubmitted { command, .. } => Some(command.id()),
                _ => None,
            })
            .collect();
        assert_eq!(submitted, vec![first.id(), second.id()]);

        assert_eq!(queue.poll(Duration::ZERO).unwrap().id(), first.id());
        assert_eq!(queue.poll(Duration::ZERO).unwrap().id(), second.id());
        assert!(queue.poll(Duration::from_millis(1)).is_none());
    }

    #[test]
    fn test_reset_keeps_statistics() {
        let (queue, _bus) = queue(10);
        queue.enqueue_compile("G28", CommandStyle::WithLine).unwrap();
        queue.enqueue_compile("G29", CommandStyle::WithLine).unwrap();
        queue.increment_errors();
        queue.increment_resends();
        queue.increment_resends();

        queue.reset();
        assert!(queue.is_empty());
        assert_eq!(queue.line_number(), 0);

        let stats = queue.statistics();
        assert_eq!(stats.command_submissions(), 2);
        assert_eq!(stats.command_errors(), 1);
        assert_eq!(stats.command_resends(), 2);
    }

    #[test]
    fn test_poll_wakes_on_enqueue() {
        let (queue, _bus) = queue(10);
        let queue = Arc::new(queue);

        let producer = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                queue.enqueue_compile("M105", CommandStyle::WithoutLine).unwrap();
            })
        };

        let command = queue.poll(Duration::from_secs(5));
        producer.join().unwrap();
        assert_eq!(command.unwrap().text(), "M105");
    }

    #[test]
    fn test_handler_may_enqueue_on_submission() {
        let (queue, bus) = queue(10);
        let queue = Arc::new(queue);

        let weak = Arc::downgrade(&queue);
        bus.subscribe(printlink_core::EventFilter::All, move |event| {
            if let (PrinterEvent::CommandSubmitted { command, .. }, Some(queue)) =
                (event, weak.upgrade())
            {
                if command.text() == "N0 G28" {
                    queue.enqueue_compile("M400", CommandStyle::WithoutLine).unwrap();
                }
            }
        });

        queue.enqueue_compile("G28", CommandStyle::WithLine).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.statistics().command_submissions(), 2);
    }

    #[test]
    fn test_handler_and_caller_enqueue_concurrently() {
        let (queue, bus) = queue(10);
        let queue = Arc::new(queue);

        let weak = Arc::downgrade(&queue);
        bus.subscribe(printlink_core::EventFilter::All, move |event| {
            if let (PrinterEvent::CommandSucceeded { .. }, Some(queue)) = (event, weak.upgrade()) {
                std::thread::sleep(Duration::from_millis(100));
                queue.enqueue_compile("M400", CommandStyle::WithoutLine).unwrap();
            }
        });

        let (done, finished) = std::sync::mpsc::channel();

        let engine_side = {
            let bus = bus.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                bus.publish(PrinterEvent::CommandSucceeded {
                    timestamp: chrono::Utc::now(),
                    command: compile(5, "M105", CommandStyle::WithLine),
                });
                done.send("handler").unwrap();
            })
        };
        let caller_side = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                queue.enqueue_compile("G28", CommandStyle::WithLine).unwrap();
                done.send("caller").unwrap();
            })
        };

        let mut finished_threads: Vec<&str> = (0..2)
            .filter_map(|_| finished.recv_timeout(Duration::from_secs(5)).ok())
            .collect();
        finished_threads.sort_unstable();
        assert_eq!(finished_threads, vec!["caller", "handler"]);

        engine_side.join().unwrap();
        caller_side.join().unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.statistics().command_submissions(), 2);
    }

    #[test]
    fn test_reset_waits_for_submission_in_progress() {
        let (queue, bus) = queue(10);
        let queue = Arc::new(queue);
        let reset_done = Arc::new(AtomicBool::new(false));
        let reset_during_submission = Arc::new(AtomicBool::new(false));
        let resetter = Arc::new(parking_lot::Mutex::new(None));

        let weak = Arc::downgrade(&queue);
        let (flag, early, slot) = (
            reset_done.clone(),
            reset_during_submission.clone(),
            resetter.clone(),
        );
        bus.subscribe(printlink_core::EventFilter::All, move |event| {
            if let (PrinterEvent::CommandSubmitted { .. }, Some(queue)) = (event, weak.upgrade()) {
                let done = flag.clone();
                *slot.lock() = Some(std::thread::spawn(move || {
                    queue.reset();
                    done.store(true, Ordering::SeqCst);
                }));
                std::thread::sleep(Duration::from_millis(50));
                early.store(flag.load(Ordering::SeqCst), Ordering::SeqCst);
            }
        });

        queue.enqueue_compile("G28", CommandStyle::WithLine).unwrap();
        assert!(!reset_during_submission.load(Ordering::SeqCst));

        let handle = resetter.lock().take().unwrap();
        handle.join().unwrap();
        assert!(reset_done.load(Ordering::SeqCst));
        assert!(queue.is_empty());
        assert_eq!(queue.line_number(), 0);
    }

    #[test]
    fn test_handler_enqueue_respects_capacity() {
        let (queue, bus) = queue(1);
        let queue = Arc::new(queue);
        let rejected = Arc::new(parking_lot::Mutex::new(None));

        let weak = Arc::downgrade(&queue);
        let seen = rejected.clone();
        bus.subscribe(printlink_core::EventFilter::All, move |event| {
            if let (PrinterEvent::CommandSubmitted { .. }, Some(queue)) = (event, weak.upgrade()) {
                if seen.lock().is_none() {
                    let result = queue.enqueue_compile("M400", CommandStyle::WithoutLine);
                    *seen.lock() = Some(result);
                }
            }
        });

        queue.enqueue_compile("G28", CommandStyle::WithLine).unwrap();
        assert_eq!(queue.len(), 1);
        assert!(matches!(
            rejected.lock().take(),
            Some(Err(PrinterError::QueueFull { capacity: 1 }))
        ));
    }
}
