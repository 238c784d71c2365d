//! Event sinks.
//!
//! The runner only knows the `EventSink` trait. Sinks must be callable
//! from whatever thread executes the job, so all of them are `Send + Sync`.

use std::sync::mpsc;

use parking_lot::Mutex;

use super::types::Event;

/// Receiver of runner events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Type alias for a plain event callback.
pub type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;

/// Forwards each event to a callback.
pub struct CallbackSink {
    callback: EventCallback,
}

impl CallbackSink {
    pub fn new(callback: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl EventSink for CallbackSink {
    fn emit(&self, event: Event) {
        (self.callback)(&event);
    }
}

/// Hands events to another thread over a channel.
///
/// A disconnected receiver is not an error; events are dropped.
pub struct ChannelSink {
    sender: mpsc::Sender<Event>,
}

impl ChannelSink {
    /// Create a sink and the receiver a front end polls.
    pub fn channel() -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }

    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: Event) {
        if self.sender.send(event).is_err() {
            tracing::debug!("Event receiver dropped; discarding event");
        }
    }
}

/// Buffers events in memory until drained.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all buffered events (non-blocking).
    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Copy of buffered events, leaving them in place.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn callback_sink_invokes_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let sink = CallbackSink::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        sink.emit(Event::job_status("j", JobState::Running, None));
        sink.emit(Event::job_status("j", JobState::Succeeded, None));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn channel_sink_crosses_threads() {
        let (sink, rx) = ChannelSink::channel();
        let sink = Arc::new(sink);

        let worker = {
            let sink = Arc::clone(&sink);
            std::thread::spawn(move || {
                sink.emit(Event::progress("j", None, 1, 2, "step"));
            })
        };
        worker.join().unwrap();

        let event = rx.recv().unwrap();
        assert_eq!(event.event_type(), "progress");
    }

    #[test]
    fn channel_sink_accepts_concurrent_emitters() {
        let (sink, rx) = ChannelSink::channel();
        let sink = Arc::new(sink);

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for n in 0..10 {
                        sink.emit(Event::progress("j", None, n, 10, &format!("worker {}", i)));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        drop(sink);

        assert_eq!(rx.iter().count(), 40);
    }

    #[test]
    fn channel_sink_tolerates_dropped_receiver() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        sink.emit(Event::job_status("j", JobState::Running, None));
    }

    #[test]
    fn memory_sink_drains() {
        let sink = MemorySink::new();
        sink.emit(Event::job_status("j", JobState::Running, None));
        assert_eq!(sink.len(), 1);

        let drained = sink.drain();
        assert_eq!(drained.len(), 1);
        assert!(sink.is_empty());
    }
}
