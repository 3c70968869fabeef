//! Event Sources
//!
//! Pull-side view of the producer that feeds construction.
//!
//! - `IterSource`: events from any iterator, same thread
//! - `ThreadedSource`: producer on its own thread, joined by a rendezvous
//!   channel so it pauses after every event until the consumer asks again
//!
//! Withdrawing (`stop`) is cooperative: a threaded producer notices at its
//! next `emit` and unwinds with [`DtmError::Withdrawn`].

use super::events::BuildEvent;
use crate::error::{DtmError, Result};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

/// Something that yields construction events one at a time.
pub trait EventSource {
    /// Next event, `Ok(None)` at end of stream
    fn next_event(&mut self) -> Result<Option<BuildEvent>>;

    /// The consumer no longer wants events. Later calls return `Ok(None)`.
    fn stop(&mut self) {}
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn next_event(&mut self) -> Result<Option<BuildEvent>> {
        (**self).next_event()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

// ============================================================================
// Iterator-backed source
// ============================================================================

/// Same-thread source over an iterator of (possibly failing) events
pub struct IterSource {
    inner: Box<dyn Iterator<Item = Result<BuildEvent>>>,
    stopped: bool,
}

impl IterSource {
    pub fn new<I>(events: I) -> Self
    where
        I: IntoIterator<Item = BuildEvent>,
        I::IntoIter: 'static,
    {
        Self {
            inner: Box::new(events.into_iter().map(Ok)),
            stopped: false,
        }
    }

    /// Source whose items may carry producer failures
    pub fn fallible<I>(events: I) -> Self
    where
        I: IntoIterator<Item = Result<BuildEvent>>,
        I::IntoIter: 'static,
    {
        Self {
            inner: Box::new(events.into_iter()),
            stopped: false,
        }
    }
}

impl From<Vec<BuildEvent>> for IterSource {
    fn from(events: Vec<BuildEvent>) -> Self {
        Self::new(events)
    }
}

impl EventSource for IterSource {
    fn next_event(&mut self) -> Result<Option<BuildEvent>> {
        if self.stopped {
            return Ok(None);
        }
        self.inner.next().transpose()
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

// ============================================================================
// Threaded source
// ============================================================================

/// Producer-side handle passed to the closure run by [`ThreadedSource::spawn`]
pub struct EventSink {
    sender: SyncSender<Result<BuildEvent>>,
}

impl EventSink {
    /// Hand one event to the consumer, blocking until it is taken.
    ///
    /// Returns [`DtmError::Withdrawn`] once the consumer has gone away; the
    /// producer should stop and propagate it.
    pub fn emit(&mut self, event: BuildEvent) -> Result<()> {
        self.sender
            .send(Ok(event))
            .map_err(|_| DtmError::Withdrawn)
    }
}

/// Producer running on a worker thread
pub struct ThreadedSource {
    receiver: Option<Receiver<Result<BuildEvent>>>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadedSource {
    /// Start `producer` on a new thread. Its events are delivered one per
    /// [`EventSource::next_event`] call.
    pub fn spawn<F>(producer: F) -> Result<Self>
    where
        F: FnOnce(&mut EventSink) -> Result<()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(0);
        let worker = thread::Builder::new()
            .name("rustydtm-producer".to_string())
            .spawn(move || {
                let mut sink = EventSink { sender };
                match producer(&mut sink) {
                    Ok(()) | Err(DtmError::Withdrawn) => {}
                    Err(err) => {
                        // Consumer may already be gone; nothing left to tell it then
                        let _ = sink.sender.send(Err(err));
                    }
                }
            })
            .map_err(|e| DtmError::Source(format!("failed to start producer thread: {e}")))?;

        Ok(Self {
            receiver: Some(receiver),
            worker: Some(worker),
        })
    }

    /// Reap the finished worker, turning a panic into a source error
    fn join_worker(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| DtmError::Source("producer thread panicked".to_string())),
            None => Ok(()),
        }
    }
}

impl EventSource for ThreadedSource {
    fn next_event(&mut self) -> Result<Option<BuildEvent>> {
        let Some(receiver) = self.receiver.as_ref() else {
            return Ok(None);
        };
        match receiver.recv() {
            Ok(Ok(event)) => Ok(Some(event)),
            Ok(Err(err)) => {
                self.receiver = None;
                Err(err)
            }
            Err(_) => {
                // Sender dropped: the producer returned (or panicked)
                self.receiver = None;
                self.join_worker()?;
                Ok(None)
            }
        }
    }

    fn stop(&mut self) {
        // Dropping the receiver fails the producer's next send. The worker is
        // left detached; it exits at that point.
        self.receiver = None;
        self.worker = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_iter_source() {
        let mut source = IterSource::from(vec![BuildEvent::StartDocument, BuildEvent::EndDocument]);
        assert_eq!(source.next_event(), Ok(Some(BuildEvent::StartDocument)));
        assert_eq!(source.next_event(), Ok(Some(BuildEvent::EndDocument)));
        assert_eq!(source.next_event(), Ok(None));
    }

    #[test]
    fn test_iter_source_stop() {
        let mut source = IterSource::new(vec![BuildEvent::StartDocument]);
        source.stop();
        assert_eq!(source.next_event(), Ok(None));
    }

    #[test]
    fn test_fallible_source_reports_error() {
        let mut source = IterSource::fallible(vec![
            Ok(BuildEvent::StartDocument),
            Err(DtmError::Source("bad byte".into())),
        ]);
        assert!(source.next_event().is_ok());
        assert_eq!(source.next_event(), Err(DtmError::Source("bad byte".into())));
    }

    #[test]
    fn test_threaded_source_delivers_in_order() {
        let mut source = ThreadedSource::spawn(|sink| {
            sink.emit(BuildEvent::StartDocument)?;
            sink.emit(BuildEvent::start("a"))?;
            sink.emit(BuildEvent::EndElement)?;
            sink.emit(BuildEvent::EndDocument)
        })
        .unwrap();

        assert_eq!(source.next_event(), Ok(Some(BuildEvent::StartDocument)));
        assert_eq!(source.next_event(), Ok(Some(BuildEvent::start("a"))));
        assert_eq!(source.next_event(), Ok(Some(BuildEvent::EndElement)));
        assert_eq!(source.next_event(), Ok(Some(BuildEvent::EndDocument)));
        assert_eq!(source.next_event(), Ok(None));
        assert_eq!(source.next_event(), Ok(None));
    }

    #[test]
    fn test_threaded_source_error_surfaces() {
        let mut source = ThreadedSource::spawn(|sink| {
            sink.emit(BuildEvent::StartDocument)?;
            Err(DtmError::Source("unexpected end of input".into()))
        })
        .unwrap();

        assert_eq!(source.next_event(), Ok(Some(BuildEvent::StartDocument)));
        assert!(matches!(source.next_event(), Err(DtmError::Source(_))));
        assert_eq!(source.next_event(), Ok(None));
    }

    #[test]
    fn test_threaded_source_pauses_and_withdraws() {
        let produced = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&produced);
        let (done_tx, done_rx) = mpsc::channel();

        let mut source = ThreadedSource::spawn(move |sink| {
            let result = (0..1000).try_for_each(|_| {
                counter.fetch_add(1, Ordering::SeqCst);
                sink.emit(BuildEvent::text("x"))
            });
            let _ = done_tx.send(result.clone());
            result
        })
        .unwrap();

        assert!(source.next_event().unwrap().is_some());
        assert!(source.next_event().unwrap().is_some());
        source.stop();

        // Producer unwinds with Withdrawn instead of running to completion
        let outcome = done_rx.recv().unwrap();
        assert_eq!(outcome, Err(DtmError::Withdrawn));
        assert!(produced.load(Ordering::SeqCst) < 1000);
        assert_eq!(source.next_event(), Ok(None));
    }

    #[test]
    fn test_threaded_source_panic_is_source_error() {
        let mut source = ThreadedSource::spawn(|_sink| -> Result<()> {
            panic!("producer bug");
        })
        .unwrap();
        assert!(matches!(source.next_event(), Err(DtmError::Source(_))));
    }
}
