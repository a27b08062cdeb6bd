use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::warn;

use capreel_types::{EventBatch, SessionEvent};

use crate::error::{Error, Result};
use crate::transport::SessionTransport;

/// Flush tuning. Defaults match the capture client this store grew up with:
/// 50 events or 5 seconds, whichever comes first.
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    pub batch_threshold: usize,
    pub flush_interval: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            batch_threshold: 50,
            flush_interval: Duration::from_secs(5),
        }
    }
}

enum Control {
    /// Pending buffer may have crossed the threshold.
    Nudge,
    /// Explicit flush; result reported back.
    FlushNow(Sender<Result<()>>),
    /// Drain (if requested) and shut the worker down.
    Stop {
        drain: bool,
        done: Sender<Result<()>>,
    },
}

struct Shared {
    pending: Mutex<Vec<SessionEvent>>,
    captured: AtomicUsize,
    acknowledged: AtomicUsize,
    threshold: usize,
}

/// Accumulates captured events and delivers them in ordered batches.
///
/// `push` appends to an in-memory buffer and never blocks or drops. One
/// named worker thread performs every flush, so flushes are serialized by
/// construction: a batch that fails delivery is retained whole (same batch
/// id) and resent before anything newer, which keeps per-session order
/// stable across retries and makes a resend after a lost acknowledgment a
/// store-side no-op. The batcher imposes no retry backoff of its own — the
/// next trigger (threshold, interval tick, or explicit flush) retries.
///
/// Owned state with an explicit lifecycle: `start` spawns the worker,
/// `stop` drains and joins it. One batcher per recording session.
pub struct EventBatcher {
    shared: Arc<Shared>,
    tx: Sender<Control>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EventBatcher {
    pub fn start(
        session_id: String,
        transport: Arc<dyn SessionTransport>,
        config: BatcherConfig,
    ) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            pending: Mutex::new(Vec::new()),
            captured: AtomicUsize::new(0),
            acknowledged: AtomicUsize::new(0),
            threshold: config.batch_threshold.max(1),
        });

        let (tx, rx) = channel();
        let worker_shared = shared.clone();
        let interval = config.flush_interval;
        let handle = std::thread::Builder::new()
            .name("capreel-flush".to_string())
            .spawn(move || {
                let mut worker = FlushWorker {
                    session_id,
                    transport,
                    shared: worker_shared,
                    inflight: None,
                };
                worker.run(rx, interval);
            })?;

        Ok(Self {
            shared,
            tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Append a captured event. Never blocks, never drops.
    pub fn push(&self, event: SessionEvent) {
        let crossed = {
            let mut pending = self.shared.pending.lock().unwrap();
            pending.push(event);
            pending.len() >= self.shared.threshold
        };
        self.shared.captured.fetch_add(1, Ordering::Relaxed);
        if crossed {
            let _ = self.tx.send(Control::Nudge);
        }
    }

    /// Events handed to `push` so far.
    pub fn captured(&self) -> usize {
        self.shared.captured.load(Ordering::Relaxed)
    }

    /// Events the store has acknowledged as durably appended.
    pub fn acknowledged(&self) -> usize {
        self.shared.acknowledged.load(Ordering::Relaxed)
    }

    /// Flush everything currently pending and wait for the outcome.
    pub fn flush_now(&self) -> Result<()> {
        let (ack_tx, ack_rx) = channel();
        self.tx
            .send(Control::FlushNow(ack_tx))
            .map_err(|_| Error::Stopped)?;
        ack_rx.recv().map_err(|_| Error::Stopped)?
    }

    /// Stop the worker. With `drain`, everything still buffered is flushed
    /// first and a delivery failure is reported to the caller.
    pub fn stop(&self, drain: bool) -> Result<()> {
        let handle = self.handle.lock().unwrap().take();
        let Some(handle) = handle else {
            return Err(Error::Stopped);
        };

        let (done_tx, done_rx) = channel();
        let result = match self.tx.send(Control::Stop {
            drain,
            done: done_tx,
        }) {
            Ok(()) => done_rx.recv().map_err(|_| Error::Stopped)?,
            Err(_) => Err(Error::Stopped),
        };
        let _ = handle.join();
        result
    }
}

impl Drop for EventBatcher {
    fn drop(&mut self) {
        // Worker exits when the control channel closes; nothing to flush
        // here because a graceful caller already invoked stop(true).
        let _ = self.handle.lock().map(|mut h| h.take());
    }
}

struct FlushWorker {
    session_id: String,
    transport: Arc<dyn SessionTransport>,
    shared: Arc<Shared>,
    /// Batch that failed delivery, kept whole for an ordered, idempotent
    /// resend ahead of anything newer.
    inflight: Option<EventBatch>,
}

impl FlushWorker {
    fn run(&mut self, rx: Receiver<Control>, interval: Duration) {
        loop {
            match rx.recv_timeout(interval) {
                Ok(Control::Nudge) => {
                    if self.should_flush() {
                        if let Err(e) = self.flush() {
                            warn!(error = %e, "batch flush failed; events re-buffered");
                        }
                    }
                }
                Ok(Control::FlushNow(done)) => {
                    let _ = done.send(self.flush());
                }
                Ok(Control::Stop { drain, done }) => {
                    let result = if drain { self.flush() } else { Ok(()) };
                    let _ = done.send(result);
                    return;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if let Err(e) = self.flush() {
                        warn!(error = %e, "interval flush failed; events re-buffered");
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    fn should_flush(&self) -> bool {
        self.inflight.is_some()
            || self.shared.pending.lock().unwrap().len() >= self.shared.threshold
    }

    /// Deliver the retained batch (if any), then a snapshot of the pending
    /// buffer. An empty flush is a no-op.
    fn flush(&mut self) -> Result<()> {
        if let Some(batch) = self.inflight.take() {
            match self.transport.send_event_batch(&self.session_id, &batch) {
                Ok(()) => {
                    self.shared
                        .acknowledged
                        .fetch_add(batch.len(), Ordering::Relaxed);
                }
                Err(e) => {
                    self.inflight = Some(batch);
                    return Err(e);
                }
            }
        }

        let events = {
            let mut pending = self.shared.pending.lock().unwrap();
            std::mem::take(&mut *pending)
        };
        if events.is_empty() {
            return Ok(());
        }

        let batch = EventBatch::new(events);
        match self.transport.send_event_batch(&self.session_id, &batch) {
            Ok(()) => {
                self.shared
                    .acknowledged
                    .fetch_add(batch.len(), Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.inflight = Some(batch);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::MockTransport;
    use capreel_testing::pointer_stream;
    use std::time::Instant;

    fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if check() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        check()
    }

    fn batcher_with(
        transport: &Arc<MockTransport>,
        threshold: usize,
        interval: Duration,
    ) -> EventBatcher {
        EventBatcher::start(
            "s-1".to_string(),
            transport.clone() as Arc<dyn SessionTransport>,
            BatcherConfig {
                batch_threshold: threshold,
                flush_interval: interval,
            },
        )
        .unwrap()
    }

    #[test]
    fn threshold_and_drain_produce_the_expected_batches() {
        let transport = Arc::new(MockTransport::new());
        transport.create_session("s-1");
        let batcher = batcher_with(&transport, 50, Duration::from_secs(60));

        let events = pointer_stream(120, 50);

        // 120 events with a threshold of 50: two threshold flushes while
        // capturing, the 20-event remainder on drain.
        for event in &events[..50] {
            batcher.push(event.clone());
        }
        assert!(wait_until(Duration::from_secs(2), || batcher.acknowledged() == 50));

        for event in &events[50..100] {
            batcher.push(event.clone());
        }
        assert!(wait_until(Duration::from_secs(2), || batcher.acknowledged() == 100));

        for event in &events[100..] {
            batcher.push(event.clone());
        }
        batcher.stop(true).unwrap();

        assert_eq!(batcher.captured(), 120);
        assert_eq!(batcher.acknowledged(), 120);
        assert_eq!(transport.batch_sizes("s-1"), vec![50, 50, 20]);
        assert_eq!(transport.stored_count("s-1"), 120);
        transport.assert_order_preserved("s-1");
    }

    #[test]
    fn empty_flush_is_a_noop() {
        let transport = Arc::new(MockTransport::new());
        transport.create_session("s-1");
        let batcher = batcher_with(&transport, 50, Duration::from_secs(60));

        batcher.flush_now().unwrap();
        batcher.stop(true).unwrap();
        assert!(transport.batch_sizes("s-1").is_empty());
    }

    #[test]
    fn failed_flush_rebuffers_and_retries_in_order() {
        let transport = Arc::new(MockTransport::new());
        transport.create_session("s-1");
        transport.fail_next_sends(1);
        let batcher = batcher_with(&transport, 1000, Duration::from_secs(60));

        for event in pointer_stream(10, 10) {
            batcher.push(event);
        }
        let err = batcher.flush_now().unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(batcher.acknowledged(), 0);
        assert_eq!(transport.stored_count("s-1"), 0);

        // Newer events arrive while the first batch is parked
        for event in pointer_stream(5, 10)
            .into_iter()
            .map(|mut e| {
                e.timestamp += 1_000;
                e
            })
        {
            batcher.push(event);
        }

        // Transport healed: retry delivers the parked batch first, then the
        // new one, with no losses and no reordering.
        batcher.flush_now().unwrap();
        batcher.stop(true).unwrap();

        assert_eq!(batcher.acknowledged(), 15);
        assert_eq!(transport.batch_sizes("s-1"), vec![10, 5]);
        assert_eq!(transport.stored_count("s-1"), 15);
        transport.assert_order_preserved("s-1");
    }

    #[test]
    fn resend_after_lost_ack_does_not_double_count() {
        let transport = Arc::new(MockTransport::new());
        transport.create_session("s-1");
        // Store applies the batch but the acknowledgment is lost in transit
        transport.lose_next_acks(1);
        let batcher = batcher_with(&transport, 1000, Duration::from_secs(60));

        for event in pointer_stream(30, 10) {
            batcher.push(event);
        }
        assert!(batcher.flush_now().is_err());

        // Retry resends the same batch id; the store dedups it
        batcher.flush_now().unwrap();
        batcher.stop(true).unwrap();

        assert_eq!(transport.stored_count("s-1"), 30);
        assert_eq!(batcher.acknowledged(), 30);

        let ids = transport.batch_ids("s-1");
        assert_eq!(ids.len(), 2, "same batch sent twice");
        assert_eq!(ids[0], ids[1], "retry reuses the batch id");
    }

    #[test]
    fn interval_tick_flushes_below_threshold() {
        let transport = Arc::new(MockTransport::new());
        transport.create_session("s-1");
        let batcher = batcher_with(&transport, 1000, Duration::from_millis(30));

        for event in pointer_stream(7, 10) {
            batcher.push(event);
        }
        assert!(wait_until(Duration::from_secs(2), || {
            batcher.acknowledged() == 7
        }));
        batcher.stop(true).unwrap();
        assert_eq!(transport.stored_count("s-1"), 7);
    }

    #[test]
    fn stop_twice_reports_stopped() {
        let transport = Arc::new(MockTransport::new());
        transport.create_session("s-1");
        let batcher = batcher_with(&transport, 50, Duration::from_secs(60));

        batcher.stop(true).unwrap();
        assert!(matches!(batcher.stop(true), Err(Error::Stopped)));
        assert!(matches!(batcher.flush_now(), Err(Error::Stopped)));
    }
}
