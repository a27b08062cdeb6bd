use std::sync::Arc;

use capreel_types::{SessionEvent, SessionMetadata};

use crate::batcher::{BatcherConfig, EventBatcher};
use crate::error::{Error, Result};
use crate::mirror::MirrorSender;
use crate::transport::SessionTransport;

#[derive(Debug, Clone, Default)]
pub struct RecorderConfig {
    pub batcher: BatcherConfig,
    /// Address of the live-mirror TCP channel. None disables mirroring.
    pub mirror_addr: Option<String>,
}

struct Inner {
    session_id: String,
    batcher: EventBatcher,
    mirror: Option<MirrorSender>,
    transport: Arc<dyn SessionTransport>,
}

impl Inner {
    fn push(&self, event: SessionEvent) {
        if let Some(mirror) = &self.mirror {
            mirror.send(&self.session_id, &event);
        }
        self.batcher.push(event);
    }
}

/// One recording session's capture pipeline, start to end.
///
/// `start` registers the session with the store and spawns the batcher;
/// `stop` drains the remaining buffer and then marks the session ended, in
/// that order, so everything captured lands before `endTime` is set.
///
/// The local `captured`/`acknowledged` counters are UI feedback only; after
/// a client restart the authoritative count comes from
/// `SessionTransport::fetch_session`.
pub struct Recorder {
    inner: Arc<Inner>,
}

impl Recorder {
    pub fn start(
        transport: Arc<dyn SessionTransport>,
        user_id: &str,
        metadata: &SessionMetadata,
        config: RecorderConfig,
    ) -> Result<Self> {
        let session_id = transport.start_session(user_id, metadata)?;
        let batcher = EventBatcher::start(session_id.clone(), transport.clone(), config.batcher)
            .map_err(|e| Error::Transport(format!("failed to spawn flush worker: {}", e)))?;
        let mirror = config.mirror_addr.as_deref().map(MirrorSender::connect);

        Ok(Self {
            inner: Arc::new(Inner {
                session_id,
                batcher,
                mirror,
                transport,
            }),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Record one captured event: buffered for durable delivery, mirrored
    /// best-effort for live observers.
    pub fn record(&self, event: SessionEvent) {
        self.inner.push(event);
    }

    /// Sink handle for the capture source. Every captured event is one
    /// synchronous call into the batcher; the capture source keeps no queue
    /// of its own.
    pub fn sink(&self) -> RecorderSink {
        RecorderSink {
            inner: self.inner.clone(),
        }
    }

    /// Events captured locally so far.
    pub fn captured(&self) -> usize {
        self.inner.batcher.captured()
    }

    /// Events the store has acknowledged as durably appended.
    pub fn acknowledged(&self) -> usize {
        self.inner.batcher.acknowledged()
    }

    /// Drain the pending buffer, then end the session. The remainder is
    /// flushed before `endTime` is set; a delivery failure aborts the stop
    /// so no buffered event is silently dropped.
    pub fn stop(&self) -> Result<()> {
        self.inner.batcher.stop(true)?;
        self.inner.transport.end_session(&self.inner.session_id)
    }
}

/// Cloneable push handle handed to the capture source.
#[derive(Clone)]
pub struct RecorderSink {
    inner: Arc<Inner>,
}

impl RecorderSink {
    pub fn push(&self, event: SessionEvent) {
        self.inner.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::MockTransport;
    use capreel_testing::{pointer_stream, sample_metadata};
    use std::time::Duration;

    fn recorder_with(transport: &Arc<MockTransport>, threshold: usize) -> Recorder {
        Recorder::start(
            transport.clone() as Arc<dyn SessionTransport>,
            "user-1",
            &sample_metadata(),
            RecorderConfig {
                batcher: BatcherConfig {
                    batch_threshold: threshold,
                    flush_interval: Duration::from_secs(60),
                },
                mirror_addr: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn stop_flushes_remainder_before_ending_session() {
        let transport = Arc::new(MockTransport::new());
        let recorder = recorder_with(&transport, 50);
        let session_id = recorder.session_id().to_string();

        for event in pointer_stream(20, 50) {
            recorder.record(event);
        }
        assert_eq!(recorder.captured(), 20);
        assert_eq!(recorder.acknowledged(), 0);

        recorder.stop().unwrap();

        assert_eq!(recorder.acknowledged(), 20);
        assert!(transport.ended(&session_id));

        // The drain append happens strictly before the end call
        let log = transport.call_log();
        assert_eq!(log, vec!["start", "append:20", "end"]);
    }

    #[test]
    fn sink_feeds_the_same_session() {
        let transport = Arc::new(MockTransport::new());
        let recorder = recorder_with(&transport, 50);
        let sink = recorder.sink();

        for event in pointer_stream(5, 10) {
            sink.push(event);
        }
        recorder.stop().unwrap();

        assert_eq!(transport.stored_count(recorder.session_id()), 5);
    }

    #[test]
    fn capture_continues_while_store_unreachable() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_next_sends(1);
        let recorder = recorder_with(&transport, 10);

        // Threshold flush fails; capture keeps buffering regardless
        for event in pointer_stream(25, 10) {
            recorder.record(event);
        }
        assert_eq!(recorder.captured(), 25);

        recorder.stop().unwrap();
        assert_eq!(recorder.acknowledged(), 25);
        assert_eq!(transport.stored_count(recorder.session_id()), 25);
        transport.assert_order_preserved(recorder.session_id());
    }
}
