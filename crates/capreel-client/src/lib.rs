// Capture-side client
// Event batching with durable delivery, plus a best-effort live mirror

mod batcher;
mod error;
mod mirror;
mod recorder;
mod transport;

#[cfg(test)]
mod tests_support;

// Public API
pub use batcher::{BatcherConfig, EventBatcher};
pub use error::{Error, Result};
pub use mirror::MirrorSender;
pub use recorder::{Recorder, RecorderConfig, RecorderSink};
pub use transport::{HttpTransport, SessionTransport};
