use std::time::Duration;

use tracing::warn;

use crate::encode::{VideoArtifact, VideoEncoder};
use crate::error::{Error, Result};
use crate::render::{Frame, Renderer};
use crate::replay::{PlaybackState, ReplayDriver};

/// Export parameters.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Target frame cadence.
    pub fps: u32,

    /// Settle budget granted to the renderer after each seek.
    pub settle_budget: Duration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            settle_budget: Duration::from_millis(150),
        }
    }
}

/// Progress report, one per sampled frame.
#[derive(Debug, Clone, Copy)]
pub struct ExportProgress {
    pub frame_index: usize,
    pub total_frames: usize,
}

impl ExportProgress {
    pub fn ratio(&self) -> f64 {
        if self.total_frames == 0 {
            return 1.0;
        }
        self.frame_index as f64 / self.total_frames as f64
    }
}

/// Drive the replay driver at a fixed frame cadence and assemble the
/// captured stills into a video artifact.
///
/// For duration `D`, samples `ceil(D / (1000/fps))` frames at
/// `t = index * (1000/fps)`. Each step pauses, seeks, waits for the renderer
/// to settle, and captures. A frame that fails to settle or capture is
/// logged and skipped — a degraded-but-complete video beats a failed export.
/// Encoder failures are terminal. Sampling never waits on wall-clock
/// playback; only ordering and per-frame duration matter.
pub fn export_video<R, E, F>(
    driver: &mut ReplayDriver<R>,
    mut encoder: E,
    config: &ExportConfig,
    mut progress: F,
) -> Result<VideoArtifact>
where
    R: Renderer,
    E: VideoEncoder,
    F: FnMut(ExportProgress),
{
    if driver.state() == PlaybackState::Idle {
        return Err(Error::InvalidTransition(
            "export requires a loaded recording".to_string(),
        ));
    }
    if config.fps == 0 {
        return Err(Error::Encode("fps must be positive".to_string()));
    }

    let duration_ms = driver.total_duration();
    let interval_ms = 1000.0 / config.fps as f64;
    // A recording whose only events sit at t=0 still yields one frame.
    let total_frames = ((duration_ms as f64 / interval_ms).ceil() as usize).max(1);

    let mut encoded = 0usize;
    for frame_index in 0..total_frames {
        let target_ms = (frame_index as f64 * interval_ms) as u64;

        match sample_frame(driver, config, target_ms) {
            Ok(frame) => {
                encoder.add_frame(&frame)?;
                encoded += 1;
            }
            Err(e) => {
                warn!(frame_index, target_ms, error = %e, "frame skipped");
            }
        }

        progress(ExportProgress {
            frame_index,
            total_frames,
        });
    }

    if encoded < total_frames {
        warn!(
            encoded,
            total_frames,
            "export finished degraded: some frames were skipped"
        );
    }

    encoder.finish()
}

fn sample_frame<R: Renderer>(
    driver: &mut ReplayDriver<R>,
    config: &ExportConfig,
    target_ms: u64,
) -> Result<Frame> {
    driver.pause();
    driver.seek(target_ms)?;
    let renderer = driver.renderer_mut();
    renderer.wait_settled(config.settle_budget)?;
    renderer.capture()
}
