use capreel_types::SessionEvent;

use crate::error::{Error, Result};
use crate::render::Renderer;

/// Playback state machine.
///
/// ```text
/// Idle --load--> Loaded --play--> Playing --pause--> Paused
///                                    |                  |
///                                 advance to end      play
///                                    v                  v
///                                 Finished           Playing
/// seek: any state but Idle -> Seeking -> Paused
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loaded,
    Playing,
    Paused,
    Seeking,
    Finished,
}

/// Deterministic re-player over an ordered event log.
///
/// Replay is a pure function of (events, target time): `seek` always
/// re-materializes from the most recent full snapshot at or before the
/// target, so the same target yields the same visual state from any prior
/// state. The incremental path (`advance`) exists for live playback and
/// folds events forward without resetting.
pub struct ReplayDriver<R: Renderer> {
    renderer: R,
    events: Vec<SessionEvent>,
    state: PlaybackState,
    current_ms: u64,
    /// Index of the first event not yet applied on the incremental path.
    cursor: usize,
}

impl<R: Renderer> ReplayDriver<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            events: Vec::new(),
            state: PlaybackState::Idle,
            current_ms: 0,
            cursor: 0,
        }
    }

    /// Load an ordered recording. Fails with `EmptyRecording` for an empty
    /// event list. Loading over a previous recording tears the old state
    /// down first (the renderer is reset).
    pub fn load(&mut self, events: Vec<SessionEvent>) -> Result<()> {
        if events.is_empty() {
            return Err(Error::EmptyRecording);
        }
        self.renderer.reset();
        self.events = events;
        self.state = PlaybackState::Loaded;
        self.current_ms = 0;
        self.cursor = 0;
        Ok(())
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Current elapsed milliseconds.
    pub fn current_time(&self) -> u64 {
        self.current_ms
    }

    /// Timestamp of the last event; zero before a recording is loaded.
    pub fn total_duration(&self) -> u64 {
        self.events.last().map(|e| e.timestamp).unwrap_or(0)
    }

    pub fn play(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Loaded | PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
                Ok(())
            }
            other => Err(Error::InvalidTransition(format!(
                "play from {:?}",
                other
            ))),
        }
    }

    /// Playing -> Paused. A no-op in every other non-Idle state so callers
    /// can unconditionally pause before a seek.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Materialize the visual state as if continuous playback had reached
    /// `target_ms`, then settle into Paused.
    pub fn seek(&mut self, target_ms: u64) -> Result<()> {
        if self.state == PlaybackState::Idle {
            return Err(Error::InvalidTransition("seek before load".to_string()));
        }
        self.state = PlaybackState::Seeking;

        // Baseline: the last full snapshot at or before the target, else the
        // beginning of the recording.
        let baseline = self
            .events
            .iter()
            .rposition(|e| e.is_full_snapshot() && e.timestamp <= target_ms)
            .unwrap_or(0);

        self.renderer.reset();
        let mut cursor = baseline;
        let result = loop {
            match self.events.get(cursor) {
                Some(event) if event.timestamp <= target_ms => {
                    if let Err(e) = self.renderer.apply(event) {
                        break Err(e);
                    }
                    cursor += 1;
                }
                _ => break Ok(()),
            }
        };

        self.cursor = cursor;
        self.current_ms = target_ms;
        self.state = PlaybackState::Paused;
        result
    }

    /// Drive playback forward by `delta_ms`. Reaching the timestamp of the
    /// last event transitions Playing -> Finished.
    pub fn advance(&mut self, delta_ms: u64) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Err(Error::InvalidTransition(format!(
                "advance from {:?}",
                self.state
            )));
        }

        let total = self.total_duration();
        let target = (self.current_ms.saturating_add(delta_ms)).min(total);
        while let Some(event) = self.events.get(self.cursor) {
            if event.timestamp > target {
                break;
            }
            self.renderer.apply(event)?;
            self.cursor += 1;
        }

        self.current_ms = target;
        if self.current_ms >= total {
            self.state = PlaybackState::Finished;
        }
        Ok(())
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}
