use std::time::Duration;

use capreel_types::{EventPayload, PointerAction, SessionEvent};

use crate::error::{Error, Result};

/// A materialized still: the visual surface at one elapsed time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub elapsed_ms: u64,
    pub width: u32,
    pub height: u32,
    /// Row-major rgb24.
    pub pixels: Vec<u8>,
}

/// Materializes recorded events into a visual surface.
///
/// Implementations are external to the pipeline (a DOM replayer, a terminal
/// rasterizer, ...). The driver only needs four capabilities: drop all
/// accumulated state, fold one event into the surface, confirm the surface
/// has finished painting, and capture it as a still.
pub trait Renderer {
    /// Discard all accumulated visual state.
    fn reset(&mut self);

    /// Fold one event into the current visual state.
    fn apply(&mut self, event: &SessionEvent) -> Result<()>;

    /// Block until the surface has finished painting, or fail with
    /// `Error::SettleTimeout` once the budget is exhausted.
    ///
    /// Implementations with an asynchronous paint path and no completion
    /// signal may fall back to sleeping a fixed delay within the budget.
    /// That fallback is a heuristic, not a guarantee — captures after it can
    /// still race the paint.
    fn wait_settled(&mut self, budget: Duration) -> Result<()>;

    /// Capture the currently materialized surface.
    fn capture(&mut self) -> Result<Frame>;
}

const DEFAULT_BACKGROUND: [u8; 3] = [0x20, 0x20, 0x24];
const GRID_COLOR: [u8; 3] = [0x2e, 0x2e, 0x34];
const POINTER_COLOR: [u8; 3] = [0xff, 0x45, 0x2b];
const CLICK_COLOR: [u8; 3] = [0xff, 0xc2, 0x2b];
const GRID_STEP: i32 = 64;
const POINTER_ARM: i32 = 6;
const CLICK_RADIUS: i32 = 10;

/// Minimal deterministic renderer.
///
/// Paints the snapshot background, a scroll-shifted reference grid, a
/// pointer crosshair and a click highlight into a fixed-size rgb24 buffer.
/// It renders synchronously, so `wait_settled` returns immediately. Scene
/// documents, input and custom payloads have no visual effect here.
pub struct BasicRenderer {
    width: u32,
    height: u32,
    background: [u8; 3],
    pointer: Option<(i32, i32)>,
    pointer_down: bool,
    scroll: (i32, i32),
    elapsed_ms: u64,
    has_snapshot: bool,
}

impl BasicRenderer {
    /// Output dimensions are fixed for the lifetime of the renderer so
    /// every captured frame has the same size regardless of recorded
    /// viewport changes.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: DEFAULT_BACKGROUND,
            pointer: None,
            pointer_down: false,
            scroll: (0, 0),
            elapsed_ms: 0,
            has_snapshot: false,
        }
    }

    fn put(&self, pixels: &mut [u8], x: i32, y: i32, color: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        pixels[idx..idx + 3].copy_from_slice(&color);
    }
}

impl Renderer for BasicRenderer {
    fn reset(&mut self) {
        self.background = DEFAULT_BACKGROUND;
        self.pointer = None;
        self.pointer_down = false;
        self.scroll = (0, 0);
        self.elapsed_ms = 0;
        self.has_snapshot = false;
    }

    fn apply(&mut self, event: &SessionEvent) -> Result<()> {
        self.elapsed_ms = event.timestamp;
        match &event.payload {
            EventPayload::FullSnapshot(snapshot) => {
                // A snapshot supersedes everything accumulated so far.
                self.pointer = None;
                self.pointer_down = false;
                self.scroll = (0, 0);
                self.background = snapshot
                    .background
                    .as_deref()
                    .and_then(parse_color)
                    .unwrap_or(DEFAULT_BACKGROUND);
                self.has_snapshot = true;
            }
            EventPayload::Pointer(pointer) => {
                self.pointer = Some((pointer.x, pointer.y));
                match pointer.action {
                    PointerAction::Down => self.pointer_down = true,
                    PointerAction::Up => self.pointer_down = false,
                    PointerAction::Move => {}
                }
            }
            EventPayload::Scroll(scroll) => {
                self.scroll = (scroll.x, scroll.y);
            }
            EventPayload::Input(_) | EventPayload::Meta(_) | EventPayload::Custom(_) => {}
        }
        Ok(())
    }

    fn wait_settled(&mut self, _budget: Duration) -> Result<()> {
        // Synchronous renderer: state is fully painted once apply returns.
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame> {
        let mut pixels = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for _ in 0..self.width as usize * self.height as usize {
            pixels.extend_from_slice(&self.background);
        }

        if self.has_snapshot {
            // Reference grid, shifted by the scroll offset so scrolling is
            // visible in captured pixels.
            let (sx, sy) = self.scroll;
            for y in 0..self.height as i32 {
                for x in 0..self.width as i32 {
                    if (x + sx).rem_euclid(GRID_STEP) == 0 || (y + sy).rem_euclid(GRID_STEP) == 0 {
                        self.put(&mut pixels, x, y, GRID_COLOR);
                    }
                }
            }
        }

        if let Some((px, py)) = self.pointer {
            if self.pointer_down {
                for dy in -CLICK_RADIUS..=CLICK_RADIUS {
                    for dx in -CLICK_RADIUS..=CLICK_RADIUS {
                        if dx * dx + dy * dy <= CLICK_RADIUS * CLICK_RADIUS {
                            self.put(&mut pixels, px + dx, py + dy, CLICK_COLOR);
                        }
                    }
                }
            }
            for d in -POINTER_ARM..=POINTER_ARM {
                self.put(&mut pixels, px + d, py, POINTER_COLOR);
                self.put(&mut pixels, px, py + d, POINTER_COLOR);
            }
        }

        Ok(Frame {
            elapsed_ms: self.elapsed_ms,
            width: self.width,
            height: self.height,
            pixels,
        })
    }
}

fn parse_color(raw: &str) -> Option<[u8; 3]> {
    let hex = raw.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}
