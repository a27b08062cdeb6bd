use capreel_types::{
    EventPayload, PointerAction, PointerPayload, ScrollPayload, SessionEvent, SnapshotPayload,
};

/// Fluent builder for ordered event sequences.
///
/// Starts with a full snapshot at t=0 so the recording always has a
/// baseline. Callers append steps with non-decreasing timestamps; the
/// builder does not reorder.
///
/// # Example
/// ```
/// use capreel_testing::EventScript;
///
/// let events = EventScript::new(640, 480)
///     .pointer_walk(10, 50, 20)
///     .click_at(1200, 30, 30)
///     .build();
/// assert_eq!(events.last().unwrap().timestamp, 1200);
/// ```
pub struct EventScript {
    width: u32,
    height: u32,
    events: Vec<SessionEvent>,
}

impl EventScript {
    pub fn new(width: u32, height: u32) -> Self {
        let mut script = Self {
            width,
            height,
            events: Vec::new(),
        };
        script = script.snapshot_at(0, None);
        script
    }

    /// Full snapshot at `ts`, optionally with a `#rrggbb` background.
    pub fn snapshot_at(mut self, ts: u64, background: Option<&str>) -> Self {
        self.events.push(SessionEvent::new(
            ts,
            EventPayload::FullSnapshot(SnapshotPayload {
                width: self.width,
                height: self.height,
                background: background.map(str::to_string),
                document: serde_json::Value::Null,
            }),
        ));
        self
    }

    /// `count` pointer moves along a deterministic diagonal path, the first
    /// at `start_ms`, spaced `step_ms` apart.
    pub fn pointer_walk(mut self, start_ms: u64, step_ms: u64, count: usize) -> Self {
        for i in 0..count {
            let x = ((10 + i * 7) % self.width.max(1) as usize) as i32;
            let y = ((8 + i * 5) % self.height.max(1) as usize) as i32;
            self.events.push(SessionEvent::new(
                start_ms + i as u64 * step_ms,
                EventPayload::Pointer(PointerPayload {
                    x,
                    y,
                    action: PointerAction::Move,
                }),
            ));
        }
        self
    }

    /// Press and release at the same timestamp.
    pub fn click_at(mut self, ts: u64, x: i32, y: i32) -> Self {
        for action in [PointerAction::Down, PointerAction::Up] {
            self.events.push(SessionEvent::new(
                ts,
                EventPayload::Pointer(PointerPayload { x, y, action }),
            ));
        }
        self
    }

    pub fn scroll_at(mut self, ts: u64, x: i32, y: i32) -> Self {
        self.events.push(SessionEvent::new(
            ts,
            EventPayload::Scroll(ScrollPayload { x, y }),
        ));
        self
    }

    pub fn build(self) -> Vec<SessionEvent> {
        self.events
    }
}
