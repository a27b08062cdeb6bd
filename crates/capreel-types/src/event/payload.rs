use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "camelCase")]
pub enum EventPayload {
    /// Full visual state (baseline). Supersedes everything before it.
    FullSnapshot(SnapshotPayload),

    /// Pointer movement or button transition.
    Pointer(PointerPayload),

    /// Viewport scroll offset change.
    Scroll(ScrollPayload),

    /// Text entered into an input target.
    Input(InputPayload),

    /// Session-level annotation (page url, viewport resize, ...). Not
    /// visual; ignored by renderers that don't understand the name.
    Meta(MetaPayload),

    /// Opaque capture-source extension. Carried through storage and replay
    /// untouched.
    Custom(Value),
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::FullSnapshot(_) => "fullSnapshot",
            EventPayload::Pointer(_) => "pointer",
            EventPayload::Scroll(_) => "scroll",
            EventPayload::Input(_) => "input",
            EventPayload::Meta(_) => "meta",
            EventPayload::Custom(_) => "custom",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    /// Viewport width in pixels.
    pub width: u32,

    /// Viewport height in pixels.
    pub height: u32,

    /// Background color as `#rrggbb`. Renderer default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,

    /// Serialized scene document from the capture source. Opaque here.
    #[serde(default)]
    pub document: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PointerAction {
    Move,
    Down,
    Up,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerPayload {
    pub x: i32,
    pub y: i32,
    pub action: PointerAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollPayload {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPayload {
    /// Capture-source identifier of the input target.
    pub target: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaPayload {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_wire_tag() {
        let payload = EventPayload::FullSnapshot(SnapshotPayload {
            width: 800,
            height: 600,
            background: None,
            document: Value::Null,
        });

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], payload.kind());
    }
}
