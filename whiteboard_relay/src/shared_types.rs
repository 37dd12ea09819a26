use serde::{Deserialize, Serialize};

// A single incremental segment of a freehand stroke.
// Clients emit one of these per pointer-move tick, not one per gesture.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct Stroke {
    pub start: (i32, i32),
    pub end: (i32, i32),
    pub color: String,
    pub width: i32,
}

// Everything that can be drawn on the shared canvas, tagged by `action`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum DrawingEvent {
    Line(Stroke),
    Clear,
}

impl DrawingEvent {
    pub fn line(start: (i32, i32), end: (i32, i32), color: impl Into<String>, width: i32) -> Self {
        DrawingEvent::Line(Stroke {
            start,
            end,
            color: color.into(),
            width,
        })
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, DrawingEvent::Clear)
    }
}

// Message envelope for the relay wire protocol.
// `Init` replays history once per connection, `Drawing` carries one live event.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Message {
    Init(Vec<DrawingEvent>),
    Drawing(DrawingEvent),
}
