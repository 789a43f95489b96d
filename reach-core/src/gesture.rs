use crate::geometry::Point;

/// Input device family a gesture originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFamily {
    Pointer,
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Start,
    Move,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Started,
    Moved,
    Ended,
    Cancelled,
}

/// Device-level input, already mapped into scene coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInput {
    PointerMoved(Point),
    /// Primary button pressed at the last known cursor position
    PointerPressed,
    PointerReleased,
    Touch {
        id: u64,
        phase: TouchPhase,
        position: Point,
    },
}

/// One step of a normalised gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub family: InputFamily,
    pub position: Point,
}

impl GestureEvent {
    pub fn new(kind: GestureKind, family: InputFamily, position: Point) -> Self {
        Self {
            kind,
            family,
            position,
        }
    }

    /// Hands the event to the matching callback of `handler`
    pub fn deliver<H: GestureHandler + ?Sized>(&self, handler: &mut H) {
        match self.kind {
            GestureKind::Start => handler.on_gesture_start(self.position),
            GestureKind::Move => handler.on_gesture_move(self.position),
            GestureKind::End => handler.on_gesture_end(self.position),
        }
    }
}

/// Receiver of a normalised gesture stream.
///
/// Implementors may assume causal order: `start` before any `move`, every
/// `move` before `end`, and no second `start` before an `end`.
pub trait GestureHandler {
    fn on_gesture_start(&mut self, position: Point);
    fn on_gesture_move(&mut self, position: Point);
    fn on_gesture_end(&mut self, position: Point);
}
