pub mod geometry;
pub mod gesture;
pub mod phase;
pub mod scene;
pub mod trial;

pub use geometry::{Point, Region, SceneTransform, distance, evenly_spaced_angles, polar, within};
pub use gesture::{GestureEvent, GestureHandler, GestureKind, InputFamily, RawInput, TouchPhase};
pub use phase::SessionPhase;
pub use scene::{Color, Element, Scene};
pub use trial::{DrawState, TargetSpec, TrialPhase, TrialRecord};
