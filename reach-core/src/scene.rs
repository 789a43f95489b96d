//! Per-frame scene contents handed to the presentation backend.

use crate::geometry::Point;
use reach_cache::LabelId;

pub type Color = [u8; 4];

pub mod palette {
    use super::Color;

    pub const BACKGROUND: Color = [0, 0, 0, 255];
    pub const REGION_FILL: Color = [26, 26, 26, 255];
    pub const REGION_STROKE: Color = [90, 90, 90, 255];
    pub const HOLD_CUE: Color = [255, 200, 0, 255];
    pub const PATH_NEUTRAL: Color = [128, 128, 128, 255];
    pub const CORRECT: Color = [0, 255, 0, 255];
    pub const INCORRECT: Color = [255, 0, 0, 255];
    pub const AGENT: Color = [255, 255, 255, 255];
}

/// A visual element positioned in scene coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Circle {
        center: Point,
        radius: f32,
        fill: Option<Color>,
        /// Stroke colour and width
        stroke: Option<(Color, f32)>,
    },
    /// Open polyline with round caps and joins
    Path {
        points: Vec<Point>,
        color: Color,
        width: f32,
    },
    /// The configured decoration image, scaled to `size` and centred on `center`
    Decoration { center: Point, size: f32 },
    Text { label: LabelId, position: Point },
}

/// Ordered list of elements; later elements are composited on top
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub background: Color,
    pub elements: Vec<Element>,
}

impl Scene {
    pub fn new(background: Color) -> Self {
        Self {
            background,
            elements: Vec::with_capacity(8),
        }
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(palette::BACKGROUND)
    }
}
