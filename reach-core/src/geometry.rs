//! Geometry and scoring helpers.
//!
//! Scene coordinates have their origin at the centre of the screen with y
//! pointing up. All distances are in scene units (physical pixels).

use std::f32::consts::TAU;

pub type Point = (f32, f32);

/// Euclidean distance between two points
pub fn distance(p1: Point, p2: Point) -> f32 {
    (p1.0 - p2.0).hypot(p1.1 - p2.1)
}

/// Strict point-in-circle test; a point exactly on the boundary is outside
pub fn within(point: Point, center: Point, radius: f32) -> bool {
    distance(point, center) < radius
}

/// `n` angles in radians, starting at 0 and stepping by `2π / n`
pub fn evenly_spaced_angles(n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    let step = TAU / n as f32;
    (0..n).map(|i| i as f32 * step).collect()
}

/// Position at `radius` from the origin along `angle`
pub fn polar(radius: f32, angle: f32) -> Point {
    (radius * angle.cos(), radius * angle.sin())
}

/// Circular region used for hit-testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub center: Point,
    pub radius: f32,
}

impl Region {
    pub fn new(center: Point, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn contains(&self, point: Point) -> bool {
        within(point, self.center, self.radius)
    }
}

/// Maps between window pixels (origin top-left, y down) and scene coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneTransform {
    pub width: f32,
    pub height: f32,
}

impl SceneTransform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn to_scene(&self, window: Point) -> Point {
        (window.0 - self.width * 0.5, self.height * 0.5 - window.1)
    }

    pub fn to_window(&self, scene: Point) -> Point {
        (scene.0 + self.width * 0.5, self.height * 0.5 - scene.1)
    }

    /// Half extents of the visible scene
    pub fn half_extent(&self) -> (f32, f32) {
        (self.width * 0.5, self.height * 0.5)
    }
}
