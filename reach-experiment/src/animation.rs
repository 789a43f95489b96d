use reach_core::Point;
use std::time::Duration;

/// Linear interpolation between two values of a visual property
pub trait Lerp: Copy {
    fn lerp(self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Point {
    fn lerp(self, to: Self, t: f32) -> Self {
        (self.0.lerp(to.0, t), self.1.lerp(to.1, t))
    }
}

/// Time-based property animation, sampled once per frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation<V: Lerp> {
    pub from: V,
    pub to: V,
    /// Timer timestamp (ns) the animation starts at
    pub start: u64,
    pub duration: Duration,
}

impl<V: Lerp> Animation<V> {
    pub fn new(from: V, to: V, start: u64, duration: Duration) -> Self {
        Self {
            from,
            to,
            start,
            duration,
        }
    }

    /// Fraction complete at `now`, clamped to `[0, 1]`
    pub fn progress(&self, now: u64) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start) as f64;
        (elapsed / self.duration.as_nanos() as f64).clamp(0.0, 1.0) as f32
    }

    pub fn value_at(&self, now: u64) -> V {
        self.from.lerp(self.to, self.progress(now))
    }

    pub fn is_done(&self, now: u64) -> bool {
        self.progress(now) >= 1.0
    }
}
