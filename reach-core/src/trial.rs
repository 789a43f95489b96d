use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// Lifecycle of a single reach trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrialPhase {
    Idle,
    /// Pressed inside home, hold timer running
    Armed,
    Drawing,
    /// Terminal; `correct` is set
    Evaluated,
}

/// Per-trial drawing record.
///
/// Written only by the trial state machine; everything else reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawState {
    pub points: Vec<Point>,
    pub started: bool,
    /// Timer timestamp (ns) of the press that armed the hold
    pub started_time: Option<u64>,
    pub active: bool,
    pub finished: bool,
    pub correct: Option<bool>,
}

impl DrawState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TrialPhase {
        if self.finished {
            TrialPhase::Evaluated
        } else if self.active {
            TrialPhase::Drawing
        } else if self.started {
            TrialPhase::Armed
        } else {
            TrialPhase::Idle
        }
    }
}

/// Placement of one trial's target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub position: Point,
    /// Distance from the home position
    pub distance: f32,
    /// Direction from the home position, radians
    pub angle: f32,
}

impl TargetSpec {
    pub fn at(position: Point) -> Self {
        Self {
            position,
            distance: position.0.hypot(position.1),
            angle: position.1.atan2(position.0),
        }
    }
}

/// Outcome of one completed trial
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub trial: usize,
    pub target: TargetSpec,
    pub release: Point,
    pub correct: bool,
    pub path_points: usize,
    pub hold_started_ns: u64,
    pub released_ns: u64,
    /// Holds released before the threshold during this trial
    pub aborted_holds: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_follows_flags() {
        let mut state = DrawState::new();
        assert_eq!(state.phase(), TrialPhase::Idle);
        state.started = true;
        assert_eq!(state.phase(), TrialPhase::Armed);
        state.active = true;
        assert_eq!(state.phase(), TrialPhase::Drawing);
        state.active = false;
        state.finished = true;
        assert_eq!(state.phase(), TrialPhase::Evaluated);
    }

    #[test]
    fn target_from_position() {
        let target = TargetSpec::at((0.0, 300.0));
        assert!((target.distance - 300.0).abs() < 1e-4);
        assert!((target.angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
