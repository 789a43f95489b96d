/// Coarse stage of a session
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Start screen, waiting for any press or touch
    #[default]
    Start,
    Trials,
    /// End screen, shown for a fixed interval
    End,
    Finished,
}

impl SessionPhase {
    pub fn next(&self) -> Option<Self> {
        use SessionPhase::*;
        Some(match self {
            Start => Trials,
            Trials => End,
            End => Finished,
            Finished => return None,
        })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, SessionPhase::Finished)
    }
}
