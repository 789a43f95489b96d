use crate::config::ExperimentConfig;
use reach_core::scene::palette;
use reach_core::{
    Color, DrawState, GestureHandler, Point, Region, TargetSpec, TrialPhase, TrialRecord, within,
};
use reach_timing::Timer;
use std::time::Duration;
use tracing::{debug, info};

/// Hold, draw, release and evaluate for a single trial.
///
/// Gesture callbacks and [`tick`](Self::tick) are the only writers of the
/// [`DrawState`].
pub struct TrialStateMachine<T: Timer<Timestamp = u64>> {
    index: usize,
    target: TargetSpec,
    home: Region,
    acceptance_radius: f32,
    hold_threshold: Duration,
    timer: T,
    state: DrawState,
    stroke_color: Color,
    release: Option<(Point, u64)>,
    aborted_holds: u32,
}

impl<T: Timer<Timestamp = u64>> TrialStateMachine<T> {
    pub fn new(index: usize, target: TargetSpec, config: &ExperimentConfig, timer: T) -> Self {
        Self {
            index,
            target,
            home: Region::new((0.0, 0.0), config.home_radius),
            acceptance_radius: config.acceptance_radius,
            hold_threshold: config.hold_threshold(),
            timer,
            state: DrawState::new(),
            stroke_color: palette::PATH_NEUTRAL,
            release: None,
            aborted_holds: 0,
        }
    }

    /// Per-frame poll; starts drawing once the hold has lasted longer than the threshold
    pub fn tick(&mut self) -> TrialPhase {
        if self.phase() == TrialPhase::Armed {
            if let Some(started) = self.state.started_time {
                if self.timer.elapsed(started) > self.hold_threshold {
                    self.state.active = true;
                    info!(trial = self.index, "hold complete, drawing");
                }
            }
        }
        self.phase()
    }

    pub fn phase(&self) -> TrialPhase {
        self.state.phase()
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    pub fn home(&self) -> &Region {
        &self.home
    }

    pub fn stroke_color(&self) -> Color {
        self.stroke_color
    }

    pub fn release_position(&self) -> Option<Point> {
        self.release.map(|(position, _)| position)
    }

    pub fn aborted_holds(&self) -> u32 {
        self.aborted_holds
    }

    /// How long the current hold has lasted, if one is running
    pub fn hold_elapsed(&self) -> Option<Duration> {
        match self.phase() {
            TrialPhase::Armed => self.state.started_time.map(|t| self.timer.elapsed(t)),
            _ => None,
        }
    }

    /// Result of an evaluated trial
    pub fn record(&self) -> Option<TrialRecord> {
        let correct = self.state.correct?;
        let (release, released_ns) = self.release?;
        Some(TrialRecord {
            trial: self.index,
            target: self.target,
            release,
            correct,
            path_points: self.state.points.len(),
            hold_started_ns: self.state.started_time.unwrap_or_default(),
            released_ns,
            aborted_holds: self.aborted_holds,
        })
    }

    /// Consumes the machine, keeping what the feedback frames still need
    pub fn into_parts(self) -> (DrawState, Color, Option<TrialRecord>) {
        let record = self.record();
        (self.state, self.stroke_color, record)
    }

    fn arm(&mut self) {
        let restart = self.state.started;
        self.state.points.clear();
        self.state.started = true;
        self.state.started_time = Some(self.timer.now());
        self.stroke_color = palette::PATH_NEUTRAL;
        debug!(trial = self.index, restart, "hold armed");
    }

    fn evaluate(&mut self, position: Point) {
        let correct = within(position, self.target.position, self.acceptance_radius);
        self.state.correct = Some(correct);
        self.state.active = false;
        self.state.finished = true;
        self.stroke_color = if correct {
            palette::CORRECT
        } else {
            palette::INCORRECT
        };
        self.release = Some((position, self.timer.now()));
        info!(
            trial = self.index,
            correct,
            x = position.0,
            y = position.1,
            points = self.state.points.len(),
            "trial evaluated"
        );
    }
}

impl<T: Timer<Timestamp = u64>> GestureHandler for TrialStateMachine<T> {
    fn on_gesture_start(&mut self, position: Point) {
        match self.phase() {
            TrialPhase::Idle | TrialPhase::Armed if self.home.contains(position) => self.arm(),
            _ => {}
        }
    }

    fn on_gesture_move(&mut self, position: Point) {
        if self.phase() == TrialPhase::Drawing {
            self.state.points.push(position);
        }
    }

    fn on_gesture_end(&mut self, position: Point) {
        match self.phase() {
            TrialPhase::Armed => {
                self.state.started = false;
                self.state.started_time = None;
                self.state.points.clear();
                self.aborted_holds += 1;
                debug!(trial = self.index, "hold released early");
            }
            TrialPhase::Drawing => self.evaluate(position),
            TrialPhase::Idle | TrialPhase::Evaluated => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reach_timing::ManualTimer;

    const HOLD: Duration = Duration::from_millis(1000);
    const EPS: Duration = Duration::from_millis(1);

    fn machine(target: Point) -> (TrialStateMachine<ManualTimer>, ManualTimer) {
        let timer = ManualTimer::new();
        let config = ExperimentConfig::default();
        let m = TrialStateMachine::new(0, TargetSpec::at(target), &config, timer.clone());
        (m, timer)
    }

    fn reach_drawing(m: &mut TrialStateMachine<ManualTimer>, timer: &ManualTimer) {
        m.on_gesture_start((0.0, 0.0));
        timer.advance(HOLD + EPS);
        assert_eq!(m.tick(), TrialPhase::Drawing);
    }

    #[test]
    fn press_outside_home_does_nothing() {
        let (mut m, _) = machine((700.0, 0.0));
        m.on_gesture_start((150.0, 0.0));
        assert_eq!(m.phase(), TrialPhase::Idle);
        assert!(!m.state().started);
    }

    #[test]
    fn press_inside_home_arms_and_records_time() {
        let (mut m, timer) = machine((700.0, 0.0));
        timer.set_ns(5_000);
        m.on_gesture_start((10.0, 10.0));
        assert_eq!(m.phase(), TrialPhase::Armed);
        assert_eq!(m.state().started_time, Some(5_000));
    }

    #[test]
    fn hold_just_short_of_threshold_aborts_on_release() {
        let (mut m, timer) = machine((700.0, 0.0));
        m.on_gesture_start((0.0, 0.0));
        timer.advance(HOLD - EPS);
        assert_eq!(m.tick(), TrialPhase::Armed);
        m.on_gesture_move((30.0, 0.0));
        m.on_gesture_end((30.0, 0.0));

        assert_eq!(m.phase(), TrialPhase::Idle);
        assert!(m.state().points.is_empty());
        assert_eq!(m.state().correct, None);
        assert_eq!(m.state().started_time, None);
        assert_eq!(m.aborted_holds(), 1);
        assert!(m.record().is_none());
    }

    #[test]
    fn hold_at_exactly_threshold_is_not_enough() {
        let (mut m, timer) = machine((700.0, 0.0));
        m.on_gesture_start((0.0, 0.0));
        timer.advance(HOLD);
        assert_eq!(m.tick(), TrialPhase::Armed);
        timer.advance(EPS);
        assert_eq!(m.tick(), TrialPhase::Drawing);
    }

    #[test]
    fn tick_while_idle_never_draws() {
        let (mut m, timer) = machine((700.0, 0.0));
        timer.advance(Duration::from_secs(10));
        assert_eq!(m.tick(), TrialPhase::Idle);
        assert_eq!(m.hold_elapsed(), None);
    }

    #[test]
    fn points_are_exactly_the_moves_while_drawing() {
        let (mut m, timer) = machine((700.0, 0.0));
        reach_drawing(&mut m, &timer);
        let moves = [(10.0, 1.0), (200.0, 2.0), (150.0, -3.0), (690.0, 0.0)];
        for p in moves {
            m.on_gesture_move(p);
        }
        m.on_gesture_end((690.0, 0.0));
        assert_eq!(m.state().points, moves.to_vec());
        assert_eq!(m.phase(), TrialPhase::Evaluated);
    }

    #[test]
    fn restart_clears_points_from_earlier_attempt() {
        let (mut m, timer) = machine((700.0, 0.0));
        for _ in 0..3 {
            m.on_gesture_start((0.0, 0.0));
            timer.advance(HOLD / 2);
            m.on_gesture_move((5.0, 5.0));
            m.on_gesture_end((5.0, 5.0));
            assert!(m.state().points.is_empty());
        }
        reach_drawing(&mut m, &timer);
        assert!(m.state().points.is_empty());
        m.on_gesture_move((1.0, 1.0));
        assert_eq!(m.state().points, vec![(1.0, 1.0)]);
        assert_eq!(m.aborted_holds(), 3);
    }

    #[test]
    fn second_start_while_armed_restarts_the_hold() {
        let (mut m, timer) = machine((700.0, 0.0));
        m.on_gesture_start((0.0, 0.0));
        timer.advance(HOLD - EPS);
        m.on_gesture_start((1.0, 1.0));
        timer.advance(EPS * 2);
        assert_eq!(m.tick(), TrialPhase::Armed);
        assert!(m.hold_elapsed().unwrap() < HOLD);
    }

    #[test]
    fn release_inside_acceptance_radius_is_correct() {
        let (mut m, timer) = machine((-700.0, 0.0));
        reach_drawing(&mut m, &timer);
        m.on_gesture_move((-650.0, 10.0));
        m.on_gesture_end((-650.0, 10.0));
        assert_eq!(m.state().correct, Some(true));
        assert_eq!(m.stroke_color(), palette::CORRECT);
    }

    #[test]
    fn release_outside_acceptance_radius_is_incorrect() {
        let (mut m, timer) = machine((700.0, 0.0));
        reach_drawing(&mut m, &timer);
        m.on_gesture_end((0.0, 0.0));
        assert_eq!(m.state().correct, Some(false));
        assert_eq!(m.stroke_color(), palette::INCORRECT);
    }

    #[test]
    fn acceptance_radius_is_wider_than_the_drawn_target() {
        let (mut m, timer) = machine((700.0, 0.0));
        reach_drawing(&mut m, &timer);
        // 150 from the centre: outside the 100 drawn radius, inside 200
        m.on_gesture_end((550.0, 0.0));
        assert_eq!(m.state().correct, Some(true));
    }

    #[test]
    fn release_exactly_on_acceptance_radius_misses() {
        let (mut m, timer) = machine((700.0, 0.0));
        reach_drawing(&mut m, &timer);
        m.on_gesture_end((500.0, 0.0));
        assert_eq!(m.state().correct, Some(false));

        let (mut m, timer) = machine((700.0, 0.0));
        reach_drawing(&mut m, &timer);
        m.on_gesture_end((500.01, 0.0));
        assert_eq!(m.state().correct, Some(true));
    }

    #[test]
    fn evaluated_trial_ignores_further_input() {
        let (mut m, timer) = machine((700.0, 0.0));
        reach_drawing(&mut m, &timer);
        m.on_gesture_end((700.0, 0.0));
        let before = m.state().clone();

        m.on_gesture_start((0.0, 0.0));
        m.on_gesture_move((3.0, 3.0));
        m.on_gesture_end((0.0, 0.0));
        timer.advance(HOLD * 2);
        assert_eq!(m.tick(), TrialPhase::Evaluated);
        assert_eq!(m.state(), &before);
    }

    #[test]
    fn record_captures_the_outcome() {
        let (mut m, timer) = machine((700.0, 0.0));
        m.on_gesture_start((0.0, 0.0));
        m.on_gesture_end((0.0, 0.0));
        reach_drawing(&mut m, &timer);
        m.on_gesture_move((400.0, 0.0));
        m.on_gesture_end((690.0, 5.0));

        let record = m.record().unwrap();
        assert!(record.correct);
        assert_eq!(record.release, (690.0, 5.0));
        assert_eq!(record.path_points, 1);
        assert_eq!(record.aborted_holds, 1);
        assert!(record.released_ns > record.hold_started_ns);
    }
}
