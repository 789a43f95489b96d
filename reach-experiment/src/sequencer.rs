use crate::animation::Animation;
use crate::config::ExperimentConfig;
use crate::error::{ConfigError, SessionError};
use crate::plan::TrialPlan;
use crate::router::{HandlerGauge, InputRouter, Subscription};
use crate::scene::{TrialView, compose_message, compose_trial};
use crate::trial::TrialStateMachine;
use rand::Rng;
use reach_cache::{LabelId, intern_label};
use reach_core::{
    Color, DrawState, GestureKind, Point, RawInput, Region, Scene, SceneTransform, SessionPhase,
    TargetSpec, TrialPhase, TrialRecord,
};
use reach_timing::Timer;
use tracing::{debug, info, warn};

/// Notable transitions, drained by [`Sequencer::tick`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SessionStarted,
    TrialStarted { trial: usize },
    DrawingStarted { trial: usize },
    TrialEvaluated { trial: usize, correct: bool },
    SessionFinished { correct: usize, total: usize },
}

struct ActiveTrial<T: Timer<Timestamp = u64>> {
    machine: TrialStateMachine<T>,
    subscription: Subscription,
}

/// What stays on screen after a trial's machine is gone
struct Feedback {
    trial: usize,
    target: TargetSpec,
    points: Vec<Point>,
    color: Color,
    release: Point,
    stroke: Animation<f32>,
    agent: Option<Animation<Point>>,
}

enum Stage<T: Timer<Timestamp = u64>> {
    StartScreen,
    Reaching(ActiveTrial<T>),
    Exit(Feedback),
    Display { feedback: Feedback, since: u64 },
    EndScreen { since: u64 },
    Done,
}

struct Labels {
    start: LabelId,
    end: LabelId,
    progress: Vec<LabelId>,
}

/// Runs a whole session, one `tick()` per rendered frame.
///
/// Trials are strictly serialised: at most one trial holds a gesture
/// subscription, and it is released before its draw state is dropped.
pub struct Sequencer<T: Timer<Timestamp = u64>> {
    config: ExperimentConfig,
    timer: T,
    screen: SceneTransform,
    router: InputRouter,
    plan: TrialPlan,
    phase: SessionPhase,
    stage: Stage<T>,
    trial_index: usize,
    results: Vec<TrialRecord>,
    labels: Labels,
    pending: Vec<SessionEvent>,
}

impl<T: Timer<Timestamp = u64>> Sequencer<T> {
    pub fn new<R: Rng>(
        config: ExperimentConfig,
        timer: T,
        screen: SceneTransform,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let plan = TrialPlan::generate(&config, &screen, rng)?;
        let labels = Labels {
            start: intern_label("Touch the screen to start"),
            end: intern_label("Done. Thank you!"),
            progress: (1..=plan.len())
                .map(|i| intern_label(&format!("Trial {}/{}", i, plan.len())))
                .collect(),
        };
        info!(trials = plan.len(), layout = ?config.layout, "session prepared");

        Ok(Self {
            config,
            timer,
            screen,
            router: InputRouter::new(),
            plan,
            phase: SessionPhase::Start,
            stage: Stage::StartScreen,
            trial_index: 0,
            results: Vec::new(),
            labels,
            pending: Vec::new(),
        })
    }

    /// Routes one raw input event to whoever currently listens for gestures
    pub fn handle_input(&mut self, raw: RawInput) {
        match &mut self.stage {
            Stage::StartScreen => {
                let started = self
                    .router
                    .normalize(raw)
                    .is_some_and(|event| event.kind == GestureKind::Start);
                if started {
                    self.begin_trials();
                }
            }
            Stage::Reaching(active) => {
                self.router.dispatch(raw, &mut active.machine);
            }
            _ => {
                // keep contact tracking consistent between trials
                self.router.normalize(raw);
            }
        }
    }

    /// Advances time-driven transitions and returns what happened since the last call
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let now = self.timer.now();
        let stage = std::mem::replace(&mut self.stage, Stage::Done);
        self.stage = match stage {
            Stage::Reaching(mut active) => {
                let before = active.machine.phase();
                let after = active.machine.tick();
                if before == TrialPhase::Armed && after == TrialPhase::Drawing {
                    self.pending.push(SessionEvent::DrawingStarted {
                        trial: active.machine.index(),
                    });
                }
                if after == TrialPhase::Evaluated {
                    self.finish_trial(active, now)
                } else {
                    Stage::Reaching(active)
                }
            }
            Stage::Exit(feedback) => {
                if feedback.stroke.is_done(now) {
                    Stage::Display {
                        feedback,
                        since: now,
                    }
                } else {
                    Stage::Exit(feedback)
                }
            }
            Stage::Display { feedback, since } => {
                if self.timer.elapsed(since) >= self.config.feedback_display() {
                    self.advance(feedback.trial)
                } else {
                    Stage::Display { feedback, since }
                }
            }
            Stage::EndScreen { since } => {
                if self.timer.elapsed(since) >= self.config.end_screen() {
                    self.finish_session()
                } else {
                    Stage::EndScreen { since }
                }
            }
            other => other,
        };
        std::mem::take(&mut self.pending)
    }

    /// Current frame contents
    pub fn scene(&self) -> Scene {
        let now = self.timer.now();
        match &self.stage {
            Stage::StartScreen => compose_message(self.labels.start),
            Stage::Reaching(active) => {
                let machine = &active.machine;
                let state = machine.state();
                let agent = match machine.phase() {
                    TrialPhase::Drawing | TrialPhase::Evaluated => {
                        state.points.last().copied().or(Some(machine.home().center))
                    }
                    TrialPhase::Idle | TrialPhase::Armed => Some(machine.home().center),
                };
                compose_trial(&TrialView {
                    home: *machine.home(),
                    target: self.target_region(machine.target()),
                    decoration: self.decoration(),
                    hold_cue: machine.phase() == TrialPhase::Armed,
                    path: &state.points,
                    path_color: machine.stroke_color(),
                    path_width: self.config.path_stroke_width,
                    agent,
                    agent_radius: self.config.agent_radius,
                    progress: self.progress(machine.index()),
                })
            }
            Stage::Exit(feedback) | Stage::Display { feedback, .. } => {
                let agent = feedback
                    .agent
                    .map(|anim| anim.value_at(now))
                    .unwrap_or(feedback.release);
                compose_trial(&TrialView {
                    home: self.home_region(),
                    target: self.target_region(&feedback.target),
                    decoration: self.decoration(),
                    hold_cue: false,
                    path: &feedback.points,
                    path_color: feedback.color,
                    path_width: feedback.stroke.value_at(now),
                    agent: Some(agent),
                    agent_radius: self.config.agent_radius,
                    progress: self.progress(feedback.trial),
                })
            }
            Stage::EndScreen { .. } | Stage::Done => compose_message(self.labels.end),
        }
    }

    /// Cancels the session. Releases the running trial's subscription and
    /// reports which trial was interrupted.
    pub fn abort(&mut self) -> Result<(), SessionError> {
        let interrupted = self.release_active();
        self.stage = Stage::Done;
        self.phase = SessionPhase::Finished;
        match interrupted {
            Some(trial) => {
                warn!(trial, completed = self.results.len(), "session aborted");
                Err(SessionError::Aborted { trial })
            }
            None => {
                info!(completed = self.results.len(), "session closed");
                Ok(())
            }
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_finished()
    }

    pub fn results(&self) -> &[TrialRecord] {
        &self.results
    }

    pub fn plan(&self) -> &TrialPlan {
        &self.plan
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Index of the trial currently taking input
    pub fn current_trial(&self) -> Option<usize> {
        match &self.stage {
            Stage::Reaching(active) => Some(active.machine.index()),
            _ => None,
        }
    }

    pub fn trial_phase(&self) -> Option<TrialPhase> {
        match &self.stage {
            Stage::Reaching(active) => Some(active.machine.phase()),
            _ => None,
        }
    }

    pub fn draw_state(&self) -> Option<&DrawState> {
        match &self.stage {
            Stage::Reaching(active) => Some(active.machine.state()),
            _ => None,
        }
    }

    /// Live gesture handler handles; zero outside a trial
    pub fn handler_count(&self) -> usize {
        self.router.handler_count()
    }

    /// Live handle count that stays readable after the sequencer is dropped
    pub fn handler_gauge(&self) -> HandlerGauge {
        self.router.gauge()
    }

    pub fn resize(&mut self, screen: SceneTransform) {
        self.screen = screen;
    }

    fn begin_trials(&mut self) {
        if let Some(next) = self.phase.next() {
            self.phase = next;
        }
        self.pending.push(SessionEvent::SessionStarted);
        info!("session started");
        self.stage = self.start_trial(0);
    }

    fn start_trial(&mut self, index: usize) -> Stage<T> {
        let Some(target) = self.plan.get(index).copied() else {
            return self.end_trials();
        };
        self.trial_index = index;
        let machine = TrialStateMachine::new(index, target, &self.config, self.timer.clone());
        let subscription = self.router.subscribe();
        self.pending.push(SessionEvent::TrialStarted { trial: index });
        info!(
            trial = index,
            x = target.position.0,
            y = target.position.1,
            "trial started"
        );
        Stage::Reaching(ActiveTrial {
            machine,
            subscription,
        })
    }

    fn finish_trial(&mut self, active: ActiveTrial<T>, now: u64) -> Stage<T> {
        let ActiveTrial {
            machine,
            subscription,
        } = active;
        self.router.unsubscribe(subscription);

        let trial = machine.index();
        let target = *machine.target();
        let release = machine
            .release_position()
            .or_else(|| machine.state().points.last().copied())
            .unwrap_or(target.position);
        let (state, color, record) = machine.into_parts();
        let correct = state.correct.unwrap_or(false);
        if let Some(record) = record {
            self.results.push(record);
        }
        self.pending
            .push(SessionEvent::TrialEvaluated { trial, correct });

        let exit = self.config.exit_animation();
        Stage::Exit(Feedback {
            trial,
            target,
            points: state.points,
            color,
            release,
            stroke: Animation::new(self.config.path_stroke_width, 0.0, now, exit),
            agent: correct.then(|| Animation::new(release, target.position, now, exit)),
        })
    }

    fn advance(&mut self, finished_trial: usize) -> Stage<T> {
        let next = finished_trial + 1;
        if next < self.plan.len() {
            self.start_trial(next)
        } else {
            self.end_trials()
        }
    }

    fn end_trials(&mut self) -> Stage<T> {
        self.phase = SessionPhase::End;
        debug!("all trials done");
        Stage::EndScreen {
            since: self.timer.now(),
        }
    }

    fn finish_session(&mut self) -> Stage<T> {
        self.phase = SessionPhase::Finished;
        let correct = self.results.iter().filter(|r| r.correct).count();
        let total = self.results.len();
        let stats = self.timer.calibration_stats();
        info!(
            correct,
            total,
            frame_ms = stats.average_frame_time_ns / 1e6,
            jitter_ms = stats.jitter_ns / 1e6,
            fps = stats.effective_fps,
            "session complete"
        );
        self.pending
            .push(SessionEvent::SessionFinished { correct, total });
        Stage::Done
    }

    /// Drops the running trial, if any, releasing its subscription first
    fn release_active(&mut self) -> Option<usize> {
        if !matches!(self.stage, Stage::Reaching(_)) {
            return None;
        }
        match std::mem::replace(&mut self.stage, Stage::Done) {
            Stage::Reaching(ActiveTrial {
                machine,
                subscription,
            }) => {
                self.router.unsubscribe(subscription);
                Some(machine.index())
            }
            other => {
                self.stage = other;
                None
            }
        }
    }

    fn home_region(&self) -> Region {
        Region::new((0.0, 0.0), self.config.home_radius)
    }

    fn target_region(&self, target: &TargetSpec) -> Region {
        Region::new(target.position, self.config.target_radius)
    }

    fn decoration(&self) -> Option<f32> {
        self.config
            .decoration_image
            .as_ref()
            .map(|_| self.config.decoration_size)
    }

    fn progress(&self, trial: usize) -> Option<(LabelId, Point)> {
        let label = *self.labels.progress.get(trial)?;
        let (half_w, half_h) = self.screen.half_extent();
        Some((label, (-half_w + 120.0, half_h - 50.0)))
    }
}

impl<T: Timer<Timestamp = u64>> Drop for Sequencer<T> {
    fn drop(&mut self) {
        if let Some(trial) = self.release_active() {
            debug!(trial, "released gesture handlers of unfinished trial");
        }
    }
}
