pub mod animation;
pub mod config;
pub mod error;
pub mod plan;
pub mod router;
pub mod scene;
pub mod sequencer;
pub mod trial;

pub use animation::{Animation, Lerp};
pub use config::{ExperimentConfig, TargetLayout};
pub use error::{ConfigError, SessionError};
pub use plan::TrialPlan;
pub use router::{HandlerGauge, HandlerId, InputRouter, Subscription};
pub use sequencer::{Sequencer, SessionEvent};
pub use trial::TrialStateMachine;
