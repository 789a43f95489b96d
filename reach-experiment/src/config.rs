use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How target positions are chosen across trials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetLayout {
    /// Uniformly random anywhere on screen
    Free,
    /// Random direction at a fixed distance from home
    FixedRadius { radius: f32 },
    /// `n_locations` evenly spaced directions, trial `i` uses location `i mod n`
    Cycled { n_locations: usize, radius: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub n_trials: usize,
    pub layout: TargetLayout,
    pub home_radius: f32,
    /// Drawn target radius
    pub target_radius: f32,
    /// Hit-test radius around the target centre, independent of `target_radius`
    pub acceptance_radius: f32,
    pub hold_threshold_ms: u64,
    pub exit_animation_ms: u64,
    pub feedback_display_ms: u64,
    pub end_screen_ms: u64,
    pub path_stroke_width: f32,
    pub agent_radius: f32,
    /// Edge length of the decoration image drawn on the target
    pub decoration_size: f32,
    pub decoration_image: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
    /// Seed for target placement; random when unset
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_trials: 100,
            layout: TargetLayout::Cycled {
                n_locations: 4,
                radius: 700.0,
            },
            home_radius: 100.0,
            target_radius: 100.0,
            acceptance_radius: 200.0,
            hold_threshold_ms: 1000,
            exit_animation_ms: 500,
            feedback_display_ms: 800,
            end_screen_ms: 1000,
            path_stroke_width: 25.0,
            agent_radius: 20.0,
            decoration_size: 120.0,
            decoration_image: None,
            font_path: None,
            font_size: 48.0,
            seed: None,
        }
    }
}

impl ExperimentConfig {
    /// Reads a JSON config; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rejects configurations that cannot produce a session
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        match self.layout {
            TargetLayout::Free => {}
            TargetLayout::FixedRadius { radius } => positive("layout radius", radius)?,
            TargetLayout::Cycled {
                n_locations,
                radius,
            } => {
                if n_locations == 0 {
                    return Err(ConfigError::EmptyLocationSet);
                }
                positive("layout radius", radius)?;
            }
        }
        positive("home_radius", self.home_radius)?;
        positive("target_radius", self.target_radius)?;
        positive("acceptance_radius", self.acceptance_radius)?;
        positive("path_stroke_width", self.path_stroke_width)?;
        positive("agent_radius", self.agent_radius)?;
        positive("font_size", self.font_size)?;
        if self.decoration_image.is_some() {
            positive("decoration_size", self.decoration_size)?;
        }
        Ok(())
    }

    pub fn hold_threshold(&self) -> Duration {
        Duration::from_millis(self.hold_threshold_ms)
    }

    pub fn exit_animation(&self) -> Duration {
        Duration::from_millis(self.exit_animation_ms)
    }

    pub fn feedback_display(&self) -> Duration {
        Duration::from_millis(self.feedback_display_ms)
    }

    pub fn end_screen(&self) -> Duration {
        Duration::from_millis(self.end_screen_ms)
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    // NaN fails this comparison too
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(ExperimentConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_trials_is_rejected() {
        let config = ExperimentConfig {
            n_trials: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoTrials)));
    }

    #[test]
    fn empty_location_set_is_rejected() {
        let config = ExperimentConfig {
            layout: TargetLayout::Cycled {
                n_locations: 0,
                radius: 700.0,
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyLocationSet)
        ));
    }

    #[test]
    fn non_positive_radius_names_the_field() {
        let config = ExperimentConfig {
            acceptance_radius: 0.0,
            ..Default::default()
        };
        match config.validate() {
            Err(ConfigError::NonPositive { field, .. }) => assert_eq!(field, "acceptance_radius"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "n_trials": 8, "layout": {{ "kind": "fixed_radius", "radius": 400.0 }} }}"#
        )
        .unwrap();

        let config = ExperimentConfig::load(file.path()).unwrap();
        assert_eq!(config.n_trials, 8);
        assert_eq!(config.layout, TargetLayout::FixedRadius { radius: 400.0 });
        assert_eq!(config.acceptance_radius, 200.0);
        assert_eq!(config.hold_threshold(), Duration::from_secs(1));
    }

    #[test]
    fn negative_trial_count_fails_to_parse() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "n_trials": -3 }}"#).unwrap();
        assert!(matches!(
            ExperimentConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ExperimentConfig::load(Path::new("/nonexistent/reach.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
