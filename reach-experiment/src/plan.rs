use crate::config::{ExperimentConfig, TargetLayout};
use crate::error::ConfigError;
use rand::Rng;
use reach_core::{SceneTransform, TargetSpec, evenly_spaced_angles, polar};
use std::f32::consts::TAU;

/// Precomputed target placements for a whole session; never empty
#[derive(Debug, Clone, PartialEq)]
pub struct TrialPlan {
    targets: Vec<TargetSpec>,
}

impl TrialPlan {
    pub fn generate<R: Rng>(
        config: &ExperimentConfig,
        screen: &SceneTransform,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let n = config.n_trials;

        let targets = match config.layout {
            TargetLayout::Free => {
                let (half_w, half_h) = screen.half_extent();
                if half_w <= 0.0 {
                    return Err(ConfigError::NonPositive {
                        field: "screen width",
                        value: screen.width,
                    });
                }
                if half_h <= 0.0 {
                    return Err(ConfigError::NonPositive {
                        field: "screen height",
                        value: screen.height,
                    });
                }
                (0..n)
                    .map(|_| {
                        let x = rng.random_range(-half_w..half_w);
                        let y = rng.random_range(-half_h..half_h);
                        TargetSpec::at((x, y))
                    })
                    .collect()
            }
            TargetLayout::FixedRadius { radius } => (0..n)
                .map(|_| {
                    let angle = rng.random_range(0.0..TAU);
                    TargetSpec {
                        position: polar(radius, angle),
                        distance: radius,
                        angle,
                    }
                })
                .collect(),
            TargetLayout::Cycled {
                n_locations,
                radius,
            } => {
                let angles = evenly_spaced_angles(n_locations);
                (0..n)
                    .map(|i| {
                        let angle = angles[i % n_locations];
                        TargetSpec {
                            position: polar(radius, angle),
                            distance: radius,
                            angle,
                        }
                    })
                    .collect()
            }
        };

        Ok(Self { targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TargetSpec> {
        self.targets.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetSpec> {
        self.targets.iter()
    }
}
