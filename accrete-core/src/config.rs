//! Engine configuration.

use crate::error::PatchError;
use accrete_data::SegmentLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

/// Default frame-sampling stride.
pub const DEFAULT_STEP: usize = 3;

/// Largest accepted greedy-grid search radius, in voxels.
pub const MAX_SEARCH_RADIUS: i32 = 64;

/// Semantic-class codes that never denote a dynamic instance, plus the
/// unlabeled sentinel.
pub const DEFAULT_EXCLUDED_CLASSES: [SegmentLabel; 14] =
    [-1, 0, 1, 2, 4, 5, 9, 10, 12, 13, 15, 17, 20, 21];

/// Which accumulation strategy to merge observations with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Concatenate in sampling order, no spatial correction.
    #[default]
    Default,
    /// Coarse voxel-correspondence alignment before concatenating.
    GreedyGrid,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::Default, StrategyKind::GreedyGrid];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Default => "default",
            StrategyKind::GreedyGrid => "greedy_grid",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StrategyKind::Default => "Simple concatenation (no registration)",
            StrategyKind::GreedyGrid => "Greedy Grid registration-based alignment",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                PatchError::InvalidConfig(format!(
                    "unknown strategy '{}' (expected one of: default, greedy_grid)",
                    s
                ))
            })
    }
}

/// Parameters of the greedy grid alignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreedyGridConfig {
    /// Edge length of the cubic voxels, in metres.
    pub voxel_size: f32,
    /// Offsets from `-search_radius..=search_radius` voxels are tried on each
    /// axis. At most [`MAX_SEARCH_RADIUS`].
    pub search_radius: i32,
}

impl Default for GreedyGridConfig {
    fn default() -> Self {
        Self {
            voxel_size: 0.2,
            search_radius: 4,
        }
    }
}

impl GreedyGridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voxel_size(mut self, metres: f32) -> Self {
        self.voxel_size = metres;
        self
    }

    pub fn with_search_radius(mut self, voxels: i32) -> Self {
        self.search_radius = voxels;
        self
    }

    pub fn validate(&self) -> Result<(), PatchError> {
        if !(self.voxel_size.is_finite() && self.voxel_size > 0.0) {
            return Err(PatchError::InvalidConfig(format!(
                "voxel_size must be positive, got {}",
                self.voxel_size
            )));
        }
        if !(0..=MAX_SEARCH_RADIUS).contains(&self.search_radius) {
            return Err(PatchError::InvalidConfig(format!(
                "search_radius must be within 0..={}, got {}",
                MAX_SEARCH_RADIUS, self.search_radius
            )));
        }
        Ok(())
    }
}

/// Everything the patching layer can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Use every `step`-th frame of an instance's track.
    pub step: NonZeroUsize,
    pub strategy: StrategyKind,
    /// Labels treated as semantic classes rather than instances.
    pub excluded_classes: BTreeSet<SegmentLabel>,
    pub greedy_grid: GreedyGridConfig,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            step: NonZeroUsize::new(DEFAULT_STEP).unwrap_or(NonZeroUsize::MIN),
            strategy: StrategyKind::Default,
            excluded_classes: DEFAULT_EXCLUDED_CLASSES.into_iter().collect(),
            greedy_grid: GreedyGridConfig::default(),
        }
    }
}

impl PatchConfig {
    pub fn with_step(mut self, step: NonZeroUsize) -> Self {
        self.step = step;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_excluded_classes(mut self, classes: impl IntoIterator<Item = SegmentLabel>) -> Self {
        self.excluded_classes = classes.into_iter().collect();
        self
    }

    pub fn with_greedy_grid(mut self, greedy_grid: GreedyGridConfig) -> Self {
        self.greedy_grid = greedy_grid;
        self
    }

    pub fn validate(&self) -> Result<(), PatchError> {
        self.greedy_grid.validate()
    }
}
