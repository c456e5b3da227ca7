//! The accumulation contract shared by every merge policy

use crate::accumulation::default::DefaultStrategy;
use crate::accumulation::greedy_grid::GreedyGridStrategy;
use crate::config::{GreedyGridConfig, StrategyKind};
use crate::error::PatchError;
use accrete_data::{LayoutError, PointCloud, Pose};

/// One sampled frame's view of an instance: its points in sensor
/// coordinates and the frame pose that maps them into the scene frame.
#[derive(Debug, Clone)]
pub struct Observation {
    pub frame_id: String,
    pub points: PointCloud,
    pub pose: Pose,
}

impl Observation {
    pub fn new(frame_id: impl Into<String>, points: PointCloud, pose: Pose) -> Self {
        Self {
            frame_id: frame_id.into(),
            points,
            pose,
        }
    }

    /// The observation's points expressed in the scene-global frame.
    pub fn in_scene_frame(&self) -> PointCloud {
        self.points.transformed(&self.pose)
    }
}

/// Merges several observations of one instance into a single point set.
///
/// Implementations receive observations in frame-sampling order, must move
/// every observation into the scene frame before merging, and must return a
/// cloud with the same channel layout as the input (no label channel).
pub trait AccumulationStrategy {
    fn name(&self) -> &'static str;

    fn accumulate(&self, observations: &[Observation]) -> Result<PointCloud, PatchError>;
}

/// Instantiate the strategy selected by `kind`.
pub fn build_strategy(kind: StrategyKind, grid: GreedyGridConfig) -> Box<dyn AccumulationStrategy> {
    match kind {
        StrategyKind::Default => Box::new(DefaultStrategy),
        StrategyKind::GreedyGrid => Box::new(GreedyGridStrategy::new(grid)),
    }
}

/// The channel count shared by all observations.
///
/// Returns `Ok(None)` when no observation has a layout yet, and an error as
/// soon as two observations disagree.
pub fn common_channels(observations: &[Observation]) -> Result<Option<usize>, LayoutError> {
    let mut channels = None;
    for observation in observations {
        if observation.points.is_layout_free() {
            continue;
        }
        let found = observation.points.channels();
        match channels {
            None => channels = Some(found),
            Some(expected) if expected != found => {
                return Err(LayoutError::ChannelMismatch { expected, found });
            }
            Some(_) => {}
        }
    }
    Ok(channels)
}

/// An empty output cloud with the observations' layout.
pub(crate) fn empty_output(observations: &[Observation]) -> Result<PointCloud, LayoutError> {
    Ok(common_channels(observations)?
        .map(PointCloud::empty)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_common_channels_detects_mismatch() {
        let xyz = Observation::new("a", PointCloud::from_positions(&[Vec3::ZERO]), Pose::identity());
        let xyzi = Observation::new(
            "b",
            PointCloud::from_flat(4, vec![0.0; 4]).unwrap(),
            Pose::identity(),
        );
        let free = Observation::new("c", PointCloud::default(), Pose::identity());

        assert_eq!(common_channels(&[free.clone(), xyz.clone()]).unwrap(), Some(3));
        assert_eq!(common_channels(&[free]).unwrap(), None);
        assert_eq!(
            common_channels(&[xyz, xyzi]).unwrap_err(),
            LayoutError::ChannelMismatch { expected: 3, found: 4 }
        );
    }

    #[test]
    fn test_build_strategy_names() {
        for kind in StrategyKind::ALL {
            let strategy = build_strategy(kind, GreedyGridConfig::default());
            assert_eq!(strategy.name(), kind.name());
        }
    }
}
