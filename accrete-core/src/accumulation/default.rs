//! Order-preserving concatenation

use crate::accumulation::strategy::{AccumulationStrategy, Observation, empty_output};
use crate::error::PatchError;
use accrete_data::PointCloud;
use tracing::debug;

/// Moves every observation into the scene frame and concatenates them in
/// sampling order. No deduplication and no noise correction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStrategy;

impl AccumulationStrategy for DefaultStrategy {
    fn name(&self) -> &'static str {
        "default"
    }

    fn accumulate(&self, observations: &[Observation]) -> Result<PointCloud, PatchError> {
        let mut merged = empty_output(observations)?;
        for observation in observations {
            merged.extend_from(&observation.in_scene_frame())?;
        }
        debug!(
            "Concatenated {} observations into {} points",
            observations.len(),
            merged.len()
        );
        Ok(merged)
    }
}
