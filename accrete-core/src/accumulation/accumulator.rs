//! Per-instance accumulation across the frames of a scene

use crate::accumulation::strategy::{AccumulationStrategy, Observation};
use crate::error::PatchError;
use crate::index::{GroupedInstances, group_instances};
use accrete_data::{FrameSource, InstanceId, PointCloud, SegmentLabel};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use tracing::{debug, info};

/// Collects an instance's observations from a strided subset of its frames
/// and hands them to an [`AccumulationStrategy`].
pub struct PointCloudAccumulator<'a, S: ?Sized> {
    source: &'a S,
    grouped: Cow<'a, GroupedInstances>,
    step: NonZeroUsize,
}

impl<'a, S: FrameSource + ?Sized> PointCloudAccumulator<'a, S> {
    /// Accumulate against an index the caller already built.
    pub fn new(source: &'a S, grouped: &'a GroupedInstances, step: NonZeroUsize) -> Self {
        Self {
            source,
            grouped: Cow::Borrowed(grouped),
            step,
        }
    }

    /// Build the scene's index now and accumulate against it.
    pub fn for_scene(
        source: &'a S,
        scene: &str,
        excluded: &BTreeSet<SegmentLabel>,
        step: NonZeroUsize,
    ) -> Result<Self, PatchError> {
        let grouped = group_instances(source, scene, excluded)?;
        Ok(Self {
            source,
            grouped: Cow::Owned(grouped),
            step,
        })
    }

    pub fn grouped(&self) -> &GroupedInstances {
        &self.grouped
    }

    pub fn step(&self) -> NonZeroUsize {
        self.step
    }

    /// Every `step`-th frame of the instance's track, starting with the first.
    /// Empty for an unknown instance.
    pub fn sampled_frames(&self, instance: InstanceId) -> Vec<&str> {
        self.grouped
            .frames(instance)
            .unwrap_or_default()
            .iter()
            .step_by(self.step.get())
            .map(String::as_str)
            .collect()
    }

    /// The instance's points and pose in each sampled frame.
    pub fn observations(
        &self,
        scene: &str,
        instance: InstanceId,
    ) -> Result<Vec<Observation>, PatchError> {
        self.sampled_frames(instance)
            .into_iter()
            .map(|frame_id| -> Result<Observation, PatchError> {
                let frame = self.source.load_frame(scene, frame_id)?;
                let points = frame.points_with_label(instance.label());
                debug!("Frame {}: {} points of instance {}", frame_id, points.len(), instance);
                Ok(Observation::new(frame_id, points, frame.pose))
            })
            .collect()
    }

    /// Merge the instance's sampled observations with `strategy`.
    ///
    /// An instance missing from the index yields an empty cloud, not an error.
    #[tracing::instrument(skip(self, strategy), fields(strategy = strategy.name()))]
    pub fn merge(
        &self,
        scene: &str,
        instance: InstanceId,
        strategy: &dyn AccumulationStrategy,
    ) -> Result<PointCloud, PatchError> {
        if !self.grouped.contains(instance) {
            debug!("Instance {} not in index, nothing to merge", instance);
            return Ok(PointCloud::default());
        }

        let observations = self.observations(scene, instance)?;
        let merged = strategy.accumulate(&observations)?;
        info!(
            "Merged instance {} from {} frames into {} points",
            instance,
            observations.len(),
            merged.len()
        );
        Ok(merged)
    }
}
