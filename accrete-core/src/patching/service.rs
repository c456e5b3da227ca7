//! Frame patching orchestration

use crate::accumulation::{AccumulationStrategy, PointCloudAccumulator, build_strategy};
use crate::config::PatchConfig;
use crate::error::PatchError;
use crate::index::{GroupedInstances, group_instances};
use crate::patching::patcher::FramePatcher;
use accrete_data::{Frame, FrameSink, FrameSource, InstanceId, PointCloud, Pose, SegmentLabel};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

/// Progress sink: fraction in `[0, 1]` and a short status message.
pub type ProgressFn<'p> = &'p mut dyn FnMut(f32, &str);

/// Result of patching one frame.
#[derive(Debug, Clone)]
pub struct PatchedFrame {
    pub scene_id: String,
    pub frame_id: String,
    pub pose: Pose,
    pub points: PointCloud,
    pub segments: Vec<SegmentLabel>,
    /// Point count of the frame before patching.
    pub original_len: usize,
    /// Instances whose points were replaced.
    pub patched: Vec<InstanceId>,
    /// Requested instances missing from the grouping index.
    pub skipped: Vec<InstanceId>,
    /// Indexed instances that had no points in this frame.
    pub absent: Vec<InstanceId>,
}

impl PatchedFrame {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_frame(self) -> Frame {
        Frame {
            id: self.frame_id,
            points: self.points,
            segments: self.segments,
            pose: self.pose,
        }
    }
}

/// Summary of one instance's presence in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceInfo {
    pub exists: bool,
    pub frames: usize,
    pub first_frame: Option<String>,
    pub last_frame: Option<String>,
}

/// Drives accumulation and patching for a frame, one instance at a time.
pub struct PatchingService<'a, S: ?Sized> {
    source: &'a S,
    config: PatchConfig,
    strategy: Box<dyn AccumulationStrategy>,
}

impl<'a, S: FrameSource + ?Sized> PatchingService<'a, S> {
    pub fn new(source: &'a S, config: PatchConfig) -> Result<Self, PatchError> {
        config.validate()?;
        let strategy = build_strategy(config.strategy, config.greedy_grid);
        Ok(Self {
            source,
            config,
            strategy,
        })
    }

    /// Use a custom strategy instead of the configured one.
    pub fn with_strategy(mut self, strategy: Box<dyn AccumulationStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Build the grouped-instances index for `scene` with the configured exclusions.
    pub fn group(&self, scene: &str) -> Result<GroupedInstances, PatchError> {
        group_instances(self.source, scene, &self.config.excluded_classes)
    }

    /// Patch `instance_ids` into `frame` with the configured strategy.
    pub fn patch_frame(
        &self,
        scene: &str,
        frame: &str,
        instance_ids: &[InstanceId],
        grouped: &GroupedInstances,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<PatchedFrame, PatchError> {
        self.patch_frame_with(
            scene,
            frame,
            instance_ids,
            grouped,
            self.strategy.as_ref(),
            progress,
        )
    }

    /// Patch `instance_ids` into `frame`, in the order given.
    ///
    /// Instances missing from `grouped` are skipped. Merged points are built
    /// in the scene frame and mapped into the target frame's coordinates
    /// before substitution. On error the partial working copy is dropped;
    /// callers re-run the whole patch.
    #[tracing::instrument(skip(self, instance_ids, grouped, strategy, progress), fields(instances = instance_ids.len()))]
    pub fn patch_frame_with(
        &self,
        scene: &str,
        frame: &str,
        instance_ids: &[InstanceId],
        grouped: &GroupedInstances,
        strategy: &dyn AccumulationStrategy,
        mut progress: Option<ProgressFn<'_>>,
    ) -> Result<PatchedFrame, PatchError> {
        let accumulator = PointCloudAccumulator::new(self.source, grouped, self.config.step);
        let mut patcher = FramePatcher::load(self.source, scene, frame)?;
        let original_len = patcher.len();
        let scene_to_frame = patcher.pose().try_inverse()?;

        let mut skipped = Vec::new();
        let mut absent = Vec::new();
        let total = instance_ids.len();

        for (i, &instance) in instance_ids.iter().enumerate() {
            if let Some(report) = progress.as_deref_mut() {
                report(i as f32 / total as f32, &format!("Patching instance {}...", instance));
            }

            if !grouped.contains(instance) {
                debug!("Instance {} not in index, skipping", instance);
                skipped.push(instance);
                continue;
            }

            let merged = accumulator.merge(scene, instance, strategy)?;
            // a fresh buffer per call; the patcher takes ownership
            let local = merged.transformed(&scene_to_frame);
            let outcome = patcher.patch_instance(instance, local)?;
            if outcome.is_noop() {
                absent.push(instance);
            }
        }

        if let Some(report) = progress.as_deref_mut() {
            report(1.0, "Patching complete!");
        }

        let patched = patcher.patched_instances().to_vec();
        let pose = *patcher.pose();
        let (points, segments) = patcher.into_parts();
        info!(
            "Patched {} instances in {}/{}: {} -> {} points",
            patched.len(),
            scene,
            frame,
            original_len,
            points.len()
        );

        Ok(PatchedFrame {
            scene_id: scene.to_string(),
            frame_id: frame.to_string(),
            pose,
            points,
            segments,
            original_len,
            patched,
            skipped,
            absent,
        })
    }

    pub fn instance_info(&self, instance: InstanceId, grouped: &GroupedInstances) -> InstanceInfo {
        match grouped.frames(instance) {
            Some(frames) => InstanceInfo {
                exists: true,
                frames: frames.len(),
                first_frame: frames.first().cloned(),
                last_frame: frames.last().cloned(),
            },
            None => InstanceInfo {
                exists: false,
                frames: 0,
                first_frame: None,
                last_frame: None,
            },
        }
    }

    /// Persist a patched frame through `sink`. The original frame is never overwritten.
    pub fn save_patched_frame<K: FrameSink + ?Sized>(
        &self,
        sink: &K,
        patched: &PatchedFrame,
    ) -> Result<PathBuf, PatchError> {
        Ok(sink.serialise_frame(
            &patched.scene_id,
            &patched.frame_id,
            &patched.points,
            &patched.segments,
            &patched.pose,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyKind;
    use accrete_data::MemoryDataset;
    use glam::Vec3;
    use std::num::NonZeroUsize;

    fn frame(id: &str, labels: &[SegmentLabel], pose: Pose) -> Frame {
        let positions: Vec<Vec3> = (0..labels.len()).map(|i| Vec3::new(i as f32, 1.0, 0.0)).collect();
        Frame::new(id, PointCloud::from_positions(&positions), labels.to_vec(), pose).unwrap()
    }

    fn config() -> PatchConfig {
        PatchConfig::default()
            .with_step(NonZeroUsize::MIN)
            .with_excluded_classes([-1, 0])
    }

    #[test]
    fn test_progress_reports_fractions_then_one() {
        let dataset = MemoryDataset::new()
            .with_frame("s", frame("f0", &[7, 8, 0], Pose::identity()))
            .with_frame("s", frame("f1", &[7, 8], Pose::identity()));
        let service = PatchingService::new(&dataset, config()).unwrap();
        let grouped = service.group("s").unwrap();

        let mut reports: Vec<(f32, String)> = Vec::new();
        let mut record = |fraction: f32, message: &str| reports.push((fraction, message.to_string()));
        service
            .patch_frame("s", "f0", &[InstanceId(7), InstanceId(8)], &grouped, Some(&mut record))
            .unwrap();

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0], (0.0, "Patching instance 7...".to_string()));
        assert_eq!(reports[1].0, 0.5);
        assert_eq!(reports[2], (1.0, "Patching complete!".to_string()));
    }

    #[test]
    fn test_skips_unindexed_and_reports_absent() {
        let dataset = MemoryDataset::new()
            .with_frame("s", frame("f0", &[7, 0], Pose::identity()))
            .with_frame("s", frame("f1", &[8, 8], Pose::identity()));
        let service = PatchingService::new(&dataset, config()).unwrap();
        let grouped = service.group("s").unwrap();

        let patched = service
            .patch_frame("s", "f0", &[InstanceId(999), InstanceId(8), InstanceId(7)], &grouped, None)
            .unwrap();
        assert_eq!(patched.skipped, vec![InstanceId(999)]);
        assert_eq!(patched.absent, vec![InstanceId(8)]);
        assert_eq!(patched.patched, vec![InstanceId(7)]);
        assert_eq!(patched.original_len, 2);
        assert_eq!(patched.len(), 2);
    }

    #[test]
    fn test_merged_points_land_in_target_frame() {
        // the same world point seen from two differently posed frames
        let shift = Pose::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let f0 = Frame::new(
            "f0",
            PointCloud::from_positions(&[Vec3::new(1.0, 0.0, 0.0)]),
            vec![7],
            Pose::identity(),
        )
        .unwrap();
        let f1 = Frame::new(
            "f1",
            PointCloud::from_positions(&[Vec3::new(-4.0, 0.0, 0.0)]),
            vec![7],
            shift,
        )
        .unwrap();
        let dataset = MemoryDataset::new().with_frame("s", f0).with_frame("s", f1);
        let service = PatchingService::new(&dataset, config()).unwrap();
        let grouped = service.group("s").unwrap();

        let patched = service
            .patch_frame("s", "f1", &[InstanceId(7)], &grouped, None)
            .unwrap();
        assert_eq!(patched.len(), 2);
        for p in patched.points.positions() {
            assert!((p - Vec3::new(-4.0, 0.0, 0.0)).length() < 1e-5);
        }
        assert_eq!(patched.pose, shift);
    }

    #[test]
    fn test_greedy_grid_service_runs() {
        let dataset = MemoryDataset::new()
            .with_frame("s", frame("f0", &[7, 7, 7], Pose::identity()))
            .with_frame("s", frame("f1", &[7, 7], Pose::identity()));
        let service =
            PatchingService::new(&dataset, config().with_strategy(StrategyKind::GreedyGrid)).unwrap();
        assert_eq!(service.strategy_name(), "greedy_grid");
        let grouped = service.group("s").unwrap();
        let patched = service
            .patch_frame("s", "f1", &[InstanceId(7)], &grouped, None)
            .unwrap();
        assert_eq!(patched.len(), 5);
    }

    #[test]
    fn test_instance_info() {
        let dataset = MemoryDataset::new()
            .with_frame("s", frame("f0", &[7], Pose::identity()))
            .with_frame("s", frame("f1", &[0], Pose::identity()))
            .with_frame("s", frame("f2", &[7], Pose::identity()));
        let service = PatchingService::new(&dataset, config()).unwrap();
        let grouped = service.group("s").unwrap();

        let info = service.instance_info(InstanceId(7), &grouped);
        assert!(info.exists);
        assert_eq!(info.frames, 2);
        assert_eq!(info.first_frame.as_deref(), Some("f0"));
        assert_eq!(info.last_frame.as_deref(), Some("f2"));
        assert!(!service.instance_info(InstanceId(3), &grouped).exists);
    }

    #[test]
    fn test_save_goes_to_sink() {
        let dataset = MemoryDataset::new()
            .with_frame("s", frame("f0", &[7, 0], Pose::identity()))
            .with_frame("s", frame("f1", &[7, 7], Pose::identity()));
        let service = PatchingService::new(&dataset, config()).unwrap();
        let grouped = service.group("s").unwrap();
        let patched = service
            .patch_frame("s", "f0", &[InstanceId(7)], &grouped, None)
            .unwrap();

        service.save_patched_frame(&dataset, &patched).unwrap();
        let saved = dataset.saved_frame("s", "f0").unwrap();
        assert_eq!(saved.len(), 1 + 1 + 2);
        assert_eq!(dataset.load_frame("s", "f0").unwrap().len(), 2);
    }

    #[test]
    fn test_singular_target_pose_fails_instead_of_writing_nan() {
        let collapsed = Pose::from_row_major([[0.0; 4], [0.0; 4], [0.0; 4], [0.0, 0.0, 0.0, 1.0]]);
        let dataset = MemoryDataset::new()
            .with_frame("s", frame("f0", &[7, 7, 0], collapsed))
            .with_frame("s", frame("f1", &[7], Pose::identity()));
        let service = PatchingService::new(&dataset, config()).unwrap();
        let grouped = service.group("s").unwrap();

        let err = service
            .patch_frame("s", "f0", &[InstanceId(7)], &grouped, None)
            .unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dataset = MemoryDataset::new();
        let bad = config().with_greedy_grid(crate::config::GreedyGridConfig::new().with_voxel_size(-1.0));
        assert!(matches!(
            PatchingService::new(&dataset, bad),
            Err(PatchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unbounded_search_radius_is_rejected_up_front() {
        let dataset = MemoryDataset::new().with_frame("s", frame("f0", &[7], Pose::identity()));
        let wide = config()
            .with_strategy(StrategyKind::GreedyGrid)
            .with_greedy_grid(crate::config::GreedyGridConfig::new().with_search_radius(100_000));
        assert!(matches!(
            PatchingService::new(&dataset, wide),
            Err(PatchError::InvalidConfig(_))
        ));
    }
}
