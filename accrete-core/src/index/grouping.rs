//! Grouping of instance observations across the frames of a scene

use crate::error::PatchError;
use accrete_data::{FrameSource, InstanceId, SegmentLabel, UNLABELED};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Instance id → frames (in scene order) that contain at least one of its points.
///
/// Built once per scene and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupedInstances {
    instances: BTreeMap<InstanceId, Vec<String>>,
}

impl GroupedInstances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `instance` appears in `frame`.
    ///
    /// Frames must be recorded in scene order; recording the same frame twice
    /// in a row is ignored.
    pub fn record(&mut self, instance: InstanceId, frame: &str) {
        let frames = self.instances.entry(instance).or_default();
        if frames.last().map(String::as_str) != Some(frame) {
            frames.push(frame.to_string());
        }
    }

    /// Frames the instance appears in, or `None` for an unknown instance.
    pub fn frames(&self, instance: InstanceId) -> Option<&[String]> {
        self.instances.get(&instance).map(Vec::as_slice)
    }

    pub fn contains(&self, instance: InstanceId) -> bool {
        self.instances.contains_key(&instance)
    }

    /// Instance ids in ascending order.
    pub fn instance_ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.instances.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &[String])> + '_ {
        self.instances.iter().map(|(id, frames)| (*id, frames.as_slice()))
    }

    /// Instances whose frame list contains `frame`.
    pub fn instances_in_frame<'a>(&'a self, frame: &'a str) -> impl Iterator<Item = InstanceId> + 'a {
        self.instances
            .iter()
            .filter(move |(_, frames)| frames.iter().any(|f| f == frame))
            .map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl FromIterator<(InstanceId, Vec<String>)> for GroupedInstances {
    fn from_iter<T: IntoIterator<Item = (InstanceId, Vec<String>)>>(iter: T) -> Self {
        Self {
            instances: iter.into_iter().collect(),
        }
    }
}

/// True when `label` names a dynamic instance rather than a semantic class.
pub fn is_instance_label(label: SegmentLabel, excluded: &BTreeSet<SegmentLabel>) -> bool {
    label != UNLABELED && !excluded.contains(&label)
}

/// Build the grouped-instances index for `scene`.
///
/// Frames are visited in the source's canonical order. A frame that fails to
/// load fails the whole scene.
#[tracing::instrument(skip(source, excluded))]
pub fn group_instances<S: FrameSource + ?Sized>(
    source: &S,
    scene: &str,
    excluded: &BTreeSet<SegmentLabel>,
) -> Result<GroupedInstances, PatchError> {
    let frames = source.frames(scene)?;
    let mut grouped = GroupedInstances::new();

    for frame in &frames {
        let segments = source.segments(scene, frame)?;
        let labels: BTreeSet<SegmentLabel> = segments
            .into_iter()
            .filter(|&label| is_instance_label(label, excluded))
            .collect();
        debug!("Frame {} has {} instances", frame, labels.len());
        for label in labels {
            grouped.record(InstanceId(label), frame);
        }
    }

    info!(
        "Grouped {} instances across {} frames of scene {}",
        grouped.len(),
        frames.len(),
        scene
    );
    Ok(grouped)
}

/// Instances present in `frame` according to the index, with their point
/// counts in that frame. Excluded classes are dropped.
pub fn frame_instances<S: FrameSource + ?Sized>(
    source: &S,
    scene: &str,
    frame: &str,
    grouped: &GroupedInstances,
    excluded: &BTreeSet<SegmentLabel>,
) -> Result<BTreeMap<InstanceId, usize>, PatchError> {
    let counts = source.load_frame(scene, frame)?.label_counts();

    Ok(grouped
        .instances_in_frame(frame)
        .filter(|id| is_instance_label(id.label(), excluded))
        .map(|id| (id, counts.get(&id.label()).copied().unwrap_or(0)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrete_data::{DatasetError, Frame, MemoryDataset, PointCloud, Pose};
    use glam::Vec3;

    fn frame(id: &str, labels: &[SegmentLabel]) -> Frame {
        let points = PointCloud::from_positions(&vec![Vec3::ZERO; labels.len()]);
        Frame::new(id, points, labels.to_vec(), Pose::identity()).unwrap()
    }

    fn excluded() -> BTreeSet<SegmentLabel> {
        [-1, 0, 1].into_iter().collect()
    }

    #[test]
    fn test_groups_in_frame_order_without_duplicates() {
        let dataset = MemoryDataset::new()
            .with_frame("s", frame("f0", &[7, 7, 0, 12]))
            .with_frame("s", frame("f1", &[12, -1]))
            .with_frame("s", frame("f2", &[7, 1, 7, 7]));

        let grouped = group_instances(&dataset, "s", &excluded()).unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.frames(InstanceId(7)).unwrap(), ["f0", "f2"]);
        assert_eq!(grouped.frames(InstanceId(12)).unwrap(), ["f0", "f1"]);
        assert!(grouped.frames(InstanceId(0)).is_none());
        assert!(!grouped.contains(InstanceId(-1)));
    }

    #[test]
    fn test_grouping_fails_for_missing_scene() {
        let dataset = MemoryDataset::new();
        let err = group_instances(&dataset, "nope", &excluded()).unwrap_err();
        assert!(matches!(err, PatchError::Dataset(DatasetError::SceneNotFound(_))));
    }

    #[test]
    fn test_record_ignores_repeat_of_last_frame() {
        let mut grouped = GroupedInstances::new();
        grouped.record(InstanceId(3), "a");
        grouped.record(InstanceId(3), "a");
        grouped.record(InstanceId(3), "b");
        assert_eq!(grouped.frames(InstanceId(3)).unwrap(), ["a", "b"]);
    }

    #[test]
    fn test_frame_instances_counts_points() {
        let dataset = MemoryDataset::new()
            .with_frame("s", frame("f0", &[7, 7, 0, 12]))
            .with_frame("s", frame("f1", &[12, 12, 12]));
        let grouped = group_instances(&dataset, "s", &excluded()).unwrap();

        let in_f1 = frame_instances(&dataset, "s", "f1", &grouped, &excluded()).unwrap();
        assert_eq!(in_f1.len(), 1);
        assert_eq!(in_f1.get(&InstanceId(12)), Some(&3));

        let in_f0 = frame_instances(&dataset, "s", "f0", &grouped, &excluded()).unwrap();
        assert_eq!(in_f0.get(&InstanceId(7)), Some(&2));
        assert_eq!(in_f0.get(&InstanceId(12)), Some(&1));
    }

    #[test]
    fn test_json_uses_string_keys() {
        let grouped: GroupedInstances = [(InstanceId(7), vec!["f0".to_string()])]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&grouped).unwrap();
        assert_eq!(json, r#"{"7":["f0"]}"#);
        let back: GroupedInstances = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grouped);
    }
}
