//! A single LiDAR capture with its labels and pose.

use crate::error::LayoutError;
use crate::pose::Pose;
use crate::types::{PointCloud, SegmentLabel};
use std::collections::BTreeMap;

/// One frame of a scene: points, one segment label per point, and a pose.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: String,
    pub points: PointCloud,
    pub segments: Vec<SegmentLabel>,
    pub pose: Pose,
}

impl Frame {
    /// Create a frame, checking that every point has exactly one label.
    pub fn new(
        id: impl Into<String>,
        points: PointCloud,
        segments: Vec<SegmentLabel>,
        pose: Pose,
    ) -> Result<Self, LayoutError> {
        check_segments(&points, &segments)?;
        Ok(Self {
            id: id.into(),
            points,
            segments,
            pose,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Copy of the points carrying `label`, in their original order.
    pub fn points_with_label(&self, label: SegmentLabel) -> PointCloud {
        let indices: Vec<usize> = self
            .segments
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| (s == label).then_some(i))
            .collect();
        self.points.select(&indices)
    }

    /// Number of points per distinct label.
    pub fn label_counts(&self) -> BTreeMap<SegmentLabel, usize> {
        let mut counts = BTreeMap::new();
        for &label in &self.segments {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }
}

/// Verify that a segment array matches a point cloud one-to-one.
pub fn check_segments(points: &PointCloud, segments: &[SegmentLabel]) -> Result<(), LayoutError> {
    if points.len() != segments.len() {
        return Err(LayoutError::SegmentLengthMismatch {
            points: points.len(),
            segments: segments.len(),
        });
    }
    Ok(())
}
