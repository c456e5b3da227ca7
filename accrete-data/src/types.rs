//! Core data types for LiDAR point clouds and segment labels.
//!
//! These are CPU-side representations shared by the accumulation engine and
//! the dataset readers. Points are stored point-major in one flat buffer.

use crate::error::LayoutError;
use crate::pose::Pose;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of leading channels that hold the x, y, z position.
pub const POSITION_CHANNELS: usize = 3;

/// Index of the intensity ("strength") channel when a cloud carries one.
pub const INTENSITY_CHANNEL: usize = 3;

/// Per-point label: either a semantic class code or an instance id.
pub type SegmentLabel = i32;

/// Label used for points without any segment assignment.
pub const UNLABELED: SegmentLabel = -1;

/// Identity of a dynamic object within one scene.
///
/// Instance ids share the label space with semantic classes; which labels
/// count as instances is decided by the excluded-class configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub SegmentLabel);

impl InstanceId {
    /// The segment label carried by points of this instance.
    pub fn label(self) -> SegmentLabel {
        self.0
    }
}

impl From<SegmentLabel> for InstanceId {
    fn from(label: SegmentLabel) -> Self {
        Self(label)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstanceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(InstanceId)
    }
}

/// A fixed-layout point cloud.
///
/// Every point has the same number of channels. Channels 0..3 are the
/// position; channel 3, when present, is intensity; anything after that is
/// carried through untouched.
///
/// `PointCloud::default()` is an empty cloud with no layout yet. It accepts
/// points of any layout and adopts the first one it sees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    channels: usize,
    data: Vec<f32>,
}

impl PointCloud {
    /// An empty cloud with a fixed layout.
    pub fn empty(channels: usize) -> Self {
        Self {
            channels,
            data: Vec::new(),
        }
    }

    /// Build a cloud from a point-major flat buffer.
    pub fn from_flat(channels: usize, data: Vec<f32>) -> Result<Self, LayoutError> {
        if channels < POSITION_CHANNELS {
            return Err(LayoutError::TooFewChannels(channels));
        }
        if data.len() % channels != 0 {
            return Err(LayoutError::RaggedBuffer {
                len: data.len(),
                channels,
            });
        }
        Ok(Self { channels, data })
    }

    /// Build a position-only cloud.
    pub fn from_positions(positions: &[Vec3]) -> Self {
        let mut data = Vec::with_capacity(positions.len() * POSITION_CHANNELS);
        for p in positions {
            data.extend_from_slice(&[p.x, p.y, p.z]);
        }
        Self {
            channels: POSITION_CHANNELS,
            data,
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.data.len() / self.channels
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Channels per point, or 0 for a cloud that has not adopted a layout.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// True when the cloud has no layout yet and can absorb any other cloud.
    pub fn is_layout_free(&self) -> bool {
        self.channels == 0
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    pub fn into_flat(self) -> Vec<f32> {
        self.data
    }

    /// All channels of point `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.len()`.
    pub fn point(&self, index: usize) -> &[f32] {
        let start = index * self.channels;
        &self.data[start..start + self.channels]
    }

    /// Position of point `index`.
    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from_slice(self.point(index))
    }

    /// Intensity of point `index`, if the layout has an intensity channel.
    pub fn intensity(&self, index: usize) -> Option<f32> {
        (self.channels > INTENSITY_CHANNEL).then(|| self.point(index)[INTENSITY_CHANNEL])
    }

    /// Iterate over points as channel slices.
    pub fn iter(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.channels.max(1))
    }

    /// Iterate over point positions.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.iter().map(Vec3::from_slice)
    }

    /// Append one point. A layout-free cloud adopts the point's layout.
    pub fn push(&mut self, point: &[f32]) -> Result<(), LayoutError> {
        if self.is_layout_free() {
            if point.len() < POSITION_CHANNELS {
                return Err(LayoutError::TooFewChannels(point.len()));
            }
            self.channels = point.len();
        } else if point.len() != self.channels {
            return Err(LayoutError::ChannelMismatch {
                expected: self.channels,
                found: point.len(),
            });
        }
        self.data.extend_from_slice(point);
        Ok(())
    }

    /// Append every point of `other`.
    ///
    /// Layout-free clouds on either side are compatible with anything; two
    /// clouds with fixed layouts must have the same channel count, even when
    /// one of them is empty.
    pub fn extend_from(&mut self, other: &PointCloud) -> Result<(), LayoutError> {
        if other.is_layout_free() {
            return Ok(());
        }
        if self.is_layout_free() {
            self.channels = other.channels;
        } else if self.channels != other.channels {
            return Err(LayoutError::ChannelMismatch {
                expected: self.channels,
                found: other.channels,
            });
        }
        self.data.extend_from_slice(&other.data);
        Ok(())
    }

    /// Copy out the points at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> PointCloud {
        let mut data = Vec::with_capacity(indices.len() * self.channels);
        for &i in indices {
            data.extend_from_slice(self.point(i));
        }
        PointCloud {
            channels: self.channels,
            data,
        }
    }

    /// Keep only the points for which `keep(index, point)` returns true.
    /// Relative order of the kept points is preserved.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, &[f32]) -> bool,
    {
        let c = self.channels;
        if c == 0 {
            return;
        }
        let mut write = 0;
        for read in 0..self.len() {
            if keep(read, &self.data[read * c..(read + 1) * c]) {
                if write != read {
                    self.data.copy_within(read * c..(read + 1) * c, write * c);
                }
                write += 1;
            }
        }
        self.data.truncate(write * c);
    }

    /// Apply a rigid transform to every position. Other channels are untouched.
    pub fn transform_in_place(&mut self, pose: &Pose) {
        let c = self.channels;
        if c == 0 {
            return;
        }
        for chunk in self.data.chunks_exact_mut(c) {
            let p = pose.transform_point(Vec3::new(chunk[0], chunk[1], chunk[2]));
            chunk[0] = p.x;
            chunk[1] = p.y;
            chunk[2] = p.z;
        }
    }

    /// A transformed copy of this cloud.
    pub fn transformed(&self, pose: &Pose) -> PointCloud {
        let mut out = self.clone();
        out.transform_in_place(pose);
        out
    }

    /// Shift every position by `offset`.
    pub fn translate(&mut self, offset: Vec3) {
        let c = self.channels;
        if c == 0 {
            return;
        }
        for chunk in self.data.chunks_exact_mut(c) {
            chunk[0] += offset.x;
            chunk[1] += offset.y;
            chunk[2] += offset.z;
        }
    }
}
