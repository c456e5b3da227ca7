//! PLY property naming for frame files

use crate::types::{PointCloud, SegmentLabel};

/// Property holding the intensity channel.
pub const STRENGTH_PROPERTY: &str = "strength";

/// Property holding per-point segment labels.
pub const SEGMENT_PROPERTY: &str = "segment";

/// Name of the PLY property storing channel `index` (for channels after intensity).
pub fn extra_channel_property(index: usize) -> String {
    format!("channel_{}", index)
}

/// Contents of a frame PLY file.
#[derive(Debug, Clone)]
pub struct FramePly {
    pub points: PointCloud,
    /// `None` when the file has no `segment` property.
    pub segments: Option<Vec<SegmentLabel>>,
}
