//! Dataset access interfaces.
//!
//! The accumulation engine only ever talks to a dataset through these traits,
//! so it works the same against files on disk, an in-memory scene, or a cache
//! wrapping either.

use crate::error::DatasetError;
use crate::frame::Frame;
use crate::pose::Pose;
use crate::types::{PointCloud, SegmentLabel};
use std::path::PathBuf;

/// Read side of a dataset. Scene and frame ids are opaque strings.
pub trait FrameSource {
    /// All scene ids, in a stable order.
    fn scenes(&self) -> Result<Vec<String>, DatasetError>;

    /// Frame ids of `scene` in canonical (capture) order.
    fn frames(&self, scene: &str) -> Result<Vec<String>, DatasetError>;

    fn point_cloud(&self, scene: &str, frame: &str) -> Result<PointCloud, DatasetError>;

    fn segments(&self, scene: &str, frame: &str) -> Result<Vec<SegmentLabel>, DatasetError>;

    fn pose(&self, scene: &str, frame: &str) -> Result<Pose, DatasetError>;

    /// Load everything about one frame.
    ///
    /// Implementations backed by a single file should override this to avoid
    /// reading it more than once.
    fn load_frame(&self, scene: &str, frame: &str) -> Result<Frame, DatasetError> {
        let points = self.point_cloud(scene, frame)?;
        let segments = self.segments(scene, frame)?;
        let pose = self.pose(scene, frame)?;
        Ok(Frame::new(frame, points, segments, pose)?)
    }
}

/// Write side of a dataset.
pub trait FrameSink {
    /// Persist a patched frame and return where it went.
    ///
    /// Implementations must never overwrite the original frame.
    fn serialise_frame(
        &self,
        scene: &str,
        frame: &str,
        points: &PointCloud,
        segments: &[SegmentLabel],
        pose: &Pose,
    ) -> Result<PathBuf, DatasetError>;
}

impl<S: FrameSource + ?Sized> FrameSource for &S {
    fn scenes(&self) -> Result<Vec<String>, DatasetError> {
        (**self).scenes()
    }

    fn frames(&self, scene: &str) -> Result<Vec<String>, DatasetError> {
        (**self).frames(scene)
    }

    fn point_cloud(&self, scene: &str, frame: &str) -> Result<PointCloud, DatasetError> {
        (**self).point_cloud(scene, frame)
    }

    fn segments(&self, scene: &str, frame: &str) -> Result<Vec<SegmentLabel>, DatasetError> {
        (**self).segments(scene, frame)
    }

    fn pose(&self, scene: &str, frame: &str) -> Result<Pose, DatasetError> {
        (**self).pose(scene, frame)
    }

    fn load_frame(&self, scene: &str, frame: &str) -> Result<Frame, DatasetError> {
        (**self).load_frame(scene, frame)
    }
}
