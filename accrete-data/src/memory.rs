//! In-memory dataset, mostly for tests and embedding.

use crate::error::DatasetError;
use crate::frame::Frame;
use crate::pose::Pose;
use crate::source::{FrameSink, FrameSource};
use crate::types::{PointCloud, SegmentLabel};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Scenes held entirely in memory. Frames keep their insertion order.
///
/// Saved frames are kept in a separate table so the originals are never
/// replaced, mirroring the on-disk `patched_v3` subtree.
#[derive(Debug, Default)]
pub struct MemoryDataset {
    scenes: BTreeMap<String, Vec<Frame>>,
    saved: RefCell<BTreeMap<(String, String), Frame>>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame to `scene`, creating the scene if needed.
    pub fn insert_frame(&mut self, scene: impl Into<String>, frame: Frame) {
        self.scenes.entry(scene.into()).or_default().push(frame);
    }

    pub fn with_frame(mut self, scene: impl Into<String>, frame: Frame) -> Self {
        self.insert_frame(scene, frame);
        self
    }

    /// A frame previously written through [`FrameSink::serialise_frame`].
    pub fn saved_frame(&self, scene: &str, frame: &str) -> Option<Frame> {
        self.saved
            .borrow()
            .get(&(scene.to_string(), frame.to_string()))
            .cloned()
    }

    fn frame(&self, scene: &str, frame: &str) -> Result<&Frame, DatasetError> {
        let frames = self
            .scenes
            .get(scene)
            .ok_or_else(|| DatasetError::SceneNotFound(scene.to_string()))?;
        frames
            .iter()
            .find(|f| f.id == frame)
            .ok_or_else(|| DatasetError::FrameNotFound {
                scene: scene.to_string(),
                frame: frame.to_string(),
            })
    }
}

impl FrameSource for MemoryDataset {
    fn scenes(&self) -> Result<Vec<String>, DatasetError> {
        Ok(self.scenes.keys().cloned().collect())
    }

    fn frames(&self, scene: &str) -> Result<Vec<String>, DatasetError> {
        self.scenes
            .get(scene)
            .map(|frames| frames.iter().map(|f| f.id.clone()).collect())
            .ok_or_else(|| DatasetError::SceneNotFound(scene.to_string()))
    }

    fn point_cloud(&self, scene: &str, frame: &str) -> Result<PointCloud, DatasetError> {
        Ok(self.frame(scene, frame)?.points.clone())
    }

    fn segments(&self, scene: &str, frame: &str) -> Result<Vec<SegmentLabel>, DatasetError> {
        Ok(self.frame(scene, frame)?.segments.clone())
    }

    fn pose(&self, scene: &str, frame: &str) -> Result<Pose, DatasetError> {
        Ok(self.frame(scene, frame)?.pose)
    }

    fn load_frame(&self, scene: &str, frame: &str) -> Result<Frame, DatasetError> {
        self.frame(scene, frame).cloned()
    }
}

impl FrameSink for MemoryDataset {
    fn serialise_frame(
        &self,
        scene: &str,
        frame: &str,
        points: &PointCloud,
        segments: &[SegmentLabel],
        pose: &Pose,
    ) -> Result<PathBuf, DatasetError> {
        let saved = Frame::new(frame, points.clone(), segments.to_vec(), *pose)?;
        self.saved
            .borrow_mut()
            .insert((scene.to_string(), frame.to_string()), saved);
        Ok(PathBuf::from(format!("memory://patched/{}/{}", scene, frame)))
    }
}
