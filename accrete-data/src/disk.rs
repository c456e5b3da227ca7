//! Directory-tree dataset.
//!
//! ```text
//! root/
//! ├── <split>/<scene>/<frame>/points.ply   x y z [strength] [segment]
//! ├── <split>/<scene>/<frame>/pose.json    row-major 4x4
//! └── patched_v3/<split>/<scene>/<frame>/  patched output, same files
//! ```

use crate::error::DatasetError;
use crate::frame::Frame;
use crate::ply::{load_frame_ply, save_frame_ply};
use crate::pose::Pose;
use crate::source::{FrameSink, FrameSource};
use crate::types::{PointCloud, SegmentLabel, UNLABELED};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const POINTS_FILE: &str = "points.ply";
pub const POSE_FILE: &str = "pose.json";
pub const PATCHED_DIR: &str = "patched_v3";
pub const DEFAULT_SPLIT: &str = "training";

/// A dataset stored as one directory per frame.
#[derive(Debug, Clone)]
pub struct DiskDataset {
    root: PathBuf,
    split: String,
}

impl DiskDataset {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            split: DEFAULT_SPLIT.to_string(),
        }
    }

    pub fn with_split(mut self, split: impl Into<String>) -> Self {
        self.split = split.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn split(&self) -> &str {
        &self.split
    }

    fn split_dir(&self) -> PathBuf {
        self.root.join(&self.split)
    }

    fn scene_dir(&self, scene: &str) -> PathBuf {
        self.split_dir().join(scene)
    }

    pub fn frame_dir(&self, scene: &str, frame: &str) -> PathBuf {
        self.scene_dir(scene).join(frame)
    }

    /// Where a patched copy of `scene/frame` is written.
    pub fn patched_frame_dir(&self, scene: &str, frame: &str) -> PathBuf {
        self.root
            .join(PATCHED_DIR)
            .join(&self.split)
            .join(scene)
            .join(frame)
    }

    fn existing_frame_dir(&self, scene: &str, frame: &str) -> Result<PathBuf, DatasetError> {
        let dir = self.frame_dir(scene, frame);
        if !dir.is_dir() {
            if !self.scene_dir(scene).is_dir() {
                return Err(DatasetError::SceneNotFound(scene.to_string()));
            }
            return Err(DatasetError::FrameNotFound {
                scene: scene.to_string(),
                frame: frame.to_string(),
            });
        }
        Ok(dir)
    }

    fn read_pose(&self, dir: &Path) -> Result<Pose, DatasetError> {
        let path = dir.join(POSE_FILE);
        if !path.exists() {
            debug!("No pose file at {}, using identity", path.display());
            return Ok(Pose::identity());
        }
        let text = fs::read_to_string(&path).map_err(|e| DatasetError::io(&path, e))?;
        serde_json::from_str(&text).map_err(|source| DatasetError::Json { path, source })
    }
}

/// Sorted names of the subdirectories of `dir`.
fn sorted_subdirs(dir: &Path) -> Result<Vec<String>, DatasetError> {
    let entries = fs::read_dir(dir).map_err(|e| DatasetError::io(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DatasetError::io(dir, e))?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

impl FrameSource for DiskDataset {
    fn scenes(&self) -> Result<Vec<String>, DatasetError> {
        sorted_subdirs(&self.split_dir())
    }

    fn frames(&self, scene: &str) -> Result<Vec<String>, DatasetError> {
        let dir = self.scene_dir(scene);
        if !dir.is_dir() {
            return Err(DatasetError::SceneNotFound(scene.to_string()));
        }
        sorted_subdirs(&dir)
    }

    fn point_cloud(&self, scene: &str, frame: &str) -> Result<PointCloud, DatasetError> {
        let dir = self.existing_frame_dir(scene, frame)?;
        Ok(load_frame_ply(&dir.join(POINTS_FILE))?.points)
    }

    fn segments(&self, scene: &str, frame: &str) -> Result<Vec<SegmentLabel>, DatasetError> {
        Ok(self.load_frame(scene, frame)?.segments)
    }

    fn pose(&self, scene: &str, frame: &str) -> Result<Pose, DatasetError> {
        let dir = self.existing_frame_dir(scene, frame)?;
        self.read_pose(&dir)
    }

    #[tracing::instrument(skip(self))]
    fn load_frame(&self, scene: &str, frame: &str) -> Result<Frame, DatasetError> {
        let dir = self.existing_frame_dir(scene, frame)?;
        let ply = load_frame_ply(&dir.join(POINTS_FILE))?;
        let segments = ply
            .segments
            .unwrap_or_else(|| vec![UNLABELED; ply.points.len()]);
        let pose = self.read_pose(&dir)?;
        Ok(Frame::new(frame, ply.points, segments, pose)?)
    }
}

impl FrameSink for DiskDataset {
    #[tracing::instrument(skip(self, points, segments, pose))]
    fn serialise_frame(
        &self,
        scene: &str,
        frame: &str,
        points: &PointCloud,
        segments: &[SegmentLabel],
        pose: &Pose,
    ) -> Result<PathBuf, DatasetError> {
        let dir = self.patched_frame_dir(scene, frame);
        fs::create_dir_all(&dir).map_err(|e| DatasetError::io(&dir, e))?;

        save_frame_ply(&dir.join(POINTS_FILE), points, segments)?;

        let pose_path = dir.join(POSE_FILE);
        let json = serde_json::to_string_pretty(pose).map_err(|source| DatasetError::Json {
            path: pose_path.clone(),
            source,
        })?;
        fs::write(&pose_path, json).map_err(|e| DatasetError::io(&pose_path, e))?;

        info!("Saved patched frame ({} points) to {}", points.len(), dir.display());
        Ok(dir)
    }
}
