//! Read-through cache over any [`FrameSource`].

use crate::error::DatasetError;
use crate::frame::Frame;
use crate::pose::Pose;
use crate::source::FrameSource;
use crate::types::{PointCloud, SegmentLabel};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::debug;

/// Caches scene listings, frame listings and loaded frames.
///
/// Entries live until [`CachedSource::clear`]. Interior mutability keeps the
/// `FrameSource` signatures unchanged; the cache is meant for a single thread.
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    scenes: RefCell<Option<Vec<String>>>,
    frames: RefCell<HashMap<String, Vec<String>>>,
    loaded: RefCell<HashMap<(String, String), Frame>>,
}

impl<S: FrameSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            scenes: RefCell::new(None),
            frames: RefCell::new(HashMap::new()),
            loaded: RefCell::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.scenes.borrow_mut().take();
        self.frames.borrow_mut().clear();
        self.loaded.borrow_mut().clear();
        debug!("Dataset cache cleared");
    }

    /// Number of frames currently held.
    pub fn cached_frame_count(&self) -> usize {
        self.loaded.borrow().len()
    }
}

impl<S: FrameSource> FrameSource for CachedSource<S> {
    fn scenes(&self) -> Result<Vec<String>, DatasetError> {
        if let Some(scenes) = self.scenes.borrow().as_ref() {
            return Ok(scenes.clone());
        }
        let scenes = self.inner.scenes()?;
        *self.scenes.borrow_mut() = Some(scenes.clone());
        Ok(scenes)
    }

    fn frames(&self, scene: &str) -> Result<Vec<String>, DatasetError> {
        if let Some(frames) = self.frames.borrow().get(scene) {
            return Ok(frames.clone());
        }
        let frames = self.inner.frames(scene)?;
        self.frames
            .borrow_mut()
            .insert(scene.to_string(), frames.clone());
        Ok(frames)
    }

    fn point_cloud(&self, scene: &str, frame: &str) -> Result<PointCloud, DatasetError> {
        Ok(self.load_frame(scene, frame)?.points)
    }

    fn segments(&self, scene: &str, frame: &str) -> Result<Vec<SegmentLabel>, DatasetError> {
        Ok(self.load_frame(scene, frame)?.segments)
    }

    fn pose(&self, scene: &str, frame: &str) -> Result<Pose, DatasetError> {
        Ok(self.load_frame(scene, frame)?.pose)
    }

    fn load_frame(&self, scene: &str, frame: &str) -> Result<Frame, DatasetError> {
        let key = (scene.to_string(), frame.to_string());
        if let Some(cached) = self.loaded.borrow().get(&key) {
            return Ok(cached.clone());
        }
        let loaded = self.inner.load_frame(scene, frame)?;
        self.loaded.borrow_mut().insert(key, loaded.clone());
        Ok(loaded)
    }
}
