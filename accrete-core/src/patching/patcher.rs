//! Instance substitution inside one frame's working copy

use crate::error::PatchError;
use accrete_data::{
    Frame, FrameSource, InstanceId, LayoutError, PointCloud, Pose, SegmentLabel, check_segments,
};
use tracing::debug;

/// Where a patcher is in its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchState {
    /// Working copy identical to the frame it was loaded from.
    Loaded,
    /// At least one instance has been replaced. There is no way back.
    Patched,
}

/// What a single `patch_instance` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOutcome {
    pub instance: InstanceId,
    pub removed: usize,
    pub added: usize,
}

impl PatchOutcome {
    /// The instance had no points in this frame, so nothing changed.
    pub fn is_noop(&self) -> bool {
        self.removed == 0
    }
}

/// Mutable working copy of one frame's points and labels.
///
/// The stored frame is never touched; callers save the result explicitly or
/// drop it. The point count and label count always agree.
#[derive(Debug, Clone)]
pub struct FramePatcher {
    frame_id: String,
    pose: Pose,
    points: PointCloud,
    segments: Vec<SegmentLabel>,
    state: PatchState,
    patched: Vec<InstanceId>,
}

impl FramePatcher {
    pub fn new(frame: Frame) -> Result<Self, PatchError> {
        check_segments(&frame.points, &frame.segments)?;
        Ok(Self {
            frame_id: frame.id,
            pose: frame.pose,
            points: frame.points,
            segments: frame.segments,
            state: PatchState::Loaded,
            patched: Vec::new(),
        })
    }

    /// Seed a patcher with a frame loaded from `source`.
    pub fn load<S: FrameSource + ?Sized>(
        source: &S,
        scene: &str,
        frame: &str,
    ) -> Result<Self, PatchError> {
        Self::new(source.load_frame(scene, frame)?)
    }

    /// Replace every point labeled `instance` with `replacement`.
    ///
    /// The replacement is taken by value: each call needs its own copy of the
    /// accumulated points. If the instance has no points here the call is a
    /// no-op and `replacement` is dropped. On a layout mismatch nothing is
    /// modified.
    pub fn patch_instance(
        &mut self,
        instance: InstanceId,
        replacement: PointCloud,
    ) -> Result<PatchOutcome, PatchError> {
        let label = instance.label();
        let removed = self.segments.iter().filter(|&&s| s == label).count();
        if removed == 0 {
            debug!("Instance {} not present in frame {}, skipping", instance, self.frame_id);
            return Ok(PatchOutcome {
                instance,
                removed: 0,
                added: 0,
            });
        }

        if !replacement.is_layout_free() && replacement.channels() != self.points.channels() {
            return Err(LayoutError::ChannelMismatch {
                expected: self.points.channels(),
                found: replacement.channels(),
            }
            .into());
        }

        let segments = &self.segments;
        self.points.retain(|i, _| segments[i] != label);
        self.segments.retain(|&s| s != label);

        let added = replacement.len();
        self.points.extend_from(&replacement)?;
        self.segments.extend(std::iter::repeat_n(label, added));

        self.state = PatchState::Patched;
        if !self.patched.contains(&instance) {
            self.patched.push(instance);
        }
        debug!(
            "Instance {} in frame {}: replaced {} points with {}",
            instance, self.frame_id, removed, added
        );
        Ok(PatchOutcome {
            instance,
            removed,
            added,
        })
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn points(&self) -> &PointCloud {
        &self.points
    }

    pub fn segments(&self) -> &[SegmentLabel] {
        &self.segments
    }

    pub fn state(&self) -> PatchState {
        self.state
    }

    /// Instances replaced so far, in the order they were first patched.
    pub fn patched_instances(&self) -> &[InstanceId] {
        &self.patched
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_parts(self) -> (PointCloud, Vec<SegmentLabel>) {
        (self.points, self.segments)
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
