//! Frame patching
//!
//! A [`FramePatcher`] owns the working copy of one frame; the
//! [`PatchingService`] feeds it accumulated instances one at a time.

pub mod patcher;
pub mod service;

pub use patcher::{FramePatcher, PatchOutcome, PatchState};
pub use service::{InstanceInfo, PatchedFrame, PatchingService, ProgressFn};
