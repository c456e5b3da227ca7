//! Accrete Core Crate
//!
//! Densifies dynamic objects in a LiDAR frame by replacing each selected
//! instance's points with the instance's observations accumulated across
//! other frames of the same scene.
//!
//! ## Modules
//!
//! - [`index`]: instance → frames grouping for a scene
//! - [`accumulation`]: merge strategies and the strided accumulator
//! - [`patching`]: the per-frame working copy and the patching service
//! - [`config`]: stride, strategy and class-exclusion settings

pub mod accumulation;
pub mod config;
pub mod error;
pub mod index;
pub mod patching;

pub use accumulation::{
    AccumulationStrategy, DefaultStrategy, GreedyGridStrategy, Observation, PointCloudAccumulator,
};
pub use config::{GreedyGridConfig, PatchConfig, StrategyKind};
pub use error::PatchError;
pub use index::{GroupedInstances, frame_instances, group_instances};
pub use patching::{FramePatcher, InstanceInfo, PatchState, PatchedFrame, PatchingService};
