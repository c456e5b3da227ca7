//! Accrete Data Crate
//!
//! Point cloud, pose and frame types plus dataset access for LiDAR scenes.
//! This crate knows nothing about accumulation or patching; it only loads,
//! holds and saves frames.
//!
//! ## Modules
//!
//! - [`types`]: point clouds, segment labels, instance ids
//! - [`pose`]: rigid frame poses
//! - [`frame`]: one capture with labels and pose
//! - [`source`]: the `FrameSource` / `FrameSink` collaborator traits
//! - [`disk`], [`memory`]: dataset implementations
//! - [`cache`]: read-through cache over any source
//! - [`ply`]: PLY frame files

pub mod cache;
pub mod disk;
pub mod error;
pub mod frame;
pub mod memory;
pub mod ply;
pub mod pose;
pub mod source;
pub mod types;

pub use cache::CachedSource;
pub use disk::DiskDataset;
pub use error::{DatasetError, LayoutError};
pub use frame::{Frame, check_segments};
pub use memory::MemoryDataset;
pub use pose::Pose;
pub use source::{FrameSink, FrameSource};
pub use types::{InstanceId, PointCloud, SegmentLabel, UNLABELED};
