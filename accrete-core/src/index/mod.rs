//! Instance grouping index
//!
//! Maps each dynamic instance of a scene to the ordered list of frames it
//! appears in. The index is a pure function of the scene's labels.

pub mod grouping;

pub use grouping::{GroupedInstances, frame_instances, group_instances, is_instance_label};
