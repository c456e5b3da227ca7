//! PLY frame files: loading and writing

mod loader;
mod vertex;
mod writer;

pub use loader::load_frame_ply;
pub use vertex::{FramePly, SEGMENT_PROPERTY, STRENGTH_PROPERTY};
pub use writer::save_frame_ply;
