//! PLY frame loading

use crate::error::{DatasetError, LayoutError};
use crate::ply::vertex::{FramePly, SEGMENT_PROPERTY, STRENGTH_PROPERTY, extra_channel_property};
use crate::types::{POSITION_CHANNELS, PointCloud, SegmentLabel};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

// serde_ply hands rows back as maps so optional properties can be looked up by name
#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(rename = "vertex")]
    vertex: Vec<HashMap<String, JsonValue>>,
}

fn get_f32(prop: Option<&JsonValue>) -> Option<f32> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n.as_f64().map(|f| f as f32),
        _ => None,
    })
}

fn get_label(prop: Option<&JsonValue>) -> Option<SegmentLabel> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|i| SegmentLabel::try_from(i).ok()),
        _ => None,
    })
}

/// Load a frame's points and (if present) segment labels from a PLY file.
///
/// The `vertex` element must carry `x`, `y`, `z`. An optional `strength`
/// property becomes the intensity channel, `channel_4`, `channel_5`, ...
/// become further channels, and an optional `segment` property becomes the
/// label array. The channel layout is taken from the first vertex and every
/// other vertex must match it.
///
/// A file with no vertices carries no layout, so it loads as a layout-free
/// empty cloud with no labels whatever properties the header declares.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_frame_ply(path: &Path) -> Result<FramePly, DatasetError> {
    debug!("Loading PLY frame from: {}", path.display());
    let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
    let reader = BufReader::new(file);

    let ply_data: PlyFile = serde_ply::from_reader(reader).map_err(|e| {
        warn!("Failed to parse PLY file: {}", e);
        DatasetError::Ply {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    let ply_error = |message: String| DatasetError::Ply {
        path: path.to_path_buf(),
        message,
    };

    let Some(first) = ply_data.vertex.first() else {
        debug!("Loaded empty frame");
        return Ok(FramePly {
            points: PointCloud::default(),
            segments: None,
        });
    };
    let has_strength = first.contains_key(STRENGTH_PROPERTY);
    let mut extra_channels = 0;
    while has_strength
        && first.contains_key(&extra_channel_property(POSITION_CHANNELS + 1 + extra_channels))
    {
        extra_channels += 1;
    }
    let has_segments = first.contains_key(SEGMENT_PROPERTY);
    let channels = POSITION_CHANNELS + usize::from(has_strength) + extra_channels;

    let mut data = Vec::with_capacity(ply_data.vertex.len() * channels);
    let mut segments = Vec::with_capacity(if has_segments { ply_data.vertex.len() } else { 0 });

    for (i, vertex) in ply_data.vertex.iter().enumerate() {
        for axis in ["x", "y", "z"] {
            let value = get_f32(vertex.get(axis))
                .ok_or_else(|| ply_error(format!("Missing '{}' at vertex {}", axis, i)))?;
            data.push(value);
        }
        if has_strength {
            let value = get_f32(vertex.get(STRENGTH_PROPERTY)).ok_or_else(|| {
                ply_error(format!("Missing '{}' at vertex {}", STRENGTH_PROPERTY, i))
            })?;
            data.push(value);
        }
        for k in 0..extra_channels {
            let name = extra_channel_property(POSITION_CHANNELS + 1 + k);
            let value = get_f32(vertex.get(&name))
                .ok_or_else(|| ply_error(format!("Missing '{}' at vertex {}", name, i)))?;
            data.push(value);
        }
        if has_segments {
            let label = get_label(vertex.get(SEGMENT_PROPERTY)).ok_or_else(|| {
                ply_error(format!("Missing '{}' at vertex {}", SEGMENT_PROPERTY, i))
            })?;
            segments.push(label);
        }
    }

    let points = PointCloud::from_flat(channels, data).map_err(DatasetError::from)?;
    let segments = has_segments.then_some(segments);
    if let Some(labels) = &segments {
        if labels.len() != points.len() {
            return Err(LayoutError::SegmentLengthMismatch {
                points: points.len(),
                segments: labels.len(),
            }
            .into());
        }
    }

    debug!(
        "Loaded {} points with {} channels ({} labels)",
        points.len(),
        channels,
        if has_segments { "with" } else { "without" }
    );
    Ok(FramePly { points, segments })
}
