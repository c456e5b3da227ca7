//! ASCII PLY frame writing

use crate::error::DatasetError;
use crate::frame::check_segments;
use crate::ply::vertex::{SEGMENT_PROPERTY, STRENGTH_PROPERTY, extra_channel_property};
use crate::types::{INTENSITY_CHANNEL, PointCloud, SegmentLabel};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

// Mirrors the loader's `PlyFile`; rows are maps because the channel count varies
#[derive(Serialize)]
struct PlyFile<'a> {
    vertex: Vec<VertexRow<'a>>,
}

struct VertexRow<'a> {
    point: &'a [f32],
    label: SegmentLabel,
}

fn property_name(channel: usize) -> Cow<'static, str> {
    match channel {
        0 => Cow::Borrowed("x"),
        1 => Cow::Borrowed("y"),
        2 => Cow::Borrowed("z"),
        INTENSITY_CHANNEL => Cow::Borrowed(STRENGTH_PROPERTY),
        _ => Cow::Owned(extra_channel_property(channel)),
    }
}

impl Serialize for VertexRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.point.len() + 1))?;
        for (channel, value) in self.point.iter().enumerate() {
            map.serialize_entry(&property_name(channel), value)?;
        }
        map.serialize_entry(SEGMENT_PROPERTY, &self.label)?;
        map.end()
    }
}

/// Write a frame PLY file to `path` in the layout `load_frame_ply` reads
/// back, replacing any existing file.
///
/// Channels are written as `x y z [strength] [channel_N...]` floats followed
/// by an int `segment` property.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn save_frame_ply(
    path: &Path,
    points: &PointCloud,
    segments: &[SegmentLabel],
) -> Result<(), DatasetError> {
    check_segments(points, segments)?;

    let file = PlyFile {
        vertex: points
            .iter()
            .zip(segments)
            .map(|(point, &label)| VertexRow { point, label })
            .collect(),
    };
    let bytes = serde_ply::to_bytes(&file, serde_ply::SerializeOptions::ascii()).map_err(|e| {
        warn!("Failed to serialize PLY file: {}", e);
        DatasetError::Ply {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;
    fs::write(path, bytes).map_err(|e| DatasetError::io(path, e))?;

    debug!("Wrote {} points", points.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ply::load_frame_ply;

    #[test]
    fn test_header_names_every_channel() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("points.ply");
        let points =
            PointCloud::from_flat(5, vec![1.0, 2.0, 3.0, 0.5, 9.0, -1.0, 0.0, 4.0, 0.25, 8.0])
                .unwrap();
        save_frame_ply(&path, &points, &[12, -1]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let header: Vec<&str> = text.lines().take_while(|l| *l != "end_header").collect();
        assert!(header.contains(&"format ascii 1.0"));
        assert!(header.contains(&"element vertex 2"));
        assert!(header.iter().any(|l| l.ends_with(" strength")));
        assert!(header.iter().any(|l| l.ends_with(" channel_4")));
        assert!(header.iter().any(|l| l.starts_with("property int") && l.ends_with(" segment")));

        let loaded = load_frame_ply(&path).unwrap();
        assert_eq!(loaded.points, points);
        assert_eq!(loaded.segments, Some(vec![12, -1]));
    }

    #[test]
    fn test_refuses_mismatched_labels() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("points.ply");
        let points = PointCloud::from_flat(3, vec![0.0; 6]).unwrap();

        let err = save_frame_ply(&path, &points, &[1]).unwrap_err();
        assert!(matches!(err, DatasetError::Layout(_)));
        assert!(!path.exists());
    }
}
