use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// A single tracked anatomical point in `[0,1]`-normalized image space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Relative depth estimate, not metric.
    pub z: f32,
    /// Confidence that the point is visible, in `[0,1]`.
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }
}

/// Axis-aligned extent of a landmark set, in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f32,
    pub xmax: f32,
    pub ymin: f32,
    pub ymax: f32,
}

impl BoundingBox {
    /// Coordinate extremes over a landmark set; `None` when it is empty.
    pub fn around(landmarks: &[Landmark]) -> Option<Self> {
        let first = landmarks.first()?;
        let mut bbox = Self {
            xmin: first.x,
            xmax: first.x,
            ymin: first.y,
            ymax: first.y,
        };
        for lm in &landmarks[1..] {
            bbox.xmin = bbox.xmin.min(lm.x);
            bbox.xmax = bbox.xmax.max(lm.x);
            bbox.ymin = bbox.ymin.min(lm.y);
            bbox.ymax = bbox.ymax.max(lm.y);
        }
        Some(bbox)
    }
}

/// Per-frame result bundle.
///
/// `has_landmarks` and `bbox` are derived from the landmark set at
/// construction, so `has_landmarks == !landmarks.is_empty()` and
/// `bbox.is_some() == has_landmarks` hold by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// 1-based frame index, dense and monotonically increasing.
    pub frame: u64,
    pub landmarks: Vec<Landmark>,
    pub bbox: Option<BoundingBox>,
    pub has_landmarks: bool,
}

impl FrameRecord {
    pub fn new(frame: u64, landmarks: Vec<Landmark>) -> Self {
        let bbox = BoundingBox::around(&landmarks);
        let has_landmarks = !landmarks.is_empty();
        Self {
            frame,
            landmarks,
            bbox,
            has_landmarks,
        }
    }
}

/// Serializes the full ordered record sequence to `path` as one JSON array,
/// one object per frame.
pub fn write_records(path: &Path, records: &[FrameRecord]) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| PipelineError::Serialization(format!("{}: {e}", path.display())))?;
    serde_json::to_writer(BufWriter::new(file), records)
        .map_err(|e| PipelineError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmark(x: f32, y: f32) -> Landmark {
        Landmark::new(x, y, 0.0, 0.9)
    }

    #[test]
    fn record_invariants_hold_for_detected_frames() {
        let record = FrameRecord::new(3, vec![landmark(0.2, 0.8), landmark(0.6, 0.1)]);
        assert!(record.has_landmarks);
        let bbox = record.bbox.expect("detected frame carries a bbox");
        assert_eq!(bbox.xmin, 0.2);
        assert_eq!(bbox.xmax, 0.6);
        assert_eq!(bbox.ymin, 0.1);
        assert_eq!(bbox.ymax, 0.8);
        assert!(bbox.xmin <= bbox.xmax);
        assert!(bbox.ymin <= bbox.ymax);
    }

    #[test]
    fn record_invariants_hold_for_empty_frames() {
        let record = FrameRecord::new(7, Vec::new());
        assert!(!record.has_landmarks);
        assert!(record.bbox.is_none());
        assert!(record.landmarks.is_empty());
    }

    #[test]
    fn single_landmark_bbox_degenerates_to_a_point() {
        let bbox = BoundingBox::around(&[landmark(0.5, 0.5)]).unwrap();
        assert_eq!(bbox.xmin, bbox.xmax);
        assert_eq!(bbox.ymin, bbox.ymax);
    }

    #[test]
    fn wire_shape_matches_the_documented_json() {
        let detected = FrameRecord::new(1, vec![Landmark::new(0.1, 0.2, 0.3, 0.4)]);
        let empty = FrameRecord::new(2, Vec::new());

        let value = serde_json::to_value([&detected, &empty]).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {
                    "frame": 1,
                    "landmarks": [{"x": 0.1f32, "y": 0.2f32, "z": 0.3f32, "visibility": 0.4f32}],
                    "bbox": {"xmin": 0.1f32, "xmax": 0.1f32, "ymin": 0.2f32, "ymax": 0.2f32},
                    "has_landmarks": true
                },
                {
                    "frame": 2,
                    "landmarks": [],
                    "bbox": null,
                    "has_landmarks": false
                }
            ])
        );
    }

    #[test]
    fn write_records_produces_a_parseable_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("landmarks.json");
        let records = vec![
            FrameRecord::new(1, vec![landmark(0.4, 0.4)]),
            FrameRecord::new(2, Vec::new()),
        ];

        write_records(&path, &records).unwrap();

        let parsed: Vec<FrameRecord> =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(parsed, records);
    }
}
