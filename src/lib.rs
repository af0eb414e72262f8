//! posetrace: per-frame human pose annotation for video files.
//!
//! The pipeline decodes an input container, runs a pose-estimation model on
//! every frame in order, draws the detected skeleton onto the frame, re-encodes
//! at the source resolution and frame rate, and optionally collects one
//! landmark record per frame.

pub mod annotator; // pose backend + skeleton overlay
pub mod config; // pipeline configuration and CLI args
pub mod error;
pub mod pipeline; // orchestration state machine
pub mod record; // per-frame landmark records
pub mod session; // per-invocation working directories
pub mod video; // container decode/encode

pub use crate::annotator::{DrawStyle, OrtPoseBackend, PoseAnnotator, PoseBackend};
pub use crate::config::{Args, ModelComplexity, PoseConfig};
pub use crate::error::{PipelineError, Result};
pub use crate::pipeline::{effective_fps, process_video, process_with_backend, PipelineSummary};
pub use crate::record::{BoundingBox, FrameRecord, Landmark};
pub use crate::session::{extension_allowed, SessionDir, ALLOWED_EXTENSIONS};
pub use crate::video::{Frame, FrameSink, FrameSource, VideoDecoder, VideoEncoder};

/// Landmarks produced per detected pose (MediaPipe body topology).
pub const LANDMARK_COUNT: usize = 33;

/// Anatomical skeleton edges over the 33 body landmarks, by landmark index.
/// Immutable topology data; the overlay draws one segment per entry.
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    (11, 12),
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    (11, 23),
    (12, 24),
    (23, 24),
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];
