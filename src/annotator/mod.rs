mod backend;
mod overlay;

pub use backend::OrtPoseBackend;
pub use overlay::draw_skeleton;

use image::RgbImage;

use crate::error::Result;
use crate::record::Landmark;
use crate::video::Frame;

/// Pose estimation behind a narrow contract: one frame in, zero-or-one
/// landmark sets out.
///
/// Implementations may carry temporal state across the frames of one video
/// (tracking mode), hence `&mut self`. `reset` tears that state down and must
/// run before the backend is reused on a different video. Any conforming
/// implementation can be substituted without changing pipeline behavior.
pub trait PoseBackend {
    /// Detects a pose on one RGB frame. `Ok(None)` means no pose cleared the
    /// configured confidence threshold; that is a result, not an error.
    fn detect(&mut self, frame: &RgbImage) -> Result<Option<Vec<Landmark>>>;

    /// Drops per-video tracking state.
    fn reset(&mut self);
}

/// Visual style of the skeleton overlay. Colors are in the frame's native BGR
/// channel order.
#[derive(Debug, Clone, Copy)]
pub struct DrawStyle {
    pub landmark_color: [u8; 3],
    pub connection_color: [u8; 3],
    pub landmark_radius: i32,
}

impl Default for DrawStyle {
    fn default() -> Self {
        // Orange dots, light bones.
        Self {
            landmark_color: [0, 69, 255],
            connection_color: [230, 230, 230],
            landmark_radius: 3,
        }
    }
}

/// Runs detection and, when enabled, draws the skeleton onto the frame.
///
/// Scoped to one video: construct, feed frames strictly in order, then
/// [`PoseAnnotator::finish`] before any reuse.
pub struct PoseAnnotator<B> {
    backend: B,
    style: DrawStyle,
    draw_landmarks: bool,
}

impl<B: PoseBackend> PoseAnnotator<B> {
    pub fn new(backend: B, draw_landmarks: bool) -> Self {
        Self {
            backend,
            style: DrawStyle::default(),
            draw_landmarks,
        }
    }

    pub fn with_style(mut self, style: DrawStyle) -> Self {
        self.style = style;
        self
    }

    /// Processes one frame. The model sees an RGB copy; the overlay lands on
    /// the original BGR pixels afterwards.
    pub fn process(&mut self, frame: &mut Frame) -> Result<Option<Vec<Landmark>>> {
        let rgb = frame.to_rgb();
        let landmarks = self.backend.detect(&rgb)?;
        if self.draw_landmarks {
            if let Some(landmarks) = &landmarks {
                overlay::draw_skeleton(frame, landmarks, &self.style);
            }
        }
        Ok(landmarks)
    }

    /// Tears down per-video tracking state.
    pub fn finish(&mut self) {
        self.backend.reset();
    }
}
