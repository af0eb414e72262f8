use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use super::DrawStyle;
use crate::record::Landmark;
use crate::video::Frame;
use crate::POSE_CONNECTIONS;

/// Draws landmark dots and skeleton edges onto the frame, in place. No-op for
/// an empty landmark set.
///
/// The buffer stays in BGR; `DrawStyle` colors are BGR too, so the `Rgb`
/// pixel type below is only a three-channel container. Coordinates outside
/// the image are clipped by the drawing primitives.
pub fn draw_skeleton(frame: &mut Frame, landmarks: &[Landmark], style: &DrawStyle) {
    if landmarks.is_empty() {
        return;
    }
    let (w, h) = (frame.width(), frame.height());
    let buffer = frame.take_buffer();
    let mut canvas = RgbImage::from_raw(w, h, buffer).expect("frame buffer sized to dimensions");

    for (a, b) in POSE_CONNECTIONS {
        let (Some(from), Some(to)) = (landmarks.get(a), landmarks.get(b)) else {
            continue;
        };
        draw_line_segment_mut(
            &mut canvas,
            (from.x * w as f32, from.y * h as f32),
            (to.x * w as f32, to.y * h as f32),
            Rgb(style.connection_color),
        );
    }
    for lm in landmarks {
        let cx = (lm.x * w as f32).round() as i32;
        let cy = (lm.y * h as f32).round() as i32;
        draw_filled_circle_mut(&mut canvas, (cx, cy), style.landmark_radius, Rgb(style.landmark_color));
    }

    frame.restore_buffer(canvas.into_raw());
}
