use std::path::Path;

use opencv::core::{Mat, Vec3b};
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};
use tracing::debug;

use super::{Frame, FrameSource};
use crate::error::{PipelineError, Result};

/// Pull-based reader over an input container, backed by OpenCV.
///
/// The capture handle is released on drop, so early exits cannot leak it.
#[derive(Debug)]
pub struct VideoDecoder {
    capture: VideoCapture,
    width: u32,
    height: u32,
    fps: f64,
}

impl VideoDecoder {
    /// Opens `path` for sequential decoding. Fails with [`PipelineError::Open`]
    /// when the container cannot be decoded or reports a bogus geometry.
    pub fn open(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| PipelineError::Open(format!("non-UTF8 path: {}", path.display())))?;
        let capture = VideoCapture::from_file(path_str, videoio::CAP_ANY).map_err(open_err)?;
        if !capture.is_opened().map_err(open_err)? {
            return Err(PipelineError::Open(format!(
                "cannot open video: {}",
                path.display()
            )));
        }

        let fps = capture.get(videoio::CAP_PROP_FPS).map_err(open_err)?;
        let width = capture
            .get(videoio::CAP_PROP_FRAME_WIDTH)
            .map_err(open_err)? as u32;
        let height = capture
            .get(videoio::CAP_PROP_FRAME_HEIGHT)
            .map_err(open_err)? as u32;
        if width == 0 || height == 0 {
            return Err(PipelineError::Open(format!(
                "container reports {width}x{height} frames: {}",
                path.display()
            )));
        }

        debug!(fps, width, height, input = %path.display(), "opened input container");
        Ok(Self {
            capture,
            width,
            height,
            fps: if fps.is_finite() && fps > 0.0 { fps } else { 0.0 },
        })
    }
}

impl FrameSource for VideoDecoder {
    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut mat = Mat::default();
        if !self.capture.read(&mut mat).map_err(open_err)? {
            return Ok(None);
        }
        mat_to_frame(&mat).map(Some)
    }
}

/// Owned packed copy of a BGR Mat. Continuous storage is copied wholesale;
/// padded storage goes row by row, since `data_bytes` rejects it.
fn mat_to_frame(mat: &Mat) -> Result<Frame> {
    let rows = mat.rows();
    let cols = mat.cols();
    let mut buf = Vec::with_capacity(rows as usize * cols as usize * 3);
    if mat.is_continuous() {
        buf.extend_from_slice(mat.data_bytes().map_err(open_err)?);
    } else {
        for y in 0..rows {
            let row: &[Vec3b] = mat.at_row(y).map_err(open_err)?;
            for px in row {
                buf.extend_from_slice(&[px[0], px[1], px[2]]);
            }
        }
    }
    Ok(Frame::from_bgr(cols as u32, rows as u32, buf))
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        let _ = self.capture.release();
    }
}

fn open_err(e: opencv::Error) -> PipelineError {
    PipelineError::Open(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::Rect;

    fn bgr_mat(data: &[u8], rows: i32) -> Mat {
        Mat::from_slice(data)
            .unwrap()
            .reshape(3, rows)
            .unwrap()
            .try_clone()
            .unwrap()
    }

    #[test]
    fn continuous_mat_copies_to_a_packed_frame() {
        let data: Vec<u8> = (0..2 * 2 * 3).map(|i| i as u8).collect();
        let mat = bgr_mat(&data, 2);
        let frame = mat_to_frame(&mat).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.bgr_data(), &data[..]);
    }

    #[test]
    fn padded_mat_rows_copy_without_the_padding() {
        let data: Vec<u8> = (0..4 * 4 * 3).map(|i| i as u8).collect();
        let full = bgr_mat(&data, 4);
        let view = Mat::roi(&full, Rect::new(1, 1, 2, 2)).unwrap();
        assert!(!view.is_continuous());

        let frame = mat_to_frame(&view).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        let expected: Vec<u8> = [1usize, 2]
            .iter()
            .flat_map(|&y| {
                let start = (y * 4 + 1) * 3;
                data[start..start + 6].to_vec()
            })
            .collect();
        assert_eq!(frame.bgr_data(), &expected[..]);
    }
}
