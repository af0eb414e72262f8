mod decoder;
mod encoder;

pub use decoder::VideoDecoder;
pub use encoder::VideoEncoder;

use image::RgbImage;

use crate::error::Result;

/// One decoded frame: a packed BGR24 buffer in row-major order.
///
/// BGR is the container backend's native channel order; the pose model wants
/// RGB. The conversion is an explicit copy so the two orders never mix.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wraps a packed BGR24 buffer. Panics when the buffer does not match the
    /// dimensions; decoders guarantee this by construction.
    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(data.len(), width as usize * height as usize * 3);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bgr_data(&self) -> &[u8] {
        &self.data
    }

    /// Channel-swapped RGB copy for inference.
    pub fn to_rgb(&self) -> RgbImage {
        let mut rgb = vec![0u8; self.data.len()];
        for (dst, src) in rgb.chunks_exact_mut(3).zip(self.data.chunks_exact(3)) {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
        }
        RgbImage::from_raw(self.width, self.height, rgb).expect("buffer sized to dimensions")
    }

    /// Moves the pixel buffer out for in-place drawing; pair with
    /// [`Frame::restore_buffer`].
    pub(crate) fn take_buffer(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    pub(crate) fn restore_buffer(&mut self, data: Vec<u8>) {
        debug_assert_eq!(data.len(), self.width as usize * self.height as usize * 3);
        self.data = data;
    }
}

/// Forward-only frame producer over an input container.
///
/// Not restartable. Implementations may reuse internal decode buffers, so
/// every returned [`Frame`] is an owned copy.
pub trait FrameSource {
    /// Container-reported frame rate; `0.0` when unavailable.
    fn frame_rate(&self) -> f64;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Next frame in display order, or `None` once the input is exhausted.
    fn read_frame(&mut self) -> Result<Option<Frame>>;
}

/// Appends frames to an output container in call order.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flushes and finalizes the container.
    fn finish(&mut self) -> Result<()>;
}
