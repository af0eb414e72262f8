use std::path::Path;

use opencv::core::{Mat, Size};
use opencv::prelude::*;
use opencv::videoio::VideoWriter;
use tracing::debug;

use super::{Frame, FrameSink};
use crate::error::{PipelineError, Result};

/// Writes BGR frames to an mp4 container at a fixed resolution and frame
/// rate. The writer handle is released on drop even when the pipeline bails
/// early.
pub struct VideoEncoder {
    writer: VideoWriter,
    width: u32,
    height: u32,
    finished: bool,
}

impl VideoEncoder {
    pub fn create(path: &Path, fps: f64, width: u32, height: u32) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| PipelineError::Open(format!("non-UTF8 path: {}", path.display())))?;
        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v').map_err(open_err)?;
        let writer = VideoWriter::new(
            path_str,
            fourcc,
            fps,
            Size::new(width as i32, height as i32),
            true,
        )
        .map_err(open_err)?;
        if !writer.is_opened().map_err(open_err)? {
            return Err(PipelineError::Open(format!(
                "cannot create output video: {}",
                path.display()
            )));
        }

        debug!(fps, width, height, output = %path.display(), "opened output container");
        Ok(Self {
            writer,
            width,
            height,
            finished: false,
        })
    }
}

impl FrameSink for VideoEncoder {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(PipelineError::Open(format!(
                "frame size {}x{} does not match output {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        let flat = Mat::from_slice(frame.bgr_data()).map_err(open_err)?;
        let mat = flat
            .reshape(3, frame.height() as i32)
            .map_err(open_err)?
            .try_clone()
            .map_err(open_err)?;
        self.writer.write(&mat).map_err(open_err)
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        self.writer.release().map_err(open_err)
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.writer.release();
        }
    }
}

fn open_err(e: opencv::Error) -> PipelineError {
    PipelineError::Open(e.to_string())
}
