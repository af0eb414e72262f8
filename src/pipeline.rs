use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::annotator::{OrtPoseBackend, PoseAnnotator, PoseBackend};
use crate::config::PoseConfig;
use crate::error::{PipelineError, Result};
use crate::record::{write_records, FrameRecord};
use crate::video::{FrameSink, FrameSource, VideoDecoder, VideoEncoder};

/// Pipeline lifecycle, for log correlation. Each run moves strictly forward;
/// `Failed` is terminal and has already cleaned up partial artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Opening,
    Processing,
    Finalizing,
    Closed,
    Failed,
}

/// What a completed run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Total frames decoded, annotated, and re-encoded.
    pub frame_count: u64,
    /// Frame rate of the output, truncated to whole frames per second.
    pub fps: i32,
}

/// The frame rate to encode at: the container's own when it reports a usable
/// one, the configured fallback otherwise.
pub fn effective_fps(reported: f64, fallback: f64) -> f64 {
    if reported.is_finite() && reported > 0.0 {
        reported
    } else {
        fallback
    }
}

/// Drains `source` through the annotator into `sink`, collecting one
/// [`FrameRecord`] per frame when `records` is provided. Returns the frame
/// count.
///
/// Every decoded frame is annotated and written exactly once, in decode
/// order; a frame without a detection still produces an output frame (and an
/// empty record).
pub fn run<S, K, B>(
    source: &mut S,
    sink: &mut K,
    annotator: &mut PoseAnnotator<B>,
    mut records: Option<&mut Vec<FrameRecord>>,
) -> Result<u64>
where
    S: FrameSource,
    K: FrameSink,
    B: PoseBackend,
{
    let mut frame_count: u64 = 0;
    while let Some(mut frame) = source.read_frame()? {
        frame_count += 1;
        let landmarks = annotator.process(&mut frame)?;
        if let Some(records) = records.as_deref_mut() {
            records.push(FrameRecord::new(frame_count, landmarks.unwrap_or_default()));
        }
        sink.write_frame(&frame)?;
    }
    annotator.finish();
    sink.finish()?;
    Ok(frame_count)
}

/// Full file-to-file run with a caller-supplied pose backend.
///
/// On any failure past opening, partially written artifacts (the output video
/// and the landmark JSON) are removed before the error is returned.
pub fn process_with_backend<B: PoseBackend>(
    input: &Path,
    output: &Path,
    landmarks_json: Option<&Path>,
    config: &PoseConfig,
    backend: B,
) -> Result<PipelineSummary> {
    if !input.is_file() {
        return Err(PipelineError::NotFound(input.to_path_buf()));
    }

    let mut annotator = PoseAnnotator::new(backend, config.draw_landmarks);
    let mut created: Vec<PathBuf> = Vec::new();
    match open_and_run(input, output, landmarks_json, config, &mut annotator, &mut created) {
        Ok(summary) => {
            debug!(state = ?State::Closed, "pipeline done");
            Ok(summary)
        }
        Err(e) => {
            // Handles are already dropped; remove only what this run created,
            // never files that pre-existed at the target paths.
            for path in &created {
                remove_partial(path);
            }
            warn!(state = ?State::Failed, error = %e, "pipeline failed, partial outputs removed");
            Err(e)
        }
    }
}

/// Full file-to-file run with the ONNX backend from `config`.
pub fn process_video(
    input: &Path,
    output: &Path,
    landmarks_json: Option<&Path>,
    config: &PoseConfig,
) -> Result<PipelineSummary> {
    if !input.is_file() {
        return Err(PipelineError::NotFound(input.to_path_buf()));
    }
    let backend = OrtPoseBackend::from_config(config)?;
    process_with_backend(input, output, landmarks_json, config, backend)
}

fn open_and_run<B: PoseBackend>(
    input: &Path,
    output: &Path,
    landmarks_json: Option<&Path>,
    config: &PoseConfig,
    annotator: &mut PoseAnnotator<B>,
    created: &mut Vec<PathBuf>,
) -> Result<PipelineSummary> {
    debug!(state = ?State::Opening, input = %input.display(), "opening");
    let mut decoder = VideoDecoder::open(input)?;
    let fps = effective_fps(decoder.frame_rate(), config.fallback_fps);
    created.push(output.to_path_buf());
    let mut encoder = VideoEncoder::create(output, fps, decoder.width(), decoder.height())?;

    debug!(state = ?State::Processing, fps, "transcoding");
    let mut records = landmarks_json.map(|_| Vec::new());
    let frame_count = run(&mut decoder, &mut encoder, annotator, records.as_mut())?;

    debug!(state = ?State::Finalizing, frame_count, "finalizing");
    if let (Some(path), Some(records)) = (landmarks_json, &records) {
        created.push(path.to_path_buf());
        write_records(path, records)?;
    }

    info!(
        frame_count,
        fps,
        output = %output.display(),
        "annotated video written"
    );
    Ok(PipelineSummary {
        frame_count,
        fps: fps as i32,
    })
}

fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "could not remove partial output");
        }
    }
}
