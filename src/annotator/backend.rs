use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use super::PoseBackend;
use crate::config::PoseConfig;
use crate::error::{PipelineError, Result};
use crate::record::Landmark;
use crate::LANDMARK_COUNT;

/// Model input edge length. Frames are stretched to this square regardless of
/// aspect ratio; landmark output is normalized so the distortion cancels out
/// when coordinates are mapped back onto the source frame.
const INPUT_SIZE: u32 = 256;

/// Single-person pose estimation on an ONNX landmark model.
///
/// Temporal state is a single flag: once a frame clears the detection
/// threshold the backend switches to the (typically looser) tracking
/// threshold, and falls back the moment a frame fails it. [`reset`] returns
/// to the detection threshold for the next video.
///
/// [`reset`]: PoseBackend::reset
pub struct OrtPoseBackend {
    session: Session,
    input_name: String,
    output_names: Vec<String>,
    min_detection_confidence: f32,
    min_tracking_confidence: f32,
    tracking: bool,
}

impl OrtPoseBackend {
    /// Builds a backend from the pipeline configuration, resolving (and if
    /// necessary downloading) the model file for the configured complexity.
    pub fn from_config(config: &PoseConfig) -> Result<Self> {
        let model_path = resolve_model(config)?;
        Self::from_model_file(
            &model_path,
            config.min_detection_confidence,
            config.min_tracking_confidence,
        )
    }

    pub fn from_model_file(
        path: &Path,
        min_detection_confidence: f32,
        min_tracking_confidence: f32,
    ) -> Result<Self> {
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| PipelineError::Detection(format!("{}: {e}", path.display())))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| PipelineError::Detection("model declares no inputs".into()))?;
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        if output_names.is_empty() {
            return Err(PipelineError::Detection("model declares no outputs".into()));
        }

        info!(model = %path.display(), input = %input_name, "loaded pose model");
        Ok(Self {
            session,
            input_name,
            output_names,
            min_detection_confidence,
            min_tracking_confidence,
            tracking: false,
        })
    }

    /// NCHW float tensor, stretched to the model square and scaled to 0..1.
    fn preprocess(&self, frame: &RgbImage) -> Array4<f32> {
        let resized = imageops::resize(frame, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        let mut input = Array4::<f32>::zeros((1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            input[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
        }
        input
    }
}

impl PoseBackend for OrtPoseBackend {
    fn detect(&mut self, frame: &RgbImage) -> Result<Option<Vec<Landmark>>> {
        let input = self.preprocess(frame);
        let tensor = Tensor::from_array(input)
            .map_err(|e| PipelineError::Detection(format!("input tensor: {e}")))?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| PipelineError::Detection(format!("inference failed: {e}")))?;

        // The landmark models expose a flat landmark tensor plus a scalar
        // presence score; output order varies between export revisions, so
        // classify by element count instead of by name.
        let mut score = 1.0f32;
        let mut raw: Option<Vec<f32>> = None;
        for name in &self.output_names {
            let view: ndarray::ArrayViewD<f32> = outputs[name.as_str()]
                .try_extract_array()
                .map_err(|e| PipelineError::Detection(format!("output {name}: {e}")))?;
            let values: Vec<f32> = view.iter().copied().collect();
            if values.len() == 1 {
                score = values[0];
            } else if values.len() % LANDMARK_COUNT == 0 && raw.is_none() {
                raw = Some(values);
            }
        }
        let raw = raw.ok_or_else(|| {
            PipelineError::Detection(format!(
                "no output with a multiple of {LANDMARK_COUNT} values"
            ))
        })?;

        let threshold = if self.tracking {
            self.min_tracking_confidence
        } else {
            self.min_detection_confidence
        };
        if score < threshold {
            if self.tracking {
                debug!(score, threshold, "pose lost");
            }
            self.tracking = false;
            return Ok(None);
        }
        self.tracking = true;

        Ok(Some(parse_landmarks(&raw, score)?))
    }

    fn reset(&mut self) {
        self.tracking = false;
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Converts the raw landmark tensor into normalized landmarks. Each landmark
/// needs at least x/y/z; a fourth value is a visibility logit, otherwise the
/// frame-level presence score stands in.
fn parse_landmarks(raw: &[f32], score: f32) -> Result<Vec<Landmark>> {
    let step = raw.len() / LANDMARK_COUNT;
    if step < 3 {
        return Err(PipelineError::Detection(format!(
            "landmark output carries {step} values per landmark, need at least 3"
        )));
    }
    let size = INPUT_SIZE as f32;
    Ok(raw
        .chunks_exact(step)
        .map(|chunk| {
            let visibility = if step >= 4 { sigmoid(chunk[3]) } else { score };
            Landmark::new(
                chunk[0] / size,
                chunk[1] / size,
                chunk[2] / size,
                visibility.clamp(0.0, 1.0),
            )
        })
        .collect())
}

/// Finds the model file to load: an explicit path wins, then the local cache,
/// then a download into the cache when a URL is configured.
fn resolve_model(config: &PoseConfig) -> Result<PathBuf> {
    if let Some(path) = &config.model_path {
        if !path.is_file() {
            return Err(PipelineError::Detection(format!(
                "model file not found: {}",
                path.display()
            )));
        }
        return Ok(path.clone());
    }

    let cache = dirs::cache_dir()
        .ok_or_else(|| PipelineError::Detection("no cache directory on this system".into()))?
        .join("posetrace");
    let dest = cache.join(config.model_complexity.model_file());
    if dest.is_file() {
        return Ok(dest);
    }

    let url = config.model_url.as_deref().ok_or_else(|| {
        PipelineError::Detection(format!(
            "model {} is not cached; pass --model <file> or --model-url <url>",
            dest.display()
        ))
    })?;
    fs::create_dir_all(&cache)
        .map_err(|e| PipelineError::Detection(format!("cannot create model cache: {e}")))?;
    fetch_model(url, &dest)?;
    Ok(dest)
}

fn fetch_model(url: &str, dest: &Path) -> Result<()> {
    info!(url, dest = %dest.display(), "downloading pose model");
    let response = ureq::get(url)
        .call()
        .map_err(|e| PipelineError::Detection(format!("model download failed: {e}")))?;
    let part = dest.with_extension("part");
    let mut file = fs::File::create(&part)
        .map_err(|e| PipelineError::Detection(format!("cannot write model file: {e}")))?;
    io::copy(&mut response.into_reader(), &mut file)
        .map_err(|e| PipelineError::Detection(format!("model download failed: {e}")))?;
    fs::rename(&part, dest)
        .map_err(|e| PipelineError::Detection(format!("cannot place model file: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_centered_and_bounded() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn five_value_landmarks_parse_with_sigmoid_visibility() {
        let mut raw = vec![0.0f32; LANDMARK_COUNT * 5];
        raw[0] = 128.0;
        raw[1] = 64.0;
        raw[2] = -32.0;
        raw[3] = 10.0;
        let landmarks = parse_landmarks(&raw, 0.9).unwrap();
        assert_eq!(landmarks.len(), LANDMARK_COUNT);
        assert!((landmarks[0].x - 0.5).abs() < 1e-6);
        assert!((landmarks[0].y - 0.25).abs() < 1e-6);
        assert!((landmarks[0].z + 0.125).abs() < 1e-6);
        assert!(landmarks[0].visibility > 0.99);
    }

    #[test]
    fn three_value_landmarks_fall_back_to_the_presence_score() {
        let raw = vec![0.0f32; LANDMARK_COUNT * 3];
        let landmarks = parse_landmarks(&raw, 0.7).unwrap();
        assert!(landmarks.iter().all(|lm| lm.visibility == 0.7));
    }

    #[test]
    fn too_narrow_landmark_output_is_a_detection_error() {
        let raw = vec![0.0f32; LANDMARK_COUNT];
        let err = parse_landmarks(&raw, 0.9).unwrap_err();
        assert!(matches!(err, PipelineError::Detection(_)));
    }

    #[test]
    fn missing_explicit_model_path_is_reported() {
        let config = PoseConfig {
            model_path: Some(PathBuf::from("/nonexistent/pose.onnx")),
            ..PoseConfig::default()
        };
        let err = resolve_model(&config).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
