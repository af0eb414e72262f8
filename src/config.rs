use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

/// Latency/accuracy tier of the pose landmark model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelComplexity {
    /// Fastest, least accurate.
    Lite,
    /// Balanced.
    Full,
    /// Slowest, most accurate.
    Heavy,
}

impl ModelComplexity {
    /// Cached model file name for this tier.
    pub fn model_file(&self) -> &'static str {
        match self {
            ModelComplexity::Lite => "pose_landmark_lite.onnx",
            ModelComplexity::Full => "pose_landmark_full.onnx",
            ModelComplexity::Heavy => "pose_landmark_heavy.onnx",
        }
    }
}

/// Configuration for one pipeline invocation.
///
/// Input is always treated as a continuous temporal sequence (tracking mode);
/// there is no static-image mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseConfig {
    pub model_complexity: ModelComplexity,
    /// Presence score a frame must clear to start a new detection, in `[0,1]`.
    pub min_detection_confidence: f32,
    /// Presence score a frame must clear while a pose is already being
    /// tracked, in `[0,1]`.
    pub min_tracking_confidence: f32,
    /// Draw the skeleton overlay onto output frames.
    pub draw_landmarks: bool,
    /// Frame rate used when the container reports none.
    pub fallback_fps: f64,
    /// Explicit model file; overrides complexity-based cache lookup.
    pub model_path: Option<PathBuf>,
    /// Where to download the model from when it is not cached.
    pub model_url: Option<String>,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            model_complexity: ModelComplexity::Full,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            draw_landmarks: true,
            fallback_fps: 25.0,
            model_path: None,
            model_url: None,
        }
    }
}

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "posetrace",
    about = "Overlay detected body landmarks on a video and optionally export them as JSON"
)]
pub struct Args {
    /// Input video (mp4/mov/avi/mkv/webm)
    pub input: PathBuf,

    /// Annotated output video (mp4)
    pub output: PathBuf,

    /// Write per-frame landmark records to this JSON file
    #[arg(long)]
    pub landmarks_json: Option<PathBuf>,

    /// Pose landmark model file (.onnx)
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Download the model from this URL into the cache dir when missing
    #[arg(long)]
    pub model_url: Option<String>,

    #[arg(long, value_enum, default_value = "full")]
    pub model_complexity: ModelComplexity,

    #[arg(long, default_value_t = 0.5)]
    pub min_detection_confidence: f32,

    #[arg(long, default_value_t = 0.5)]
    pub min_tracking_confidence: f32,

    /// Skip drawing the skeleton overlay
    #[arg(long)]
    pub no_draw: bool,

    /// Frame rate used when the container reports none
    #[arg(long, default_value_t = 25.0)]
    pub fallback_fps: f64,
}

impl Args {
    pub fn to_config(&self) -> PoseConfig {
        PoseConfig {
            model_complexity: self.model_complexity,
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
            draw_landmarks: !self.no_draw,
            fallback_fps: self.fallback_fps,
            model_path: self.model.clone(),
            model_url: self.model_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_documented_ones() {
        let config = PoseConfig::default();
        assert_eq!(config.model_complexity, ModelComplexity::Full);
        assert_eq!(config.min_detection_confidence, 0.5);
        assert_eq!(config.min_tracking_confidence, 0.5);
        assert!(config.draw_landmarks);
        assert_eq!(config.fallback_fps, 25.0);
    }

    #[test]
    fn complexity_tiers_map_to_distinct_model_files() {
        assert_ne!(
            ModelComplexity::Lite.model_file(),
            ModelComplexity::Heavy.model_file()
        );
        assert!(ModelComplexity::Full.model_file().ends_with(".onnx"));
    }
}
