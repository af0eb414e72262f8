use std::path::PathBuf;

use thiserror::Error;

/// Pipeline failure taxonomy.
///
/// A frame with no detectable pose is *not* an error; it yields an empty
/// landmark set. [`PipelineError::Detection`] covers model load and inference
/// faults only.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot open video container: {0}")]
    Open(String),

    #[error("pose model failure: {0}")]
    Detection(String),

    #[error("cannot write landmark records: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
