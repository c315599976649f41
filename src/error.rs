//! Error type shared by the recognition pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by an inference backend.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the license plate pipeline.
///
/// Per-frame errors (a failed inference call, a tracker that could not be
/// initialised) are contained by the fusion controller and only logged.
/// Errors surface to callers when acquiring resources at startup.
#[derive(Debug, Error)]
pub enum LprError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("inference failed: {0}")]
    Inference(#[source] BoxedError),

    #[error("malformed detector output: expected at least {expected} columns, got {got}")]
    MalformedOutput { expected: usize, got: usize },

    #[error("tracker initialisation failed: {0}")]
    TrackerInit(String),

    #[error("replay line {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("no frames found in {0}")]
    NoFrames(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("video error: {0}")]
    Video(String),

    #[cfg(feature = "opencv-backend")]
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl LprError {
    pub fn inference<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Inference(Box::new(err))
    }
}
