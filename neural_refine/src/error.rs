//! Error types for neural_refine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading data, training or checkpointing.
#[derive(Error, Debug)]
pub enum NeuralRefineError {
    /// Pose math error (degenerate rotation, short point cloud, bad matrix).
    #[error(transparent)]
    Core(#[from] refine_core::RefineCoreError),

    /// File could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed row in a point cloud file.
    #[error("{path}:{line}: {message}")]
    PointCloudParse {
        /// Point cloud file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the row.
        message: String,
    },

    /// Image decoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON manifest or sidecar could not be parsed or written.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Model record could not be saved or loaded.
    #[error("checkpoint error: {message}")]
    Checkpoint {
        /// Description of the recorder failure.
        message: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// The train or validation split has no samples.
    #[error("{split} split is empty ({samples} samples, valid_fraction = {valid_fraction})")]
    EmptySplit {
        /// `"train"` or `"validation"`.
        split: &'static str,
        /// Total number of samples in the dataset.
        samples: usize,
        /// Fraction of samples held out for validation.
        valid_fraction: f64,
    },

    /// Sample index past the end of the source.
    #[error("sample index {index} out of range for {len} samples")]
    SampleOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of samples.
        len: usize,
    },

    /// Tensor contents could not be read back to the host.
    #[error("tensor data error: {message}")]
    TensorData {
        /// Description of the conversion failure.
        message: String,
    },

    /// Invalid or corrupted data.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl NeuralRefineError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a JSON error with the path it happened on.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Result type for neural_refine operations.
pub type Result<T> = std::result::Result<T, NeuralRefineError>;
