//! The error type shared by every dataset component.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = DatasetError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to load manifest '{}': {reason}", path.display())]
    ManifestLoad { path: PathBuf, reason: String },

    /// Sizes are `(width, height)` pairs.
    #[error(
        "image size of '{}' is different from annotations, expect {expected:?}, but get {actual:?}",
        path.display()
    )]
    AnnotationMismatch {
        path: PathBuf,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("index {index} is out of range for dataset of length {len}")]
    Index { index: usize, len: usize },

    #[error("'{0}' is not implemented for this dataset")]
    NotImplemented(&'static str),

    #[error("failed to decode image '{}'", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read image header of '{}': {reason}", path.display())]
    ImageProbe { path: PathBuf, reason: String },

    #[error("transform failed")]
    Transform(#[source] anyhow::Error),

    #[error("cannot collate an empty batch")]
    EmptyBatch,

    #[error("invalid image: {reason}")]
    InvalidImage { reason: String },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("dataset type '{0}' is not registered")]
    UnknownDataset(String),

    #[error("dataset type '{0}' is already registered")]
    DuplicateDataset(String),

    #[error("loader worker failed: {0}")]
    Worker(String),
}

impl DatasetError {
    pub(crate) fn manifest(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ManifestLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn config(reason: impl ToString) -> Self {
        Self::Config {
            reason: reason.to_string(),
        }
    }
}
