//! Error types for pictor-vision

use thiserror::Error;

/// Errors that can occur during component labeling
#[derive(Debug, Error)]
pub enum VisionError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] pictor_core::Error),

    /// The raster decomposed into more components than a label plane
    /// can address
    #[error("too many objects: {count} exceeds the {limit} label ceiling")]
    TooManyObjects { count: usize, limit: usize },

    /// A configuration artifact failed to parse
    #[error("invalid artifact {key}: {value:?}")]
    InvalidArtifact { key: String, value: String },
}

/// Result type for vision operations
pub type VisionResult<T> = Result<T, VisionError>;
