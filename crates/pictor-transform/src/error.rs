//! Error types for pictor-transform

use pictor_core::Rectangle;
use thiserror::Error;

/// Errors that can occur during geometric transformations
#[derive(Debug, Error)]
pub enum TransformError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] pictor_core::Error),

    /// Shear angle at a multiple of 90 degrees has no finite tangent
    #[error("angle is discontinuous: {0} degrees")]
    AngleIsDiscontinuous(f64),

    /// Region request does not intersect the raster
    #[error("geometry does not contain image: {width}x{height}{x:+}{y:+}", width = .0.width, height = .0.height, x = .0.x, y = .0.y)]
    GeometryDoesNotContainImage(Rectangle),

    /// Plane consolidation needs a complete group of grayscale rasters
    #[error("raster sequence required: expected a multiple of {expected}, got {actual}")]
    SequenceRequired { expected: usize, actual: usize },
}

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;
