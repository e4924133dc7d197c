//! Error types for pictor-core
//!
//! Provides a unified error type for all operations in the core crate.
//! Each variant captures enough context for diagnostics without exposing
//! internal implementation details.

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid raster dimensions
    #[error("invalid raster dimensions: {width}x{height}")]
    InvalidDimension { width: usize, height: usize },

    /// Index out of bounds
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Matrix element access outside the allocated extent
    #[error("matrix element out of range: ({x}, {y}) in {columns}x{rows}")]
    MatrixOutOfRange {
        x: usize,
        y: usize,
        columns: usize,
        rows: usize,
    },

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Malformed geometry specification string
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Operation cancelled by the progress monitor
    #[error("operation interrupted: {0}")]
    OperationInterrupted(&'static str),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
