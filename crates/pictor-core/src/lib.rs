//! pictor-core - Raster and geometry data structures
//!
//! This crate provides the fundamental data structures used throughout
//! the pictor image processing library:
//!
//! - [`Raster`] - The pixel container with canvas metadata
//! - [`Pixel`] - Five-channel floating-point pixel in the Q16 range
//! - [`Rectangle`] / [`PageGeometry`] - Regions and geometry parsing
//! - [`Matrix`] - Dense 2-D scratch storage
//! - [`VirtualPolicy`] - Out-of-range pixel read resolution

pub mod error;
pub mod geometry;
pub mod matrix;
pub mod pixel;
pub mod raster;
pub mod view;

pub use error::{Error, Result};
pub use geometry::{
    CanvasClip, GeometryFlags, Gravity, Orientation, PageGeometry, Rectangle, clip_to_canvas,
    gravity_adjust, parse_page_geometry, shear_bounds,
};
pub use matrix::Matrix;
pub use pixel::{
    OPAQUE_ALPHA, Pixel, QUANTUM_RANGE, QUANTUM_SCALE, TRANSPARENT_ALPHA, clamp_to_quantum,
    fuzzy_equivalent, perceptible_reciprocal,
};
pub use raster::{Channels, ProgressMonitor, Raster};
pub use view::VirtualPolicy;
