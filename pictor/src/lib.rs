//! Pictor - Geometric pixel transforms and region labeling
//!
//! # Overview
//!
//! Pictor provides the raster operations of a classic image processing
//! pipeline:
//!
//! - Orthogonal rotations, mirrors, and EXIF auto-orientation
//! - Antialiased shear and arbitrary-angle rotation via the
//!   three-shear decomposition
//! - Automatic skew detection and correction (Radon projection)
//! - Region surgery: crop, tiles, extent, shave, trim, splice, chop,
//!   roll
//! - Connected-components labeling with per-object statistics, shape
//!   metrics, and declarative merge/keep/remove policies
//!
//! # Example
//!
//! ```
//! use pictor::{Pixel, Raster};
//! use pictor::transform::integral_rotate;
//!
//! let mut raster = Raster::new(640, 480).unwrap();
//! raster.background = Pixel::gray(65535.0);
//! raster.set_background_pixels();
//! let rotated = integral_rotate(&raster, 1).unwrap();
//! assert_eq!((rotated.columns(), rotated.rows()), (480, 640));
//! ```

// Re-export core types (primary data structures used everywhere)
pub use pictor_core::*;

// Re-export domain crates as modules to avoid name conflicts
pub use pictor_transform as transform;
pub use pictor_vision as vision;
