//! pictor-transform - Geometric transformations for rasters
//!
//! The operations fall into three groups:
//!
//! - Exact pixel permutations: [`integral_rotate`], [`flip`], [`flop`],
//!   [`transpose`], [`transverse`], [`auto_orient`], [`roll`]
//! - Resampling transforms: [`shear`], [`shear_rotate`], [`deskew`],
//!   [`sample`]
//! - Region surgery: [`crop`], [`crop_to_tiles`], [`excerpt`],
//!   [`extent`], [`shave`], [`trim`], [`splice`], [`chop`],
//!   [`transform`]
//!
//! All operations are scanline-parallel and honor the raster's progress
//! monitor; a monitor returning `false` aborts the operation with
//! [`pictor_core::Error::OperationInterrupted`].

pub mod crop;
pub mod deskew;
pub mod error;
mod progress;
pub mod rotate;
pub mod shear;
pub mod splice;

pub use crop::{crop, crop_to_tiles, excerpt, extent, sample, shave, transform, trim};
pub use deskew::{deskew, radon_transform};
pub use error::{TransformError, TransformResult};
pub use rotate::{auto_orient, flip, flop, integral_rotate, transpose, transverse};
pub use shear::{shear, shear_rotate, x_shear, y_shear};
pub use splice::{chop, consolidate_cmyk, roll, splice};
