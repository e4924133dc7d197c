//! pictor-vision - Connected-components labeling and object statistics
//!
//! [`connected_components`] decomposes a raster into maximal regions of
//! fuzzy-equivalent color and returns a label plane plus a [`CcObject`]
//! table sorted by descending area. Behavior is configured through
//! `connected-components:*` artifacts on the source raster: merge
//! thresholds on area or shape metrics, keep/remove selections by id or
//! color, mean-color recoloring, and verbose reporting.

pub mod conncomp;
pub mod error;
pub mod metrics;
mod policy;
mod progress;

pub use conncomp::{CcObject, MAX_OBJECTS, connected_components};
pub use error::{VisionError, VisionResult};
pub use metrics::compute_metrics;
