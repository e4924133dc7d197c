//! The raster container
//!
//! [`Raster`] owns a row-major pixel array plus the canvas metadata the
//! transform operations consume: background color, virtual-canvas page,
//! fuzz tolerance, gravity, orientation, the per-raster artifact store,
//! and an optional progress monitor.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::geometry::{Gravity, Orientation, Rectangle};
use crate::pixel::{Pixel, TRANSPARENT_ALPHA, fuzzy_equivalent};
use crate::view::VirtualPolicy;

/// Which optional channels a raster carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Channels {
    pub alpha: bool,
    pub black: bool,
}

/// Progress callback: `(tag, completed, span)`. Returning `false`
/// requests cancellation of the running operation.
pub type ProgressMonitor = Arc<dyn Fn(&str, u64, u64) -> bool + Send + Sync>;

/// A raster image with canvas metadata.
#[derive(Clone)]
pub struct Raster {
    columns: usize,
    rows: usize,
    pixels: Vec<Pixel>,
    pub channels: Channels,
    pub background: Pixel,
    pub page: Rectangle,
    pub fuzz: f64,
    pub gravity: Gravity,
    pub orientation: Orientation,
    pub virtual_policy: VirtualPolicy,
    artifacts: BTreeMap<String, String>,
    pub monitor: Option<ProgressMonitor>,
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("columns", &self.columns)
            .field("rows", &self.rows)
            .field("channels", &self.channels)
            .field("page", &self.page)
            .field("fuzz", &self.fuzz)
            .finish_non_exhaustive()
    }
}

impl Raster {
    /// Allocate a raster of opaque black pixels.
    pub fn new(columns: usize, rows: usize) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(Error::InvalidDimension {
                width: columns,
                height: rows,
            });
        }
        Ok(Raster {
            columns,
            rows,
            pixels: vec![Pixel::default(); columns * rows],
            channels: Channels::default(),
            background: Pixel::default(),
            page: Rectangle::default(),
            fuzz: 0.0,
            gravity: Gravity::default(),
            orientation: Orientation::default(),
            virtual_policy: VirtualPolicy::default(),
            artifacts: BTreeMap::new(),
            monitor: None,
        })
    }

    /// Clone every attribute but allocate a fresh pixel array of the
    /// given extent.
    pub fn clone_sized(&self, columns: usize, rows: usize) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(Error::InvalidDimension {
                width: columns,
                height: rows,
            });
        }
        let mut raster = self.clone();
        raster.columns = columns;
        raster.rows = rows;
        raster.pixels = vec![Pixel::default(); columns * rows];
        Ok(raster)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The page rectangle with its extent defaulted to the pixel array.
    pub fn canvas(&self) -> Rectangle {
        let mut page = self.page;
        if page.width == 0 || page.height == 0 {
            page.width = self.columns;
            page.height = self.rows;
        }
        page
    }

    pub fn get(&self, x: usize, y: usize) -> Result<Pixel> {
        if x >= self.columns || y >= self.rows {
            return Err(Error::IndexOutOfBounds {
                index: y * self.columns + x,
                len: self.pixels.len(),
            });
        }
        Ok(self.pixels[y * self.columns + x])
    }

    pub fn put(&mut self, x: usize, y: usize, pixel: Pixel) -> Result<()> {
        if x >= self.columns || y >= self.rows {
            return Err(Error::IndexOutOfBounds {
                index: y * self.columns + x,
                len: self.pixels.len(),
            });
        }
        self.pixels[y * self.columns + x] = pixel;
        Ok(())
    }

    /// Row slice. Panics on an out-of-range row; callers validate.
    pub fn row(&self, y: usize) -> &[Pixel] {
        &self.pixels[y * self.columns..(y + 1) * self.columns]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [Pixel] {
        &mut self.pixels[y * self.columns..(y + 1) * self.columns]
    }

    /// Mutable row iterator, the unit of scanline parallelism.
    pub fn rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, Pixel> {
        self.pixels.chunks_exact_mut(self.columns)
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    /// Flood the pixel array with the background color.
    pub fn set_background_pixels(&mut self) {
        let background = self.background;
        self.pixels.fill(background);
    }

    /// Bounding box of the content that differs from the border colors.
    ///
    /// Three corner pixels serve as edge targets: (0, 0) bounds the left
    /// and top edges, (columns-1, 0) the right edge, and (0, rows-1) the
    /// bottom edge. A raster whose interior never differs from the
    /// targets reports a zero-extent rectangle.
    pub fn bounding_box(&self) -> Rectangle {
        let mut bounds = Rectangle {
            x: self.columns as i64,
            y: self.rows as i64,
            width: 0,
            height: 0,
        };
        let target = [
            self.pixels[0],
            self.pixels[self.columns - 1],
            self.pixels[(self.rows - 1) * self.columns],
        ];
        for y in 0..self.rows {
            let row = self.row(y);
            for (x, pixel) in row.iter().enumerate() {
                if (x as i64) < bounds.x && !fuzzy_equivalent(pixel, &target[0], self.fuzz) {
                    bounds.x = x as i64;
                }
                if x > bounds.width && !fuzzy_equivalent(pixel, &target[1], self.fuzz) {
                    bounds.width = x;
                }
                if (y as i64) < bounds.y && !fuzzy_equivalent(pixel, &target[0], self.fuzz) {
                    bounds.y = y as i64;
                }
                if y > bounds.height && !fuzzy_equivalent(pixel, &target[2], self.fuzz) {
                    bounds.height = y;
                }
            }
        }
        if bounds.width == 0 && bounds.height == 0 {
            return Rectangle::default();
        }
        bounds.width = (bounds.width as i64 - (bounds.x - 1)) as usize;
        bounds.height = (bounds.height as i64 - (bounds.y - 1)) as usize;
        bounds
    }

    pub fn artifact(&self, key: &str) -> Option<&str> {
        self.artifacts.get(key).map(String::as_str)
    }

    pub fn set_artifact(&mut self, key: &str, value: &str) {
        self.artifacts.insert(key.to_string(), value.to_string());
    }

    pub fn remove_artifact(&mut self, key: &str) {
        self.artifacts.remove(key);
    }

    /// The 1x1 transparent raster returned for degenerate region
    /// requests. Its page records the prior canvas extent with a (-1,
    /// -1) offset so callers can recognize the sentinel.
    pub fn degenerate_sentinel(&self) -> Raster {
        let mut sentinel = self
            .clone_sized(1, 1)
            .unwrap_or_else(|_| unreachable!("1x1 extent is always valid"));
        sentinel.channels.alpha = true;
        sentinel.background.alpha = TRANSPARENT_ALPHA;
        sentinel.set_background_pixels();
        sentinel.page = self.canvas();
        sentinel.page.x = -1;
        sentinel.page.y = -1;
        sentinel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::QUANTUM_RANGE;

    #[test]
    fn test_new_rejects_zero_extent() {
        assert!(Raster::new(0, 10).is_err());
        assert!(Raster::new(10, 0).is_err());
    }

    #[test]
    fn test_get_put() {
        let mut raster = Raster::new(4, 3).unwrap();
        let red = Pixel::rgb(QUANTUM_RANGE, 0.0, 0.0);
        raster.put(2, 1, red).unwrap();
        assert_eq!(raster.get(2, 1).unwrap(), red);
        assert!(raster.get(4, 0).is_err());
        assert!(raster.put(0, 3, red).is_err());
    }

    #[test]
    fn test_clone_sized_keeps_metadata() {
        let mut raster = Raster::new(4, 4).unwrap();
        raster.fuzz = 12.5;
        raster.page = Rectangle::new(3, 4, 10, 10);
        raster.set_artifact("deskew:angle", "1.5");
        let copy = raster.clone_sized(8, 2).unwrap();
        assert_eq!(copy.columns(), 8);
        assert_eq!(copy.rows(), 2);
        assert_eq!(copy.fuzz, 12.5);
        assert_eq!(copy.page, raster.page);
        assert_eq!(copy.artifact("deskew:angle"), Some("1.5"));
    }

    #[test]
    fn test_canvas_defaults_to_extent() {
        let raster = Raster::new(6, 5).unwrap();
        assert_eq!(raster.canvas(), Rectangle::sized(6, 5));
        let mut paged = raster.clone();
        paged.page = Rectangle::new(2, 3, 20, 30);
        assert_eq!(paged.canvas(), Rectangle::new(2, 3, 20, 30));
    }

    #[test]
    fn test_background_fill() {
        let mut raster = Raster::new(3, 3).unwrap();
        raster.background = Pixel::rgb(0.0, QUANTUM_RANGE, 0.0);
        raster.set_background_pixels();
        assert_eq!(raster.get(1, 1).unwrap(), raster.background);
    }

    #[test]
    fn test_bounding_box_centered_blob() {
        let mut raster = Raster::new(10, 10).unwrap();
        raster.set_background_pixels();
        let white = Pixel::gray(QUANTUM_RANGE);
        for y in 3..=5 {
            for x in 2..=6 {
                raster.put(x, y, white).unwrap();
            }
        }
        let bounds = raster.bounding_box();
        assert_eq!(bounds, Rectangle::new(2, 3, 5, 3));
    }

    #[test]
    fn test_bounding_box_uniform_raster() {
        let mut raster = Raster::new(8, 8).unwrap();
        raster.set_background_pixels();
        assert!(raster.bounding_box().is_empty());
    }

    #[test]
    fn test_degenerate_sentinel() {
        let mut raster = Raster::new(5, 5).unwrap();
        raster.page = Rectangle::new(0, 0, 5, 5);
        let sentinel = raster.degenerate_sentinel();
        assert_eq!((sentinel.columns(), sentinel.rows()), (1, 1));
        assert_eq!((sentinel.page.x, sentinel.page.y), (-1, -1));
        assert_eq!(sentinel.get(0, 0).unwrap().alpha, TRANSPARENT_ALPHA);
    }
}
