//! Virtual pixel access
//!
//! Reads outside the stored pixel array resolve through the raster's
//! virtual pixel policy. Only the policies the transform operations
//! exercise are modeled.

use crate::pixel::Pixel;
use crate::raster::Raster;

/// How out-of-range pixel reads resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VirtualPolicy {
    /// Clamp to the nearest edge pixel.
    #[default]
    Edge,
    /// Return the background color.
    Background,
    /// Reflect across the nearest edge.
    Mirror,
    /// Wrap around periodically.
    Tile,
}

/// Fold a coordinate into `[0, extent)` by reflection.
fn mirror(coordinate: i64, extent: usize) -> usize {
    let extent = extent as i64;
    let period = 2 * extent;
    let mut c = coordinate.rem_euclid(period);
    if c >= extent {
        c = period - 1 - c;
    }
    c as usize
}

impl Raster {
    /// Read a pixel at a possibly out-of-range coordinate, resolved by
    /// the raster's virtual pixel policy.
    pub fn virtual_pixel(&self, x: i64, y: i64) -> Pixel {
        let columns = self.columns() as i64;
        let rows = self.rows() as i64;
        if x >= 0 && x < columns && y >= 0 && y < rows {
            return self.row(y as usize)[x as usize];
        }
        match self.virtual_policy {
            VirtualPolicy::Background => self.background,
            VirtualPolicy::Edge => {
                let cx = x.clamp(0, columns - 1) as usize;
                let cy = y.clamp(0, rows - 1) as usize;
                self.row(cy)[cx]
            }
            VirtualPolicy::Mirror => {
                let cx = mirror(x, self.columns());
                let cy = mirror(y, self.rows());
                self.row(cy)[cx]
            }
            VirtualPolicy::Tile => {
                let cx = x.rem_euclid(columns) as usize;
                let cy = y.rem_euclid(rows) as usize;
                self.row(cy)[cx]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::QUANTUM_RANGE;

    fn gradient_raster() -> Raster {
        let mut raster = Raster::new(4, 3).unwrap();
        for y in 0..3 {
            for x in 0..4 {
                raster
                    .put(x, y, Pixel::gray((y * 4 + x) as f64))
                    .unwrap();
            }
        }
        raster
    }

    #[test]
    fn test_in_range_read() {
        let raster = gradient_raster();
        assert_eq!(raster.virtual_pixel(2, 1), Pixel::gray(6.0));
    }

    #[test]
    fn test_edge_policy_clamps() {
        let raster = gradient_raster();
        assert_eq!(raster.virtual_pixel(-5, -5), Pixel::gray(0.0));
        assert_eq!(raster.virtual_pixel(100, 100), Pixel::gray(11.0));
    }

    #[test]
    fn test_background_policy() {
        let mut raster = gradient_raster();
        raster.virtual_policy = VirtualPolicy::Background;
        raster.background = Pixel::rgb(QUANTUM_RANGE, 0.0, 0.0);
        assert_eq!(raster.virtual_pixel(-1, 0), raster.background);
        assert_eq!(raster.virtual_pixel(0, 0), Pixel::gray(0.0));
    }

    #[test]
    fn test_mirror_policy() {
        let mut raster = gradient_raster();
        raster.virtual_policy = VirtualPolicy::Mirror;
        // x = -1 reflects to x = 0, x = 4 reflects to x = 3
        assert_eq!(raster.virtual_pixel(-1, 0), Pixel::gray(0.0));
        assert_eq!(raster.virtual_pixel(4, 0), Pixel::gray(3.0));
    }

    #[test]
    fn test_tile_policy() {
        let mut raster = gradient_raster();
        raster.virtual_policy = VirtualPolicy::Tile;
        assert_eq!(raster.virtual_pixel(4, 0), Pixel::gray(0.0));
        assert_eq!(raster.virtual_pixel(-1, 0), Pixel::gray(3.0));
        assert_eq!(raster.virtual_pixel(0, 3), Pixel::gray(0.0));
    }
}
