//! Canvas surgery: roll, splice, chop, and plane consolidation

use rayon::prelude::*;

use pictor_core::{OPAQUE_ALPHA, Pixel, QUANTUM_RANGE, Raster, Rectangle, clamp_to_quantum};

use crate::error::{TransformError, TransformResult};
use crate::progress::Progress;

/// Shift the raster by the given offsets, wrapping pixels that fall off
/// one edge back in on the opposite edge.
pub fn roll(raster: &Raster, x_offset: i64, y_offset: i64) -> TransformResult<Raster> {
    let columns = raster.columns();
    let rows = raster.rows();
    let x_offset = x_offset.rem_euclid(columns as i64) as usize;
    let y_offset = y_offset.rem_euclid(rows as i64) as usize;
    let mut rolled = raster.clone_sized(columns, rows)?;
    let progress = Progress::new(raster, "roll", rows as u64);
    rolled
        .pixels_mut()
        .par_chunks_mut(columns)
        .enumerate()
        .for_each(|(y, row)| {
            if progress.is_aborted() {
                return;
            }
            let source = raster.row((y + rows - y_offset) % rows);
            row[x_offset..].copy_from_slice(&source[..columns - x_offset]);
            row[..x_offset].copy_from_slice(&source[columns - x_offset..]);
            progress.step();
        });
    progress.finish()?;
    Ok(rolled)
}

/// Insert a cross of background-colored columns and rows.
///
/// The geometry inserts `width` columns starting at `x` and `height`
/// rows starting at `y`; existing pixels move right and down to make
/// room. A gravity on the raster re-anchors the insertion point, with
/// one historical oddity kept intact: west gravity offsets y by half the
/// inserted width.
pub fn splice(raster: &Raster, geometry: &Rectangle) -> TransformResult<Raster> {
    use pictor_core::Gravity;

    let columns = raster.columns() + geometry.width;
    let rows = raster.rows() + geometry.height;
    let mut x = geometry.x;
    let mut y = geometry.y;
    match raster.gravity {
        Gravity::North => {
            x += geometry.width as i64 / 2;
        }
        Gravity::NorthEast => {
            x += geometry.width as i64;
        }
        Gravity::West => {
            y += geometry.width as i64 / 2;
        }
        Gravity::Center => {
            x += geometry.width as i64 / 2;
            y += geometry.height as i64 / 2;
        }
        Gravity::East => {
            x += geometry.width as i64;
            y += geometry.height as i64 / 2;
        }
        Gravity::SouthWest => {
            y += geometry.height as i64;
        }
        Gravity::South => {
            x += geometry.width as i64 / 2;
            y += geometry.height as i64;
        }
        Gravity::SouthEast => {
            x += geometry.width as i64;
            y += geometry.height as i64;
        }
        Gravity::Undefined | Gravity::NorthWest => {}
    }
    let mut spliced = raster.clone_sized(columns, rows)?;
    spliced.channels.alpha = true;
    spliced.set_background_pixels();
    // Leading columns copy straight across; after the inserted band the
    // source continues where the leading copy stopped.
    let leading = x.min(columns as i64);
    let band_end = x + geometry.width as i64;
    let gap_top = y;
    let gap_bottom = y + geometry.height as i64;
    let progress = Progress::new(raster, "splice", rows as u64);
    spliced
        .pixels_mut()
        .par_chunks_mut(columns)
        .enumerate()
        .for_each(|(row_index, row)| {
            if progress.is_aborted() {
                return;
            }
            let row_index = row_index as i64;
            let source_y = if row_index < gap_top {
                row_index
            } else if row_index < gap_bottom {
                progress.step();
                return;
            } else {
                row_index - geometry.height as i64
            };
            let mut source_x = 0i64;
            for (column, pixel) in row.iter_mut().enumerate() {
                let column = column as i64;
                if column < leading || column >= band_end {
                    *pixel = raster.virtual_pixel(source_x, source_y);
                    source_x += 1;
                }
            }
            progress.step();
        });
    progress.finish()?;
    Ok(spliced)
}

/// Remove a cross of columns and rows from the raster; the remaining
/// quadrants close up around the removed band.
pub fn chop(raster: &Raster, geometry: &Rectangle) -> TransformResult<Raster> {
    let columns = raster.columns() as i64;
    let rows = raster.rows() as i64;
    let mut extent = *geometry;
    if extent.x + (extent.width as i64) < 0
        || extent.y + (extent.height as i64) < 0
        || extent.x > columns
        || extent.y > rows
    {
        return Err(TransformError::GeometryDoesNotContainImage(*geometry));
    }
    if extent.x + extent.width as i64 > columns {
        extent.width = (columns - extent.x) as usize;
    }
    if extent.y + extent.height as i64 > rows {
        extent.height = (rows - extent.y) as usize;
    }
    if extent.x < 0 {
        extent.width -= (-extent.x) as usize;
        extent.x = 0;
    }
    if extent.y < 0 {
        extent.height -= (-extent.y) as usize;
        extent.y = 0;
    }
    if extent.width as i64 >= columns || extent.height as i64 >= rows {
        return Err(TransformError::GeometryDoesNotContainImage(*geometry));
    }
    let x = extent.x as usize;
    let y = extent.y as usize;
    let dest_columns = raster.columns() - extent.width;
    let dest_rows = raster.rows() - extent.height;
    let mut chopped = raster.clone_sized(dest_columns, dest_rows)?;
    let progress = Progress::new(raster, "chop", dest_rows as u64);
    chopped
        .pixels_mut()
        .par_chunks_mut(dest_columns)
        .enumerate()
        .for_each(|(row_index, row)| {
            if progress.is_aborted() {
                return;
            }
            let source_y = if row_index < y {
                row_index
            } else {
                row_index + extent.height
            };
            let source = raster.row(source_y);
            row[..x].copy_from_slice(&source[..x]);
            row[x..].copy_from_slice(&source[x + extent.width..]);
            progress.step();
        });
    progress.finish()?;
    Ok(chopped)
}

fn ink_density(pixel: &Pixel) -> f64 {
    clamp_to_quantum(QUANTUM_RANGE - pixel.intensity())
}

/// Combine groups of four grayscale separation rasters into CMYK
/// rasters. Each plane's intensity is inverted into ink density; the
/// planes arrive in cyan, magenta, yellow, black order.
pub fn consolidate_cmyk(planes: &[Raster]) -> TransformResult<Vec<Raster>> {
    if planes.is_empty() || planes.len() % 4 != 0 {
        return Err(TransformError::SequenceRequired {
            expected: 4,
            actual: planes.len(),
        });
    }
    let mut consolidated = Vec::with_capacity(planes.len() / 4);
    for group in planes.chunks_exact(4) {
        let columns = group[0].columns();
        let rows = group[0].rows();
        for plane in &group[1..] {
            if plane.columns() != columns || plane.rows() != rows {
                return Err(TransformError::Core(pictor_core::Error::InvalidDimension {
                    width: plane.columns(),
                    height: plane.rows(),
                }));
            }
        }
        let mut raster = group[0].clone_sized(columns, rows)?;
        raster.channels.black = true;
        let progress = Progress::new(&group[0], "consolidate", rows as u64);
        raster
            .pixels_mut()
            .par_chunks_mut(columns)
            .enumerate()
            .for_each(|(y, row)| {
                if progress.is_aborted() {
                    return;
                }
                let cyan = group[0].row(y);
                let magenta = group[1].row(y);
                let yellow = group[2].row(y);
                let black = group[3].row(y);
                for (x, pixel) in row.iter_mut().enumerate() {
                    *pixel = Pixel {
                        red: ink_density(&cyan[x]),
                        green: ink_density(&magenta[x]),
                        blue: ink_density(&yellow[x]),
                        black: ink_density(&black[x]),
                        alpha: OPAQUE_ALPHA,
                    };
                }
                progress.step();
            });
        progress.finish()?;
        consolidated.push(raster);
    }
    Ok(consolidated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pictor_core::Gravity;

    fn gradient(columns: usize, rows: usize) -> Raster {
        let mut raster = Raster::new(columns, rows).unwrap();
        for y in 0..rows {
            for x in 0..columns {
                let value = (y * columns + x) as f64;
                raster.put(x, y, Pixel::gray(value)).unwrap();
            }
        }
        raster
    }

    #[test]
    fn test_roll_wraps_pixels() {
        let raster = gradient(3, 3);
        let rolled = roll(&raster, 1, 1).unwrap();
        assert_eq!(rolled.get(0, 0).unwrap(), raster.get(2, 2).unwrap());
        assert_eq!(rolled.get(1, 1).unwrap(), raster.get(0, 0).unwrap());
        assert_eq!(rolled.get(2, 0).unwrap(), raster.get(1, 2).unwrap());
    }

    #[test]
    fn test_roll_offset_normalization() {
        let raster = gradient(4, 3);
        let negative = roll(&raster, -1, -1).unwrap();
        let wrapped = roll(&raster, 3, 2).unwrap();
        assert_eq!(negative.pixels(), wrapped.pixels());
        let full_turn = roll(&raster, 4, 3).unwrap();
        assert_eq!(full_turn.pixels(), raster.pixels());
    }

    #[test]
    fn test_splice_inserts_cross() {
        let mut raster = gradient(4, 4);
        raster.background = Pixel::gray(QUANTUM_RANGE);
        let spliced = splice(&raster, &Rectangle::new(2, 2, 2, 2)).unwrap();
        assert_eq!((spliced.columns(), spliced.rows()), (6, 6));
        assert_eq!(spliced.get(0, 0).unwrap(), raster.get(0, 0).unwrap());
        assert_eq!(spliced.get(1, 1).unwrap(), raster.get(1, 1).unwrap());
        // Inserted band takes the background color
        assert_eq!(spliced.get(2, 0).unwrap().red, QUANTUM_RANGE);
        assert_eq!(spliced.get(0, 3).unwrap().red, QUANTUM_RANGE);
        // Content past the band shifts right and down
        assert_eq!(spliced.get(4, 4).unwrap(), raster.get(2, 2).unwrap());
        assert_eq!(spliced.get(5, 5).unwrap(), raster.get(3, 3).unwrap());
    }

    #[test]
    fn test_splice_gravity_moves_band() {
        let mut raster = gradient(4, 4);
        raster.background = Pixel::gray(QUANTUM_RANGE);
        raster.gravity = Gravity::SouthEast;
        let spliced = splice(&raster, &Rectangle::new(0, 0, 2, 2)).unwrap();
        // Band lands at (2, 2) after the gravity adjustment
        assert_eq!(spliced.get(0, 0).unwrap(), raster.get(0, 0).unwrap());
        assert_eq!(spliced.get(2, 0).unwrap().red, QUANTUM_RANGE);
        assert_eq!(spliced.get(1, 1).unwrap(), raster.get(1, 1).unwrap());
    }

    #[test]
    fn test_chop_removes_cross() {
        let raster = gradient(6, 6);
        let chopped = chop(&raster, &Rectangle::new(2, 2, 2, 2)).unwrap();
        assert_eq!((chopped.columns(), chopped.rows()), (4, 4));
        assert_eq!(chopped.get(0, 0).unwrap(), raster.get(0, 0).unwrap());
        assert_eq!(chopped.get(1, 1).unwrap(), raster.get(1, 1).unwrap());
        assert_eq!(chopped.get(2, 2).unwrap(), raster.get(4, 4).unwrap());
        assert_eq!(chopped.get(3, 3).unwrap(), raster.get(5, 5).unwrap());
    }

    #[test]
    fn test_chop_clamps_negative_offset() {
        let raster = gradient(6, 6);
        let chopped = chop(&raster, &Rectangle::new(-2, 0, 4, 2)).unwrap();
        assert_eq!((chopped.columns(), chopped.rows()), (4, 4));
        // The band clips to columns [0, 2) and rows [0, 2)
        assert_eq!(chopped.get(0, 0).unwrap(), raster.get(2, 2).unwrap());
        assert_eq!(chopped.get(1, 1).unwrap(), raster.get(3, 3).unwrap());
    }

    #[test]
    fn test_chop_band_ending_at_zero_is_empty() {
        // A band that ends exactly at the left edge clamps to zero
        // width: nothing is removed horizontally
        let raster = gradient(6, 6);
        let chopped = chop(&raster, &Rectangle::new(-2, 0, 2, 2)).unwrap();
        assert_eq!((chopped.columns(), chopped.rows()), (6, 4));
        assert_eq!(chopped.get(0, 0).unwrap(), raster.get(0, 2).unwrap());
    }

    #[test]
    fn test_chop_rejects_disjoint_geometry() {
        let raster = gradient(6, 6);
        assert!(matches!(
            chop(&raster, &Rectangle::new(10, 0, 2, 2)),
            Err(TransformError::GeometryDoesNotContainImage(_))
        ));
        assert!(matches!(
            chop(&raster, &Rectangle::new(0, 0, 6, 2)),
            Err(TransformError::GeometryDoesNotContainImage(_))
        ));
    }

    #[test]
    fn test_consolidate_cmyk_inverts_planes() {
        let mut planes = Vec::new();
        for value in [0.0, QUANTUM_RANGE, QUANTUM_RANGE / 2.0, 0.0] {
            let mut plane = Raster::new(2, 2).unwrap();
            for y in 0..2 {
                for x in 0..2 {
                    plane.put(x, y, Pixel::gray(value)).unwrap();
                }
            }
            planes.push(plane);
        }
        let consolidated = consolidate_cmyk(&planes).unwrap();
        assert_eq!(consolidated.len(), 1);
        let raster = &consolidated[0];
        assert!(raster.channels.black);
        let pixel = raster.get(0, 0).unwrap();
        assert!((pixel.red - QUANTUM_RANGE).abs() < 1e-6);
        assert!(pixel.green.abs() < 1e-6);
        assert!((pixel.blue - QUANTUM_RANGE / 2.0).abs() < 1e-6);
        assert!((pixel.black - QUANTUM_RANGE).abs() < 1e-6);
    }

    #[test]
    fn test_consolidate_cmyk_requires_complete_groups() {
        let planes = vec![Raster::new(2, 2).unwrap(); 3];
        assert!(matches!(
            consolidate_cmyk(&planes),
            Err(TransformError::SequenceRequired {
                expected: 4,
                actual: 3
            })
        ));
    }
}
