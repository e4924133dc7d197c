//! Shear transformations
//!
//! One-dimensional area-weighted shear passes and the three-shear
//! rotation built from them, after Paeth's "A Fast Algorithm for General
//! Raster Rotation". A shear slides each scanline by a displacement
//! proportional to its distance from the midline; the fractional part of
//! the displacement is realized by blending neighboring pixels, so edges
//! stay antialiased. Vacated cells fill with the background color.

use rayon::prelude::*;

use pictor_core::{Pixel, Raster};

use crate::crop::crop;
use crate::error::{TransformError, TransformResult};
use crate::progress::Progress;
use crate::rotate::integral_rotate;

/// Shear one line of pixels in place.
///
/// `line[offset..offset + extent]` holds the content being sheared;
/// `limit` is the line length. A positive displacement moves content
/// toward higher indices. The carried pixel from the previous cell is
/// blended with each source pixel by the fractional coverage `area`, so
/// a sub-pixel displacement spreads each source across two cells.
fn shear_line(
    line: &mut [Pixel],
    displacement: f64,
    extent: usize,
    offset: usize,
    limit: usize,
    background: Pixel,
) {
    if displacement == 0.0 {
        return;
    }
    let forward = displacement > 0.0;
    let displacement = displacement.abs();
    let mut step = displacement.floor() as usize;
    let area = displacement - step as f64;
    step += 1;
    let mut pixel = background;
    if !forward {
        // Transfer toward lower indices.
        if step > offset {
            return;
        }
        let mut p = offset;
        let mut q = offset - step;
        for _ in 0..extent {
            let source = line[p];
            line[q] = Pixel::area_blend(&pixel, pixel.alpha, &source, source.alpha, area);
            pixel = source;
            p += 1;
            q += 1;
        }
        line[q] = Pixel::area_blend(&pixel, pixel.alpha, &background, background.alpha, area);
        q += 1;
        for _ in 0..step - 1 {
            line[q] = background;
            q += 1;
        }
    } else {
        // Transfer toward higher indices.
        let mut p = offset + extent;
        let mut q = p + step;
        for i in 0..extent {
            p -= 1;
            q -= 1;
            if offset + extent + step - i > limit {
                continue;
            }
            let source = line[p];
            line[q] = Pixel::area_blend(&pixel, pixel.alpha, &source, source.alpha, area);
            pixel = source;
        }
        q -= 1;
        line[q] = Pixel::area_blend(&pixel, pixel.alpha, &background, background.alpha, area);
        for _ in 0..step - 1 {
            q -= 1;
            line[q] = background;
        }
    }
}

/// Shear a horizontal band of the raster in place along the X axis.
///
/// `width` x `height` at (`x_offset`, `y_offset`) is the content region;
/// each of its rows shifts by `tangent` times the row's signed distance
/// from the band midline.
pub fn x_shear(
    raster: &mut Raster,
    tangent: f64,
    width: usize,
    height: usize,
    x_offset: usize,
    y_offset: usize,
) -> TransformResult<()> {
    let columns = raster.columns();
    let background = raster.background;
    let progress = Progress::new(raster, "x-shear", height as u64);
    let band = &mut raster.pixels_mut()[y_offset * columns..(y_offset + height) * columns];
    band.par_chunks_mut(columns)
        .enumerate()
        .for_each(|(y, row)| {
            if progress.is_aborted() {
                return;
            }
            let displacement = tangent * (y as f64 - height as f64 / 2.0);
            shear_line(row, displacement, width, x_offset, columns, background);
            progress.step();
        });
    progress.finish()
}

/// Shear a vertical band of the raster in place along the Y axis.
///
/// The counterpart of [`x_shear`] for columns: each column of the
/// `width` x `height` region at (`x_offset`, `y_offset`) shifts
/// vertically by `tangent` times its signed distance from the band
/// midline.
pub fn y_shear(
    raster: &mut Raster,
    tangent: f64,
    width: usize,
    height: usize,
    x_offset: usize,
    y_offset: usize,
) -> TransformResult<()> {
    let rows = raster.rows();
    let background = raster.background;
    let progress = Progress::new(raster, "y-shear", width as u64);
    // Columns are strided, so each sheared column is rebuilt in a local
    // buffer and written back once all columns are done.
    let sheared: Vec<(usize, Vec<Pixel>)> = (0..width)
        .into_par_iter()
        .filter_map(|x| {
            if progress.is_aborted() {
                return None;
            }
            let displacement = tangent * (x as f64 - width as f64 / 2.0);
            progress.step();
            if displacement == 0.0 {
                return None;
            }
            let column = x_offset + x;
            let mut line: Vec<Pixel> = (0..rows).map(|y| raster.row(y)[column]).collect();
            shear_line(&mut line, displacement, height, y_offset, rows, background);
            Some((column, line))
        })
        .collect();
    progress.finish()?;
    for (column, line) in sheared {
        for (y, pixel) in line.into_iter().enumerate() {
            raster.row_mut(y)[column] = pixel;
        }
    }
    Ok(())
}

/// Surround the raster with a background-colored border.
fn pad_with_border(raster: &Raster, border_width: usize, border_height: usize) -> Raster {
    let columns = raster.columns() + 2 * border_width;
    let rows = raster.rows() + 2 * border_height;
    let mut padded = raster
        .clone_sized(columns, rows)
        .unwrap_or_else(|_| unreachable!("padded extent exceeds the source extent"));
    padded.set_background_pixels();
    for y in 0..raster.rows() {
        let dest = &mut padded.row_mut(border_height + y)
            [border_width..border_width + raster.columns()];
        dest.copy_from_slice(raster.row(y));
    }
    padded
}

/// Crop a sheared workspace down to the extent the sheared content
/// actually occupies, preserving the original page rectangle.
fn crop_to_fit(
    raster: Raster,
    x_shear: f64,
    y_shear: f64,
    width: usize,
    height: usize,
    rotate: bool,
) -> TransformResult<Raster> {
    let geometry = pictor_core::shear_bounds(
        width,
        height,
        x_shear,
        y_shear,
        rotate,
        raster.columns(),
        raster.rows(),
    );
    let page = raster.page;
    let mut workspace = raster;
    workspace.page = pictor_core::Rectangle::default();
    let mut cropped = crop(&workspace, &geometry)?;
    cropped.page = page;
    Ok(cropped)
}

/// Shear a raster along both axes.
///
/// `x_degrees` is measured against the Y axis and `y_degrees` against
/// the X axis; either may be zero. The result is enlarged to hold the
/// parallelogram, with vacated corners filled by the background color.
/// Angles at nonzero multiples of 90 degrees have no finite tangent and
/// are rejected.
pub fn shear(raster: &Raster, x_degrees: f64, y_degrees: f64) -> TransformResult<Raster> {
    if x_degrees != 0.0 && x_degrees % 90.0 == 0.0 {
        return Err(TransformError::AngleIsDiscontinuous(x_degrees));
    }
    if y_degrees != 0.0 && y_degrees % 90.0 == 0.0 {
        return Err(TransformError::AngleIsDiscontinuous(y_degrees));
    }
    let shear_x = -(x_degrees % 360.0).to_radians().tan();
    let shear_y = (y_degrees % 360.0).to_radians().tan();
    if shear_x == 0.0 && shear_y == 0.0 {
        return Ok(raster.clone());
    }
    let columns = raster.columns();
    let rows = raster.rows();
    let bounds_width = columns + (shear_x.abs() * rows as f64 + 0.5).floor() as usize;
    let border_width = (columns as f64 + (shear_x.abs() * rows as f64 - columns as f64) / 2.0
        - 0.5)
        .ceil() as usize;
    let border_height = (rows as f64 + (shear_y.abs() * bounds_width as f64 - rows as f64) / 2.0
        - 0.5)
        .ceil() as usize;
    let had_alpha = raster.channels.alpha;
    let mut workspace = pad_with_border(raster, border_width, border_height);
    workspace.channels.alpha = true;
    let x_band_top = (workspace.rows() - rows) / 2;
    let y_band_left = (workspace.columns() - bounds_width) / 2;
    x_shear(&mut workspace, shear_x, columns, rows, border_width, x_band_top)?;
    y_shear(
        &mut workspace,
        shear_y,
        bounds_width,
        rows,
        y_band_left,
        border_height,
    )?;
    let mut sheared = crop_to_fit(workspace, shear_x, shear_y, columns, rows, false)?;
    sheared.channels.alpha = had_alpha;
    sheared.page.width = 0;
    sheared.page.height = 0;
    Ok(sheared)
}

/// Rotate a raster by an arbitrary angle with three shear passes.
///
/// Positive angles rotate counter-clockwise. The angle is reduced to
/// (-45, 45] degrees plus quarter turns; the quarter turns run through
/// [`integral_rotate`] and the residual angle through an X-Y-X shear
/// triple. The result is usually larger than the source, with the empty
/// corner triangles filled by the background color.
pub fn shear_rotate(raster: &Raster, degrees: f64) -> TransformResult<Raster> {
    let mut angle = degrees % 360.0;
    if angle < -45.0 {
        angle += 360.0;
    }
    let mut rotations: usize = 0;
    while angle > 45.0 {
        angle -= 90.0;
        rotations += 1;
    }
    rotations %= 4;
    let integral = integral_rotate(raster, rotations)?;
    let shear_x = -(angle.to_radians() / 2.0).tan();
    let shear_y = angle.to_radians().sin();
    if shear_x == 0.0 && shear_y == 0.0 {
        return Ok(integral);
    }
    let width = integral.columns();
    let height = integral.rows();
    let bounds_width = ((height as f64 * shear_x).abs() + width as f64 + 0.5).floor() as usize;
    let bounds_height =
        ((bounds_width as f64 * shear_y).abs() + height as f64 + 0.5).floor() as usize;
    let shear_width =
        ((bounds_height as f64 * shear_x).abs() + bounds_width as f64 + 0.5).floor() as usize;
    let border_width = if shear_width > bounds_width {
        (width as f64 / 2.0 + 0.5).floor() as usize
    } else {
        ((bounds_width as f64 - shear_width as f64 + 2.0) / 2.0 + 0.5).floor() as usize
    };
    let border_height = ((bounds_height as f64 - height as f64 + 2.0) / 2.0 + 0.5).floor() as usize;
    let had_alpha = raster.channels.alpha;
    let mut workspace = pad_with_border(&integral, border_width, border_height);
    workspace.channels.alpha = true;
    let first_band_top = (workspace.rows() - height) / 2;
    let band_left = (workspace.columns() - bounds_width) / 2;
    let final_band_top = (workspace.rows() - bounds_height) / 2;
    x_shear(&mut workspace, shear_x, width, height, border_width, first_band_top)?;
    y_shear(
        &mut workspace,
        shear_y,
        bounds_width,
        height,
        band_left,
        border_height,
    )?;
    x_shear(
        &mut workspace,
        shear_x,
        bounds_width,
        bounds_height,
        band_left,
        final_band_top,
    )?;
    let mut rotated = crop_to_fit(workspace, shear_x, shear_y, width, height, true)?;
    rotated.channels.alpha = had_alpha;
    rotated.page.width = 0;
    rotated.page.height = 0;
    Ok(rotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pictor_core::{OPAQUE_ALPHA, QUANTUM_RANGE};

    fn checkered(columns: usize, rows: usize) -> Raster {
        let mut raster = Raster::new(columns, rows).unwrap();
        for y in 0..rows {
            for x in 0..columns {
                let value = if (x + y) % 2 == 0 { QUANTUM_RANGE } else { 0.0 };
                raster.put(x, y, Pixel::gray(value)).unwrap();
            }
        }
        raster
    }

    #[test]
    fn test_shear_rejects_discontinuous_angles() {
        let raster = checkered(4, 4);
        assert!(matches!(
            shear(&raster, 90.0, 0.0),
            Err(TransformError::AngleIsDiscontinuous(_))
        ));
        assert!(matches!(
            shear(&raster, 0.0, 270.0),
            Err(TransformError::AngleIsDiscontinuous(_))
        ));
        assert!(matches!(
            shear(&raster, -180.0, 0.0),
            Err(TransformError::AngleIsDiscontinuous(_))
        ));
    }

    #[test]
    fn test_zero_shear_is_identity() {
        let raster = checkered(5, 3);
        let sheared = shear(&raster, 0.0, 0.0).unwrap();
        assert_eq!(sheared.columns(), 5);
        assert_eq!(sheared.rows(), 3);
        for y in 0..3 {
            assert_eq!(sheared.row(y), raster.row(y));
        }
    }

    #[test]
    fn test_shear_line_integral_shift() {
        let background = Pixel::gray(0.0);
        let mut line = vec![background; 8];
        line[2] = Pixel::gray(QUANTUM_RANGE);
        line[3] = Pixel::gray(QUANTUM_RANGE);
        // Integral displacement: area is zero, pure shift by one cell
        shear_line(&mut line, 1.0, 4, 2, 8, background);
        assert_eq!(line[3].red, QUANTUM_RANGE);
        assert_eq!(line[4].red, QUANTUM_RANGE);
        assert_eq!(line[2].red, 0.0);
    }

    #[test]
    fn test_shear_line_negative_shift() {
        let background = Pixel::gray(0.0);
        let mut line = vec![background; 8];
        line[3] = Pixel::gray(QUANTUM_RANGE);
        shear_line(&mut line, -1.0, 4, 2, 8, background);
        assert_eq!(line[2].red, QUANTUM_RANGE);
        assert_eq!(line[3].red, 0.0);
    }

    #[test]
    fn test_shear_line_fractional_blend() {
        let background = Pixel::rgba(0.0, 0.0, 0.0, OPAQUE_ALPHA);
        let mut line = vec![background; 10];
        line[4] = Pixel::gray(QUANTUM_RANGE);
        shear_line(&mut line, 1.5, 2, 4, 10, background);
        // Half the source lands in each of two destination cells
        assert!((line[5].red - QUANTUM_RANGE / 2.0).abs() < 1.0);
        assert!((line[6].red - QUANTUM_RANGE / 2.0).abs() < 1.0);
    }

    #[test]
    fn test_x_shear_midline_row_is_fixed() {
        let mut raster = checkered(6, 5);
        raster.background = Pixel::gray(0.0);
        let midline = raster.row(2).to_vec();
        let outside = raster.row(4).to_vec();
        // Band of height 4: row 2 sits on the midline, row 4 is outside
        x_shear(&mut raster, 0.5, 6, 4, 0, 0).unwrap();
        assert_eq!(raster.row(2), midline.as_slice());
        assert_eq!(raster.row(4), outside.as_slice());
    }

    #[test]
    fn test_shear_enlarges_canvas() {
        let raster = checkered(10, 10);
        let sheared = shear(&raster, 30.0, 0.0).unwrap();
        assert!(sheared.columns() > 10);
        assert_eq!(sheared.page.width, 0);
        assert_eq!(sheared.page.height, 0);
    }

    #[test]
    fn test_shear_rotate_quarter_turn_is_integral() {
        let raster = checkered(7, 4);
        let rotated = shear_rotate(&raster, 90.0).unwrap();
        let integral = integral_rotate(&raster, 1).unwrap();
        assert_eq!(rotated.columns(), integral.columns());
        assert_eq!(rotated.rows(), integral.rows());
        for y in 0..rotated.rows() {
            assert_eq!(rotated.row(y), integral.row(y));
        }
    }

    #[test]
    fn test_shear_rotate_small_angle_grows() {
        let raster = checkered(16, 8);
        let rotated = shear_rotate(&raster, 10.0).unwrap();
        assert!(rotated.columns() >= 16);
        assert!(rotated.rows() >= 8);
    }

    #[test]
    fn test_shear_rotate_negative_angle() {
        let raster = checkered(8, 8);
        let rotated = shear_rotate(&raster, -30.0).unwrap();
        assert!(rotated.columns() > 8);
        assert!(rotated.rows() > 8);
    }
}
