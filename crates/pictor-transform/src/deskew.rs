//! Skew detection and correction
//!
//! The skew angle of scanned text is recovered with a discrete Radon
//! transform: foreground pixels are packed eight to a cell as popcounts,
//! a recursive-doubling pass accumulates the counts along every candidate
//! shear, and the shear whose column profile has the most energy in its
//! vertical derivative wins. Correction is a rotation by the negated
//! angle around the shear engine.

use rayon::prelude::*;

use pictor_core::{
    Matrix, Pixel, QUANTUM_RANGE, QUANTUM_SCALE, Raster, VirtualPolicy, clamp_to_quantum,
};

use crate::crop::crop;
use crate::error::TransformResult;
use crate::shear::shear_rotate;

fn radon_width(columns: usize) -> usize {
    let mut width = 1;
    while width < (columns + 7) / 8 {
        width <<= 1;
    }
    width
}

/// Pack each scanline into popcount cells: one cell per 8 pixels, the
/// cell value counting the foreground pixels among them. A pixel is
/// foreground when any of its color channels falls below `threshold`.
/// The reversed layout stores cells right to left, which mirrors the
/// raster so both shear signs share one projection routine.
fn pack_bit_density(raster: &Raster, threshold: f64, matrix: &mut Matrix<u16>, reversed: bool) {
    let columns = raster.columns();
    let width = matrix.columns();
    let cells = (columns + 7) / 8;
    matrix
        .as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let source = raster.row(y);
            let mut index = if reversed { cells } else { 0 };
            let mut store = |row: &mut [u16], byte: u8| {
                if reversed {
                    index -= 1;
                    row[index] = byte.count_ones() as u16;
                } else {
                    row[index] = byte.count_ones() as u16;
                    index += 1;
                }
            };
            let mut bit = 0;
            let mut byte = 0u8;
            for pixel in source {
                byte <<= 1;
                if pixel.red < threshold || pixel.green < threshold || pixel.blue < threshold {
                    byte |= 0x01;
                }
                bit += 1;
                if bit == 8 {
                    store(row, byte);
                    bit = 0;
                    byte = 0;
                }
            }
            if bit != 0 {
                byte <<= 8 - bit;
                store(row, byte);
            }
        });
}

/// Accumulate the packed counts along every dyadic shear and fold each
/// final column's sum of squared vertical differences into `projection`.
fn radon_projection(
    source: &mut Matrix<u16>,
    destination: &mut Matrix<u16>,
    sign: i64,
    projection: &mut [u64],
) {
    let columns = source.columns();
    let rows = source.rows();
    let mut p = source;
    let mut q = destination;
    let mut step = 1;
    while step < columns {
        let mut x = 0;
        while x < columns {
            for i in 0..step {
                let near = rows.saturating_sub(i + 1);
                let far = rows.saturating_sub(i);
                for y in 0..near {
                    let element = p.row(y)[x + i];
                    let neighbor = p.row(y + i)[x + i + step];
                    q.row_mut(y)[x + 2 * i] = element.wrapping_add(neighbor);
                    let neighbor = p.row(y + i + 1)[x + i + step];
                    q.row_mut(y)[x + 2 * i + 1] = element.wrapping_add(neighbor);
                }
                for y in near..far {
                    let element = p.row(y)[x + i];
                    let neighbor = p.row(y + i)[x + i + step];
                    q.row_mut(y)[x + 2 * i] = element.wrapping_add(neighbor);
                    q.row_mut(y)[x + 2 * i + 1] = element;
                }
                for y in far..rows {
                    let element = p.row(y)[x + i];
                    q.row_mut(y)[x + 2 * i] = element;
                    q.row_mut(y)[x + 2 * i + 1] = element;
                }
            }
            x += 2 * step;
        }
        std::mem::swap(&mut p, &mut q);
        step *= 2;
    }
    for x in 0..columns {
        let mut sum = 0u64;
        for y in 0..rows.saturating_sub(1) {
            let delta = p.row(y)[x] as i64 - p.row(y + 1)[x] as i64;
            sum += (delta * delta) as u64;
        }
        projection[(columns as i64 + sign * x as i64 - 1) as usize] = sum;
    }
}

/// Radon projection profile of the raster's foreground.
///
/// The result has `2 * width - 1` bins, `width` being the smallest power
/// of two that holds a packed scanline; bin `width - 1 + s` holds the
/// derivative energy at shear `s` in the range `[-(width-1), width-1]`.
pub fn radon_transform(raster: &Raster, threshold: f64) -> TransformResult<Vec<u64>> {
    let width = radon_width(raster.columns());
    let rows = raster.rows();
    let mut source = Matrix::<u16>::new(width, rows)?;
    let mut destination = Matrix::<u16>::new(width, rows)?;
    let mut projection = vec![0u64; 2 * width - 1];
    pack_bit_density(raster, threshold, &mut source, true);
    radon_projection(&mut source, &mut destination, -1, &mut projection);
    source.fill(0);
    pack_bit_density(raster, threshold, &mut source, false);
    radon_projection(&mut source, &mut destination, 1, &mut projection);
    Ok(projection)
}

/// Average the four `offset` x `offset` corner blocks into the raster's
/// background color. Corners are the most likely pure-background sample
/// on a scanned page.
fn estimate_border_background(raster: &mut Raster, offset: i64) {
    if offset <= 0 {
        return;
    }
    let columns = raster.columns() as i64;
    let rows = raster.rows() as i64;
    let mut sum = (0.0, 0.0, 0.0, 0.0);
    let mut count = 0.0;
    for y in 0..rows {
        if y >= offset && y < rows - offset {
            continue;
        }
        for (x, pixel) in raster.row(y as usize).iter().enumerate() {
            if (x as i64) >= offset && (x as i64) < columns - offset {
                continue;
            }
            sum.0 += QUANTUM_SCALE * pixel.red;
            sum.1 += QUANTUM_SCALE * pixel.green;
            sum.2 += QUANTUM_SCALE * pixel.blue;
            sum.3 += QUANTUM_SCALE * pixel.alpha;
            count += 1.0;
        }
    }
    if count == 0.0 {
        return;
    }
    raster.background.red = clamp_to_quantum(QUANTUM_RANGE * sum.0 / count);
    raster.background.green = clamp_to_quantum(QUANTUM_RANGE * sum.1 / count);
    raster.background.blue = clamp_to_quantum(QUANTUM_RANGE * sum.2 / count);
    if raster.channels.alpha {
        raster.background.alpha = clamp_to_quantum(QUANTUM_RANGE * sum.3 / count);
    }
}

fn median9(mut values: [f64; 9]) -> f64 {
    values.sort_by(f64::total_cmp);
    values[4]
}

/// 3x3 median filter over every channel, reading borders through the
/// virtual pixel policy. Knocks out the speckle that would otherwise
/// fool the auto-crop bounding box.
fn median_smooth(raster: &Raster) -> TransformResult<Raster> {
    let columns = raster.columns();
    let mut smoothed = raster.clone_sized(columns, raster.rows())?;
    smoothed
        .pixels_mut()
        .par_chunks_mut(columns)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.iter_mut().enumerate() {
                let mut reds = [0.0; 9];
                let mut greens = [0.0; 9];
                let mut blues = [0.0; 9];
                let mut alphas = [0.0; 9];
                let mut blacks = [0.0; 9];
                let mut i = 0;
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let neighbor = raster.virtual_pixel(x as i64 + dx, y as i64 + dy);
                        reds[i] = neighbor.red;
                        greens[i] = neighbor.green;
                        blues[i] = neighbor.blue;
                        alphas[i] = neighbor.alpha;
                        blacks[i] = neighbor.black;
                        i += 1;
                    }
                }
                *pixel = Pixel {
                    red: median9(reds),
                    green: median9(greens),
                    blue: median9(blues),
                    alpha: median9(alphas),
                    black: median9(blacks),
                };
            }
        });
    Ok(smoothed)
}

/// Straighten a skewed raster.
///
/// The Radon argmax gives the text-line shear; its negated arctangent is
/// the correction angle, recorded in the `deskew:angle` artifact of the
/// result. Vacated regions fill with the background color. With the
/// `deskew:auto-crop` artifact set to a truthy value, the rotated result
/// is cropped back to its content bounding box after a median smoothing
/// pass; the value `1` doubles as a corner-sample offset for
/// re-estimating the background color first.
pub fn deskew(raster: &Raster, threshold: f64) -> TransformResult<Raster> {
    let projection = radon_transform(raster, threshold)?;
    let width = (projection.len() + 1) / 2;
    let mut max_projection = 0u64;
    let mut skew = 0i64;
    for (i, &value) in projection.iter().enumerate() {
        if value > max_projection {
            skew = i as i64 - width as i64 + 1;
            max_projection = value;
        }
    }
    let degrees = (-(skew as f64 / width as f64 / 8.0)).atan().to_degrees();
    log::debug!("deskew angle: {degrees:.6}");
    let mut skewed = raster.clone();
    skewed.set_artifact("deskew:angle", &format!("{degrees}"));
    skewed.virtual_policy = VirtualPolicy::Background;
    let artifact = skewed.artifact("deskew:auto-crop");
    let auto_crop = artifact.is_some_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "true" | "on" | "yes" | "1"
        )
    });
    if !auto_crop {
        return shear_rotate(&skewed, degrees);
    }
    let offset = artifact.and_then(|value| value.parse::<i64>().ok()).unwrap_or(0);
    estimate_border_background(&mut skewed, offset);
    let rotated = shear_rotate(&skewed, degrees)?;
    let smoothed = median_smooth(&rotated)?;
    let geometry = smoothed.bounding_box();
    log::debug!(
        "deskew crop: {}x{}{:+}{:+}",
        geometry.width,
        geometry.height,
        geometry.x,
        geometry.y
    );
    crop(&rotated, &geometry)
}
