//! Quarter-turn rotations, mirrors, and orientation correction
//!
//! These operations permute pixels without resampling, so they are exact
//! and self-inverse in the expected combinations. Each also adjusts the
//! virtual-canvas page so a rotated tile stays anchored to the same
//! content on its larger canvas.

use rayon::prelude::*;

use pictor_core::{Orientation, Raster};

use crate::error::TransformResult;
use crate::progress::Progress;

/// Rotate a raster by `rotations` quarter turns counter-clockwise
/// measured in screen coordinates, which reads as clockwise on a
/// y-down raster.
pub fn integral_rotate(raster: &Raster, rotations: usize) -> TransformResult<Raster> {
    let columns = raster.columns();
    let rows = raster.rows();
    let rotations = rotations % 4;
    let (dest_columns, dest_rows) = match rotations {
        1 | 3 => (rows, columns),
        _ => (columns, rows),
    };
    let mut rotated = raster.clone_sized(dest_columns, dest_rows)?;
    match rotations {
        0 => {
            rotated.pixels_mut().copy_from_slice(raster.pixels());
        }
        1 => {
            let progress = Progress::new(raster, "rotate", dest_rows as u64);
            rotated
                .pixels_mut()
                .par_chunks_mut(dest_columns)
                .enumerate()
                .for_each(|(y, row)| {
                    if progress.is_aborted() {
                        return;
                    }
                    for (x, pixel) in row.iter_mut().enumerate() {
                        *pixel = raster.row(rows - 1 - x)[y];
                    }
                    progress.step();
                });
            progress.finish()?;
            let page = raster.page;
            rotated.page.width = page.height;
            rotated.page.height = page.width;
            rotated.page.x = page.y;
            rotated.page.y = page.x;
            if rotated.page.width != 0 {
                rotated.page.x = rotated.page.width as i64 - dest_columns as i64 - page.y;
            }
        }
        2 => {
            let progress = Progress::new(raster, "rotate", dest_rows as u64);
            rotated
                .pixels_mut()
                .par_chunks_mut(dest_columns)
                .enumerate()
                .for_each(|(y, row)| {
                    if progress.is_aborted() {
                        return;
                    }
                    let source = raster.row(rows - 1 - y);
                    for (x, pixel) in row.iter_mut().enumerate() {
                        *pixel = source[columns - 1 - x];
                    }
                    progress.step();
                });
            progress.finish()?;
            let page = raster.page;
            if page.width != 0 {
                rotated.page.x = page.width as i64 - dest_columns as i64 - page.x;
            }
            if page.height != 0 {
                rotated.page.y = page.height as i64 - dest_rows as i64 - page.y;
            }
        }
        3 => {
            let progress = Progress::new(raster, "rotate", dest_rows as u64);
            rotated
                .pixels_mut()
                .par_chunks_mut(dest_columns)
                .enumerate()
                .for_each(|(y, row)| {
                    if progress.is_aborted() {
                        return;
                    }
                    for (x, pixel) in row.iter_mut().enumerate() {
                        *pixel = raster.row(x)[columns - 1 - y];
                    }
                    progress.step();
                });
            progress.finish()?;
            let page = raster.page;
            rotated.page.width = page.height;
            rotated.page.height = page.width;
            rotated.page.x = page.y;
            rotated.page.y = page.x;
            if rotated.page.height != 0 {
                rotated.page.y = rotated.page.height as i64 - dest_rows as i64 - page.x;
            }
        }
        _ => unreachable!(),
    }
    Ok(rotated)
}

/// Reflect a raster around the horizontal midline.
pub fn flip(raster: &Raster) -> TransformResult<Raster> {
    let columns = raster.columns();
    let rows = raster.rows();
    let mut flipped = raster.clone_sized(columns, rows)?;
    let progress = Progress::new(raster, "flip", rows as u64);
    flipped
        .pixels_mut()
        .par_chunks_mut(columns)
        .enumerate()
        .for_each(|(y, row)| {
            if progress.is_aborted() {
                return;
            }
            row.copy_from_slice(raster.row(rows - 1 - y));
            progress.step();
        });
    progress.finish()?;
    if flipped.page.height != 0 {
        flipped.page.y = flipped.page.height as i64 - rows as i64 - flipped.page.y;
    }
    Ok(flipped)
}

/// Reflect a raster around the vertical midline.
pub fn flop(raster: &Raster) -> TransformResult<Raster> {
    let columns = raster.columns();
    let rows = raster.rows();
    let mut flopped = raster.clone_sized(columns, rows)?;
    let progress = Progress::new(raster, "flop", rows as u64);
    flopped
        .pixels_mut()
        .par_chunks_mut(columns)
        .enumerate()
        .for_each(|(y, row)| {
            if progress.is_aborted() {
                return;
            }
            let source = raster.row(y);
            for (x, pixel) in row.iter_mut().enumerate() {
                *pixel = source[columns - 1 - x];
            }
            progress.step();
        });
    progress.finish()?;
    if flopped.page.width != 0 {
        flopped.page.x = flopped.page.width as i64 - columns as i64 - flopped.page.x;
    }
    Ok(flopped)
}

/// Reflect a raster around the top-left to bottom-right diagonal.
pub fn transpose(raster: &Raster) -> TransformResult<Raster> {
    let rows = raster.rows();
    let columns = raster.columns();
    let mut transposed = raster.clone_sized(rows, columns)?;
    let progress = Progress::new(raster, "transpose", columns as u64);
    transposed
        .pixels_mut()
        .par_chunks_mut(rows)
        .enumerate()
        .for_each(|(y, row)| {
            if progress.is_aborted() {
                return;
            }
            for (x, pixel) in row.iter_mut().enumerate() {
                *pixel = raster.row(x)[y];
            }
            progress.step();
        });
    progress.finish()?;
    let page = raster.page;
    transposed.page.width = page.height;
    transposed.page.height = page.width;
    transposed.page.x = page.y;
    transposed.page.y = page.x;
    Ok(transposed)
}

/// Reflect a raster around the bottom-left to top-right diagonal.
pub fn transverse(raster: &Raster) -> TransformResult<Raster> {
    let rows = raster.rows();
    let columns = raster.columns();
    let mut transversed = raster.clone_sized(rows, columns)?;
    let progress = Progress::new(raster, "transverse", columns as u64);
    transversed
        .pixels_mut()
        .par_chunks_mut(rows)
        .enumerate()
        .for_each(|(y, row)| {
            if progress.is_aborted() {
                return;
            }
            for (x, pixel) in row.iter_mut().enumerate() {
                *pixel = raster.row(rows - 1 - x)[columns - 1 - y];
            }
            progress.step();
        });
    progress.finish()?;
    let page = raster.page;
    transversed.page.width = page.height;
    transversed.page.height = page.width;
    transversed.page.x = page.y;
    transversed.page.y = page.x;
    if transversed.page.width != 0 {
        transversed.page.x = transversed.page.width as i64 - rows as i64 - page.y;
    }
    if transversed.page.height != 0 {
        transversed.page.y = transversed.page.height as i64 - columns as i64 - page.x;
    }
    Ok(transversed)
}

/// Rework a raster so its pixels are stored in the order the
/// orientation tag says they should be viewed, then reset the tag.
pub fn auto_orient(raster: &Raster) -> TransformResult<Raster> {
    let mut oriented = match raster.orientation {
        Orientation::TopRight => flop(raster)?,
        Orientation::BottomRight => integral_rotate(raster, 2)?,
        Orientation::BottomLeft => flip(raster)?,
        Orientation::LeftTop => transpose(raster)?,
        Orientation::RightTop => integral_rotate(raster, 1)?,
        Orientation::RightBottom => transverse(raster)?,
        Orientation::LeftBottom => integral_rotate(raster, 3)?,
        Orientation::Undefined | Orientation::TopLeft => raster.clone(),
    };
    oriented.orientation = Orientation::TopLeft;
    Ok(oriented)
}
