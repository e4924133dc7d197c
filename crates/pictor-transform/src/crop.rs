//! Region extraction
//!
//! Cropping works in virtual-canvas coordinates: a raster's pixel array
//! may sit anywhere on a larger page, and crop requests are expressed
//! against that page. A request that misses the canvas entirely yields
//! the 1x1 transparent sentinel rather than an error, so multi-frame
//! pipelines keep their frame count.

use rayon::prelude::*;

use pictor_core::{
    CanvasClip, Gravity, Raster, Rectangle, clip_to_canvas, gravity_adjust, parse_page_geometry,
};

use crate::error::{TransformError, TransformResult};
use crate::progress::Progress;

/// Extract a region of the raster.
///
/// `geometry` is in virtual-canvas coordinates. The request is clipped
/// against both the canvas and the stored pixels; the result keeps its
/// position on the page. A fully disjoint request returns the sentinel
/// raster, a request that clips to nothing is an error.
pub fn crop(raster: &Raster, geometry: &Rectangle) -> TransformResult<Raster> {
    let canvas = raster.canvas();
    let clip = clip_to_canvas(geometry, &canvas, raster.columns(), raster.rows());
    let (source, origin) = match clip {
        CanvasClip::Disjoint => {
            log::warn!(
                "crop {}x{}{:+}{:+} does not intersect the canvas",
                geometry.width,
                geometry.height,
                geometry.x,
                geometry.y
            );
            return Ok(raster.degenerate_sentinel());
        }
        CanvasClip::Empty => {
            return Err(TransformError::GeometryDoesNotContainImage(*geometry));
        }
        CanvasClip::Region { source, origin } => (source, origin),
    };
    let mut cropped = raster.clone_sized(source.width, source.height)?;
    cropped.page.width = raster.page.width;
    cropped.page.height = raster.page.height;
    if origin.0 + canvas.width as i64 > raster.page.width as i64
        || origin.1 + canvas.height as i64 > raster.page.height as i64
    {
        cropped.page.width = canvas.width;
        cropped.page.height = canvas.height;
    }
    cropped.page.x = origin.0;
    cropped.page.y = origin.1;
    let x = source.x as usize;
    let y = source.y as usize;
    let progress = Progress::new(raster, "crop", source.height as u64);
    cropped
        .pixels_mut()
        .par_chunks_mut(source.width)
        .enumerate()
        .for_each(|(row_index, row)| {
            if progress.is_aborted() {
                return;
            }
            row.copy_from_slice(&raster.row(y + row_index)[x..x + source.width]);
            progress.step();
        });
    progress.finish()?;
    Ok(cropped)
}

/// Extract a region by reading through the virtual pixel policy, with no
/// clipping: the region may hang off any edge of the raster.
pub fn excerpt(raster: &Raster, geometry: &Rectangle) -> TransformResult<Raster> {
    let mut excerpted = raster.clone_sized(geometry.width, geometry.height)?;
    let progress = Progress::new(raster, "excerpt", geometry.height as u64);
    excerpted
        .pixels_mut()
        .par_chunks_mut(geometry.width)
        .enumerate()
        .for_each(|(y, row)| {
            if progress.is_aborted() {
                return;
            }
            for (x, pixel) in row.iter_mut().enumerate() {
                *pixel = raster.virtual_pixel(geometry.x + x as i64, geometry.y + y as i64);
            }
            progress.step();
        });
    progress.finish()?;
    Ok(excerpted)
}

/// Place the raster on a background-colored canvas of the given extent.
/// The geometry offset moves the source relative to the new canvas: a
/// negative offset pushes the source right and down.
pub fn extent(raster: &Raster, geometry: &Rectangle) -> TransformResult<Raster> {
    let mut extended = raster.clone_sized(geometry.width, geometry.height)?;
    extended.set_background_pixels();
    let columns = raster.columns() as i64;
    let rows = raster.rows() as i64;
    let progress = Progress::new(raster, "extent", geometry.height as u64);
    extended
        .pixels_mut()
        .par_chunks_mut(geometry.width)
        .enumerate()
        .for_each(|(y, row)| {
            if progress.is_aborted() {
                return;
            }
            let source_y = y as i64 + geometry.y;
            if source_y >= 0 && source_y < rows {
                let start = (-geometry.x).max(0) as usize;
                let end = (columns - geometry.x).min(geometry.width as i64);
                if (start as i64) < end {
                    let source = raster.row(source_y as usize);
                    let source_x = (start as i64 + geometry.x) as usize;
                    let span = end as usize - start;
                    row[start..end as usize]
                        .copy_from_slice(&source[source_x..source_x + span]);
                }
            }
            progress.step();
        });
    progress.finish()?;
    Ok(extended)
}

/// Remove a border of `shave_width` columns and `shave_height` rows from
/// every edge.
pub fn shave(raster: &Raster, shave_width: usize, shave_height: usize) -> TransformResult<Raster> {
    let columns = raster.columns();
    let rows = raster.rows();
    if 2 * shave_width >= columns || 2 * shave_height >= rows {
        return Err(TransformError::GeometryDoesNotContainImage(Rectangle::new(
            shave_width as i64,
            shave_height as i64,
            columns.saturating_sub(2 * shave_width),
            rows.saturating_sub(2 * shave_height),
        )));
    }
    let geometry = Rectangle::new(
        shave_width as i64 + raster.page.x,
        shave_height as i64 + raster.page.y,
        columns - 2 * shave_width,
        rows - 2 * shave_height,
    );
    let mut shaved = crop(raster, &geometry)?;
    shaved.page.width = shaved.page.width.saturating_sub(2 * shave_width);
    shaved.page.height = shaved.page.height.saturating_sub(2 * shave_height);
    shaved.page.x -= shave_width as i64;
    shaved.page.y -= shave_height as i64;
    Ok(shaved)
}

/// Crop away the border that matches the corner pixels within the fuzz
/// tolerance.
///
/// A raster with no distinguishable content collapses to the sentinel.
/// The `trim:minSize` artifact, a geometry string, keeps the result at
/// least that large; when it applies, the raster's gravity anchors the
/// bounding box within the enlarged region.
pub fn trim(raster: &Raster) -> TransformResult<Raster> {
    let bounds = raster.bounding_box();
    if bounds.is_empty() {
        let mut sentinel = raster.degenerate_sentinel();
        sentinel.page.width = raster.page.width;
        sentinel.page.height = raster.page.height;
        return Ok(sentinel);
    }
    let mut geometry = bounds;
    let mut minimum = bounds;
    if let Some(spec) = raster.artifact("trim:minSize") {
        let parsed = parse_page_geometry(spec).map_err(TransformError::Core)?;
        if parsed.flags.width_set {
            minimum.width = parsed.rect.width;
        }
        if parsed.flags.height_set {
            minimum.height = parsed.rect.height;
        }
    }
    if geometry.width < minimum.width && geometry.height < minimum.height {
        let slack_x = minimum.width as i64 - geometry.width as i64;
        let slack_y = minimum.height as i64 - geometry.height as i64;
        match raster.gravity {
            Gravity::Center => {
                geometry.x -= slack_x / 2;
                geometry.y -= slack_y / 2;
            }
            Gravity::NorthWest => {
                geometry.x -= slack_x;
                geometry.y -= slack_y;
            }
            Gravity::North => {
                geometry.x -= slack_x / 2;
                geometry.y -= slack_y;
            }
            Gravity::NorthEast => {
                geometry.y -= slack_y;
            }
            Gravity::East => {
                geometry.y -= slack_y / 2;
            }
            Gravity::South => {
                geometry.x -= slack_x / 2;
            }
            Gravity::SouthWest => {
                geometry.x -= slack_x;
            }
            Gravity::West => {
                geometry.x -= slack_x;
                geometry.y -= slack_y / 2;
            }
            Gravity::SouthEast | Gravity::Undefined => {}
        }
        geometry.width = minimum.width;
        geometry.height = minimum.height;
    }
    geometry.x += raster.page.x;
    geometry.y += raster.page.y;
    crop(raster, &geometry)
}

/// Round to the nearest integer, ties toward the ceiling.
fn pixel_round(x: f64) -> i64 {
    if x - x.floor() < x.ceil() - x {
        x.floor() as i64
    } else {
        x.ceil() as i64
    }
}

/// Crop a raster into tiles described by a geometry specification.
///
/// Three forms are recognized:
///
/// - `NxM@` partitions the raster into an N-column, M-row grid. The
///   offsets shrink the partitioned span, or enlarge it with `!`.
/// - `WxH` cuts fixed-size tiles covering the page, left to right, top
///   to bottom; edge tiles may be smaller.
/// - A geometry with offsets (or with no extent at all) crops a single
///   region; with `!` the result's page is rebased onto the region.
pub fn crop_to_tiles(raster: &Raster, spec: &str) -> TransformResult<Vec<Raster>> {
    let parsed = parse_page_geometry(spec).map_err(TransformError::Core)?;
    let flags = parsed.flags;
    let mut geometry = parsed.rect;
    gravity_adjust(raster.gravity, &mut geometry, raster.columns(), raster.rows());
    if flags.area {
        let mut tiles = Vec::new();
        let mut width = raster.columns() as i64;
        let mut height = raster.rows() as i64;
        if flags.aspect {
            width += geometry.x.abs();
            height += geometry.y.abs();
        } else {
            width -= geometry.x.abs();
            height -= geometry.y.abs();
        }
        let delta_x = (width as f64 / geometry.width.max(1) as f64).max(1.0);
        let delta_y = (height as f64 / geometry.height.max(1) as f64).max(1.0);
        // Each tile edge is pushed outward by the offset on its leading
        // or trailing side, depending on the offset's sign.
        let margins = |offset: i64| {
            if flags.aspect {
                (offset.max(0), if offset < -1 { offset } else { 0 })
            } else {
                (offset.min(0), offset.max(0))
            }
        };
        let (lead_x, trail_x) = margins(geometry.x);
        let (lead_y, trail_y) = margins(geometry.y);
        let mut offset_y = 0.0;
        while offset_y < height as f64 {
            let top = pixel_round(offset_y - lead_y as f64);
            offset_y += delta_y;
            let bottom = pixel_round(offset_y + trail_y as f64);
            let mut offset_x = 0.0;
            while offset_x < width as f64 {
                let left = pixel_round(offset_x - lead_x as f64);
                offset_x += delta_x;
                let right = pixel_round(offset_x + trail_x as f64);
                let tile_geometry = Rectangle::new(
                    left + raster.page.x,
                    top + raster.page.y,
                    (right - left).max(0) as usize,
                    (bottom - top).max(0) as usize,
                );
                if let Ok(tile) = crop(raster, &tile_geometry) {
                    tiles.push(tile);
                }
            }
        }
        return Ok(tiles);
    }
    if (geometry.width == 0 && geometry.height == 0) || flags.x_set || flags.y_set {
        let mut tile = crop(raster, &geometry)?;
        if flags.aspect {
            tile.page.width = geometry.width;
            tile.page.height = geometry.height;
            tile.page.x -= geometry.x;
            tile.page.y -= geometry.y;
        }
        return Ok(vec![tile]);
    }
    if raster.columns() > geometry.width || raster.rows() > geometry.height {
        let page = raster.canvas();
        let width = if geometry.width == 0 {
            page.width
        } else {
            geometry.width
        };
        let height = if geometry.height == 0 {
            page.height
        } else {
            geometry.height
        };
        let mut tiles = Vec::new();
        let mut y = 0i64;
        'grid: while y < page.height as i64 {
            let mut x = 0i64;
            while x < page.width as i64 {
                let tile_geometry = Rectangle::new(x, y, width, height);
                match crop(raster, &tile_geometry) {
                    Ok(tile) => tiles.push(tile),
                    Err(_) => break 'grid,
                }
                x += width as i64;
            }
            y += height as i64;
        }
        return Ok(tiles);
    }
    Ok(vec![raster.clone()])
}

/// Resize by point sampling, no interpolation. The page rectangle scales
/// with the pixel array.
pub fn sample(raster: &Raster, columns: usize, rows: usize) -> TransformResult<Raster> {
    let mut sampled = raster.clone_sized(columns, rows)?;
    let x_factor = columns as f64 / raster.columns() as f64;
    let y_factor = rows as f64 / raster.rows() as f64;
    sampled.page.width = (raster.page.width as f64 * x_factor + 0.5) as usize;
    sampled.page.height = (raster.page.height as f64 * y_factor + 0.5) as usize;
    sampled.page.x = (raster.page.x as f64 * x_factor) as i64;
    sampled.page.y = (raster.page.y as f64 * y_factor) as i64;
    let x_map: Vec<usize> = (0..columns)
        .map(|x| {
            let source = ((x as f64 + 0.5) / x_factor) as usize;
            source.min(raster.columns() - 1)
        })
        .collect();
    let progress = Progress::new(raster, "sample", rows as u64);
    sampled
        .pixels_mut()
        .par_chunks_mut(columns)
        .enumerate()
        .for_each(|(y, row)| {
            if progress.is_aborted() {
                return;
            }
            let source_y = (((y as f64 + 0.5) / y_factor) as usize).min(raster.rows() - 1);
            let source = raster.row(source_y);
            for (x, pixel) in row.iter_mut().enumerate() {
                *pixel = source[x_map[x]];
            }
            progress.step();
        });
    progress.finish()?;
    Ok(sampled)
}

/// Crop and resize in one step, driven by geometry strings.
///
/// Either stage may be omitted. The crop stage keeps the first tile when
/// the geometry yields several. A stage that fails leaves the raster as
/// the previous stage produced it, so a bad resize geometry still
/// returns the cropped result.
pub fn transform(
    raster: &Raster,
    crop_geometry: Option<&str>,
    resize_geometry: Option<&str>,
) -> TransformResult<Raster> {
    let mut transformed = match crop_geometry {
        Some(spec) => match crop_to_tiles(raster, spec) {
            Ok(mut tiles) if !tiles.is_empty() => tiles.swap_remove(0),
            Ok(_) => raster.clone(),
            Err(error) => {
                log::warn!("crop geometry {spec:?} failed: {error}");
                raster.clone()
            }
        },
        None => raster.clone(),
    };
    if let Some(spec) = resize_geometry {
        match parse_page_geometry(spec) {
            Ok(parsed) => {
                let columns = if parsed.rect.width == 0 {
                    transformed.columns()
                } else {
                    parsed.rect.width
                };
                let rows = if parsed.rect.height == 0 {
                    transformed.rows()
                } else {
                    parsed.rect.height
                };
                if columns != transformed.columns() || rows != transformed.rows() {
                    transformed = sample(&transformed, columns, rows)?;
                }
            }
            Err(error) => {
                log::warn!("resize geometry {spec:?} failed: {error}");
            }
        }
    }
    Ok(transformed)
}
