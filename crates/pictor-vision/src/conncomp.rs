//! Connected-components labeling
//!
//! Decomposes a raster into maximal regions of fuzzy-equivalent color
//! using a union-find over the flattened pixel index space, then
//! resolves the forest into a compact label plane plus a per-object
//! statistics table. Declarative merge/keep/remove policies read from
//! the `connected-components:*` artifacts decide which objects get
//! absorbed into their most-touching neighbor.

use rayon::prelude::*;

use pictor_core::{
    Matrix, Pixel, QUANTUM_SCALE, Raster, Rectangle, clamp_to_quantum, fuzzy_equivalent,
};

use crate::error::{VisionError, VisionResult};
use crate::metrics::compute_metrics;
use crate::policy::Policies;
use crate::progress::Progress;

/// Largest compact label a component plane can address.
pub const MAX_OBJECTS: usize = 65535;

/// Earlier-scan neighbor offsets `(dy, dx)` for 4-way adjacency.
const CONNECT4: [(i64, i64); 2] = [(-1, 0), (0, -1)];

/// Earlier-scan neighbor offsets `(dy, dx)` for 8-way adjacency.
const CONNECT8: [(i64, i64); 4] = [(-1, -1), (-1, 0), (-1, 1), (0, -1)];

/// Aggregate statistics for one labeled component.
#[derive(Debug, Clone)]
pub struct CcObject {
    /// Compact label carried by the component plane.
    pub id: usize,
    pub bounding_box: Rectangle,
    /// Mean source color over the object's footprint.
    pub color: Pixel,
    pub centroid: (f64, f64),
    /// Pixel count.
    pub area: f64,
    pub perimeter: f64,
    pub circularity: f64,
    pub diameter: f64,
    pub major_axis: f64,
    pub minor_axis: f64,
    pub eccentricity: f64,
    pub angle: f64,
    pub(crate) merge: bool,
}

impl CcObject {
    /// Fresh accumulator. The bounding box starts inverted and the
    /// color and centroid fields hold running sums until finalized.
    fn seed(id: usize, columns: usize, rows: usize) -> Self {
        CcObject {
            id,
            bounding_box: Rectangle {
                x: columns as i64,
                y: rows as i64,
                width: 0,
                height: 0,
            },
            color: Pixel {
                red: 0.0,
                green: 0.0,
                blue: 0.0,
                alpha: 0.0,
                black: 0.0,
            },
            centroid: (0.0, 0.0),
            area: 0.0,
            perimeter: 0.0,
            circularity: 0.0,
            diameter: 0.0,
            major_axis: 0.0,
            minor_axis: 0.0,
            eccentricity: 0.0,
            angle: 0.0,
            merge: false,
        }
    }
}

/// The compact label stored at a component-plane coordinate.
pub(crate) fn label_at(component: &Raster, x: i64, y: i64) -> usize {
    component.row(y as usize)[x as usize].red as usize
}

/// Label the connected components of a raster.
///
/// `connectivity` selects 4-way adjacency; any larger value selects
/// 8-way. Two pixels connect when they are fuzzy-equivalent under the
/// raster's fuzz tolerance. Returns the label plane (pixel value =
/// compact object id, or each object's mean color when the
/// `connected-components:mean-color` artifact is set) and the object
/// table sorted by descending area.
pub fn connected_components(
    raster: &Raster,
    connectivity: usize,
) -> VisionResult<(Raster, Vec<CcObject>)> {
    let columns = raster.columns();
    let rows = raster.rows();
    let policies = Policies::from_artifacts(raster)?;
    let offsets: &[(i64, i64)] = if connectivity > 4 { &CONNECT8 } else { &CONNECT4 };

    let mut equivalences = Matrix::<usize>::new(columns * rows, 1)?;
    for (index, parent) in equivalences.as_mut_slice().iter_mut().enumerate() {
        *parent = index;
    }
    let parent = equivalences.as_mut_slice();
    // Each offset points at an already-visited pixel, so every adjacency
    // is examined exactly once. The direction loop stays sequential:
    // later directions must see the settled unions of earlier ones.
    for &(dy, dx) in offsets {
        for y in 0..rows as i64 {
            for x in 0..columns as i64 {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || nx >= columns as i64 || ny < 0 || ny >= rows as i64 {
                    continue;
                }
                let pixel = raster.row(y as usize)[x as usize];
                let target = raster.row(ny as usize)[nx as usize];
                if !fuzzy_equivalent(&pixel, &target, raster.fuzz) {
                    continue;
                }
                let offset = y as usize * columns + x as usize;
                let neighbor = ny as usize * columns + nx as usize;
                let mut ox = offset;
                while parent[ox] != ox {
                    ox = parent[ox];
                }
                let mut oy = neighbor;
                while parent[oy] != oy {
                    oy = parent[oy];
                }
                // The smaller index wins, keeping every root the first
                // of its component's pixels in scan order
                let root = ox.min(oy);
                parent[ox.max(oy)] = root;
                let mut walk = offset;
                while parent[walk] != root {
                    let next = parent[walk];
                    parent[walk] = root;
                    walk = next;
                }
                let mut walk = neighbor;
                while parent[walk] != root {
                    let next = parent[walk];
                    parent[walk] = root;
                    walk = next;
                }
            }
        }
    }

    // Resolve roots into compact labels and accumulate the per-object
    // aggregates inline. Row-major order guarantees a root (the
    // smallest index of its component) is labeled before any of its
    // followers, so a follower resolves in two reads: its stored
    // parent, then the label that replaced that parent's entry.
    let mut component = raster.clone();
    let mut objects: Vec<CcObject> = Vec::new();
    let progress = Progress::new(raster, "connected-components", rows as u64);
    for y in 0..rows {
        if progress.is_aborted() {
            break;
        }
        let row = component.row_mut(y);
        for x in 0..columns {
            let offset = y * columns + x;
            let object = if parent[offset] == offset {
                let label = objects.len();
                objects.push(CcObject::seed(label, columns, rows));
                parent[offset] = label;
                label
            } else {
                let label = parent[parent[offset]];
                parent[offset] = label;
                label
            };
            row[x] = Pixel::gray(object.min(MAX_OBJECTS) as f64);
            let source = raster.row(y)[x];
            let stats = &mut objects[object];
            if (x as i64) < stats.bounding_box.x {
                stats.bounding_box.x = x as i64;
            }
            if x > stats.bounding_box.width {
                stats.bounding_box.width = x;
            }
            if (y as i64) < stats.bounding_box.y {
                stats.bounding_box.y = y as i64;
            }
            if y > stats.bounding_box.height {
                stats.bounding_box.height = y;
            }
            stats.color.red += source.red;
            stats.color.green += source.green;
            stats.color.blue += source.blue;
            stats.color.alpha += source.alpha;
            stats.color.black += source.black;
            stats.centroid.0 += x as f64;
            stats.centroid.1 += y as f64;
            stats.area += 1.0;
        }
        progress.step();
    }
    progress.finish()?;
    if objects.len() > MAX_OBJECTS {
        return Err(VisionError::TooManyObjects {
            count: objects.len(),
            limit: MAX_OBJECTS,
        });
    }

    // Finalize: the bounding box max trackers become extents, the sums
    // become means
    for object in &mut objects {
        let bounds = &mut object.bounding_box;
        bounds.width = (bounds.width as i64 - (bounds.x - 1)) as usize;
        bounds.height = (bounds.height as i64 - (bounds.y - 1)) as usize;
        let area = object.area;
        object.color = Pixel {
            red: clamp_to_quantum(object.color.red / area),
            green: clamp_to_quantum(object.color.green / area),
            blue: clamp_to_quantum(object.color.blue / area),
            alpha: clamp_to_quantum(object.color.alpha / area),
            black: clamp_to_quantum(object.color.black / area),
        };
        object.centroid.0 /= area;
        object.centroid.1 /= area;
    }

    let background = match policies.background_id {
        Some(id) if id < objects.len() => id,
        Some(id) => {
            return Err(VisionError::InvalidArtifact {
                key: "connected-components:background-id".to_string(),
                value: id.to_string(),
            });
        }
        None => largest_object(&objects),
    };
    if policies.needs_metrics() {
        compute_metrics(&component, &mut objects);
    }
    policies.apply(&mut objects, background, raster.fuzz);
    let span = objects.len();
    merge_flagged(&mut component, &mut objects, background);
    if policies.mean_color {
        recolor(&mut component, &objects, span);
        component.channels.alpha = raster.channels.alpha;
        component.channels.black = raster.channels.black;
    }
    objects.sort_by(|a, b| b.area.total_cmp(&a.area));
    if policies.verbose {
        report(&objects, raster.channels.alpha, policies.exclude_header);
    }
    Ok((component, objects))
}

/// Id of the largest-area object, the default background designation.
fn largest_object(objects: &[CcObject]) -> usize {
    let mut id = 0;
    let mut area = -1.0;
    for object in objects {
        if object.area > area {
            area = object.area;
            id = object.id;
        }
    }
    id
}

/// Absorb every merge-flagged object into its most-touching neighbor.
///
/// Objects are processed in ascending id order; each census is taken
/// over the final labels left by earlier merges, so a chain of small
/// objects collapses into whichever region has grown to surround them.
/// Ties go to the lower label. The absorbed entries are dropped from
/// the table after their aggregates fold into the winner.
fn merge_flagged(component: &mut Raster, objects: &mut Vec<CcObject>, background: usize) {
    const NEIGHBORS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
    let columns = component.columns() as i64;
    let rows = component.rows() as i64;
    for index in 0..objects.len() {
        if !objects[index].merge || index == background {
            continue;
        }
        let bounds = objects[index].bounding_box;
        let mut census = vec![0u64; objects.len()];
        for y in bounds.y..bounds.y + bounds.height as i64 {
            for x in bounds.x..bounds.x + bounds.width as i64 {
                if label_at(component, x, y) != index {
                    continue;
                }
                for &(dx, dy) in &NEIGHBORS {
                    let nx = x + dx;
                    let ny = y + dy;
                    if nx < 0 || ny < 0 || nx >= columns || ny >= rows {
                        continue;
                    }
                    let adjacent = label_at(component, nx, ny);
                    if adjacent != index {
                        census[adjacent] += 1;
                    }
                }
            }
        }
        let mut winner = background;
        let mut best = 0u64;
        for (id, &count) in census.iter().enumerate() {
            if count > best {
                best = count;
                winner = id;
            }
        }
        for y in bounds.y..bounds.y + bounds.height as i64 {
            for x in bounds.x..bounds.x + bounds.width as i64 {
                if label_at(component, x, y) == index {
                    component.row_mut(y as usize)[x as usize] = Pixel::gray(winner as f64);
                }
            }
        }
        let absorbed = objects[index].clone();
        let target = &mut objects[winner];
        let total = target.area + absorbed.area;
        target.centroid.0 =
            (target.centroid.0 * target.area + absorbed.centroid.0 * absorbed.area) / total;
        target.centroid.1 =
            (target.centroid.1 * target.area + absorbed.centroid.1 * absorbed.area) / total;
        target.color = Pixel {
            red: (target.color.red * target.area + absorbed.color.red * absorbed.area) / total,
            green: (target.color.green * target.area + absorbed.color.green * absorbed.area)
                / total,
            blue: (target.color.blue * target.area + absorbed.color.blue * absorbed.area) / total,
            alpha: (target.color.alpha * target.area + absorbed.color.alpha * absorbed.area)
                / total,
            black: (target.color.black * target.area + absorbed.color.black * absorbed.area)
                / total,
        };
        let right = (target.bounding_box.x + target.bounding_box.width as i64)
            .max(absorbed.bounding_box.x + absorbed.bounding_box.width as i64);
        let bottom = (target.bounding_box.y + target.bounding_box.height as i64)
            .max(absorbed.bounding_box.y + absorbed.bounding_box.height as i64);
        target.bounding_box.x = target.bounding_box.x.min(absorbed.bounding_box.x);
        target.bounding_box.y = target.bounding_box.y.min(absorbed.bounding_box.y);
        target.bounding_box.width = (right - target.bounding_box.x) as usize;
        target.bounding_box.height = (bottom - target.bounding_box.y) as usize;
        target.area = total;
    }
    objects.retain(|object| !object.merge);
}

/// Replace every label with its object's mean source color.
fn recolor(component: &mut Raster, objects: &[CcObject], span: usize) {
    let mut colors = vec![component.background; span];
    for object in objects {
        colors[object.id] = object.color;
    }
    let columns = component.columns();
    component
        .pixels_mut()
        .par_chunks_mut(columns)
        .for_each(|row| {
            for pixel in row.iter_mut() {
                *pixel = colors[pixel.red as usize];
            }
        });
}

fn report(objects: &[CcObject], alpha: bool, exclude_header: bool) {
    if !exclude_header {
        log::info!("Objects (id: bounding-box centroid area mean-color):");
    }
    for object in objects {
        log::info!(
            "  {}: {}x{}{:+}{:+} {:.1},{:.1} {} {}",
            object.id,
            object.bounding_box.width,
            object.bounding_box.height,
            object.bounding_box.x,
            object.bounding_box.y,
            object.centroid.0,
            object.centroid.1,
            object.area as u64,
            format_color(&object.color, alpha),
        );
    }
}

fn format_color(pixel: &Pixel, alpha: bool) -> String {
    let scale = |value: f64| (QUANTUM_SCALE * value * 255.0).round() as u32;
    if alpha {
        format!(
            "srgba({},{},{},{})",
            scale(pixel.red),
            scale(pixel.green),
            scale(pixel.blue),
            scale(pixel.alpha)
        )
    } else {
        format!(
            "srgb({},{},{})",
            scale(pixel.red),
            scale(pixel.green),
            scale(pixel.blue)
        )
    }
}
