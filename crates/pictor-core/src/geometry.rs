//! Rectangles, gravity, orientation, and geometry arithmetic
//!
//! The geometry helpers here are pure arithmetic shared by the transform
//! operations: shear extent projection, virtual-canvas clipping, and the
//! geometry specification mini-language (`WxH+X+Y` with `@` and `!`
//! flags).

use crate::error::{Error, Result};

/// A rectangular region with a signed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub x: i64,
    pub y: i64,
    pub width: usize,
    pub height: usize,
}

impl Rectangle {
    pub fn new(x: i64, y: i64, width: usize, height: usize) -> Self {
        Rectangle {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin with the given extent.
    pub fn sized(width: usize, height: usize) -> Self {
        Rectangle::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Nine-point placement within a larger region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    Undefined,
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

/// EXIF-style raster orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Undefined,
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
    LeftTop,
    RightTop,
    RightBottom,
    LeftBottom,
}

/// Bounding box of a `width` x `height` region sheared inside a
/// `columns` x `rows` workspace.
///
/// The four corners of the region, centered on the workspace midpoint,
/// are pushed through the shear chain (x pass, y pass, and a second x
/// pass when `rotate` is set) and the enclosing rectangle is rounded
/// outward by half a pixel.
pub fn shear_bounds(
    width: usize,
    height: usize,
    x_shear: f64,
    y_shear: f64,
    rotate: bool,
    columns: usize,
    rows: usize,
) -> Rectangle {
    let w = width as f64;
    let h = height as f64;
    let mut extent = [
        (-w / 2.0, -h / 2.0),
        (w / 2.0, -h / 2.0),
        (-w / 2.0, h / 2.0),
        (w / 2.0, h / 2.0),
    ];
    for (x, y) in &mut extent {
        *x += x_shear * *y;
        *y += y_shear * *x;
        if rotate {
            *x += x_shear * *y;
        }
        *x += columns as f64 / 2.0;
        *y += rows as f64 / 2.0;
    }
    let mut min = extent[0];
    let mut max = extent[0];
    for (x, y) in &extent[1..] {
        min.0 = min.0.min(*x);
        min.1 = min.1.min(*y);
        max.0 = max.0.max(*x);
        max.1 = max.1.max(*y);
    }
    Rectangle {
        x: (min.0 - 0.5).ceil() as i64,
        y: (min.1 - 0.5).ceil() as i64,
        width: (max.0 - min.0 + 0.5).floor().max(0.0) as usize,
        height: (max.1 - min.1 + 0.5).floor().max(0.0) as usize,
    }
}

/// Outcome of clipping a crop request against a virtual canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasClip {
    /// Request lies entirely outside the canvas or the stored pixels.
    Disjoint,
    /// Clipping reduced the request to a zero-area region.
    Empty,
    /// `source` addresses stored pixels; `origin` is the page offset the
    /// clipped region keeps on the canvas.
    Region { source: Rectangle, origin: (i64, i64) },
}

/// Clip a crop request expressed in virtual-canvas coordinates down to
/// the stored pixel array.
///
/// `canvas` is the raster's page rectangle with its extent already
/// defaulted to `columns` x `rows` when unset. A request with zero width
/// or height inherits the canvas extent.
pub fn clip_to_canvas(
    geometry: &Rectangle,
    canvas: &Rectangle,
    columns: usize,
    rows: usize,
) -> CanvasClip {
    let mut x = geometry.x;
    let mut y = geometry.y;
    let mut width = if geometry.width == 0 {
        canvas.width as i64
    } else {
        geometry.width as i64
    };
    let mut height = if geometry.height == 0 {
        canvas.height as i64
    } else {
        geometry.height as i64
    };
    if (canvas.x - x) >= width
        || (canvas.y - y) >= height
        || (x - canvas.x) > columns as i64
        || (y - canvas.y) > rows as i64
    {
        return CanvasClip::Disjoint;
    }
    if x < 0 && canvas.x >= 0 {
        width += x - canvas.x;
        x = 0;
    } else {
        width -= canvas.x - x;
        x -= canvas.x;
        if x < 0 {
            x = 0;
        }
    }
    if y < 0 && canvas.y >= 0 {
        height += y - canvas.y;
        y = 0;
    } else {
        height -= canvas.y - y;
        y -= canvas.y;
        if y < 0 {
            y = 0;
        }
    }
    if width < 0 || x + width > columns as i64 {
        width = columns as i64 - x;
    }
    if geometry.width != 0 && width > geometry.width as i64 {
        width = geometry.width as i64;
    }
    if height < 0 || y + height > rows as i64 {
        height = rows as i64 - y;
    }
    if geometry.height != 0 && height > geometry.height as i64 {
        height = geometry.height as i64;
    }
    if width <= 0 || height <= 0 {
        return CanvasClip::Empty;
    }
    CanvasClip::Region {
        source: Rectangle::new(x, y, width as usize, height as usize),
        origin: (canvas.x + x, canvas.y + y),
    }
}

/// Re-anchor a region within a `columns` x `rows` frame according to a
/// gravity. The region's offset becomes relative to the gravity corner:
/// the east column mirrors x, the south row mirrors y, and the center
/// row and column split the slack evenly.
pub fn gravity_adjust(gravity: Gravity, region: &mut Rectangle, columns: usize, rows: usize) {
    match gravity {
        Gravity::NorthEast | Gravity::East | Gravity::SouthEast => {
            region.x = columns as i64 - region.width as i64 - region.x;
        }
        Gravity::North | Gravity::Center | Gravity::South => {
            region.x += (columns / 2) as i64 - (region.width / 2) as i64;
        }
        _ => {}
    }
    match gravity {
        Gravity::SouthWest | Gravity::South | Gravity::SouthEast => {
            region.y = rows as i64 - region.height as i64 - region.y;
        }
        Gravity::West | Gravity::Center | Gravity::East => {
            region.y += (rows / 2) as i64 - (region.height / 2) as i64;
        }
        _ => {}
    }
}

/// Flags recognized in a geometry specification string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeometryFlags {
    pub width_set: bool,
    pub height_set: bool,
    pub x_set: bool,
    pub y_set: bool,
    /// `@`: partition into a tile grid instead of fixed-size tiles.
    pub area: bool,
    /// `!`: take offsets as exact, bypassing canvas adjustment.
    pub aspect: bool,
}

/// A parsed geometry specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageGeometry {
    pub rect: Rectangle,
    pub flags: GeometryFlags,
}

/// Parse a geometry specification of the form `WxH+X+Y`, where every
/// part is optional and the `@` and `!` flags may appear anywhere.
pub fn parse_page_geometry(spec: &str) -> Result<PageGeometry> {
    let mut flags = GeometryFlags::default();
    let mut body = String::with_capacity(spec.len());
    for c in spec.chars() {
        match c {
            '@' => flags.area = true,
            '!' => flags.aspect = true,
            c if c.is_whitespace() => {}
            c => body.push(c),
        }
    }
    let offset_start = body
        .char_indices()
        .find(|&(_, c)| c == '+' || c == '-')
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    let (dims, offsets) = body.split_at(offset_start);
    let mut rect = Rectangle::default();
    if !dims.is_empty() {
        let (w, h) = match dims.find(['x', 'X']) {
            Some(i) => (&dims[..i], &dims[i + 1..]),
            None => (dims, ""),
        };
        if !w.is_empty() {
            rect.width = w
                .parse::<usize>()
                .map_err(|_| Error::InvalidGeometry(spec.to_string()))?;
            flags.width_set = true;
        }
        if !h.is_empty() {
            rect.height = h
                .parse::<usize>()
                .map_err(|_| Error::InvalidGeometry(spec.to_string()))?;
            flags.height_set = true;
        }
    }
    if !offsets.is_empty() {
        let mut values = Vec::new();
        let mut current = String::new();
        for c in offsets.chars() {
            match c {
                '+' | '-' => {
                    if !current.is_empty() {
                        values.push(current.clone());
                        current.clear();
                    }
                    if c == '-' {
                        current.push('-');
                    }
                }
                '0'..='9' => current.push(c),
                _ => return Err(Error::InvalidGeometry(spec.to_string())),
            }
        }
        if !current.is_empty() && current != "-" {
            values.push(current);
        }
        if values.len() > 2 {
            return Err(Error::InvalidGeometry(spec.to_string()));
        }
        let mut parsed = values.iter().map(|v| v.parse::<i64>());
        if let Some(v) = parsed.next() {
            rect.x = v.map_err(|_| Error::InvalidGeometry(spec.to_string()))?;
            flags.x_set = true;
        }
        if let Some(v) = parsed.next() {
            rect.y = v.map_err(|_| Error::InvalidGeometry(spec.to_string()))?;
            flags.y_set = true;
        }
    }
    Ok(PageGeometry { rect, flags })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_geometry() {
        let g = parse_page_geometry("100x50+10-20").unwrap();
        assert_eq!(g.rect, Rectangle::new(10, -20, 100, 50));
        assert!(g.flags.width_set && g.flags.height_set);
        assert!(g.flags.x_set && g.flags.y_set);
        assert!(!g.flags.area && !g.flags.aspect);
    }

    #[test]
    fn test_parse_tile_grid() {
        let g = parse_page_geometry("3x2@").unwrap();
        assert_eq!(g.rect.width, 3);
        assert_eq!(g.rect.height, 2);
        assert!(g.flags.area);
        assert!(!g.flags.x_set);
    }

    #[test]
    fn test_parse_offsets_only() {
        let g = parse_page_geometry("+5+7").unwrap();
        assert_eq!((g.rect.x, g.rect.y), (5, 7));
        assert!(!g.flags.width_set);
        assert!(g.flags.x_set && g.flags.y_set);
    }

    #[test]
    fn test_parse_aspect_flag() {
        let g = parse_page_geometry("640x480!").unwrap();
        assert!(g.flags.aspect);
        assert_eq!(g.rect.width, 640);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_page_geometry("12q34").is_err());
        assert!(parse_page_geometry("+1+2+3").is_err());
    }

    #[test]
    fn test_gravity_adjust_corners() {
        let mut region = Rectangle::new(5, 5, 20, 10);
        gravity_adjust(Gravity::SouthEast, &mut region, 100, 100);
        assert_eq!((region.x, region.y), (75, 85));
        let mut centered = Rectangle::new(0, 0, 20, 10);
        gravity_adjust(Gravity::Center, &mut centered, 100, 100);
        assert_eq!((centered.x, centered.y), (40, 45));
        let mut fixed = Rectangle::new(5, 5, 20, 10);
        gravity_adjust(Gravity::NorthWest, &mut fixed, 100, 100);
        assert_eq!((fixed.x, fixed.y), (5, 5));
    }

    #[test]
    fn test_shear_bounds_identity() {
        let bounds = shear_bounds(10, 8, 0.0, 0.0, false, 10, 8);
        assert_eq!(bounds, Rectangle::new(0, 0, 10, 8));
    }

    #[test]
    fn test_shear_bounds_grows_with_shear() {
        let bounds = shear_bounds(10, 10, 0.5, 0.0, false, 20, 10);
        assert!(bounds.width > 10);
        assert_eq!(bounds.height, 10);
    }

    #[test]
    fn test_clip_simple_interior() {
        let canvas = Rectangle::sized(100, 100);
        let request = Rectangle::new(10, 20, 30, 40);
        match clip_to_canvas(&request, &canvas, 100, 100) {
            CanvasClip::Region { source, origin } => {
                assert_eq!(source, Rectangle::new(10, 20, 30, 40));
                assert_eq!(origin, (10, 20));
            }
            other => panic!("expected region, got {:?}", other),
        }
    }

    #[test]
    fn test_clip_overhang_is_trimmed() {
        let canvas = Rectangle::sized(100, 100);
        let request = Rectangle::new(90, 90, 30, 30);
        match clip_to_canvas(&request, &canvas, 100, 100) {
            CanvasClip::Region { source, .. } => {
                assert_eq!(source, Rectangle::new(90, 90, 10, 10));
            }
            other => panic!("expected region, got {:?}", other),
        }
    }

    #[test]
    fn test_clip_negative_offset() {
        let canvas = Rectangle::sized(100, 100);
        let request = Rectangle::new(-10, -10, 30, 30);
        match clip_to_canvas(&request, &canvas, 100, 100) {
            CanvasClip::Region { source, origin } => {
                assert_eq!(source, Rectangle::new(0, 0, 20, 20));
                assert_eq!(origin, (0, 0));
            }
            other => panic!("expected region, got {:?}", other),
        }
    }

    #[test]
    fn test_clip_disjoint() {
        let canvas = Rectangle::sized(100, 100);
        let request = Rectangle::new(500, 0, 10, 10);
        assert_eq!(
            clip_to_canvas(&request, &canvas, 100, 100),
            CanvasClip::Disjoint
        );
    }

    #[test]
    fn test_clip_offset_canvas() {
        // Stored pixels sit at (40, 40) on a 200x200 canvas
        let canvas = Rectangle::new(40, 40, 200, 200);
        let request = Rectangle::new(50, 50, 20, 20);
        match clip_to_canvas(&request, &canvas, 100, 100) {
            CanvasClip::Region { source, origin } => {
                assert_eq!(source, Rectangle::new(10, 10, 20, 20));
                assert_eq!(origin, (50, 50));
            }
            other => panic!("expected region, got {:?}", other),
        }
    }
}
