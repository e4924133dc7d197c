//! Per-object shape metrics
//!
//! Every metric scans only the object's bounding-box window of the
//! label plane. The perimeter uses a 2x2 boundary-pattern count that
//! tracks the smoothed outline of a pixelated region more closely than
//! a naive boundary-pixel count; the ellipse parameters come from
//! second-order image moments taken in two passes.

use std::f64::consts::{FRAC_1_SQRT_2, PI, SQRT_2};

use rayon::prelude::*;

use pictor_core::Raster;

use crate::conncomp::CcObject;

const EPSILON: f64 = 1.0e-12;

/// Fill in perimeter, circularity, diameter, ellipse axes,
/// eccentricity, and orientation angle for every object.
///
/// Objects are independent, so the pass runs object-parallel; each
/// task only reads finalized labels and writes its own entry.
pub fn compute_metrics(component: &Raster, objects: &mut [CcObject]) {
    objects.par_iter_mut().for_each(|object| {
        object.perimeter = perimeter(component, object);
        if object.perimeter > 0.0 {
            object.circularity =
                4.0 * PI * object.area / (object.perimeter * object.perimeter);
        }
        object.diameter = 2.0 * (object.area / PI).sqrt();
        let (major, minor, angle) = ellipse(component, object);
        object.major_axis = major;
        object.minor_axis = minor;
        object.angle = angle;
        if major > EPSILON {
            object.eccentricity = (1.0 - (minor * minor) / (major * major)).max(0.0).sqrt();
        }
    });
}

/// Does the coordinate carry this object's label? Out-of-range
/// coordinates count as outside the object.
fn is_member(component: &Raster, x: i64, y: i64, id: usize) -> bool {
    if x < 0 || y < 0 || x >= component.columns() as i64 || y >= component.rows() as i64 {
        return false;
    }
    component.row(y as usize)[x as usize].red as usize == id
}

/// Boundary-pattern perimeter.
///
/// Slides a 2x2 window over the bounding box padded by one pixel and
/// weights each pattern by the outline length it represents: a lone
/// corner or a three-quarter corner contributes sqrt(1/2), a straight
/// edge pair 1, and a pure-diagonal pair sqrt(2).
fn perimeter(component: &Raster, object: &CcObject) -> f64 {
    let bounds = object.bounding_box;
    let mut total = 0.0;
    for y in bounds.y - 1..bounds.y + bounds.height as i64 {
        for x in bounds.x - 1..bounds.x + bounds.width as i64 {
            let window = [
                is_member(component, x, y, object.id),
                is_member(component, x + 1, y, object.id),
                is_member(component, x, y + 1, object.id),
                is_member(component, x + 1, y + 1, object.id),
            ];
            let count = window.iter().filter(|&&inside| inside).count();
            total += match count {
                1 | 3 => FRAC_1_SQRT_2,
                2 if (window[0] && window[3]) || (window[1] && window[2]) => SQRT_2,
                2 => 1.0,
                _ => 0.0,
            };
        }
    }
    total
}

/// Ellipse axes and orientation from the second central moments.
fn ellipse(component: &Raster, object: &CcObject) -> (f64, f64, f64) {
    let bounds = object.bounding_box;
    let mut m00 = 0.0;
    let mut m10 = 0.0;
    let mut m01 = 0.0;
    for y in bounds.y..bounds.y + bounds.height as i64 {
        for x in bounds.x..bounds.x + bounds.width as i64 {
            if is_member(component, x, y, object.id) {
                m00 += 1.0;
                m10 += x as f64;
                m01 += y as f64;
            }
        }
    }
    if m00 < EPSILON {
        return (0.0, 0.0, 0.0);
    }
    let center_x = m10 / m00;
    let center_y = m01 / m00;
    let mut mu20 = 0.0;
    let mut mu02 = 0.0;
    let mut mu11 = 0.0;
    for y in bounds.y..bounds.y + bounds.height as i64 {
        for x in bounds.x..bounds.x + bounds.width as i64 {
            if is_member(component, x, y, object.id) {
                let dx = x as f64 - center_x;
                let dy = y as f64 - center_y;
                mu20 += dx * dx;
                mu02 += dy * dy;
                mu11 += dx * dy;
            }
        }
    }
    mu20 /= m00;
    mu02 /= m00;
    mu11 /= m00;
    let spread = (4.0 * mu11 * mu11 + (mu20 - mu02) * (mu20 - mu02)).sqrt();
    let major = (2.0 * (mu20 + mu02 + spread)).sqrt();
    let minor = (2.0 * (mu20 + mu02 - spread)).max(0.0).sqrt();
    (major, minor, orientation(mu20, mu02, mu11))
}

/// Orientation of the major axis in degrees, in `(-90, 90]`.
///
/// The half-angle arctangent only spans a quadrant, so the signs of
/// `mu11` and `mu20 - mu02` select the correction.
fn orientation(mu20: f64, mu02: f64, mu11: f64) -> f64 {
    let difference = mu20 - mu02;
    if mu11.abs() < EPSILON {
        if difference.abs() < EPSILON || difference > 0.0 {
            return 0.0;
        }
        return 90.0;
    }
    if difference.abs() < EPSILON {
        return if mu11 < 0.0 { -45.0 } else { 45.0 };
    }
    let angle = (0.5 * (2.0 * mu11 / difference).atan()).to_degrees();
    if difference < 0.0 { angle + 90.0 } else { angle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pictor_core::{Pixel, Rectangle};

    fn labeled(columns: usize, rows: usize, members: &[(usize, usize)]) -> (Raster, CcObject) {
        let mut component = Raster::new(columns, rows).unwrap();
        component.set_background_pixels();
        let mut min_x = columns as i64;
        let mut min_y = rows as i64;
        let mut max_x = 0;
        let mut max_y = 0;
        for &(x, y) in members {
            component.put(x, y, Pixel::gray(1.0)).unwrap();
            min_x = min_x.min(x as i64);
            min_y = min_y.min(y as i64);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let mut object = CcObject {
            id: 1,
            bounding_box: Rectangle::new(
                min_x,
                min_y,
                (max_x as i64 - min_x + 1) as usize,
                (max_y as i64 - min_y + 1) as usize,
            ),
            color: Pixel::default(),
            centroid: (0.0, 0.0),
            area: members.len() as f64,
            perimeter: 0.0,
            circularity: 0.0,
            diameter: 0.0,
            major_axis: 0.0,
            minor_axis: 0.0,
            eccentricity: 0.0,
            angle: 0.0,
            merge: false,
        };
        compute_metrics(&component, std::slice::from_mut(&mut object));
        (component, object)
    }

    #[test]
    fn test_single_pixel_perimeter() {
        let (_, object) = labeled(3, 3, &[(1, 1)]);
        assert_relative_eq!(object.perimeter, 4.0 * FRAC_1_SQRT_2, epsilon = 1e-9);
        assert_relative_eq!(object.diameter, 2.0 / PI.sqrt(), epsilon = 1e-9);
        assert_eq!(object.angle, 0.0);
        assert_eq!(object.eccentricity, 0.0);
    }

    #[test]
    fn test_square_perimeter() {
        let members: Vec<(usize, usize)> = (1..3)
            .flat_map(|y| (1..3).map(move |x| (x, y)))
            .collect();
        let (_, object) = labeled(4, 4, &members);
        // Four straight edges plus four smoothed corners
        assert_relative_eq!(
            object.perimeter,
            4.0 + 4.0 * FRAC_1_SQRT_2,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_horizontal_bar_moments() {
        let members: Vec<(usize, usize)> = (1..6).map(|x| (x, 2)).collect();
        let (_, object) = labeled(8, 5, &members);
        // Centered x offsets -2..2: variance 2, no vertical spread
        assert_relative_eq!(object.major_axis, 8.0_f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(object.minor_axis, 0.0, epsilon = 1e-9);
        assert_relative_eq!(object.eccentricity, 1.0, epsilon = 1e-9);
        assert_eq!(object.angle, 0.0);
    }

    #[test]
    fn test_vertical_bar_angle() {
        let members: Vec<(usize, usize)> = (1..6).map(|y| (2, y)).collect();
        let (_, object) = labeled(5, 8, &members);
        assert_eq!(object.angle, 90.0);
    }

    #[test]
    fn test_diagonal_bar_angle() {
        let members: Vec<(usize, usize)> = (1..6).map(|i| (i, i)).collect();
        let (_, object) = labeled(8, 8, &members);
        assert_relative_eq!(object.angle, 45.0, epsilon = 1e-9);
        let anti: Vec<(usize, usize)> = (1..6).map(|i| (i, 6 - i)).collect();
        let (_, object) = labeled(8, 8, &anti);
        assert_relative_eq!(object.angle, -45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_square_circularity() {
        let members: Vec<(usize, usize)> = (1..11)
            .flat_map(|y| (1..11).map(move |x| (x, y)))
            .collect();
        let (_, object) = labeled(12, 12, &members);
        let expected = 4.0 * PI * 100.0 / (object.perimeter * object.perimeter);
        assert_relative_eq!(object.circularity, expected, epsilon = 1e-9);
        assert!(object.circularity > 0.7 && object.circularity < 0.9);
    }
}
