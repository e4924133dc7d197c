//! Shear and rotation regression test
//!
//! Drives the three-shear rotation through quarter turns, small angles,
//! and round trips, checking extents, background fill, and agreement
//! with the exact quarter-turn path.

use pictor_core::{Pixel, QUANTUM_RANGE, Raster};
use pictor_transform::{TransformError, integral_rotate, shear, shear_rotate};

fn block_on_background(columns: usize, rows: usize) -> Raster {
    let mut raster = Raster::new(columns, rows).unwrap();
    raster.background = Pixel::gray(0.0);
    raster.set_background_pixels();
    let white = Pixel::gray(QUANTUM_RANGE);
    for y in rows / 4..3 * rows / 4 {
        for x in columns / 4..3 * columns / 4 {
            raster.put(x, y, white).unwrap();
        }
    }
    raster
}

fn content_mass(raster: &Raster) -> f64 {
    raster.pixels().iter().map(|p| p.red).sum()
}

#[test]
fn shear_reg_quarter_turns() {
    let raster = block_on_background(17, 11);
    for degrees in [90.0, 180.0, 270.0, -90.0] {
        let sheared = shear_rotate(&raster, degrees).unwrap();
        let rotations = (((degrees as i64 / 90) % 4 + 4) % 4) as usize;
        let integral = integral_rotate(&raster, rotations).unwrap();
        assert_eq!(sheared.columns(), integral.columns(), "at {} degrees", degrees);
        assert_eq!(sheared.rows(), integral.rows(), "at {} degrees", degrees);
        assert_eq!(sheared.pixels(), integral.pixels(), "at {} degrees", degrees);
    }
}

#[test]
fn shear_reg_small_angles_preserve_mass() {
    let raster = block_on_background(32, 32);
    let mass = content_mass(&raster);
    for degrees in [5.0, -10.0, 30.0] {
        let rotated = shear_rotate(&raster, degrees).unwrap();
        assert!(rotated.columns() >= raster.columns());
        assert!(rotated.rows() >= raster.rows());
        // Area-weighted blending redistributes but does not destroy
        // content; the background is black so stray mass would show up
        let rotated_mass = content_mass(&rotated);
        let ratio = rotated_mass / mass;
        assert!(
            (0.9..=1.1).contains(&ratio),
            "mass ratio {} at {} degrees",
            ratio,
            degrees
        );
    }
}

#[test]
fn shear_reg_x_only_keeps_height() {
    let raster = block_on_background(20, 10);
    let sheared = shear(&raster, 25.0, 0.0).unwrap();
    assert!(sheared.columns() > raster.columns());
    assert_eq!(sheared.rows(), raster.rows());
}

#[test]
fn shear_reg_rejects_vertical_tangent() {
    let raster = block_on_background(8, 8);
    for degrees in [90.0, -90.0, 450.0] {
        assert!(matches!(
            shear(&raster, degrees, 0.0),
            Err(TransformError::AngleIsDiscontinuous(_))
        ));
    }
}

#[test]
fn shear_reg_full_turn_restores_extent() {
    let raster = block_on_background(16, 16);
    let rotated = shear_rotate(&raster, 360.0).unwrap();
    assert_eq!((rotated.columns(), rotated.rows()), (16, 16));
    assert_eq!(rotated.pixels(), raster.pixels());
}
