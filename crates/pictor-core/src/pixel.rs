//! Pixel representation and compositing primitives
//!
//! Pixels carry five floating-point channels (red, green, blue, alpha,
//! black) in the Q16 quantum range `[0, 65535]`. The black channel is
//! only meaningful when the owning raster reports a CMYK layout; RGB
//! rasters leave it at zero.

/// Maximum quantum value for a channel.
pub const QUANTUM_RANGE: f64 = 65535.0;

/// Reciprocal of [`QUANTUM_RANGE`], used to normalize channel values.
pub const QUANTUM_SCALE: f64 = 1.0 / QUANTUM_RANGE;

/// Fully opaque alpha value.
pub const OPAQUE_ALPHA: f64 = QUANTUM_RANGE;

/// Fully transparent alpha value.
pub const TRANSPARENT_ALPHA: f64 = 0.0;

/// Smallest magnitude treated as non-zero in blend normalization.
const PERCEPTIBLE_EPSILON: f64 = 1.0e-12;

/// A single pixel sample in quantum units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
    pub black: f64,
}

impl Default for Pixel {
    fn default() -> Self {
        Pixel {
            red: 0.0,
            green: 0.0,
            blue: 0.0,
            alpha: OPAQUE_ALPHA,
            black: 0.0,
        }
    }
}

/// Reciprocal that saturates near zero instead of overflowing.
#[inline]
pub fn perceptible_reciprocal(x: f64) -> f64 {
    if x.abs() >= PERCEPTIBLE_EPSILON {
        1.0 / x
    } else if x >= 0.0 {
        1.0 / PERCEPTIBLE_EPSILON
    } else {
        -1.0 / PERCEPTIBLE_EPSILON
    }
}

/// Clamp a channel value to the quantum range.
#[inline]
pub fn clamp_to_quantum(value: f64) -> f64 {
    value.clamp(0.0, QUANTUM_RANGE)
}

impl Pixel {
    /// Opaque RGB pixel.
    pub fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Pixel {
            red,
            green,
            blue,
            alpha: OPAQUE_ALPHA,
            black: 0.0,
        }
    }

    /// RGBA pixel.
    pub fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Pixel {
            red,
            green,
            blue,
            alpha,
            black: 0.0,
        }
    }

    /// Opaque gray pixel with all color channels equal.
    pub fn gray(value: f64) -> Self {
        Pixel::rgb(value, value, value)
    }

    /// Fully transparent black.
    pub fn transparent() -> Self {
        Pixel {
            red: 0.0,
            green: 0.0,
            blue: 0.0,
            alpha: TRANSPARENT_ALPHA,
            black: 0.0,
        }
    }

    /// Rec. 709 luma of the color channels, in quantum units.
    pub fn intensity(&self) -> f64 {
        0.212656 * self.red + 0.715158 * self.green + 0.072186 * self.blue
    }

    /// Clamp every channel into the quantum range.
    pub fn clamped(&self) -> Pixel {
        Pixel {
            red: clamp_to_quantum(self.red),
            green: clamp_to_quantum(self.green),
            blue: clamp_to_quantum(self.blue),
            alpha: clamp_to_quantum(self.alpha),
            black: clamp_to_quantum(self.black),
        }
    }

    /// Alpha-weighted plus-combine of two pixels.
    ///
    /// `alpha` and `beta` are the effective coverage weights of `p` and
    /// `q` in quantum units. Color channels are combined proportionally
    /// and renormalized by the summed coverage; the result alpha is the
    /// summed coverage clamped to opaque.
    pub fn blend(p: &Pixel, alpha: f64, q: &Pixel, beta: f64) -> Pixel {
        let sa = QUANTUM_SCALE * alpha;
        let da = QUANTUM_SCALE * beta;
        let gamma = sa + da;
        let norm = perceptible_reciprocal(gamma);
        Pixel {
            red: norm * (sa * p.red + da * q.red),
            green: norm * (sa * p.green + da * q.green),
            blue: norm * (sa * p.blue + da * q.blue),
            black: norm * (sa * p.black + da * q.black),
            alpha: QUANTUM_RANGE * gamma.min(1.0),
        }
    }

    /// Area-weighted blend used by the antialiased shear passes.
    ///
    /// `area` is the fractional coverage of `q`; the remainder of the
    /// cell is covered by `p`.
    pub fn area_blend(p: &Pixel, alpha: f64, q: &Pixel, beta: f64, area: f64) -> Pixel {
        Pixel::blend(p, (1.0 - area) * alpha, q, area * beta)
    }
}

/// Minimum fuzz applied to every comparison, in quantum units.
const FUZZ_FLOOR: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Fuzzy color equivalence.
///
/// Compares squared per-channel distances against `fuzz` squared. When
/// either pixel is not fully opaque the alpha distance is tested first
/// and the color distances are scaled by the product of the normalized
/// alphas, so nearly transparent pixels compare equal regardless of
/// color.
pub fn fuzzy_equivalent(p: &Pixel, q: &Pixel, fuzz: f64) -> bool {
    let fuzz = fuzz.max(FUZZ_FLOOR);
    let fuzz = fuzz * fuzz;
    let mut scale = 1.0;
    if (p.alpha != OPAQUE_ALPHA) || (q.alpha != OPAQUE_ALPHA) {
        let distance = p.alpha - q.alpha;
        if distance * distance > fuzz {
            return false;
        }
        scale = (QUANTUM_SCALE * p.alpha) * (QUANTUM_SCALE * q.alpha);
    }
    let mut distance = 0.0;
    let pixel = p.red - q.red;
    distance += scale * pixel * pixel;
    if distance > fuzz {
        return false;
    }
    let pixel = p.green - q.green;
    distance += scale * pixel * pixel;
    if distance > fuzz {
        return false;
    }
    let pixel = p.blue - q.blue;
    distance += scale * pixel * pixel;
    if distance > fuzz {
        return false;
    }
    let pixel = p.black - q.black;
    distance += scale * pixel * pixel;
    distance <= fuzz
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_blend_equal_weights() {
        let p = Pixel::rgb(QUANTUM_RANGE, 0.0, 0.0);
        let q = Pixel::rgb(0.0, 0.0, QUANTUM_RANGE);
        let out = Pixel::blend(&p, OPAQUE_ALPHA, &q, OPAQUE_ALPHA);
        assert_relative_eq!(out.red, QUANTUM_RANGE / 2.0, epsilon = 1e-6);
        assert_relative_eq!(out.blue, QUANTUM_RANGE / 2.0, epsilon = 1e-6);
        assert_relative_eq!(out.alpha, OPAQUE_ALPHA, epsilon = 1e-6);
    }

    #[test]
    fn test_blend_zero_weights() {
        let p = Pixel::rgb(1000.0, 2000.0, 3000.0);
        let q = Pixel::rgb(4000.0, 5000.0, 6000.0);
        let out = Pixel::blend(&p, 0.0, &q, 0.0);
        assert_eq!(out.alpha, 0.0);
        // Color channels stay finite even with zero total coverage
        assert!(out.red.is_finite());
    }

    #[test]
    fn test_area_blend_extremes() {
        let p = Pixel::gray(0.0);
        let q = Pixel::gray(QUANTUM_RANGE);
        let all_q = Pixel::area_blend(&p, OPAQUE_ALPHA, &q, OPAQUE_ALPHA, 1.0);
        assert_relative_eq!(all_q.red, QUANTUM_RANGE, epsilon = 1e-6);
        let all_p = Pixel::area_blend(&p, OPAQUE_ALPHA, &q, OPAQUE_ALPHA, 0.0);
        assert_relative_eq!(all_p.red, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_area_blend_half() {
        let p = Pixel::gray(0.0);
        let q = Pixel::gray(QUANTUM_RANGE);
        let out = Pixel::area_blend(&p, OPAQUE_ALPHA, &q, OPAQUE_ALPHA, 0.5);
        assert_relative_eq!(out.red, QUANTUM_RANGE / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_intensity_white() {
        let white = Pixel::gray(QUANTUM_RANGE);
        assert_relative_eq!(white.intensity(), QUANTUM_RANGE, epsilon = 1.0);
    }

    #[test]
    fn test_fuzzy_exact_match() {
        let p = Pixel::rgb(100.0, 200.0, 300.0);
        assert!(fuzzy_equivalent(&p, &p, 0.0));
    }

    #[test]
    fn test_fuzzy_within_tolerance() {
        let p = Pixel::gray(1000.0);
        let q = Pixel::gray(1050.0);
        assert!(fuzzy_equivalent(&p, &q, 100.0));
        assert!(!fuzzy_equivalent(&p, &q, 10.0));
    }

    #[test]
    fn test_fuzzy_alpha_gate() {
        // Large alpha difference fails even with matching colors
        let p = Pixel::rgba(100.0, 100.0, 100.0, OPAQUE_ALPHA);
        let q = Pixel::rgba(100.0, 100.0, 100.0, 0.0);
        assert!(!fuzzy_equivalent(&p, &q, 100.0));
    }

    #[test]
    fn test_fuzzy_transparent_ignores_color() {
        let p = Pixel::rgba(0.0, 0.0, 0.0, 1.0);
        let q = Pixel::rgba(QUANTUM_RANGE, 0.0, 0.0, 1.0);
        // Both nearly transparent: color distance is scaled away
        assert!(fuzzy_equivalent(&p, &q, 1.0));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_to_quantum(-5.0), 0.0);
        assert_eq!(clamp_to_quantum(70000.0), QUANTUM_RANGE);
        assert_eq!(clamp_to_quantum(123.0), 123.0);
    }
}
