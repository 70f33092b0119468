//! Precomputed trigonometry for the quantized angle domain.

use nalgebra::Vector2;

/// A table of (cos θ, sin θ) pairs for θ in `[0, max_theta)` parts per
/// semiturn (one semiturn = π radians).
///
/// Only the lower half is computed directly; the upper half is derived from
/// the quarter-turn identity `(cos(θ+π/2), sin(θ+π/2)) = (−sin θ, cos θ)` so
/// that sine and cosine stay bit-for-bit consistent across quadrants.
#[derive(Debug, Clone)]
pub struct TrigTable {
    entries: Vec<Vector2<f64>>,
}

impl TrigTable {
    /// Build the table for the given angular resolution.
    ///
    /// `max_theta` must be even; a value of 180 would index the table by
    /// degrees.
    pub fn new(max_theta: usize) -> Self {
        assert!(max_theta % 2 == 0, "max_theta must be even");

        let radians_per_part = std::f64::consts::PI / max_theta as f64;
        let half = max_theta / 2;

        let mut entries = vec![Vector2::zeros(); max_theta];
        for theta in 0..half {
            let angle = theta as f64 * radians_per_part;
            let (s, c) = angle.sin_cos();
            entries[theta] = Vector2::new(c, s);
            entries[theta + half] = Vector2::new(-s, c);
        }

        Self { entries }
    }

    /// Number of parts per semiturn.
    #[inline]
    pub fn max_theta(&self) -> usize {
        self.entries.len()
    }

    /// The (cos θ, sin θ) pair for `theta` in `[0, max_theta)`.
    #[inline]
    pub fn cos_sin(&self, theta: usize) -> &Vector2<f64> {
        &self.entries[theta]
    }
}
