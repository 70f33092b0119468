//! The (θ, ρ) vote matrix and its statistical trigger.
//!
//! Every vote traces the sinusoid of one pixel through Hough space,
//! incrementing one counter per θ column whose scaled ρ lands inside the
//! matrix. The trigger rejects the null hypothesis (foreground pixels are
//! uniform noise) when the largest counter becomes too improbable under a
//! Poisson model of the column fill.

use crate::error::DetectError;
use crate::trig::TrigTable;
use crate::types::{Line, Point, Segment};
use log::debug;
use std::collections::BTreeSet;

/// Vote accumulator over quantized Hough space.
#[derive(Debug, Clone)]
pub struct Accumulator {
    trig: TrigTable,
    rows: usize,
    cols: usize,
    rho_scale: i32,
    max_rho: usize,
    counters: Vec<u16>,
    votes: u32,
    log_threshold: f64,
    min_trigger_points: u16,
}

impl Accumulator {
    /// Create an accumulator for a `rows × cols` bitmap.
    ///
    /// `threshold` is the probability below which the null hypothesis is
    /// rejected (its logarithm is what the trigger compares against);
    /// `min_trigger_points` skips the test entirely while counters are so
    /// small that the Poisson approximation breaks down.
    pub fn new(
        rows: usize,
        cols: usize,
        max_theta: usize,
        threshold: f64,
        min_trigger_points: u16,
    ) -> Self {
        let (max_rho, rho_scale) = Self::rho_info(rows, cols, max_theta);
        Self {
            trig: TrigTable::new(max_theta),
            rows,
            cols,
            rho_scale,
            max_rho,
            counters: vec![0; max_rho * max_theta],
            votes: 0,
            log_threshold: threshold.ln(),
            min_trigger_points,
        }
    }

    /// Compute the counter-matrix height and the ρ scaling exponent for a
    /// bitmap, as the pair `(max_rho, rho_scale)`.
    ///
    /// Scaled ρ values satisfy `scaled = ρ·2^rho_scale + max_rho/2`. Of the
    /// two exponents that bracket `max_theta`, the one whose row count comes
    /// closest to the column count wins, keeping the matrix near square.
    pub fn rho_info(rows: usize, cols: usize, max_theta: usize) -> (usize, i32) {
        let diag = (rows as f64 - 1.0).hypot(cols as f64 - 1.0).ceil();
        let rho_exp = libm::ilogb(max_theta as f64 / (diag * 2.0 + 1.0));

        // lo is 2·diag·2^rho_exp; hi doubles it and is the first row count
        // at or above max_theta.
        let lo = libm::scalbn(diag, rho_exp + 1).ceil() as usize + 1;
        let hi = libm::scalbn(diag, rho_exp + 2).ceil() as usize + 1;

        debug_assert!(lo <= max_theta && max_theta <= hi);

        if max_theta - lo <= hi - max_theta {
            (lo, rho_exp)
        } else {
            (hi, rho_exp + 1)
        }
    }

    /// Number of votes currently in effect.
    #[inline]
    pub fn votes(&self) -> u32 {
        self.votes
    }

    /// Height of the counter matrix.
    #[inline]
    pub fn max_rho(&self) -> usize {
        self.max_rho
    }

    fn scale_rho(&self, unscaled: f64) -> f64 {
        let offset = (self.max_rho >> 1) as f64;
        libm::rint(libm::scalbn(unscaled, self.rho_scale) + offset)
    }

    fn unscale_rho(&self, scaled: f64) -> f64 {
        let offset = (self.max_rho >> 1) as f64;
        libm::scalbn(scaled - offset, -self.rho_scale)
    }

    /// Prefer angles that are simple rational fractions of π (0, π/2, π/4,
    /// …). Staircase artifacts produce runs of adjacent θ ties; this picks
    /// the least staircase-prone member deterministically.
    fn best_candidate(&self, found: &[Line]) -> Line {
        let half = self.trig.max_theta() / 2;

        let mut best = found[0];
        let mut best_gcd = gcd(best.theta, half);
        for line in &found[1..] {
            let g = gcd(line.theta, half);
            if best_gcd < g {
                best = *line;
                best_gcd = g;
            }
        }
        best
    }

    /// Register all lines through `p`, then test the strongest counter
    /// against the null hypothesis. Returns the best candidate line when the
    /// hypothesis is rejected.
    pub fn vote(&mut self, p: Point) -> Option<Line> {
        let max_theta = self.trig.max_theta();

        let mut n = self.min_trigger_points;
        let mut found: Vec<Line> = Vec::new();

        for theta in 0..max_theta {
            let rho = self.scale_rho(p.dot(self.trig.cos_sin(theta)));
            if rho < 0.0 || rho >= self.max_rho as f64 {
                continue;
            }

            let cell = &mut self.counters[rho as usize * max_theta + theta];
            *cell += 1;
            let counter = *cell;

            if n < counter {
                n = counter;
                found.clear();
            }
            if n == counter {
                found.push(Line::new(theta, self.unscale_rho(rho)));
            }
        }

        self.votes += 1;

        if found.is_empty() {
            return None;
        }

        // Each vote increments at most one cell per column, so under the
        // null hypothesis every cell is Poisson with λ = votes / max_rho:
        //
        //    p(n) = λⁿ/Γ(n+1)·exp(−λ)
        // ln p(n) = n·ln λ − lnΓ(n+1) − λ
        let lambda = self.votes as f64 / self.max_rho as f64;
        let lnp = n as f64 * lambda.ln() - libm::lgamma(n as f64 + 1.0) - lambda;

        if lnp >= self.log_threshold {
            return None;
        }

        let line = self.best_candidate(&found);
        debug!(
            "trigger at n = {n} after {} votes (ln p = {lnp:.2}): {line}",
            self.votes
        );
        Some(line)
    }

    /// Undo a previous [`vote`](Self::vote) for `p`.
    pub fn unvote(&mut self, p: Point) -> Result<(), DetectError> {
        let max_theta = self.trig.max_theta();

        for theta in 0..max_theta {
            let rho = self.scale_rho(p.dot(self.trig.cos_sin(theta)));
            if rho < 0.0 || rho >= self.max_rho as f64 {
                continue;
            }

            let cell = &mut self.counters[rho as usize * max_theta + theta];
            if *cell == 0 {
                return Err(DetectError::accounting(format!(
                    "unvote of {p} hit a zero counter at θ = {theta}"
                )));
            }
            *cell -= 1;
        }

        self.votes = self
            .votes
            .checked_sub(1)
            .ok_or_else(|| DetectError::accounting("unvote without a matching vote"))?;
        Ok(())
    }

    /// Clip a candidate line to the bitmap rectangle.
    ///
    /// Intersections with the four image boundaries are computed from the
    /// line equation, rounded to the nearest pixel, and deduplicated; the
    /// extremes of the surviving set form the clipped segment. A line
    /// through a single corner pixel yields a single-pixel segment.
    pub fn clip(&self, line: &Line) -> Result<Segment, DetectError> {
        let cs = self.trig.cos_sin(line.theta);
        let (cos_t, sin_t) = (cs.x, cs.y);
        let rho = line.rho;

        // Division by a vanishing cos/sin produces an infinity which the
        // saturating cast pins to the integer range, well outside the image.
        let get_x = |y: f64| libm::rint((rho - sin_t * y) / cos_t) as i64;
        let get_y = |x: f64| libm::rint((rho - cos_t * x) / sin_t) as i64;

        let w = self.cols as i64 - 1;
        let h = self.rows as i64 - 1;

        let x_min = get_x(0.0);
        let y_min = get_y(0.0);
        let x_max = get_x(h as f64);
        let y_max = get_y(w as f64);

        let mut endpoints = BTreeSet::new();
        if (0..=h).contains(&y_min) {
            endpoints.insert(Point::new(0, y_min));
        }
        if (0..=w).contains(&x_min) {
            endpoints.insert(Point::new(x_min, 0));
        }
        if (0..=h).contains(&y_max) {
            endpoints.insert(Point::new(w, y_max));
        }
        if (0..=w).contains(&x_max) {
            endpoints.insert(Point::new(x_max, h));
        }

        // More than two survivors means the line passed through corners;
        // the extremes are still the correct endpoints.
        match (endpoints.first(), endpoints.last()) {
            (Some(&first), Some(&last)) => Ok(Segment::new(first, last)),
            _ => Err(DetectError::geometry(format!(
                "line {line} does not intersect the bitmap"
            ))),
        }
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn accumulator(rows: usize, cols: usize, max_theta: usize) -> Accumulator {
        Accumulator::new(rows, cols, max_theta, 1e-12, 3)
    }

    #[test]
    fn rho_info_picks_the_squarest_matrix() {
        assert_eq!(Accumulator::rho_info(10, 10, 1024), (833, 5));
        assert_eq!(Accumulator::rho_info(240, 320, 1024), (799, 0));
        assert_eq!(Accumulator::rho_info(240, 320, 256), (201, -2));
    }

    #[test]
    fn rho_scaling_round_trips() {
        let acc = accumulator(240, 320, 1024);
        for rho in [-350.0, -1.5, 0.0, 0.25, 127.0, 398.0] {
            let scaled = acc.scale_rho(rho);
            let back = acc.unscale_rho(scaled);
            assert!(
                (back - rho).abs() <= libm::scalbn(0.5, -acc.rho_scale),
                "ρ = {rho} came back as {back}"
            );
        }
    }

    #[test]
    fn clip_matches_reference_intersections() {
        let acc = accumulator(240, 320, 1024);

        let clip = |theta, rho| acc.clip(&Line::new(theta, rho)).unwrap();

        assert_eq!(
            clip(256, 100.0),
            Segment::new(Point::new(0, 141), Point::new(141, 0))
        );
        assert_eq!(
            clip(256, 200.0),
            Segment::new(Point::new(44, 239), Point::new(283, 0))
        );
        assert_eq!(
            clip(256, 300.0),
            Segment::new(Point::new(185, 239), Point::new(319, 105))
        );
        assert_eq!(
            clip(256, 0.0),
            Segment::new(Point::new(0, 0), Point::new(0, 0))
        );
        assert_eq!(
            clip(768, 0.0),
            Segment::new(Point::new(0, 0), Point::new(239, 239))
        );
    }

    #[test]
    fn clip_of_a_missing_line_fails() {
        let acc = accumulator(240, 320, 1024);
        let err = acc.clip(&Line::new(256, 1000.0)).unwrap_err();
        assert!(matches!(err, DetectError::InvalidGeometry { .. }));
    }

    #[test]
    fn first_vote_never_triggers() {
        let mut acc = accumulator(240, 320, 1024);
        assert!(acc.vote(Point::new(50, 50)).is_none());
        assert_eq!(acc.votes(), 1);
    }

    #[test]
    fn vote_unvote_restores_all_counters() {
        let mut acc = accumulator(240, 320, 1024);
        let before = acc.counters.clone();

        let points = [Point::new(50, 50), Point::new(17, 200), Point::new(319, 0)];
        for p in points {
            let _ = acc.vote(p);
        }
        for p in points {
            acc.unvote(p).unwrap();
        }

        assert_eq!(acc.counters, before);
        assert_eq!(acc.votes(), 0);
    }

    #[test]
    fn unvote_without_vote_is_an_accounting_breach() {
        let mut acc = accumulator(240, 320, 1024);
        assert!(acc.vote(Point::new(50, 50)).is_none());
        acc.unvote(Point::new(50, 50)).unwrap();

        let err = acc.unvote(Point::new(50, 50)).unwrap_err();
        assert!(matches!(err, DetectError::Accounting { .. }));
    }

    #[test]
    fn out_of_strip_vote_still_counts() {
        // With 16 columns every direction off the y-axis has |cos θ| large
        // enough that this distant point misses every ρ strip; at θ = 90°
        // its ρ is its y coordinate, also far outside.
        let mut acc = accumulator(240, 320, 16);
        assert!(acc.vote(Point::new(100_000, 300)).is_none());
        assert_eq!(acc.votes(), 1);

        acc.unvote(Point::new(100_000, 300)).unwrap();
        assert_eq!(acc.votes(), 0);
    }

    #[test]
    fn colinear_votes_trigger_and_clip_to_the_image() {
        let mut points: Vec<Point> = (50..350).map(|i| Point::new(i, i - 10)).collect();
        points.shuffle(&mut ChaCha8Rng::seed_from_u64(696_408_486));

        let mut acc = accumulator(240, 320, 4096);

        let mut candidate = None;
        for p in points {
            if let Some(line) = acc.vote(p) {
                candidate = Some(line);
                break;
            }
        }

        let line = candidate.expect("colinear votes must trigger");
        assert_eq!(line.theta, 3072, "expected the exact 135° column");
        assert_eq!(
            acc.clip(&line).unwrap(),
            Segment::new(Point::new(10, 0), Point::new(249, 239))
        );
    }

    #[test]
    fn tie_break_prefers_simple_fractions_of_pi() {
        // A staircase-free diagonal: the winning angle must be exactly 45°
        // (2700 parts of 3600 measured from the perpendicular), not one of
        // the adjacent staircase columns.
        let mut points: Vec<Point> = (50..350).map(|i| Point::new(i, i)).collect();
        points.shuffle(&mut ChaCha8Rng::seed_from_u64(0xfeed));

        let mut acc = accumulator(240, 320, 3600);

        let mut candidate = None;
        for p in points {
            if let Some(line) = acc.vote(p) {
                candidate = Some(line);
                break;
            }
        }

        let line = candidate.expect("diagonal votes must trigger");
        assert_eq!(line.theta, 2700);
        assert!(line.rho.abs() < 1.0);
    }
}
