//! Thick-line channel tracing.
//!
//! A [`Channel`] walks the ideal line between two endpoints and yields, for
//! every *canonical point* on that line, the set of pixels forming the
//! perpendicular cross-section of the thick line at that point. The
//! cross-sections are disjoint and together cover the whole thick line, so a
//! sweep can test every channel pixel exactly once.

use crate::error::DetectError;
use crate::types::Point;
use std::collections::BTreeSet;

/// The axis along which a scanner makes its unit steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl Axis {
    #[inline]
    fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

#[inline]
fn coord(p: Point, axis: Axis) -> i64 {
    match axis {
        Axis::X => p.x,
        Axis::Y => p.y,
    }
}

#[inline]
fn coord_mut(p: &mut Point, axis: Axis) -> &mut i64 {
    match axis {
        Axis::X => &mut p.x,
        Axis::Y => &mut p.y,
    }
}

/// Scanner for lines parallel to an axis. Carries no per-step state; the
/// cross-section is simply `2r − 1` pixels along the minor axis.
#[derive(Clone, Debug)]
struct AxialScanner {
    major: Axis,
    step: Point,
    radius: i64,
}

impl AxialScanner {
    fn new(delta: Point, radius: usize, major: Axis) -> Self {
        let step = Point::new(delta.x.signum(), delta.y.signum());
        debug_assert_ne!(coord(step, major), 0);
        debug_assert_eq!(coord(step, major.other()), 0);
        Self {
            major,
            step,
            radius: radius as i64,
        }
    }

    fn fill(&self, mut pt: Point, pts: &mut BTreeSet<Point>) {
        let minor = self.major.other();
        *coord_mut(&mut pt, minor) -= self.radius;
        for _ in 1..2 * self.radius {
            *coord_mut(&mut pt, minor) += 1;
            pts.insert(pt);
        }
    }

    fn advance(&self, pt: &mut Point) {
        *coord_mut(pt, self.major) += coord(self.step, self.major);
    }
}

/// General thick-line scanner after Bresenham and Murphy.
///
/// The canonical walk is plain Bresenham along the major axis; the
/// cross-sections are drawn by running the same error recurrence along the
/// perpendicular in both directions until the accumulated thickness exceeds
/// `2r·√(Δx² + Δy²)`. The `phase` term tracks where the perpendicular sits
/// relative to the canonical line so adjacent cross-sections neither overlap
/// nor leave gaps; in one boundary case that requires a compensating second
/// perpendicular shifted by one minor-axis step.
#[derive(Clone, Debug)]
struct BresenhamScanner {
    major: Axis,
    delta: Point,
    step: Point,
    perp_step: Point,
    width: f64,
    threshold: i64,
    post_minor: i64,
    post_major: i64,
    error: i64,
    phase: i64,
}

impl BresenhamScanner {
    fn new(delta: Point, radius: usize, major: Axis) -> Self {
        let abs = Point::new(delta.x.abs(), delta.y.abs());
        let step = Point::new(delta.x.signum(), delta.y.signum());
        let perp_step = match major {
            Axis::X => Point::new(-step.x, step.y),
            Axis::Y => Point::new(step.x, -step.y),
        };
        let minor = major.other();
        Self {
            major,
            delta: abs,
            step,
            perp_step,
            width: 2.0 * radius as f64 * (abs.x as f64).hypot(abs.y as f64),
            threshold: coord(abs, major) - 2 * coord(abs, minor),
            post_minor: -2 * coord(abs, major),
            post_major: 2 * coord(abs, minor),
            error: 0,
            phase: 0,
        }
    }

    fn perpendiculars(
        &self,
        pt: Point,
        pts: &mut BTreeSet<Point>,
        initial_phase: i64,
        initial_error: i64,
    ) {
        let minor = self.major.other();
        let d = self.delta.x + self.delta.y;

        let mut p = pt;
        let mut phase = initial_phase;
        let mut tk = d - initial_error;
        while (tk as f64) < self.width {
            pts.insert(p);

            if phase >= self.threshold {
                *coord_mut(&mut p, self.major) += coord(self.perp_step, self.major);
                phase += self.post_minor;
                tk += self.post_major;
            }

            *coord_mut(&mut p, minor) += coord(self.perp_step, minor);
            phase += self.post_major;
            tk -= self.post_minor;
        }

        let mut p = pt;
        let mut phase = -initial_phase;
        let mut tk = d + initial_error;
        while (tk as f64) <= self.width {
            pts.insert(p);

            if phase > self.threshold {
                *coord_mut(&mut p, self.major) -= coord(self.perp_step, self.major);
                phase += self.post_minor;
                tk += self.post_major;
            }

            *coord_mut(&mut p, minor) -= coord(self.perp_step, minor);
            phase += self.post_major;
            tk -= self.post_minor;
        }
    }

    fn fill(&self, mut pt: Point, pts: &mut BTreeSet<Point>) {
        self.perpendiculars(pt, pts, self.phase, self.error);

        if self.error >= self.threshold && self.phase >= self.threshold {
            let minor = self.major.other();
            *coord_mut(&mut pt, minor) += coord(self.step, minor);
            self.perpendiculars(
                pt,
                pts,
                self.phase + self.post_minor + self.post_major,
                self.error + self.post_minor,
            );
        }

        // The canonical point may end up in neither perpendicular; the
        // cross-section must still be non-empty.
        if pts.is_empty() {
            pts.insert(pt);
        }
    }

    fn advance(&mut self, pt: &mut Point) {
        let minor = self.major.other();
        if self.error >= self.threshold {
            *coord_mut(pt, minor) += coord(self.step, minor);
            self.error += self.post_minor;

            if self.phase >= self.threshold {
                self.phase += self.post_minor;
            }
            self.phase += self.post_major;
        }

        *coord_mut(pt, self.major) += coord(self.step, self.major);
        self.error += self.post_major;
    }
}

/// The two scanner variants form a closed set; the variant is chosen once
/// per channel from the delta vector.
#[derive(Clone, Debug)]
enum Scanner {
    Axial(AxialScanner),
    Bresenham(BresenhamScanner),
}

impl Scanner {
    fn for_delta(delta: Point, radius: usize) -> Scanner {
        if delta.x.abs() > delta.y.abs() {
            if delta.y == 0 {
                Scanner::Axial(AxialScanner::new(delta, radius, Axis::X))
            } else {
                Scanner::Bresenham(BresenhamScanner::new(delta, radius, Axis::X))
            }
        } else if delta.x == 0 {
            Scanner::Axial(AxialScanner::new(delta, radius, Axis::Y))
        } else {
            Scanner::Bresenham(BresenhamScanner::new(delta, radius, Axis::Y))
        }
    }

    fn fill(&self, pt: Point, pts: &mut BTreeSet<Point>) {
        match self {
            Scanner::Axial(s) => s.fill(pt, pts),
            Scanner::Bresenham(s) => s.fill(pt, pts),
        }
    }

    fn advance(&mut self, pt: &mut Point) {
        match self {
            Scanner::Axial(s) => s.advance(pt),
            Scanner::Bresenham(s) => s.advance(pt),
        }
    }
}

/// A thick line between two distinct endpoints.
///
/// `radius` is the half-width of the channel including the canonical pixel:
/// a radius of 3 yields cross-sections five pixels long.
#[derive(Clone, Debug)]
pub struct Channel {
    p0: Point,
    p1: Point,
    radius: usize,
}

impl Channel {
    /// Create a channel from `p0` to `p1` with the given radius (≥ 1).
    pub fn new(p0: Point, p1: Point, radius: usize) -> Result<Self, DetectError> {
        if p0 == p1 {
            return Err(DetectError::geometry(format!(
                "channel endpoints must be separated, both are {p0}"
            )));
        }
        debug_assert!(radius >= 1, "channel radius must be at least 1");
        Ok(Self { p0, p1, radius })
    }

    /// Lazily iterate the `(canonical point, cross-section)` pairs from `p0`
    /// to `p1` inclusive.
    pub fn iter(&self) -> ChannelIter {
        ChannelIter {
            scanner: Scanner::for_delta(self.p1 - self.p0, self.radius),
            current: self.p0,
            target: self.p1,
            done: false,
        }
    }
}

impl IntoIterator for &Channel {
    type Item = (Point, BTreeSet<Point>);
    type IntoIter = ChannelIter;

    fn into_iter(self) -> ChannelIter {
        self.iter()
    }
}

/// Iterator over the canonical points of a [`Channel`].
///
/// Each yielded cross-section is an owned sorted set and may be moved into
/// the caller's bookkeeping without copying.
#[derive(Debug)]
pub struct ChannelIter {
    scanner: Scanner,
    current: Point,
    target: Point,
    done: bool,
}

impl Iterator for ChannelIter {
    type Item = (Point, BTreeSet<Point>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let canonical = self.current;
        let mut pixels = BTreeSet::new();
        self.scanner.fill(canonical, &mut pixels);

        if canonical == self.target {
            self.done = true;
        } else {
            self.scanner.advance(&mut self.current);
        }

        Some((canonical, pixels))
    }
}
