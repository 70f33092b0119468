//! Geometric value types shared across the detector pipeline.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// An integer pixel coordinate.
///
/// Points are ordered lexicographically on `(x, y)`, which makes them usable
/// as keys in sorted sets of pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    #[inline]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean length of the vector from the origin.
    #[inline]
    pub fn length_squared(self) -> i64 {
        self.x * self.x + self.y * self.y
    }

    /// Dot product with a unit direction, typically a (cos θ, sin θ) pair.
    #[inline]
    pub fn dot(self, dir: &Vector2<f64>) -> f64 {
        self.x as f64 * dir.x + self.y as f64 * dir.y
    }
}

impl Add for Point {
    type Output = Point;

    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    #[inline]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An unordered pair of endpoints.
///
/// Equality is order-insensitive: `{a, b}` and `{b, a}` are the same segment.
#[derive(Clone, Copy, Debug, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    #[inline]
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// Squared distance between the endpoints.
    #[inline]
    pub fn length_squared(&self) -> i64 {
        (self.b - self.a).length_squared()
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        (self.a == other.a && self.b == other.b) || (self.a == other.b && self.b == other.a)
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}--{}", self.a, self.b)
    }
}

/// A line in Hough normal form: `ρ = x·cos θ + y·sin θ`.
///
/// `theta` is quantized in parts per semiturn; `rho` is the real-valued
/// signed length of the perpendicular from the origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub theta: usize,
    pub rho: f64,
}

impl Line {
    #[inline]
    pub const fn new(theta: usize, rho: f64) -> Self {
        Self { theta, rho }
    }
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(θ = {}, ρ = {})", self.theta, self.rho)
    }
}

/// Lifecycle tag of a pixel in the [`StateMap`](crate::StateMap).
///
/// Legal transitions are `Unset → Pending → Voted → Done` with the shortcut
/// `Pending → Done` for pixels committed without an individual vote. A pixel
/// never leaves `Done`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelStatus {
    #[default]
    Unset,
    Pending,
    Voted,
    Done,
}

impl std::fmt::Display for PixelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PixelStatus::Unset => "unset",
            PixelStatus::Pending => "pending",
            PixelStatus::Voted => "voted",
            PixelStatus::Done => "done",
        };
        f.write_str(name)
    }
}
