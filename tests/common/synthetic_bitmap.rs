use hough_detector::{Point, StateMap};
use std::collections::BTreeSet;

/// Collects foreground pixels for a synthetic test bitmap and turns them
/// into a populated state map.
pub struct BitmapBuilder {
    rows: usize,
    cols: usize,
    points: BTreeSet<Point>,
}

impl BitmapBuilder {
    pub fn new(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "image dimensions must be positive");
        Self {
            rows,
            cols,
            points: BTreeSet::new(),
        }
    }

    pub fn set(&mut self, x: i64, y: i64) -> &mut Self {
        assert!(x >= 0 && (x as usize) < self.cols, "x out of range: {x}");
        assert!(y >= 0 && (y as usize) < self.rows, "y out of range: {y}");
        self.points.insert(Point::new(x, y));
        self
    }

    /// Rasterize the segment from `a` to `b` with a unit-step walk along
    /// the major axis.
    pub fn segment(&mut self, a: Point, b: Point) -> &mut Self {
        let delta = b - a;
        let steps = delta.x.abs().max(delta.y.abs());
        if steps == 0 {
            return self.set(a.x, a.y);
        }

        for i in 0..=steps {
            let x = a.x + (delta.x * i + (delta.x.signum() * steps) / 2) / steps;
            let y = a.y + (delta.y * i + (delta.y.signum() * steps) / 2) / steps;
            self.set(x, y);
        }
        self
    }

    /// Axis-aligned rectangle outline with corners `(x0, y0)` and `(x1, y1)`.
    pub fn rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64) -> &mut Self {
        self.segment(Point::new(x0, y0), Point::new(x1, y0))
            .segment(Point::new(x0, y1), Point::new(x1, y1))
            .segment(Point::new(x0, y0), Point::new(x0, y1))
            .segment(Point::new(x1, y0), Point::new(x1, y1))
    }

    pub fn build(&self) -> StateMap {
        let mut state = StateMap::new(self.rows, self.cols);
        for p in &self.points {
            state.mark_pending(*p);
        }
        state
    }
}
