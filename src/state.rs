//! Per-pixel status raster and the pending-pixel sampler.

use crate::error::DetectError;
use crate::types::{PixelStatus, Point};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// The mutable state of one detection run.
///
/// Every pixel carries a [`PixelStatus`]; the coordinates of all pixels that
/// were ever marked pending sit in a queue from which the driver draws
/// uniformly at random. Queue entries whose status has since moved past
/// `Pending` are *stale*: they are evicted lazily at draw time rather than
/// proactively on every commit, which keeps [`StateMap::next`] amortized
/// O(1).
#[derive(Debug, Clone)]
pub struct StateMap {
    status: Vec<PixelStatus>,
    rows: usize,
    cols: usize,
    pending: Vec<Point>,
}

impl StateMap {
    /// Create an all-`Unset` raster of the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            status: vec![PixelStatus::Unset; rows * cols],
            rows,
            cols,
            pending: Vec::new(),
        }
    }

    /// Build a state from a row-major byte mask, marking every nonzero byte
    /// pending. `mask.len()` must be `rows * cols`.
    pub fn from_mask(rows: usize, cols: usize, mask: &[u8]) -> Self {
        assert_eq!(mask.len(), rows * cols, "mask does not match dimensions");

        let mut state = Self::new(rows, cols);
        for y in 0..rows {
            for x in 0..cols {
                if mask[y * cols + x] != 0 {
                    state.mark_pending(Point::new(x as i64, y as i64));
                }
            }
        }
        state
    }

    /// Height of the raster.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Width of the raster.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the point lies inside the raster.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.cols && (p.y as usize) < self.rows
    }

    #[inline]
    fn index(&self, p: Point) -> Result<usize, DetectError> {
        if self.contains(p) {
            Ok(p.y as usize * self.cols + p.x as usize)
        } else {
            Err(DetectError::OutOfBounds { point: p })
        }
    }

    /// Current status of the pixel at `p`.
    pub fn status(&self, p: Point) -> Result<PixelStatus, DetectError> {
        Ok(self.status[self.index(p)?])
    }

    /// Mark an unset pixel pending and enqueue it for sampling.
    pub fn mark_pending(&mut self, p: Point) {
        let idx = self.index(p).expect("mark_pending outside raster");
        debug_assert_eq!(self.status[idx], PixelStatus::Unset);
        self.status[idx] = PixelStatus::Pending;
        self.pending.push(p);
    }

    /// Mark a pixel done. Idempotent; a done pixel never changes again.
    pub fn mark_done(&mut self, p: Point) -> Result<(), DetectError> {
        let idx = self.index(p)?;
        self.status[idx] = PixelStatus::Done;
        Ok(())
    }

    /// Draw one pending pixel uniformly at random, transition it to
    /// `Voted`, and return it. Returns `None` once no pending pixels remain.
    ///
    /// Stale queue entries do not bias the draw: the front of the queue is
    /// trimmed first, and a sampled entry that turns out stale is discarded
    /// and the draw repeated over the remainder. Removal is swap-with-last.
    pub fn next(&mut self, rng: &mut ChaCha8Rng) -> Option<Point> {
        // Queue entries were in bounds when inserted.
        let cols = self.cols;
        let raw_index = move |p: Point| p.y as usize * cols + p.x as usize;

        while let Some(&front) = self.pending.first() {
            if self.status[raw_index(front)] == PixelStatus::Pending {
                break;
            }
            self.pending.swap_remove(0);
        }

        while !self.pending.is_empty() {
            let slot = rng.gen_range(0..self.pending.len());
            let p = self.pending.swap_remove(slot);

            let idx = raw_index(p);
            if self.status[idx] == PixelStatus::Pending {
                self.status[idx] = PixelStatus::Voted;
                return Some(p);
            }
        }

        None
    }
}
