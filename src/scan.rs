//! Channel sweep: walking a candidate line and extracting the longest
//! supported subsegment.

use crate::accumulator::Accumulator;
use crate::channel::Channel;
use crate::error::DetectError;
use crate::state::StateMap;
use crate::types::{PixelStatus, Point, Segment};
use log::debug;
use std::collections::BTreeSet;

/// A contiguous run of canonical points together with the set pixels that
/// support it.
///
/// The segment spans the first and last canonical points that contributed;
/// the pixel set holds every pending or voted pixel found in the
/// cross-sections along the way. The segment need not pass through all of
/// the pixels.
#[derive(Debug, Clone, Default)]
pub struct ScanRun {
    points: BTreeSet<Point>,
    first: Point,
    last: Point,
}

impl ScanRun {
    /// Extend the run to `canonical`, absorbing its supporting pixels.
    fn extend(&mut self, canonical: Point, found: BTreeSet<Point>) {
        debug_assert!(!found.is_empty());

        if self.points.is_empty() {
            self.first = canonical;
        }
        self.last = canonical;

        self.points.extend(found);
    }

    /// The canonical endpoints of the run.
    #[inline]
    pub fn endpoints(&self) -> Segment {
        Segment::new(self.first, self.last)
    }

    /// Squared length of the canonical run. Zero for an empty set.
    #[inline]
    pub fn length_squared(&self) -> i64 {
        (self.last - self.first).length_squared()
    }

    /// Number of supporting pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Retire the supporting pixels: withdraw the votes of `Voted` pixels,
    /// leave `Pending` ones unvoted, and mark every pixel done.
    ///
    /// Any other status means the bookkeeping between the state map and the
    /// accumulator has diverged, which is fatal.
    pub fn commit(
        self,
        state: &mut StateMap,
        accumulator: &mut Accumulator,
    ) -> Result<(), DetectError> {
        for point in self.points {
            match state.status(point)? {
                PixelStatus::Voted => accumulator.unvote(point)?,
                PixelStatus::Pending => {}
                status => {
                    return Err(DetectError::accounting(format!(
                        "committed pixel {point} has status {status}"
                    )));
                }
            }

            state.mark_done(point)?;
        }

        Ok(())
    }
}

/// Sweep the channel around a clipped candidate line and return the longest
/// contiguous subsegment of set pixels.
///
/// A canonical point whose cross-section holds no pending or voted pixel
/// widens the current gap; once the gap exceeds `max_gap` the next hit
/// starts a fresh subsegment. Ties in length go to the earliest subsegment.
pub fn scan(
    state: &StateMap,
    clip: &Segment,
    radius: usize,
    max_gap: usize,
) -> Result<ScanRun, DetectError> {
    // Technically the initial gap is infinite, but anything past max_gap
    // forces a new subsegment at the first hit.
    let mut gap = max_gap + 1;

    let mut runs: Vec<ScanRun> = Vec::new();

    for (canonical, pixels) in Channel::new(clip.a, clip.b, radius)?.iter() {
        let found: BTreeSet<Point> = pixels
            .into_iter()
            .filter(|&p| {
                state.contains(p)
                    && matches!(
                        state.status(p),
                        Ok(PixelStatus::Pending) | Ok(PixelStatus::Voted)
                    )
            })
            .collect();

        if found.is_empty() {
            gap += 1;
            continue;
        }

        if gap > max_gap {
            runs.push(ScanRun::default());
        }
        runs.last_mut()
            .expect("a run exists after a hit")
            .extend(canonical, found);
        gap = 0;
    }

    let mut longest: Option<ScanRun> = None;
    for run in runs {
        let beats = longest
            .as_ref()
            .map_or(true, |best| run.length_squared() > best.length_squared());
        if beats {
            longest = Some(run);
        }
    }

    match longest {
        Some(run) => {
            debug!(
                "scan of {clip} kept {} with {} supporting pixels",
                run.endpoints(),
                run.len()
            );
            Ok(run)
        }
        None => Err(DetectError::EmptyChannel),
    }
}
