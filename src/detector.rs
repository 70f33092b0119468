//! The driver loop tying sampler, accumulator, scanner, and postprocessor
//! together.

use crate::accumulator::Accumulator;
use crate::error::DetectError;
use crate::postprocess::Postprocessor;
use crate::scan::scan;
use crate::state::StateMap;
use crate::types::Segment;
use log::debug;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Tunable parameters of the detector.
///
/// The defaults are reasonable for typical line art; consistency between
/// the values (odd channel width, `max_gap` at least the channel radius) is
/// the caller's responsibility.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Angular resolution in parts per semiturn. Must be even; larger means
    /// finer angles but a larger counter matrix.
    pub max_theta: usize,
    /// Probability below which the Poisson null hypothesis is rejected and
    /// a channel scan is triggered. Lower it for fewer false positives at
    /// the cost of missing small segments.
    pub trigger_threshold: f64,
    /// Colinear points required before the hypothesis test runs at all; the
    /// Poisson approximation breaks down for smaller counts.
    pub min_trigger_points: u16,
    /// Width of the scan channel in pixels. Odd; the channel radius is
    /// `channel_width / 2`, floored to at least one.
    pub channel_width: u16,
    /// Longest run of empty canonical points tolerated inside one segment.
    /// Crossing segments erase pixels, so this should be no less than the
    /// channel radius.
    pub max_gap: u16,
    /// Minimum length of a significant segment, in pixels.
    pub min_length: u16,
    /// Angular slack of the postprocess fusion test, in parts per semiturn.
    pub angle_tolerance: usize,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            max_theta: 3600,
            trigger_threshold: 1e-12,
            min_trigger_points: 3,
            channel_width: 3,
            max_gap: 3,
            min_length: 10,
            angle_tolerance: 80,
        }
    }
}

impl DetectorParams {
    #[inline]
    fn channel_radius(&self) -> usize {
        ((self.channel_width >> 1) as usize).max(1)
    }
}

/// A reusable detector configuration.
#[derive(Debug, Clone, Default)]
pub struct SegmentDetector {
    params: DetectorParams,
}

impl SegmentDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Run one detection over a populated state. See [`find_segments`].
    pub fn detect(&self, state: StateMap, seed: u32) -> Result<Vec<Segment>, DetectError> {
        find_segments(state, &self.params, seed)
    }
}

/// Detect line segments in a populated state map.
///
/// `state` must already have every foreground pixel marked pending. The
/// seed drives the pending-pixel sampling; the same state and seed always
/// produce the same segments. Detection either returns the full segment
/// list or fails fatally; there are no partial results.
pub fn find_segments(
    mut state: StateMap,
    params: &DetectorParams,
    seed: u32,
) -> Result<Vec<Segment>, DetectError> {
    debug_assert!(params.channel_width % 2 == 1, "channel width must be odd");
    debug_assert!(
        params.max_gap as usize >= params.channel_radius(),
        "max_gap below the channel radius splits segments at every crossing"
    );

    let radius = params.channel_radius();
    let max_gap = params.max_gap as usize;
    let min_length_squared = (params.min_length as i64).pow(2);

    let mut accumulator = Accumulator::new(
        state.rows(),
        state.cols(),
        params.max_theta,
        params.trigger_threshold,
        params.min_trigger_points,
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
    let mut segments = Vec::new();

    while let Some(p) = state.next(&mut rng) {
        let Some(line) = accumulator.vote(p) else {
            continue;
        };

        let clip = accumulator.clip(&line)?;
        let found = scan(&state, &clip, radius, max_gap)?;

        // A triggering vote whose channel holds no long-enough run is not
        // committed; its votes stay in effect.
        if found.length_squared() >= min_length_squared {
            let endpoints = found.endpoints();
            found.commit(&mut state, &mut accumulator)?;
            segments.push(endpoints);
        }
    }

    debug!("detection produced {} raw segments", segments.len());

    Postprocessor {
        gap_limit: radius as i64,
        angle_tolerance: params.angle_tolerance,
        max_theta: params.max_theta,
    }
    .run(&mut segments);

    Ok(segments)
}
