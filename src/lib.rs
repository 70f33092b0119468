#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod detector;
pub mod error;
pub mod postprocess;
pub mod state;
pub mod types;

// Algorithm internals – public for tools and tests, but expect churn.
pub mod accumulator;
pub mod channel;
pub mod scan;
pub mod trig;

// --- High-level re-exports -------------------------------------------------

// Main entry points: detector + results.
pub use crate::detector::{find_segments, DetectorParams, SegmentDetector};
pub use crate::error::DetectError;
pub use crate::postprocess::Postprocessor;
pub use crate::state::StateMap;
pub use crate::types::{Line, PixelStatus, Point, Segment};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use hough_detector::prelude::*;
///
/// let mut state = StateMap::new(480, 640);
/// state.mark_pending(Point::new(10, 10));
///
/// let segments = find_segments(state, &DetectorParams::default(), 1).unwrap();
/// println!("found {} segments", segments.len());
/// ```
pub mod prelude {
    pub use crate::detector::{find_segments, DetectorParams, SegmentDetector};
    pub use crate::state::StateMap;
    pub use crate::types::{Point, Segment};
}
