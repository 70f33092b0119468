//! Error taxonomy of the detection core.
//!
//! Every variant here signals a broken programming invariant, not an
//! ordinary negative outcome. "No candidate this vote" and "subsegment too
//! short" are regular control flow inside the driver loop and never surface
//! as errors; anything below aborts detection with no partial results.

use crate::types::Point;

/// Fatal conditions raised by the detection core.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    /// Channel endpoints coincide, or a degenerate line produced no
    /// endpoints inside the image rectangle.
    InvalidGeometry { detail: String },
    /// Vote bookkeeping broke: an unvote hit a zero counter, the vote count
    /// underflowed, or a committed pixel carried an illegal status.
    Accounting { detail: String },
    /// A channel sweep over a candidate line found no set pixels. A
    /// candidate only arises from real votes, so this should not occur.
    EmptyChannel,
    /// A pixel status query addressed a point outside the raster.
    OutOfBounds { point: Point },
}

impl DetectError {
    pub(crate) fn geometry(detail: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            detail: detail.into(),
        }
    }

    pub(crate) fn accounting(detail: impl Into<String>) -> Self {
        Self::Accounting {
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidGeometry { detail } => write!(f, "invalid geometry: {detail}"),
            Self::Accounting { detail } => write!(f, "vote accounting breach: {detail}"),
            Self::EmptyChannel => write!(f, "channel contained no viable segments"),
            Self::OutOfBounds { point } => {
                write!(f, "point {point} lies outside the state raster")
            }
        }
    }
}

impl std::error::Error for DetectError {}
