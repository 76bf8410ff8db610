//! Row-streaming contour tracers.
//!
//! Both tracers consume an image one row at a time, top to bottom, and keep a set of
//! open fragments whose lower endpoints ("sprouts") sit on the last row seen. Each
//! new row extends, joins or closes those fragments; fragments that stop growing are
//! moved into the caller's output vectors.
//!
//! Every emitted contour keeps the background on the left of each directed edge
//! when viewed with y pointing up (on the right with y pointing down, as in image
//! coordinates). Closed polygons around foreground therefore have negative
//! [`signed_area`](crate::geom::signed_area) and holes positive.

mod binary;
mod fragment;
mod zero_cross;

pub use binary::ContourTracker;
pub use zero_cross::ZeroCrossTracker;

use crate::error::{TraceError, TraceResult};

/// How contours that touch the image border are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputMode {
    /// Pad the image with one background pixel on every side so that every
    /// boundary closes into a polygon.
    #[default]
    Polygons,
    /// Leave the image unpadded: boundaries that reach the border are emitted as
    /// open polylines, the rest as polygons.
    Split,
}

impl OutputMode {
    /// Number of virtual background columns added on each side.
    pub(crate) fn border(self) -> i32 {
        match self {
            OutputMode::Polygons => 1,
            OutputMode::Split => 0,
        }
    }
}

/// Progress of one tracing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    #[default]
    Empty,
    Accumulating,
    Flushed,
}

/// Mode and lifecycle bookkeeping shared by both tracers.
#[derive(Debug, Clone, Default)]
pub(crate) struct Pass {
    pub mode: Option<OutputMode>,
    pub state: Lifecycle,
}

impl Pass {
    /// Validate a row call and fix the output mode on the first one.
    pub fn begin_row(&mut self, mode: OutputMode) -> TraceResult<()> {
        if self.state == Lifecycle::Flushed {
            return Err(TraceError::Flushed);
        }
        match self.mode {
            None => self.mode = Some(mode),
            Some(current) if current != mode => return Err(TraceError::InconsistentOutputMode),
            Some(_) => {}
        }
        Ok(())
    }

    pub fn is_first_row(&self) -> bool {
        self.state == Lifecycle::Empty
    }

    pub fn border(&self) -> i32 {
        self.mode.map_or(0, OutputMode::border)
    }
}
