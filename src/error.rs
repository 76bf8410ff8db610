use thiserror::Error;

/// Result type alias for operations that may fail with [`TraceError`].
pub type TraceResult<T> = std::result::Result<T, TraceError>;

/// Error types that can occur while tracing contours.
///
/// Tracker errors are contract violations: they are surfaced as soon as they are
/// detected and the pass that raised them should be discarded. The remaining
/// variants wrap image I/O and array conversion failures from the outer layers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TraceError {
    /// A row does not cover the width established for the current pass.
    #[error("row covers {found} columns but the tracker expects {expected}")]
    RowWidthMismatch { expected: usize, found: usize },
    /// A run-length row overshoots the row width.
    #[error("run lengths sum to {sum}, overshooting the row width {width}")]
    MalformedRun { width: usize, sum: u64 },
    /// Polygon-only and polyline+polygon row calls were mixed within one pass.
    #[error("output mode changed within one pass; use the same row entry point for every row")]
    InconsistentOutputMode,
    /// A row or a flush arrived before the row width was known.
    #[error("row width is not initialized")]
    UninitializedWidth,
    /// Internal bookkeeping of open fragment endpoints went inconsistent.
    #[error("sprout invariant violated at row {row}: {detail}")]
    SproutInvariantViolated { row: i64, detail: &'static str },
    /// A row was supplied after the pass was flushed.
    #[error("tracker already flushed; reset it before adding rows")]
    Flushed,
    /// Caller supplied storage is shorter than the buffer dimensions require.
    #[error("storage holds {found} words but {expected} are required")]
    StorageTooSmall { expected: usize, found: usize },
    /// Image loading, decoding, or encoding error.
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),
    /// File system I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Array shape mismatch or invalid dimensions.
    #[error("Invalid array shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
