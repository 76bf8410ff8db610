use crate::fixed::Level;
use crate::trace::OutputMode;

/// Which tracer turns a mask into contours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracerKind {
    /// Pixel-edge contours on integer cell corners.
    #[default]
    Binary,
    /// Sub-pixel contours along the zero level of `pixel - zero_level`.
    ZeroCrossing,
}

/// Options for tracing a mask.
#[derive(Debug, Clone, Default)]
pub struct TraceOptions {
    pub mode: OutputMode,
    pub tracer: TracerKind,
    /// Row number given to the first image row.
    pub first_row: i32,
    /// Threshold for the zero-crossing tracer; the pixel type's default when unset.
    pub zero_level: Option<f32>,
    /// Trace the complement of the mask.
    pub invert: bool,
}

impl TraceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tracer(mut self, tracer: TracerKind) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_first_row(mut self, first_row: i32) -> Self {
        self.first_row = first_row;
        self
    }

    pub fn with_zero_level(mut self, zero_level: Option<f32>) -> Self {
        self.zero_level = zero_level;
        self
    }

    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub(crate) fn zero(&self) -> Option<Level> {
        self.zero_level.map(Level::from_f32)
    }
}

/// Options describing how a mask should be pre-processed before tracing.
#[derive(Debug, Clone)]
pub struct MaskProcessingOptions {
    pub blur: bool,
    pub blur_sigma: f32,
    /// Threshold at a fixed grey value.
    pub binary: bool,
    pub mask_threshold: u8,
    /// Threshold at the mean grey level, ignoring the darkest and brightest tenth
    /// of the pixels. Takes precedence over `binary`.
    pub mean_threshold: bool,
    pub dilate: bool,
    pub dilation_radius: f32,
    pub fill_holes: bool,
    pub invert: bool,
}

impl Default for MaskProcessingOptions {
    fn default() -> Self {
        Self {
            blur: false,
            blur_sigma: 6.0,
            binary: true,
            mask_threshold: 120,
            mean_threshold: false,
            dilate: false,
            dilation_radius: 5.0,
            fill_holes: false,
            invert: false,
        }
    }
}

impl MaskProcessingOptions {
    pub fn with_blur(mut self, sigma: Option<f32>) -> Self {
        self.blur = sigma.is_some();
        if let Some(sigma) = sigma {
            self.blur_sigma = sigma;
        }
        self
    }

    pub fn with_threshold(mut self, threshold: Option<u8>) -> Self {
        self.binary = threshold.is_some();
        if let Some(threshold) = threshold {
            self.mask_threshold = threshold;
        }
        self
    }

    pub fn with_mean_threshold(mut self, mean_threshold: bool) -> Self {
        self.mean_threshold = mean_threshold;
        self
    }

    pub fn with_dilation(mut self, radius: Option<f32>) -> Self {
        self.dilate = radius.is_some();
        if let Some(radius) = radius {
            self.dilation_radius = radius;
        }
        self
    }

    pub fn with_fill_holes(mut self, fill_holes: bool) -> Self {
        self.fill_holes = fill_holes;
        self
    }

    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }
}
