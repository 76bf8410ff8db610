use image::GrayImage;

use crate::config::TraceOptions;
use crate::fixed::{Coord, Level};
use crate::geom::Curves;
use crate::mask::{invert_mask, mask_to_bits};
use crate::pixel::Pixel;
use crate::trace::{ContourTracker, OutputMode, ZeroCrossTracker};
use crate::TraceResult;

/// A trait representing an algorithm that can turn a mask into a vector representation.
pub trait MaskVectorizer {
    type Options;
    type Output;

    fn vectorize(&self, mask: &GrayImage, options: &Self::Options) -> TraceResult<Self::Output>;
}

/// Pixel-edge tracing of a mask, non-zero pixels being foreground.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryVectorizer;

impl MaskVectorizer for BinaryVectorizer {
    type Options = TraceOptions;
    type Output = Curves<i32>;

    fn vectorize(&self, mask: &GrayImage, options: &Self::Options) -> TraceResult<Self::Output> {
        let mut bits = mask_to_bits(mask);
        if options.invert {
            bits.complement();
        }
        let mut tracker = ContourTracker::new().with_first_row(options.first_row);
        let mut curves = Curves::default();
        match options.mode {
            OutputMode::Polygons => tracker.vectorize(&bits, &mut curves.polygons)?,
            OutputMode::Split => {
                tracker.vectorize_split(&bits, &mut curves.polylines, &mut curves.polygons)?
            }
        }
        Ok(curves)
    }
}

/// Sub-pixel tracing of the level set where the mask crosses its zero level.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroCrossVectorizer;

impl MaskVectorizer for ZeroCrossVectorizer {
    type Options = TraceOptions;
    type Output = Curves<Coord>;

    fn vectorize(&self, mask: &GrayImage, options: &Self::Options) -> TraceResult<Self::Output> {
        let zero = options.zero().unwrap_or_else(u8::default_zero);
        // 255 - v measured from 255 - zero negates every level
        let inverted = options.invert.then(|| invert_mask(mask));
        let (image, zero) = match &inverted {
            Some(inverted) => (inverted, Level::from_int(255) - zero),
            None => (mask, zero),
        };
        let mut tracker = ZeroCrossTracker::new()
            .with_first_row(options.first_row)
            .with_zero_level(zero);
        let mut curves = Curves::default();
        match options.mode {
            OutputMode::Polygons => tracker.vectorize(image, &mut curves.polygons)?,
            OutputMode::Split => {
                tracker.vectorize_split(image, &mut curves.polylines, &mut curves.polygons)?
            }
        }
        Ok(curves)
    }
}
