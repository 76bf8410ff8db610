//! Streaming contour tracing for raster images.
//!
//! Images are consumed one row at a time by a [`ContourTracker`] (pixel-edge
//! contours of a binary image) or a [`ZeroCrossTracker`] (sub-pixel contours of the
//! zero level of a signed image). [`MaskHandle`] wraps a grayscale mask with
//! a preprocessing pipeline and traces it through a [`MaskVectorizer`].

pub mod buffer;
pub mod config;
pub mod error;
pub mod fixed;
pub mod geom;
pub mod mask;
pub mod pixel;
pub mod rle;
pub mod source;
pub mod trace;
pub mod vectorizer;

pub use buffer::{PixelBuffer, Row, RowMut};
pub use config::{MaskProcessingOptions, TraceOptions, TracerKind};
pub use error::{TraceError, TraceResult};
pub use fixed::{Coord, Fixed, Level};
pub use geom::{Bounds, Contour, Curves, Point};
pub use pixel::Pixel;
pub use rle::{RunArray, RunLength};
pub use source::RowImage;
pub use trace::{ContourTracker, OutputMode, ZeroCrossTracker};
pub use vectorizer::{BinaryVectorizer, MaskVectorizer, ZeroCrossVectorizer};

use std::path::Path;

use image::GrayImage;

use crate::mask::{MaskOperation, apply_operations, operations_from_options};

/// Builder-style handle over a grayscale mask with pending processing operations.
#[derive(Debug, Clone)]
pub struct MaskHandle {
    mask: GrayImage,
    /// Used by [`MaskHandle::processed`] when nothing else was requested.
    default_mask_processing: MaskProcessingOptions,
    operations: Vec<MaskOperation>,
}

impl MaskHandle {
    /// Load an image from disk, converting it to 8-bit grayscale.
    pub fn open(path: impl AsRef<Path>) -> TraceResult<Self> {
        let mask = image::open(path)?.into_luma8();
        Ok(Self::from_image(mask))
    }

    pub fn from_image(mask: GrayImage) -> Self {
        Self {
            mask,
            default_mask_processing: MaskProcessingOptions::default(),
            operations: Vec::new(),
        }
    }

    /// Set the options used when [`processed`](Self::processed) has nothing queued.
    pub fn with_default_mask_processing(mut self, options: MaskProcessingOptions) -> Self {
        self.default_mask_processing = options;
        self
    }

    /// Get a reference to the default mask processing options.
    pub fn default_mask_processing(&self) -> &MaskProcessingOptions {
        &self.default_mask_processing
    }

    /// Get a reference to the mask.
    pub fn image(&self) -> &GrayImage {
        &self.mask
    }

    /// Consume the handle and return the mask.
    pub fn into_image(self) -> GrayImage {
        self.mask
    }

    /// Save the mask to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> TraceResult<()> {
        self.mask.save(path)?;
        Ok(())
    }

    /// Add a blur operation to the processing pipeline.
    pub fn blur(mut self, sigma: f32) -> Self {
        self.operations.push(MaskOperation::Blur { sigma });
        self
    }

    /// Add a threshold operation to the processing pipeline.
    pub fn threshold(mut self, value: u8) -> Self {
        self.operations.push(MaskOperation::Threshold { value });
        self
    }

    /// Add a threshold at the trimmed mean grey level to the processing pipeline.
    pub fn mean_threshold(mut self) -> Self {
        self.operations.push(MaskOperation::MeanThreshold);
        self
    }

    /// Add a dilation operation to the processing pipeline.
    pub fn dilate(mut self, radius: f32) -> Self {
        self.operations.push(MaskOperation::Dilate { radius });
        self
    }

    /// Add a hole-filling operation to the processing pipeline.
    pub fn fill_holes(mut self) -> Self {
        let threshold = self.default_mask_processing.mask_threshold;
        self.operations.push(MaskOperation::FillHoles { threshold });
        self
    }

    pub fn invert(mut self) -> Self {
        self.operations.push(MaskOperation::Invert);
        self
    }

    /// Process the mask with the accumulated operations and optional custom options.
    ///
    /// Without custom options and without queued operations, the default options
    /// are applied.
    pub fn processed(self, options: Option<&MaskProcessingOptions>) -> TraceResult<MaskHandle> {
        let mut ops = self.operations;
        match options {
            Some(custom) => ops.extend(operations_from_options(custom)),
            None if ops.is_empty() => {
                ops.extend(operations_from_options(&self.default_mask_processing))
            }
            None => {}
        }

        let mask = apply_operations(&self.mask, &ops);
        Ok(MaskHandle {
            mask,
            default_mask_processing: self.default_mask_processing,
            operations: Vec::new(),
        })
    }

    /// Trace the current mask using the specified vectorizer and options.
    ///
    /// Queued operations are not applied; call [`processed`](Self::processed) first.
    pub fn trace<V>(&self, vectorizer: &V, options: &V::Options) -> TraceResult<V::Output>
    where
        V: MaskVectorizer,
    {
        vectorizer.vectorize(&self.mask, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn blob() -> GrayImage {
        GrayImage::from_fn(8, 8, |x, y| {
            let inside = (2..6).contains(&x) && (2..6).contains(&y) && !(x == 3 && y == 3);
            Luma([if inside { 200 } else { 30 }])
        })
    }

    mod mask_handle {
        use super::*;

        mod unit {
            use super::*;

            #[test]
            fn default_processing_thresholds() {
                let processed = MaskHandle::from_image(blob()).processed(None).expect("processed");
                assert!(processed.image().pixels().all(|p| p[0] == 0 || p[0] == 255));
                assert_eq!(processed.image().get_pixel(3, 3)[0], 0);
                assert_eq!(processed.image().get_pixel(2, 2)[0], 255);
            }

            #[test]
            fn queued_operations_replace_defaults() {
                let processed = MaskHandle::from_image(blob())
                    .threshold(100)
                    .fill_holes()
                    .processed(None)
                    .expect("processed");
                assert_eq!(processed.image().get_pixel(3, 3)[0], 255);
            }

            #[test]
            fn traced_blob_with_hole() {
                let curves = MaskHandle::from_image(blob())
                    .mean_threshold()
                    .processed(None)
                    .expect("processed")
                    .trace(&BinaryVectorizer, &TraceOptions::default())
                    .expect("traced");
                let mut areas: Vec<f64> = curves.polygons.iter().map(|p| geom::signed_area(p)).collect();
                areas.sort_by(f64::total_cmp);
                assert_eq!(areas, vec![-16.0, 1.0]);
            }

            #[test]
            fn save_and_open_round_trip() {
                let dir = tempfile::tempdir().expect("temp dir");
                let path = dir.path().join("mask.png");
                let handle = MaskHandle::from_image(blob()).invert().processed(None).expect("processed");
                handle.save(&path).expect("saved");
                let reopened = MaskHandle::open(&path).expect("opened");
                assert_eq!(reopened.image(), handle.image());
                assert_eq!(reopened.into_image().get_pixel(0, 0)[0], 225);
            }

            #[test]
            fn missing_file_is_an_image_error() {
                let dir = tempfile::tempdir().expect("temp dir");
                let result = MaskHandle::open(dir.path().join("absent.png"));
                assert!(matches!(result, Err(TraceError::Image(_))));
            }
        }
    }
}
