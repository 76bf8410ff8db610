use std::collections::VecDeque;

use image::{GrayImage, Luma};
use imageproc::contrast::{ThresholdType, threshold as ip_threshold};
use imageproc::distance_transform::euclidean_squared_distance_transform;
use imageproc::filter::gaussian_blur_f32;
use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::config::MaskProcessingOptions;

/// A single transformation step applied to a grayscale mask image.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskOperation {
    Blur { sigma: f32 },
    Threshold { value: u8 },
    /// Threshold at the trimmed mean grey level of the image itself.
    MeanThreshold,
    Dilate { radius: f32 },
    FillHoles { threshold: u8 },
    Invert,
}

impl MaskOperation {
    pub fn apply(&self, input: &GrayImage) -> GrayImage {
        match self {
            MaskOperation::Blur { sigma } => gaussian_blur_f32(input, *sigma),
            MaskOperation::Threshold { value } => threshold_mask(input, *value),
            MaskOperation::MeanThreshold => threshold_mask(input, mean_level(input)),
            MaskOperation::Dilate { radius } => dilate_euclidean(input, *radius),
            MaskOperation::FillHoles { threshold } => fill_mask_holes(input, *threshold),
            MaskOperation::Invert => invert_mask(input),
        }
    }
}

/// Run a list of operations against the provided source image, returning the transformed mask.
pub fn apply_operations(source: &GrayImage, operations: &[MaskOperation]) -> GrayImage {
    let mut current = source.clone();
    for op in operations {
        debug!(?op, width = current.width(), height = current.height(), "mask operation");
        current = op.apply(&current);
    }
    current
}

/// Produce the standard operation sequence for the given options.
///
/// Order: blur, threshold (mean or fixed), dilate, fill holes, invert.
pub fn operations_from_options(options: &MaskProcessingOptions) -> Vec<MaskOperation> {
    let mut operations = Vec::new();
    if options.blur {
        operations.push(MaskOperation::Blur {
            sigma: options.blur_sigma,
        });
    }
    if options.mean_threshold {
        operations.push(MaskOperation::MeanThreshold);
    } else if options.binary {
        operations.push(MaskOperation::Threshold {
            value: options.mask_threshold,
        });
    }
    if options.dilate {
        operations.push(MaskOperation::Dilate {
            radius: options.dilation_radius,
        });
    }
    if options.fill_holes {
        let threshold = if options.mean_threshold {
            128
        } else {
            options.mask_threshold
        };
        operations.push(MaskOperation::FillHoles { threshold });
    }
    if options.invert {
        operations.push(MaskOperation::Invert);
    }
    operations
}

/// Threshold the grayscale image: values above `thr` become 255, the rest 0.
pub fn threshold_mask(gray: &GrayImage, thr: u8) -> GrayImage {
    ip_threshold(gray, thr, ThresholdType::Binary)
}

/// Mean grey level after discarding the darkest and the brightest 10% of pixels.
///
/// Computed from a 256-bin histogram. Returns 0 for an empty image.
pub fn mean_level(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for Luma([v]) in gray.pixels() {
        histogram[usize::from(*v)] += 1;
    }
    let total: u64 = histogram.iter().sum();
    let trim = total / 10;
    let (mut low, mut high) = (trim, trim);
    let mut kept = [0u64; 256];
    kept.copy_from_slice(&histogram);
    for count in kept.iter_mut() {
        let cut = (*count).min(low);
        *count -= cut;
        low -= cut;
    }
    for count in kept.iter_mut().rev() {
        let cut = (*count).min(high);
        *count -= cut;
        high -= cut;
    }
    let (sum, n) = kept
        .iter()
        .enumerate()
        .fold((0u64, 0u64), |(sum, n), (v, &c)| (sum + v as u64 * c, n + c));
    if n == 0 { 0 } else { ((sum + n / 2) / n) as u8 }
}

pub fn dilate_euclidean(mask_bin: &GrayImage, r: f32) -> GrayImage {
    let d2 = euclidean_squared_distance_transform(mask_bin);
    let r2 = f64::from(r) * f64::from(r);
    let (w, h) = mask_bin.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        Luma([if d2.get_pixel(x, y)[0] <= r2 { 255 } else { 0 }])
    })
}

/// Fill holes in a binary mask: dark pixels not 4-connected to the border turn white.
pub fn fill_mask_holes(mask: &GrayImage, threshold: u8) -> GrayImage {
    let (w, h) = mask.dimensions();
    let dark = |x: u32, y: u32| mask.get_pixel(x, y)[0] < threshold;
    let mut outside = vec![false; w as usize * h as usize];
    let idx = |x: u32, y: u32| y as usize * w as usize + x as usize;

    let mut queue: VecDeque<(u32, u32)> = (0..w)
        .flat_map(|x| [(x, 0), (x, h.saturating_sub(1))])
        .chain((0..h).flat_map(|y| [(0, y), (w.saturating_sub(1), y)]))
        .filter(|&(x, y)| x < w && y < h && dark(x, y))
        .collect();

    while let Some((x, y)) = queue.pop_front() {
        if std::mem::replace(&mut outside[idx(x, y)], true) {
            continue;
        }
        let neighbours = [
            (x.checked_sub(1), Some(y)),
            (x.checked_add(1).filter(|&nx| nx < w), Some(y)),
            (Some(x), y.checked_sub(1)),
            (Some(x), y.checked_add(1).filter(|&ny| ny < h)),
        ];
        for (nx, ny) in neighbours {
            if let (Some(nx), Some(ny)) = (nx, ny) {
                if !outside[idx(nx, ny)] && dark(nx, ny) {
                    queue.push_back((nx, ny));
                }
            }
        }
    }

    GrayImage::from_fn(w, h, |x, y| {
        Luma([if dark(x, y) && outside[idx(x, y)] { 0 } else { 255 }])
    })
}

pub fn invert_mask(gray: &GrayImage) -> GrayImage {
    let mut out = gray.clone();
    image::imageops::invert(&mut out);
    out
}

/// Pack a mask into a boolean pixel buffer, non-zero pixels being foreground.
pub fn mask_to_bits(mask: &GrayImage) -> PixelBuffer<'static, bool> {
    let (w, h) = mask.dimensions();
    PixelBuffer::from_fn(h as usize, w as usize, |r, c| {
        mask.get_pixel(c as u32, r as u32)[0] != 0
    })
}
