use std::path::{Path, PathBuf};

use rowtrace::{MaskHandle, MaskProcessingOptions, TraceResult};

use crate::cli::MaskProcessingArgs;

/// Load the input image as a grayscale mask with the requested default processing.
pub fn open_mask(input: &Path, mask_args: &MaskProcessingArgs) -> TraceResult<MaskHandle> {
    let mask_processing: MaskProcessingOptions = mask_args.into();
    Ok(MaskHandle::open(input)?.with_default_mask_processing(mask_processing))
}

/// Derive a variant file path by appending a suffix before the extension.
pub fn derive_variant_path(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let mut derived = input.to_path_buf();
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| suffix.to_string());
    let filename = format!("{}-{}.{}", stem, suffix, extension);
    derived.set_file_name(filename);
    derived
}

/// Derive an SVG file path by changing the extension to "svg".
pub fn derive_svg_path(input: &Path) -> PathBuf {
    let mut path = input.to_path_buf();
    path.set_extension("svg");
    path
}
