use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rowtrace::{MaskProcessingOptions, OutputMode, TraceOptions, TracerKind};

/// Command line interface definition.
#[derive(Parser, Debug)]
#[command(author, version, about, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalOptions {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Log filter directives, e.g. `rowtrace=debug`
    #[arg(long = "log", env = "RUST_LOG", global = true, hide_env_values = true)]
    pub log_filter: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the processed mask as a PNG
    Mask(MaskCommand),
    /// Trace the mask into an SVG outline
    Trace(TraceCommand),
}

#[derive(Args, Debug)]
pub struct MaskCommand {
    /// Input image path
    pub input: PathBuf,
    /// Output path (defaults to `<name>-mask.png`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub mask_processing: MaskProcessingArgs,
}

#[derive(Args, Debug)]
pub struct TraceCommand {
    /// Input image path
    pub input: PathBuf,
    /// Output SVG path (defaults to input name with `.svg`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Which mask to use for tracing (auto picks raw for the zero-crossing tracer)
    #[arg(long = "mask-source", value_enum, default_value_t = MaskSourceArg::Auto)]
    pub mask_source: MaskSourceArg,
    #[command(flatten)]
    pub mask_processing: MaskProcessingArgs,
    #[command(flatten)]
    pub trace_options: TraceOptionsArgs,
}

#[derive(Args, Debug)]
pub struct MaskProcessingArgs {
    /// Enable gaussian blur before thresholding
    #[arg(long)]
    pub blur: bool,
    /// Sigma used when gaussian blur is enabled
    #[arg(long = "blur-sigma", default_value_t = 6.0)]
    pub blur_sigma: f32,
    /// Threshold applied to the input (0-255 or 0.0-1.0)
    #[arg(long = "mask-threshold", default_value_t = 120, value_parser = parse_mask_threshold)]
    pub mask_threshold: u8,
    /// Threshold at the mean grey level instead of a fixed value
    #[arg(long = "mean-threshold", conflicts_with = "no_threshold")]
    pub mean_threshold: bool,
    /// Skip thresholding entirely
    #[arg(long = "no-threshold")]
    pub no_threshold: bool,
    /// Enable dilation after thresholding
    #[arg(long)]
    pub dilate: bool,
    /// Dilation radius in pixels
    #[arg(long = "dilation-radius", default_value_t = 5.0)]
    pub dilation_radius: f32,
    /// Fill enclosed holes in the mask before vectorization
    #[arg(long = "fill-holes")]
    pub fill_holes: bool,
    /// Invert the processed mask
    #[arg(long = "invert-mask")]
    pub invert_mask: bool,
}

impl From<&MaskProcessingArgs> for MaskProcessingOptions {
    fn from(args: &MaskProcessingArgs) -> Self {
        Self {
            blur: args.blur,
            blur_sigma: args.blur_sigma,
            binary: !args.no_threshold,
            mask_threshold: args.mask_threshold,
            mean_threshold: args.mean_threshold,
            dilate: args.dilate,
            dilation_radius: args.dilation_radius,
            fill_holes: args.fill_holes,
            invert: args.invert_mask,
        }
    }
}

impl MaskProcessingArgs {
    /// Whether any flag asks for something beyond the default threshold.
    pub fn processing_requested(&self) -> bool {
        self.blur
            || self.mean_threshold
            || self.no_threshold
            || self.dilate
            || self.fill_holes
            || self.invert_mask
    }
}

fn parse_mask_threshold(value: &str) -> Result<u8, String> {
    if let Ok(int_value) = value.parse::<u8>() {
        return Ok(int_value);
    }

    let float_value = value
        .parse::<f32>()
        .map_err(|_| format!("mask threshold must be numeric (0-255 or 0.0-1.0), got `{value}`"))?;

    if (0.0..=1.0).contains(&float_value) {
        let scaled = (float_value * 255.0).round() as i32;
        return Ok(scaled.clamp(0, 255) as u8);
    }

    Err(format!(
        "mask threshold {value} is out of range; expected 0-255 or 0.0-1.0"
    ))
}

/// The argument to specify which mask source to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MaskSourceArg {
    Raw,
    Processed,
    Auto,
}

/// Tracing algorithms.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum TracerArg {
    /// Pixel-edge contours
    Binary,
    /// Sub-pixel contours along a grey level
    ZeroCross,
}

impl From<TracerArg> for TracerKind {
    fn from(value: TracerArg) -> Self {
        match value {
            TracerArg::Binary => TracerKind::Binary,
            TracerArg::ZeroCross => TracerKind::ZeroCrossing,
        }
    }
}

#[derive(Args, Debug)]
pub struct TraceOptionsArgs {
    /// Tracing algorithm
    #[arg(long = "tracer", value_enum, default_value_t = TracerArg::Binary)]
    pub tracer: TracerArg,
    /// Emit border-touching boundaries as open polylines instead of closing them
    #[arg(long)]
    pub split: bool,
    /// Row number of the first image row
    #[arg(long = "first-row", default_value_t = 0, allow_negative_numbers = true)]
    pub first_row: i32,
    /// Grey level traced by the zero-crossing tracer (defaults to 128)
    #[arg(long = "zero-level")]
    pub zero_level: Option<f32>,
    /// Trace the background instead of the foreground
    #[arg(long)]
    pub invert: bool,
    /// Stroke width of the rendered outlines
    #[arg(long = "stroke-width", default_value_t = 1.0)]
    pub stroke_width: f32,
    /// Fill closed polygons in the SVG
    #[arg(long)]
    pub fill: bool,
}

impl From<&TraceOptionsArgs> for TraceOptions {
    fn from(args: &TraceOptionsArgs) -> Self {
        let mode = if args.split {
            OutputMode::Split
        } else {
            OutputMode::Polygons
        };
        TraceOptions::new()
            .with_mode(mode)
            .with_tracer(args.tracer.into())
            .with_first_row(args.first_row)
            .with_zero_level(args.zero_level)
            .with_invert(args.invert)
    }
}
