use std::fs;

use rowtrace::{
    BinaryVectorizer, MaskHandle, TraceOptions, TraceResult, TracerKind, ZeroCrossVectorizer,
};
use tracing::{info, warn};

use crate::cli::{GlobalOptions, MaskSourceArg, TraceCommand};
use crate::svg::{SvgStyle, render};

use super::utils::{derive_svg_path, open_mask};

/// The main function to run the trace command.
pub fn run(_global: &GlobalOptions, cmd: TraceCommand) -> TraceResult<()> {
    let handle = open_mask(&cmd.input, &cmd.mask_processing)?;
    let output_path = cmd
        .output
        .clone()
        .unwrap_or_else(|| derive_svg_path(&cmd.input));
    let options = TraceOptions::from(&cmd.trace_options);

    // the zero-crossing tracer interpolates grey levels, which a threshold would flatten
    let mask_source = match cmd.mask_source {
        MaskSourceArg::Auto => match options.tracer {
            TracerKind::Binary => MaskSourceArg::Processed,
            TracerKind::ZeroCrossing if cmd.mask_processing.processing_requested() => {
                MaskSourceArg::Processed
            }
            TracerKind::ZeroCrossing => MaskSourceArg::Raw,
        },
        other => other,
    };

    if mask_source == MaskSourceArg::Raw && options.tracer == TracerKind::Binary {
        warn!("tracing the raw image with the binary tracer treats every non-zero pixel as foreground");
    }

    let mask = match mask_source {
        MaskSourceArg::Processed => handle.processed(None)?,
        _ => handle,
    };
    let (width, height) = mask.image().dimensions();
    let style = SvgStyle {
        stroke_width: cmd.trace_options.stroke_width,
        fill: cmd.trace_options.fill.then_some("black"),
        ..SvgStyle::default()
    };

    let svg = match options.tracer {
        TracerKind::Binary => {
            let curves = trace_with(&mask, &BinaryVectorizer, &options)?;
            render(&curves, width, height, &style)
        }
        TracerKind::ZeroCrossing => {
            let curves = trace_with(&mask, &ZeroCrossVectorizer, &options)?;
            render(&curves, width, height, &style)
        }
    };
    fs::write(&output_path, &svg)?;
    println!("SVG saved to {}", output_path.display());

    Ok(())
}

fn trace_with<V>(mask: &MaskHandle, vectorizer: &V, options: &TraceOptions) -> TraceResult<V::Output>
where
    V: rowtrace::MaskVectorizer<Options = TraceOptions>,
    V::Output: Summary,
{
    let output = mask.trace(vectorizer, options)?;
    let (polygons, polylines, points) = output.summary();
    info!(polygons, polylines, points, "traced");
    Ok(output)
}

/// Contour counts for logging.
trait Summary {
    fn summary(&self) -> (usize, usize, usize);
}

impl<T: rowtrace::geom::Scalar> Summary for rowtrace::Curves<T> {
    fn summary(&self) -> (usize, usize, usize) {
        (self.polygons.len(), self.polylines.len(), self.point_count())
    }
}
