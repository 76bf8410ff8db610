use rowtrace::TraceResult;
use tracing::info;

use crate::cli::{GlobalOptions, MaskCommand};

use super::utils::{derive_variant_path, open_mask};

/// The main function to run the mask command.
pub fn run(_global: &GlobalOptions, cmd: MaskCommand) -> TraceResult<()> {
    let handle = open_mask(&cmd.input, &cmd.mask_processing)?;
    let output_path = cmd
        .output
        .clone()
        .unwrap_or_else(|| derive_variant_path(&cmd.input, "mask", "png"));

    let mask = handle.processed(None)?;
    mask.save(&output_path)?;
    info!(path = %output_path.display(), "mask saved");
    println!("Processed mask PNG saved to {}", output_path.display());

    Ok(())
}
