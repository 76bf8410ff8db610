mod mask;
mod trace;
mod utils;

use crate::cli::{Cli, Commands, GlobalOptions};
use rowtrace::TraceResult;

/// The main function to run the command based on CLI input.
pub fn run(cli: Cli) -> TraceResult<()> {
    let Cli { global, command } = cli;
    dispatch(&global, command)
}

/// Dispatch the command to the appropriate handler.
fn dispatch(global: &GlobalOptions, command: Commands) -> TraceResult<()> {
    match command {
        Commands::Mask(cmd) => mask::run(global, cmd),
        Commands::Trace(cmd) => trace::run(global, cmd),
    }
}
