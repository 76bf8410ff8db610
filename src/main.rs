mod cli;
mod commands;
mod report;
mod svg;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, GlobalOptions};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.global);
    match commands::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report::report_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr. `-v` flags win over `--log` / `RUST_LOG`, which win over the `warn` default.
fn init_tracing(global: &GlobalOptions) {
    let filter = match (global.verbose, global.log_filter.as_deref()) {
        (0, Some(directives)) => EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn")),
        (0, None) => EnvFilter::new("warn"),
        (1, _) => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
