use std::process::ExitCode;

use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod cli;
pub mod error;
pub mod script;
pub mod settings;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    debug!("logging setup");
    cli::start()
}
