use std::process::ExitCode;

use clap::Parser;
use ioc_harvester::cli::{commands::execute, flags::Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Panics go to the log instead of stderr.
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("unexpected panic: {}", info);
    }));

    match std::panic::catch_unwind(|| execute(&cli)) {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(_)) | Err(_) => ExitCode::FAILURE,
    }
}
