use std::process::ExitCode;

use clap::Parser;
use imageclean_cli::{Cli, run};

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = imageclean_log::init_logging(cli.verbose, cli.quiet) {
        eprintln!("imageclean: {e}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
