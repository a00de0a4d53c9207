//! tunedex CLI entrypoint

use clap::Parser;
use std::process::ExitCode;

use tunedex::cli::Cli;
use tunedex::output;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.execute() {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}
