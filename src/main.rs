use std::process::ExitCode;

use clap::Parser;
use mnistflow::{execute, init_tracing, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();
    let mut stdout = std::io::stdout().lock();
    match execute(&cli, &mut stdout) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
