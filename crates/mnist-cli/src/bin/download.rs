use std::process::ExitCode;

fn main() -> ExitCode {
    mnist_cli::run_stage(&mnist_adapters::Download)
}
