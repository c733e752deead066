use clap::Parser;
use sentitrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
