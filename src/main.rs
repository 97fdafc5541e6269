// src/main.rs

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mbuild::cli::{dispatch, Cli};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    std::process::exit(dispatch(cli));
}
