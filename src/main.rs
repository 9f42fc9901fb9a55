//! Main entry point for the fit-rs CLI tool

use clap::Parser;
use fit_rs::cli::{init_tracing, run_cli, Args};

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run_cli(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
