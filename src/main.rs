//! `overlay-loader`: resolve configuration bases and load their files from
//! the command line.
//!
//! `resolve` walks a chain of base references and prints each root; `load`
//! prints one file read through such a chain. Failures are reported on
//! stderr as a single `error:` line carrying the whole cause chain, and the
//! process exits with status 1.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
