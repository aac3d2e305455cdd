//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use overlay_loader::restriction::LoadRestriction;

use crate::commands;

/// Overlay Loader - resolve configuration bases and load their files
#[derive(Parser, Debug)]
#[command(name = "overlay-loader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Where local files may be loaded from (root-only, none).
    ///
    /// Overrides the `restriction` key of the configuration file.
    #[arg(long, global = true, value_name = "POLICY")]
    restriction: Option<LoadRestriction>,

    /// Path to a YAML loader configuration file.
    #[arg(long, global = true, value_name = "FILE", env = "OVERLAY_LOADER_CONFIG")]
    config: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive a loader for each reference in turn and print its root
    Resolve(commands::resolve::ResolveArgs),

    /// Print the content of a file, optionally through a chain of bases
    Load(commands::load::LoadArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let options = commands::LoaderOptions {
            restriction: self.restriction,
            config: self.config,
        };
        match self.command {
            Commands::Resolve(args) => commands::resolve::execute(&options, args),
            Commands::Load(args) => commands::load::execute(&options, args),
        }
    }
}

/// `RUST_LOG` takes precedence over `--log-level` when set.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A logger may already be installed when the CLI is driven in-process.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
