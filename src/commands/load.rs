//! # Load Command Implementation
//!
//! Writes the bytes of one file to stdout. The file is read by the bootstrap
//! loader or, with `--via`, by the loader derived through each given base in
//! turn, so the same confinement and cycle rules apply as when a
//! configuration tree is processed.

use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

use super::{cleanup_all, derive_chain, root_loader, LoaderOptions};

/// Load a file or URL through a chain of bases
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Directory of the bootstrap loader.
    ///
    /// If not provided, it defaults to the current working directory.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Base to pass through before loading; may be repeated.
    #[arg(long = "via", value_name = "REF")]
    pub via: Vec<String>,

    /// File path relative to the last loader's root, or an http(s) URL.
    #[arg(value_name = "PATH")]
    pub path: String,
}

/// Execute the `load` command.
pub fn execute(options: &LoaderOptions, args: LoadArgs) -> Result<()> {
    let root = root_loader(options, args.root.as_deref())?;
    let derived = derive_chain(&root, &args.via)?;
    let loader = derived.last().unwrap_or(&root);

    let result = loader
        .load(&args.path)
        .with_context(|| format!("Failed to load '{}' from {}", args.path, loader.root()));
    cleanup_all(&derived);

    let content = result?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&content)
        .and_then(|()| stdout.flush())
        .context("Failed to write to stdout")?;
    Ok(())
}
