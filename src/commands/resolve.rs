//! # Resolve Command Implementation
//!
//! Derives a loader for each reference in turn, each from the previous one,
//! and prints the root of every derived loader. Remote references are cloned
//! and the clones are removed again before the command exits.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::{cleanup_all, derive_chain, root_loader, LoaderOptions};

/// Resolve a chain of base references and print their roots
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Directory of the bootstrap loader.
    ///
    /// If not provided, it defaults to the current working directory.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// References to resolve, in order: local paths or remote repository URLs.
    #[arg(value_name = "REF", required = true)]
    pub references: Vec<String>,
}

/// Execute the `resolve` command.
pub fn execute(options: &LoaderOptions, args: ResolveArgs) -> Result<()> {
    let root = root_loader(options, args.root.as_deref())?;
    let derived = derive_chain(&root, &args.references)?;

    for loader in &derived {
        println!("{}", loader.root());
    }

    cleanup_all(&derived);
    Ok(())
}
