//! # CLI Command Implementations
//!
//! Each subcommand of `overlay-loader` lives in its own file with an `Args`
//! struct derived using `clap` and an `execute` function. Both commands start
//! from a root loader built by [`root_loader`] and derive further loaders
//! from it.

pub mod load;
pub mod resolve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, warn};

use overlay_loader::config::{self, LoaderConfig};
use overlay_loader::filesystem::{DiskFS, FileSystem};
use overlay_loader::git::Cloner;
use overlay_loader::http::HttpClient;
use overlay_loader::path::ConfirmedDir;
use overlay_loader::restriction::LoadRestriction;
use overlay_loader::Loader;

/// Options shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Restriction given on the command line, if any.
    pub restriction: Option<LoadRestriction>,
    /// Configuration file given on the command line or in the environment.
    pub config: Option<PathBuf>,
}

impl LoaderOptions {
    fn load_config(&self) -> Result<LoaderConfig> {
        match &self.config {
            Some(path) => config::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display())),
            None => Ok(LoaderConfig::default()),
        }
    }
}

/// Build the bootstrap loader at `root`, or at the current directory.
pub fn root_loader(options: &LoaderOptions, root: Option<&Path>) -> Result<Loader> {
    let config = options.load_config()?;
    let restriction = options.restriction.unwrap_or(config.restriction);

    let root = match root {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let fs: Arc<dyn FileSystem> = Arc::new(DiskFS::new());
    let root = ConfirmedDir::new(fs.as_ref(), &root)
        .with_context(|| format!("Invalid root {}", root.display()))?;

    let http: Arc<dyn HttpClient> = config.http_client()?;
    let cloner: Arc<dyn Cloner> = Arc::new(config.cloner());
    debug!("Root loader at {} ({})", root, restriction);
    Ok(Loader::at_confirmed_dir(restriction, root, fs, Some(http), cloner))
}

/// Derive one loader per reference, each from the one before.
///
/// Returns every derived loader, newest last. On failure the loaders derived
/// so far are cleaned up before the error is returned.
pub fn derive_chain(root: &Loader, references: &[String]) -> Result<Vec<Loader>> {
    let mut derived: Vec<Loader> = Vec::with_capacity(references.len());
    for reference in references {
        let parent = derived.last().unwrap_or(root);
        match parent.new_loader(reference) {
            Ok(loader) => derived.push(loader),
            Err(e) => {
                cleanup_all(&derived);
                return Err(e).with_context(|| {
                    format!("Failed to resolve '{}' from {}", reference, parent.root())
                });
            }
        }
    }
    Ok(derived)
}

/// Clean up loaders newest first, logging failures instead of stopping.
pub fn cleanup_all(loaders: &[Loader]) {
    for loader in loaders.iter().rev() {
        if let Err(e) = loader.cleanup() {
            warn!("Failed to clean up loader at {}: {}", loader.root(), e);
        }
    }
}
