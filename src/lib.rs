//! # Overlay Loader Library
//!
//! Hierarchical content loading for configuration overlay tools. A
//! configuration tree names other trees ("bases") by relative path, absolute
//! path or remote repository URL, and names leaf files (patches, resources,
//! values) by path or HTTP(S) URL. A [`Loader`] turns such references into
//! new loaders or into file bytes, while keeping every tree from escaping
//! where it is allowed to read and from referring back to itself.
//!
//! ## Quick Example
//!
//! ```
//! use std::sync::Arc;
//! use overlay_loader::filesystem::MemoryFS;
//! use overlay_loader::restriction::LoadRestriction;
//! use overlay_loader::Loader;
//!
//! let fs = MemoryFS::new();
//! fs.write_str("app/overlay/patch.yaml", "replicas: 3").unwrap();
//! fs.write_str("app/base/deployment.yaml", "kind: Deployment").unwrap();
//!
//! let root = Loader::new(LoadRestriction::RootOnly, "/app/overlay", Arc::new(fs)).unwrap();
//! assert_eq!(root.load("patch.yaml").unwrap(), b"replicas: 3");
//!
//! let base = root.new_loader("../base").unwrap();
//! assert_eq!(base.root().to_string(), "/app/base");
//! assert!(base.new_loader("../overlay").is_err());
//! ```
//!
//! ## Core Concepts
//!
//! - **Loader (`loader`)**: `root`, `load`, `new_loader` and `cleanup`.
//! - **Referrer chain (`chain`)**: the roots and repositories already
//!   visited, used for cycle detection and clone confinement.
//! - **Restriction (`restriction`)**: whether file reads must stay below the
//!   root.
//! - **Capabilities (`filesystem`, `git`, `http`)**: traits for disk access,
//!   cloning and HTTP, each with a production and a test implementation.
//! - **Remote references (`repospec`)**: recognizing and splitting git URLs.

pub mod chain;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod http;
pub mod loader;
pub mod path;
pub mod repospec;
pub mod restriction;

#[cfg(test)]
mod path_proptest;

pub use error::{Error, Result};
pub use loader::Loader;
