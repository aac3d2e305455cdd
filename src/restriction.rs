//! Read confinement for loaders

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filesystem::{cleaned_abs, FileSystem};
use crate::path::ConfirmedDir;

/// Whether file reads must stay inside the loader root.
///
/// The policy is chosen once for the root loader and every loader derived
/// from it inherits it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadRestriction {
    /// Files must resolve, after following symlinks, to a location in or
    /// below the loader root.
    #[default]
    RootOnly,
    /// Any readable file may be loaded.
    None,
}

impl LoadRestriction {
    /// Check that `path` may be read by a loader rooted at `root` and return
    /// the real location to read from.
    pub fn check(self, fs: &dyn FileSystem, root: &ConfirmedDir, path: &Path) -> Result<PathBuf> {
        match self {
            LoadRestriction::None => fs.real_path(path),
            LoadRestriction::RootOnly => {
                let (dir, file) = cleaned_abs(fs, path)?;
                let Some(file) = file else {
                    return Err(Error::ReadFailed {
                        path: path.display().to_string(),
                        message: "must resolve to a file".to_string(),
                    });
                };
                if !dir.has_prefix(root) {
                    return Err(Error::OutsideRoot {
                        path: path.display().to_string(),
                        root: root.to_string(),
                    });
                }
                Ok(dir.join(file))
            }
        }
    }
}

impl fmt::Display for LoadRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadRestriction::RootOnly => write!(f, "root-only"),
            LoadRestriction::None => write!(f, "none"),
        }
    }
}

impl FromStr for LoadRestriction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "root-only" | "rootonly" => Ok(LoadRestriction::RootOnly),
            "none" => Ok(LoadRestriction::None),
            other => Err(format!(
                "unknown load restriction '{}' (expected 'root-only' or 'none')",
                other
            )),
        }
    }
}
