//! Path algebra for loader roots

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::filesystem::FileSystem;

/// Lexically clean a path: drop `.` segments, fold `..` into its parent and
/// strip trailing separators.
///
/// `..` at the root of an absolute path stays at the root. A relative path
/// that cleans to nothing becomes `.`.
pub fn clean<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut out = PathBuf::new();
    let mut depth = 0usize;

    for component in path.as_ref().components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(name) => {
                out.push(name);
                depth += 1;
            }
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// An absolute path proven, when it was built, to name an existing directory.
///
/// The path is the real one: symlinks were resolved by the filesystem that
/// confirmed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfirmedDir(PathBuf);

impl ConfirmedDir {
    /// Resolve `path` through `fs` and confirm it names a directory.
    pub fn new<P: AsRef<Path>>(fs: &dyn FileSystem, path: P) -> Result<Self> {
        let real = fs.real_path(path.as_ref())?;
        if !real.is_absolute() {
            return Err(Error::NotAbsolute {
                path: real.display().to_string(),
            });
        }
        if !fs.is_dir(&real) {
            return Err(Error::NotADirectory {
                path: path.as_ref().display().to_string(),
            });
        }
        Ok(Self(real))
    }

    /// Join a relative or absolute path onto this directory.
    ///
    /// An absolute `other` replaces the directory entirely. The result is
    /// lexically cleaned but not checked against any filesystem.
    pub fn join<P: AsRef<Path>>(&self, other: P) -> PathBuf {
        clean(self.0.join(other))
    }

    /// True when this directory is `other` or lies below it.
    ///
    /// Comparison is per path component, so `/foo/project2` does not have
    /// the prefix `/foo/project`.
    pub fn has_prefix(&self, other: &ConfirmedDir) -> bool {
        self.0.starts_with(&other.0)
    }

    /// True when `other` is this directory or lies below it.
    pub fn is_ancestor_of(&self, other: &ConfirmedDir) -> bool {
        other.has_prefix(self)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for ConfirmedDir {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl PartialEq<str> for ConfirmedDir {
    fn eq(&self, other: &str) -> bool {
        self.0 == Path::new(other)
    }
}

impl fmt::Display for ConfirmedDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Encode a URL to be filesystem-safe
///
/// This converts URL characters that are problematic for filesystems
/// into safe alternatives. Used to name temporary clone directories.
pub fn encode_url_path(url: &str) -> String {
    url.chars()
        .map(|c| match c {
            '/' => '-',
            '\\' => '-',
            ':' => '_',
            '*' => '_',
            '?' => '_',
            '"' => '_',
            '<' => '_',
            '>' => '_',
            '|' => '_',
            // Keep alphanumeric, dots, dashes, underscores as-is
            c if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' => c,
            // Replace other characters with underscores
            _ => '_',
        })
        .collect()
}
