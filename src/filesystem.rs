//! Filesystem capability used by loaders
//!
//! Loaders never touch the operating system directly. Every directory check,
//! read and symlink resolution goes through a [`FileSystem`], so the same
//! loader logic runs over the real disk ([`DiskFS`]) or over an in-memory
//! tree ([`MemoryFS`]) in tests.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::path::{clean, ConfirmedDir};

/// Upper bound on symlink hops while resolving one path in `MemoryFS`.
const MAX_SYMLINK_HOPS: usize = 40;

/// Operations a loader needs from a filesystem.
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Create a directory and all of its missing parents.
    fn mkdir_all(&self, path: &Path) -> Result<()>;

    /// Write a file, creating parent directories as needed.
    fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Read the full content of a file, following symlinks.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// True if `path` names a directory, following symlinks.
    fn is_dir(&self, path: &Path) -> bool;

    /// True if `path` names a file or directory, following symlinks.
    fn exists(&self, path: &Path) -> bool;

    /// Remove a file or a directory tree. Missing paths are not an error.
    fn remove_all(&self, path: &Path) -> Result<()>;

    /// Absolute, cleaned path with every symlink resolved.
    ///
    /// Fails with `Error::NotFound` if the path does not exist.
    fn real_path(&self, path: &Path) -> Result<PathBuf>;
}

/// Resolve `path` and split it into its directory and, when it names a
/// file, the file name.
pub fn cleaned_abs(fs: &dyn FileSystem, path: &Path) -> Result<(ConfirmedDir, Option<String>)> {
    let real = fs.real_path(path)?;
    if fs.is_dir(&real) {
        return Ok((ConfirmedDir::new(fs, &real)?, None));
    }

    let parent = real.parent().ok_or_else(|| Error::NotADirectory {
        path: real.display().to_string(),
    })?;
    let name = real
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::NotFound {
            path: real.display().to_string(),
        })?;
    Ok((ConfirmedDir::new(fs, parent)?, Some(name)))
}

/// Filesystem backed by the host operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFS;

impl DiskFS {
    pub fn new() -> Self {
        Self
    }

    fn absolute(path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(std::env::current_dir()?.join(path))
        }
    }
}

impl FileSystem for DiskFS {
    fn mkdir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| Error::from_io(path.display().to_string(), e))
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.mkdir_all(parent)?;
        }
        fs::write(path, content).map_err(|e| Error::from_io(path.display().to_string(), e))
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| Error::from_io(path.display().to_string(), e))
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let result = match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::from_io(path.display().to_string(), e)),
        }
    }

    fn real_path(&self, path: &Path) -> Result<PathBuf> {
        let absolute = Self::absolute(path)?;
        fs::canonicalize(&absolute).map_err(|e| Error::from_io(path.display().to_string(), e))
    }
}

#[derive(Debug, Default)]
struct Tree {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
    /// link location -> target as written (absolute or relative to the link's directory)
    symlinks: HashMap<PathBuf, PathBuf>,
}

impl Tree {
    /// Walk `path` one component at a time, so `..` after a symlink applies
    /// to the link target rather than to the link's lexical parent.
    fn resolve(&self, path: &Path, hops: &mut usize) -> Result<PathBuf> {
        let mut current = PathBuf::from("/");
        for component in Path::new("/").join(path).components() {
            match component {
                Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
                Component::ParentDir => {
                    current.pop();
                }
                Component::Normal(name) => {
                    let next = current.join(name);
                    match self.symlinks.get(&next) {
                        Some(target) => {
                            *hops += 1;
                            if *hops > MAX_SYMLINK_HOPS {
                                return Err(Error::ReadFailed {
                                    path: path.display().to_string(),
                                    message: "too many levels of symbolic links".to_string(),
                                });
                            }
                            let target = current.join(target);
                            current = self.resolve(&target, hops)?;
                        }
                        None => current = next,
                    }
                }
            }
        }
        Ok(current)
    }

    fn real_path(&self, path: &Path) -> Result<PathBuf> {
        let real = self.resolve(path, &mut 0)?;
        if self.files.contains_key(&real) || self.dirs.contains(&real) {
            Ok(real)
        } else {
            Err(Error::NotFound {
                path: path.display().to_string(),
            })
        }
    }

    fn add_dirs(&mut self, path: &Path) -> Result<()> {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component.as_os_str());
            if self.files.contains_key(&current) {
                return Err(Error::NotADirectory {
                    path: current.display().to_string(),
                });
            }
            self.dirs.insert(current.clone());
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> PathBuf {
    clean(Path::new("/").join(path))
}

/// In-memory filesystem with directories, files and symlinks.
///
/// Relative paths are taken relative to `/`. The root directory always
/// exists. Cloning a `MemoryFS` is not supported; share it behind an `Arc`.
#[derive(Default)]
pub struct MemoryFS {
    tree: RwLock<Tree>,
}

impl fmt::Debug for MemoryFS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("MemoryFS")
            .field("files", &tree.files.len())
            .field("dirs", &tree.dirs.len())
            .field("symlinks", &tree.symlinks.len())
            .finish()
    }
}

impl MemoryFS {
    /// Create a filesystem holding only `/`
    pub fn new() -> Self {
        let fs = Self::default();
        fs.tree
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .dirs
            .insert(PathBuf::from("/"));
        fs
    }

    /// Create a symlink at `link` pointing to `target`.
    ///
    /// A relative target is resolved against the directory holding the link.
    pub fn symlink<P: AsRef<Path>, Q: AsRef<Path>>(&self, target: P, link: Q) -> Result<()> {
        let link = absolute(link.as_ref());
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = link.parent() {
            tree.add_dirs(parent)?;
        }
        tree.symlinks.insert(link, target.as_ref().to_path_buf());
        Ok(())
    }

    /// Add a file with string content
    pub fn write_str<P: AsRef<Path>>(&self, path: P, content: &str) -> Result<()> {
        self.write_file(path.as_ref(), content.as_bytes())
    }

    /// Number of files stored, symlinks excluded
    pub fn file_count(&self) -> usize {
        self.tree
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .files
            .len()
    }
}

impl FileSystem for MemoryFS {
    fn mkdir_all(&self, path: &Path) -> Result<()> {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.add_dirs(&absolute(path))
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let path = absolute(path);
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        if tree.dirs.contains(&path) {
            return Err(Error::ReadFailed {
                path: path.display().to_string(),
                message: "is a directory".to_string(),
            });
        }
        if let Some(parent) = path.parent() {
            tree.add_dirs(parent)?;
        }
        tree.files.insert(path, content.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        let real = tree.real_path(path)?;
        match tree.files.get(&real) {
            Some(content) => Ok(content.clone()),
            None => Err(Error::ReadFailed {
                path: path.display().to_string(),
                message: "is a directory".to_string(),
            }),
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.real_path(path)
            .map(|real| tree.dirs.contains(&real))
            .unwrap_or(false)
    }

    fn exists(&self, path: &Path) -> bool {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.real_path(path).is_ok()
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let path = absolute(path);
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.files.retain(|p, _| !p.starts_with(&path));
        tree.dirs.retain(|p| !p.starts_with(&path));
        tree.symlinks.retain(|p, _| !p.starts_with(&path));
        tree.dirs.insert(PathBuf::from("/"));
        Ok(())
    }

    fn real_path(&self, path: &Path) -> Result<PathBuf> {
        self.tree
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .real_path(path)
    }
}
