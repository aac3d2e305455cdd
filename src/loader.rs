//! # Loader
//!
//! A `Loader` is rooted at one directory and answers two questions for a
//! configuration tree: "give me the bytes of this file" ([`Loader::load`]) and
//! "give me a loader for that other tree" ([`Loader::new_loader`]).
//!
//! ## References
//!
//! `new_loader` takes, in order of recognition:
//!
//! 1. the empty string, which is rejected;
//! 2. a remote repository reference (see [`crate::repospec`]), which is
//!    cloned through the loader's [`Cloner`];
//! 3. anything else, as a local directory relative to the root (or absolute).
//!
//! `load` takes an `http`/`https` URL, which is fetched through the loader's
//! [`HttpClient`], or a local file path. Any other `scheme://` is rejected
//! without touching the network.
//!
//! ## Safety rules
//!
//! - A new root must be a directory, must differ from the current root and
//!   must not equal or contain any root in the referrer chain.
//! - A repository may not be requested again at or above a path already in
//!   the lineage.
//! - Once a lineage passes through a clone, local bases must stay inside that
//!   clone, whatever the load restriction says.
//! - Under `LoadRestriction::RootOnly`, files must resolve (after following
//!   symlinks) to somewhere in or below the root.
//!
//! Every check runs before the side effect it guards: a reference that would
//! form a cycle is rejected before anything is cloned.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use url::Url;

use crate::chain::ReferrerChain;
use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::git::{Cloner, GitCloner};
use crate::http::{HttpClient, ReqwestClient};
use crate::path::ConfirmedDir;
use crate::repospec::RepoSpec;
use crate::restriction::LoadRestriction;

/// What a `load` reference points at.
#[derive(Debug, PartialEq, Eq)]
enum Source<'a> {
    Http(&'a str),
    Local(&'a str),
}

impl<'a> Source<'a> {
    fn classify(reference: &'a str) -> Result<Self> {
        if reference.is_empty() {
            return Err(Error::InvalidReference {
                reference: String::new(),
                message: "nothing to load".to_string(),
            });
        }
        if !reference.contains("://") {
            return Ok(Source::Local(reference));
        }

        let url = match Url::parse(reference) {
            Ok(url) => url,
            Err(e) => {
                let scheme = reference.split("://").next().unwrap_or_default();
                if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") {
                    return Err(Error::InvalidReference {
                        reference: reference.to_string(),
                        message: e.to_string(),
                    });
                }
                return Err(Error::UnsupportedScheme {
                    scheme: scheme.to_string(),
                    url: reference.to_string(),
                });
            }
        };
        match url.scheme() {
            "http" | "https" => Ok(Source::Http(reference)),
            scheme => Err(Error::UnsupportedScheme {
                scheme: scheme.to_string(),
                url: reference.to_string(),
            }),
        }
    }
}

/// Loads files and derives child loaders while enforcing confinement and
/// cycle rules.
pub struct Loader {
    root: ConfirmedDir,
    restriction: LoadRestriction,
    chain: ReferrerChain,
    fs: Arc<dyn FileSystem>,
    http: Option<Arc<dyn HttpClient>>,
    cloner: Arc<dyn Cloner>,
    /// Clone directory created by this loader's own `new_loader` call.
    owned_clone: Option<ConfirmedDir>,
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("root", &self.root)
            .field("restriction", &self.restriction)
            .field("chain", &self.chain.len())
            .field("http", &self.http.is_some())
            .field("owned_clone", &self.owned_clone)
            .finish()
    }
}

fn default_http_client() -> Option<Arc<dyn HttpClient>> {
    match ReqwestClient::new() {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!("HTTP loading disabled: {}", e);
            None
        }
    }
}

impl Loader {
    /// Loader at `/` restricted to files below the root, with the default
    /// HTTP client and git cloner.
    pub fn at_root(fs: Arc<dyn FileSystem>) -> Result<Self> {
        Self::new(LoadRestriction::RootOnly, "/", fs)
    }

    /// Loader at an existing directory, with the default HTTP client and git
    /// cloner.
    pub fn new<P: AsRef<Path>>(restriction: LoadRestriction, root: P, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let root = ConfirmedDir::new(fs.as_ref(), root)?;
        Ok(Self::at_confirmed_dir(
            restriction,
            root,
            fs,
            default_http_client(),
            Arc::new(GitCloner::new()),
        ))
    }

    /// Loader at a confirmed directory with explicit capabilities.
    pub fn at_confirmed_dir(
        restriction: LoadRestriction,
        root: ConfirmedDir,
        fs: Arc<dyn FileSystem>,
        http: Option<Arc<dyn HttpClient>>,
        cloner: Arc<dyn Cloner>,
    ) -> Self {
        Self {
            chain: ReferrerChain::start(root.clone(), None),
            root,
            restriction,
            fs,
            http,
            cloner,
            owned_clone: None,
        }
    }

    /// Clone `spec` and root a loader at the requested path inside the clone.
    pub fn at_git_clone(
        spec: RepoSpec,
        restriction: LoadRestriction,
        fs: Arc<dyn FileSystem>,
        http: Option<Arc<dyn HttpClient>>,
        cloner: Arc<dyn Cloner>,
    ) -> Result<Self> {
        Self::clone_into(spec, restriction, fs, http, cloner, None)
    }

    /// Replace the HTTP client used for `http` and `https` references.
    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Drop the HTTP client; URL loads then fail.
    pub fn without_http_client(mut self) -> Self {
        self.http = None;
        self
    }

    /// Replace the cloner used for remote references.
    pub fn with_cloner(mut self, cloner: Arc<dyn Cloner>) -> Self {
        self.cloner = cloner;
        self
    }

    pub fn root(&self) -> &ConfirmedDir {
        &self.root
    }

    pub fn restriction(&self) -> LoadRestriction {
        self.restriction
    }

    pub fn chain(&self) -> &ReferrerChain {
        &self.chain
    }

    /// True when `cleanup` would remove a clone directory.
    pub fn owns_clone(&self) -> bool {
        self.owned_clone.is_some()
    }

    /// Derive a loader for another configuration tree.
    pub fn new_loader(&self, reference: &str) -> Result<Loader> {
        if reference.is_empty() {
            return Err(Error::InvalidReference {
                reference: String::new(),
                message: "new root cannot be empty".to_string(),
            });
        }

        if let Ok(spec) = RepoSpec::parse(reference) {
            debug!("'{}' is a remote reference from {}", reference, self.root);
            self.chain.check_repo(&spec)?;
            return Self::clone_into(
                spec,
                self.restriction,
                Arc::clone(&self.fs),
                self.http.clone(),
                Arc::clone(&self.cloner),
                Some(&self.chain),
            );
        }

        let root = ConfirmedDir::new(self.fs.as_ref(), self.root.join(reference))?;
        if let Some(clone) = self.chain.containing_clone() {
            if !root.has_prefix(clone) {
                return Err(Error::OutsideClone {
                    path: root.to_string(),
                    clone: clone.to_string(),
                });
            }
        }
        if root == self.root {
            return Err(Error::SamePlace {
                path: root.to_string(),
            });
        }
        self.chain.check_dir(&root)?;

        debug!("New loader at {} (from {})", root, self.root);
        Ok(Loader {
            chain: self.chain.extended(root.clone(), None),
            root,
            restriction: self.restriction,
            fs: Arc::clone(&self.fs),
            http: self.http.clone(),
            cloner: Arc::clone(&self.cloner),
            owned_clone: None,
        })
    }

    fn clone_into(
        mut spec: RepoSpec,
        restriction: LoadRestriction,
        fs: Arc<dyn FileSystem>,
        http: Option<Arc<dyn HttpClient>>,
        cloner: Arc<dyn Cloner>,
        parent: Option<&ReferrerChain>,
    ) -> Result<Loader> {
        cloner.clone_repo(fs.as_ref(), &mut spec)?;
        let clone_dir = spec.clone_dir().cloned().ok_or_else(|| Error::CloneFailed {
            url: spec.clone_url(),
            r#ref: spec.git_ref.clone(),
            message: "cloner did not record a clone directory".to_string(),
            hint: None,
        })?;

        let root = ConfirmedDir::new(fs.as_ref(), clone_dir.join(&spec.path)).and_then(|root| {
            // The path in the repo may be a symlink leading out of the clone.
            if root.has_prefix(&clone_dir) {
                Ok(root)
            } else {
                Err(Error::OutsideClone {
                    path: root.to_string(),
                    clone: clone_dir.to_string(),
                })
            }
        });
        let root = match root {
            Ok(root) => root,
            Err(e) => {
                if let Err(cleanup) = fs.remove_all(clone_dir.as_path()) {
                    warn!("Failed to remove clone {}: {}", clone_dir, cleanup);
                }
                return Err(e);
            }
        };

        debug!("New loader at {} (cloned from {})", root, spec);
        let chain = match parent {
            Some(parent) => parent.extended(root.clone(), Some(spec)),
            None => ReferrerChain::start(root.clone(), Some(spec)),
        };
        Ok(Loader {
            root,
            restriction,
            chain,
            fs,
            http,
            cloner,
            owned_clone: Some(clone_dir),
        })
    }

    /// Read a file, or fetch an `http`/`https` URL.
    pub fn load(&self, reference: &str) -> Result<Vec<u8>> {
        match Source::classify(reference)? {
            Source::Http(url) => self.load_http(url),
            Source::Local(path) => {
                let candidate = self.root.join(path);
                let real = self
                    .restriction
                    .check(self.fs.as_ref(), &self.root, &candidate)?;
                debug!("Loading {} (as {})", candidate.display(), real.display());
                self.fs.read_file(&real)
            }
        }
    }

    fn load_http(&self, url: &str) -> Result<Vec<u8>> {
        let Some(http) = &self.http else {
            return Err(Error::FetchFailed {
                url: url.to_string(),
                message: "no HTTP client configured".to_string(),
            });
        };

        debug!("Fetching {}", url);
        let response = http.get(url)?;
        if !response.is_success() {
            let message = if RepoSpec::parse(url).is_ok() {
                format!(
                    "status code {}; the URL names a git repository, reference it as a base instead",
                    response.status
                )
            } else {
                format!("status code {}", response.status)
            };
            return Err(Error::FetchFailed {
                url: url.to_string(),
                message,
            });
        }
        Ok(response.body)
    }

    /// Remove the clone directory this loader created, if any.
    ///
    /// Loaders that merely sit inside a clone made by an ancestor never
    /// remove it. Calling this more than once is harmless.
    pub fn cleanup(&self) -> Result<()> {
        match &self.owned_clone {
            Some(dir) if self.fs.exists(dir.as_path()) => {
                debug!("Removing clone {}", dir);
                self.fs.remove_all(dir.as_path())
            }
            Some(dir) => {
                warn!("Clone {} was already removed", dir);
                Ok(())
            }
            None => Ok(()),
        }
    }
}
