//! # Remote Repository References
//!
//! A configuration tree can name another tree that lives in a remote git
//! repository. This module recognizes such references and splits them into a
//! [`RepoSpec`]: where to clone from, which ref to check out and which
//! directory inside the clone the new loader should be rooted at.
//!
//! ## Accepted forms
//!
//! - `https://github.com/org/repo/path/in/repo?ref=v1.2.0`
//! - `https://example.com/org/repo.git//path/in/repo?version=main`
//! - `github.com/org/repo/path@v1.2.0` (bare form for well-known hosts)
//! - `gh:org/repo/path`
//! - `git@github.com:org/repo.git//path`
//! - `ssh://git@example.com/org/repo/path`
//! - `file:///srv/git/repo.git//path`
//!
//! Any of these may carry a leading `git::`. A string that fits none of them,
//! or that is an absolute local path, is rejected so that callers can treat it
//! as a local path instead.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::error::{Error, Result};
use crate::path::ConfirmedDir;

/// Hosts recognized without an explicit scheme.
const WELL_KNOWN_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org"];

/// scp-like `user@host:` prefix
fn scp_host_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_.-]+@[A-Za-z0-9_.-]+):(.+)$").expect("static regex is valid")
    })
}

/// A parsed remote reference, before or after cloning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    raw: String,
    /// Scheme and host, ending in the separator before the org, e.g.
    /// `https://github.com/` or `git@github.com:`.
    pub host: String,
    /// Repository path on the host without any `.git` suffix, e.g. `org/repo`.
    pub org_repo: String,
    /// Directory inside the repository; empty for the repository root.
    pub path: String,
    /// Branch, tag or commit; empty for the remote's default.
    pub git_ref: String,
    /// `.git` if the reference spelled it out.
    pub git_suffix: String,
    /// Whether submodules should be fetched with the repository.
    pub submodules: bool,
    /// Upper bound on the clone, if the reference asked for one.
    pub timeout: Option<Duration>,
    clone_dir: Option<ConfirmedDir>,
}

impl RepoSpec {
    /// Parse a remote reference.
    ///
    /// Fails with `Error::InvalidReference` when `reference` is not a remote
    /// repository reference.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |message: &str| Error::InvalidReference {
            reference: reference.to_string(),
            message: message.to_string(),
        };

        if reference.is_empty() {
            return Err(invalid("reference is empty"));
        }
        if Path::new(reference).is_absolute() {
            return Err(invalid("reference looks like an absolute path"));
        }

        let spec = reference.strip_prefix("git::").unwrap_or(reference);
        let (spec, query) = match spec.split_once('?') {
            Some((spec, query)) => (spec, Some(query)),
            None => (spec, None),
        };

        let (host, rest) = split_host(spec).ok_or_else(|| invalid("reference lacks a host"))?;

        let (rest, at_ref) = if host.starts_with("file://") {
            (rest, None)
        } else {
            match rest.rsplit_once('@') {
                Some((rest, r)) if !r.is_empty() && !r.contains('/') => (rest, Some(r)),
                _ => (rest, None),
            }
        };

        let (org_repo, path, git_suffix) = split_org_repo(&host, rest);
        if org_repo.is_empty() {
            return Err(invalid("reference lacks a repository"));
        }
        if !host.starts_with("file://") && !org_repo.contains('/') {
            return Err(invalid("reference lacks an org/repo pair"));
        }
        let path = clean_repo_path(&path).ok_or_else(|| invalid("path in repository escapes the repository"))?;

        let mut repo_spec = RepoSpec {
            raw: reference.to_string(),
            host,
            org_repo,
            path,
            git_ref: at_ref.unwrap_or_default().to_string(),
            git_suffix,
            submodules: true,
            timeout: None,
            clone_dir: None,
        };

        if let Some(query) = query {
            repo_spec.apply_query(query).map_err(|m| invalid(&m))?;
        }
        Ok(repo_spec)
    }

    fn apply_query(&mut self, query: &str) -> std::result::Result<(), String> {
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "ref" | "version" => self.git_ref = value.to_string(),
                "submodules" => {
                    self.submodules = value
                        .parse::<bool>()
                        .map_err(|_| format!("submodules must be true or false, got '{}'", value))?;
                }
                "timeout" => {
                    let secs = value.strip_suffix('s').unwrap_or(value);
                    let secs = secs
                        .parse::<u64>()
                        .map_err(|_| format!("timeout must be a number of seconds, got '{}'", value))?;
                    self.timeout = Some(Duration::from_secs(secs));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// The reference exactly as written
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// URL handed to git for cloning
    pub fn clone_url(&self) -> String {
        format!("{}{}{}", self.host, self.org_repo, self.git_suffix)
    }

    /// Where the repository was cloned, once a cloner has run.
    pub fn clone_dir(&self) -> Option<&ConfirmedDir> {
        self.clone_dir.as_ref()
    }

    pub fn set_clone_dir(&mut self, dir: ConfirmedDir) {
        self.clone_dir = Some(dir);
    }

    /// Clone directory joined with the path in the repository.
    pub fn abs_path(&self) -> Option<PathBuf> {
        self.clone_dir.as_ref().map(|dir| dir.join(&self.path))
    }

    /// True when both specs name the same repository at the same ref,
    /// whatever directory inside it they point at.
    pub fn same_repo(&self, other: &RepoSpec) -> bool {
        self.host == other.host && self.org_repo == other.org_repo && self.git_ref == other.git_ref
    }

    /// True when loading `self` from a tree that came from `previous` would
    /// revisit `previous` or one of its ancestors inside the same repository.
    pub fn cycles_with(&self, previous: &RepoSpec) -> bool {
        self.same_repo(previous) && Path::new(&previous.path).starts_with(&self.path)
    }
}

impl fmt::Display for RepoSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Split the host off a reference, normalizing shorthand hosts.
fn split_host(spec: &str) -> Option<(String, &str)> {
    if let Some(rest) = spec.strip_prefix("gh:") {
        return Some(("https://github.com/".to_string(), rest.trim_start_matches('/')));
    }

    if let Some(rest) = spec.strip_prefix("file://") {
        return Some(("file://".to_string(), rest));
    }

    for scheme in ["https://", "http://", "ssh://"] {
        if let Some(after) = spec.strip_prefix(scheme) {
            let (host, rest) = after.split_once('/')?;
            if host.is_empty() {
                return None;
            }
            return Some((format!("{}{}/", scheme, host), rest));
        }
    }

    if let Some(caps) = scp_host_regex().captures(spec) {
        let host = caps.get(1)?.as_str();
        let rest = caps.get(2)?.as_str();
        return Some((format!("{}:", host), rest));
    }

    for known in WELL_KNOWN_HOSTS {
        if let Some(rest) = spec.strip_prefix(known).and_then(|r| r.strip_prefix('/')) {
            return Some((format!("https://{}/", known), rest));
        }
    }

    None
}

/// Split what follows the host into (org/repo, path in repo, git suffix).
fn split_org_repo(host: &str, rest: &str) -> (String, String, String) {
    if let Some((repo, path)) = rest.split_once("//") {
        let (repo, suffix) = strip_git_suffix(repo);
        return (repo.to_string(), path.to_string(), suffix);
    }

    if let Some(idx) = find_git_suffix(rest) {
        let path = rest[idx + 4..].trim_start_matches('/');
        return (rest[..idx].to_string(), path.to_string(), ".git".to_string());
    }

    if host.starts_with("file://") {
        return (rest.to_string(), String::new(), String::new());
    }

    let mut segments = rest.splitn(3, '/');
    let org = segments.next().unwrap_or_default();
    let repo = segments.next().unwrap_or_default();
    let path = segments.next().unwrap_or_default();
    if org.is_empty() || repo.is_empty() {
        return (org.to_string(), path.to_string(), String::new());
    }
    (format!("{}/{}", org, repo), path.to_string(), String::new())
}

/// Byte index of a `.git` that ends a path segment.
fn find_git_suffix(rest: &str) -> Option<usize> {
    rest.match_indices(".git").map(|(idx, _)| idx).find(|&idx| {
        let after = &rest[idx + 4..];
        after.is_empty() || after.starts_with('/')
    })
}

fn strip_git_suffix(repo: &str) -> (&str, String) {
    match repo.strip_suffix(".git") {
        Some(stripped) => (stripped, ".git".to_string()),
        None => (repo, String::new()),
    }
}

/// Clean a path inside a repository; `None` if it climbs out of it.
fn clean_repo_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(path.trim_matches('/')).components() {
        match component {
            Component::Normal(name) => parts.push(name.to_str()?),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.join("/"))
}
