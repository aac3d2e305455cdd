//! Materializing remote repositories on local disk
//!
//! A [`Cloner`] turns a parsed [`RepoSpec`] into a directory on the local
//! filesystem and records that directory on the spec. [`GitCloner`] shells out
//! to the system `git`, which picks up SSH keys, credential helpers and any
//! other authentication configured for the user. [`DoNothingCloner`] points
//! every spec at a directory that already exists, for tests.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::path::{encode_url_path, ConfirmedDir};
use crate::repospec::RepoSpec;

/// How often a running git command is polled when a timeout applies.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Capability that materializes a repository and sets its clone directory.
pub trait Cloner: Send + Sync {
    fn clone_repo(&self, fs: &dyn FileSystem, spec: &mut RepoSpec) -> Result<()>;
}

/// Clones with the system `git` into a fresh temporary directory.
#[derive(Debug, Clone)]
pub struct GitCloner {
    command: String,
    submodules: bool,
}

impl Default for GitCloner {
    fn default() -> Self {
        Self {
            command: "git".to_string(),
            submodules: true,
        }
    }
}

impl GitCloner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different git executable
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Allow or forbid fetching submodules. A spec can still opt out on its own.
    pub fn with_submodules(mut self, submodules: bool) -> Self {
        self.submodules = submodules;
        self
    }

    fn fetch_into(&self, dir: &Path, spec: &RepoSpec) -> Result<()> {
        let url = spec.clone_url();
        let git_ref = if spec.git_ref.is_empty() {
            "HEAD"
        } else {
            spec.git_ref.as_str()
        };
        let deadline = spec.timeout.map(|t| Instant::now() + t);

        self.run(dir, &["init", "--quiet"], spec, deadline)?;
        self.run(dir, &["remote", "add", "origin", &url], spec, deadline)?;
        self.run(
            dir,
            &["fetch", "--quiet", "--depth=1", "origin", git_ref],
            spec,
            deadline,
        )?;
        self.run(dir, &["checkout", "--quiet", "FETCH_HEAD"], spec, deadline)?;
        if self.submodules && spec.submodules {
            self.run(
                dir,
                &["submodule", "update", "--init", "--recursive", "--quiet"],
                spec,
                deadline,
            )?;
        }
        Ok(())
    }

    fn run(&self, dir: &Path, args: &[&str], spec: &RepoSpec, deadline: Option<Instant>) -> Result<()> {
        debug!("Running {} {} in {}", self.command, args.join(" "), dir.display());

        let mut child = Command::new(&self.command)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| clone_failed(spec, e.to_string()))?;

        let stderr = child.stderr.take();
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf);
            }
            buf
        });

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(wait_failed(spec, args, e));
                }
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(clone_failed(
                    spec,
                    format!("'git {}' timed out", args.first().copied().unwrap_or_default()),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stderr = reader.join().unwrap_or_default();
        if status.success() {
            return Ok(());
        }

        // Provide a hint for common auth failures
        let hint = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("Could not read from remote repository")
        {
            Some(
                "make sure you have access to the repository: SSH key added to ssh-agent, \
                 git credentials configured, or a personal access token set up"
                    .to_string(),
            )
        } else {
            None
        };

        Err(Error::CloneFailed {
            url: spec.clone_url(),
            r#ref: spec.git_ref.clone(),
            message: format!("'git {}' failed: {}", args.join(" "), stderr.trim()),
            hint,
        })
    }
}

impl Cloner for GitCloner {
    fn clone_repo(&self, fs: &dyn FileSystem, spec: &mut RepoSpec) -> Result<()> {
        let prefix = format!("overlay-loader-{}-", encode_url_path(&spec.org_repo));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir()
            .map_err(|e| clone_failed(spec, e.to_string()))?
            .keep();

        info!(
            "Cloning {} at {} into {}",
            spec.clone_url(),
            if spec.git_ref.is_empty() { "HEAD" } else { spec.git_ref.as_str() },
            dir.display()
        );

        let confirmed = self
            .fetch_into(&dir, spec)
            .and_then(|()| ConfirmedDir::new(fs, &dir));
        match confirmed {
            Ok(confirmed) => {
                spec.set_clone_dir(confirmed);
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup) = std::fs::remove_dir_all(&dir) {
                    warn!("Failed to remove clone directory {}: {}", dir.display(), cleanup);
                }
                Err(e)
            }
        }
    }
}

/// Test double that "clones" every repository into one existing directory.
#[derive(Debug, Clone)]
pub struct DoNothingCloner(ConfirmedDir);

impl DoNothingCloner {
    pub fn new(dir: ConfirmedDir) -> Self {
        Self(dir)
    }
}

impl Cloner for DoNothingCloner {
    fn clone_repo(&self, _fs: &dyn FileSystem, spec: &mut RepoSpec) -> Result<()> {
        spec.set_clone_dir(self.0.clone());
        Ok(())
    }
}

fn clone_failed(spec: &RepoSpec, message: String) -> Error {
    Error::CloneFailed {
        url: spec.clone_url(),
        r#ref: spec.git_ref.clone(),
        message,
        hint: None,
    }
}

fn wait_failed(spec: &RepoSpec, args: &[&str], err: std::io::Error) -> Error {
    clone_failed(spec, format!("cannot wait for 'git {}': {}", args.join(" "), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{DiskFS, MemoryFS};

    #[test]
    fn test_do_nothing_cloner_sets_dir() {
        let fs = MemoryFS::new();
        fs.mkdir_all(Path::new("/tmp/foo/base")).unwrap();
        let cloner = DoNothingCloner::new(ConfirmedDir::new(&fs, "/tmp").unwrap());

        let mut spec = RepoSpec::parse("github.com/someOrg/someRepo/foo/base").unwrap();
        assert!(spec.clone_dir().is_none());
        cloner.clone_repo(&fs, &mut spec).unwrap();

        assert_eq!(spec.clone_dir().unwrap().as_path(), Path::new("/tmp"));
        assert_eq!(spec.abs_path().unwrap(), Path::new("/tmp/foo/base"));
    }

    #[test]
    fn test_wait_error_is_a_clone_failure() {
        let spec = RepoSpec::parse("github.com/someOrg/someRepo?ref=v1").unwrap();
        let err = wait_failed(
            &spec,
            &["fetch", "origin"],
            std::io::Error::new(std::io::ErrorKind::Interrupted, "interrupted"),
        );
        match err {
            Error::CloneFailed { url, r#ref, message, .. } => {
                assert_eq!(url, "https://github.com/someOrg/someRepo");
                assert_eq!(r#ref, "v1");
                assert!(message.contains("git fetch origin"));
                assert!(message.contains("interrupted"));
            }
            other => panic!("expected CloneFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_git_cloner_missing_executable_fails_cleanly() {
        let cloner = GitCloner::new().with_command("definitely-not-a-git-binary");
        let mut spec = RepoSpec::parse("github.com/someOrg/someRepo").unwrap();

        let err = cloner.clone_repo(&DiskFS::new(), &mut spec).unwrap_err();
        assert!(matches!(err, Error::CloneFailed { .. }));
        assert!(spec.clone_dir().is_none());
    }

    #[test]
    fn test_git_cloner_from_local_repository() {
        // Needs a git binary; skip quietly where there is none.
        if Command::new("git").arg("--version").output().is_err() {
            return;
        }

        let source = tempfile::TempDir::new().unwrap();
        let git = |args: &[&str]| {
            Command::new("git")
                .args(args)
                .current_dir(source.path())
                .output()
                .unwrap()
        };
        git(&["init", "--quiet"]);
        std::fs::create_dir_all(source.path().join("foo/base")).unwrap();
        std::fs::write(source.path().join("foo/base/file.yaml"), "from git").unwrap();
        git(&["add", "."]);
        let commit = git(&[
            "-c",
            "user.name=test",
            "-c",
            "user.email=test@example.com",
            "commit",
            "--quiet",
            "-m",
            "init",
        ]);
        if !commit.status.success() {
            return;
        }

        let reference = format!("file://{}//foo/base", source.path().display());
        let mut spec = RepoSpec::parse(&reference).unwrap();
        let fs = DiskFS::new();
        GitCloner::new().clone_repo(&fs, &mut spec).unwrap();

        let abs = spec.abs_path().unwrap();
        assert_eq!(fs.read_file(&abs.join("file.yaml")).unwrap(), b"from git");
        fs.remove_all(spec.clone_dir().unwrap().as_path()).unwrap();
    }
}
