//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `overlay-loader` crate. It uses the `thiserror` library to create a single
//! `Error` enum that covers every way a loader can refuse a reference or fail
//! to produce content.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant corresponds to one failure kind
//!   and carries the offending path, URL or reference so the message alone is
//!   enough to diagnose a bad configuration tree.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Some messages are matched on by callers and must keep their shape:
//! confinement violations contain `is not in or below`, clone boundary
//! violations contain `base '<path>' is outside '<clone>'`, and both cycle
//! variants start with `cycle detected`.

use thiserror::Error;

/// Main error type for loader operations
#[derive(Error, Debug)]
pub enum Error {
    /// The reference is empty or otherwise unusable.
    #[error("invalid reference '{reference}': {message}")]
    InvalidReference { reference: String, message: String },

    /// A loader was asked to move into something that is not a directory.
    #[error("'{path}' is not a directory")]
    NotADirectory { path: String },

    /// A filesystem handed back a relative path where an absolute one is required.
    #[error("'{path}' is not an absolute path")]
    NotAbsolute { path: String },

    /// The reference resolves to the loader's own root.
    #[error("new root '{path}' is the same as the current root")]
    SamePlace { path: String },

    /// The candidate root equals or contains a root already in the referrer chain.
    #[error("cycle detected: candidate root '{candidate}' contains visited root '{visited}'")]
    CycleDetected { candidate: String, visited: String },

    /// The requested repository is already part of the lineage.
    #[error("cycle detected: URI '{uri}' referenced by previous URI '{previous}'")]
    RepoCycleDetected { uri: String, previous: String },

    /// A file read escaped the loader root under `LoadRestriction::RootOnly`.
    #[error("security; file '{path}' is not in or below '{root}'")]
    OutsideRoot { path: String, root: String },

    /// A tree loaded from a clone referenced a local base outside that clone.
    #[error("security; bases found in cloned repos must be within the repo, but base '{path}' is outside '{clone}'")]
    OutsideClone { path: String, clone: String },

    /// The reference looks like a URL but its scheme is not http or https.
    #[error("unsupported scheme '{scheme}' in '{url}'")]
    UnsupportedScheme { scheme: String, url: String },

    /// The file or directory does not exist.
    #[error("'{path}' does not exist")]
    NotFound { path: String },

    /// The file exists but could not be read.
    #[error("cannot read '{path}': {message}")]
    ReadFailed { path: String, message: String },

    /// The cloner could not materialize the repository.
    #[error("git clone error for {url}@{r#ref}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    CloneFailed {
        url: String,
        r#ref: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// The HTTP request failed or returned a non-success status.
    #[error("fetch of {url} failed: {message}")]
    FetchFailed { url: String, message: String },

    /// The loader configuration file could not be parsed.
    #[error("configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Map an I/O failure on `path` onto `NotFound` or `ReadFailed`.
    pub fn from_io(path: impl Into<String>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound { path }
        } else {
            Error::ReadFailed {
                path,
                message: err.to_string(),
            }
        }
    }

    /// True for both directory and repository cycles.
    pub fn is_cycle(&self) -> bool {
        matches!(
            self,
            Error::CycleDetected { .. } | Error::RepoCycleDetected { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_outside_root() {
        let error = Error::OutsideRoot {
            path: "/tmp/x/base/../exteriorData".to_string(),
            root: "/tmp/x/base".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("is not in or below"));
        assert!(display.contains("/tmp/x/base/../exteriorData"));
    }

    #[test]
    fn test_error_display_outside_clone() {
        let error = Error::OutsideClone {
            path: "/whatever/highBase".to_string(),
            clone: "/whatever/someClone".to_string(),
        };
        assert!(format!("{}", error)
            .contains("base '/whatever/highBase' is outside '/whatever/someClone'"));
    }

    #[test]
    fn test_error_display_cycles() {
        let dir = Error::CycleDetected {
            candidate: "/a".to_string(),
            visited: "/a/b".to_string(),
        };
        let repo = Error::RepoCycleDetected {
            uri: "github.com/org/repo".to_string(),
            previous: "github.com/org/repo/foo".to_string(),
        };
        assert!(format!("{}", dir).starts_with("cycle detected"));
        assert!(format!("{}", repo).starts_with("cycle detected"));
        assert!(dir.is_cycle());
        assert!(repo.is_cycle());
    }

    #[test]
    fn test_error_display_clone_failed_with_hint() {
        let error = Error::CloneFailed {
            url: "https://github.com/test/repo.git".to_string(),
            r#ref: "main".to_string(),
            message: "Authentication failed".to_string(),
            hint: Some("Check SSH keys".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("git clone error"));
        assert!(display.contains("https://github.com/test/repo.git@main"));
        assert!(display.contains("hint:"));
        assert!(display.contains("Check SSH keys"));
    }

    #[test]
    fn test_error_display_config_parse_without_hint() {
        let error = Error::ConfigParse {
            message: "Invalid YAML".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("configuration parsing error"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_from_io_not_found() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = Error::from_io("/x", io_error);
        assert!(matches!(error, Error::NotFound { ref path } if path == "/x"));
    }

    #[test]
    fn test_from_io_other_is_read_failed() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = Error::from_io("/x", io_error);
        assert!(matches!(error, Error::ReadFailed { .. }));
        assert!(format!("{}", error).contains("denied"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(format!("{}", error).contains("YAML parsing error"));
    }
}
