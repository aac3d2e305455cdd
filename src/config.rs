//! # Loader Configuration
//!
//! Settings used by the `overlay-loader` binary to build its root loader,
//! read from a small YAML file:
//!
//! ```yaml
//! restriction: root_only   # or: none
//! git:
//!   command: git
//!   submodules: true
//! http:
//!   timeout_secs: 30
//!   user_agent: my-tool/1.0
//! ```
//!
//! Every key is optional. Unknown keys are rejected so that a typo does not
//! silently fall back to a default.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::git::GitCloner;
use crate::http::ReqwestClient;
use crate::restriction::LoadRestriction;

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Where local files may be loaded from.
    pub restriction: LoadRestriction,
    pub git: GitConfig,
    pub http: HttpConfig,
}

/// How remote repositories are cloned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    /// Executable used for every git invocation.
    pub command: String,
    /// Whether submodules are fetched. A reference can still opt out with
    /// `?submodules=false`.
    pub submodules: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            command: "git".to_string(),
            submodules: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Overall timeout for one request; no timeout when unset.
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

impl LoaderConfig {
    /// Cloner described by the `git` section
    pub fn cloner(&self) -> GitCloner {
        GitCloner::new()
            .with_command(self.git.command.clone())
            .with_submodules(self.git.submodules)
    }

    /// HTTP client described by the `http` section
    pub fn http_client(&self) -> Result<Arc<ReqwestClient>> {
        let client = ReqwestClient::with_options(
            self.http.timeout_secs.map(Duration::from_secs),
            self.http.user_agent.as_deref(),
        )?;
        Ok(Arc::new(client))
    }
}

/// Parse a configuration from YAML.
///
/// An empty document yields the default configuration.
pub fn parse(yaml_content: &str) -> Result<LoaderConfig> {
    if yaml_content.trim().is_empty() {
        return Ok(LoaderConfig::default());
    }

    serde_yaml::from_str::<LoaderConfig>(yaml_content).map_err(|e| {
        let message = e.to_string();
        let hint = if message.contains("unknown field") {
            Some("valid keys are restriction, git.command, git.submodules, http.timeout_secs and http.user_agent".to_string())
        } else if message.contains("unknown variant") {
            Some("restriction must be root_only or none".to_string())
        } else {
            None
        };
        Error::ConfigParse { message, hint }
    })
}

/// Parse a configuration from a YAML file path
pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<LoaderConfig> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).map_err(|e| Error::from_io(path.display().to_string(), e))?;
    parse(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
restriction: none
git:
  command: /usr/local/bin/git
  submodules: false
http:
  timeout_secs: 30
  user_agent: test-agent/1.0
"#;
        let config = parse(yaml).unwrap();
        assert_eq!(config.restriction, LoadRestriction::None);
        assert_eq!(config.git.command, "/usr/local/bin/git");
        assert!(!config.git.submodules);
        assert_eq!(config.http.timeout_secs, Some(30));
        assert_eq!(config.http.user_agent.as_deref(), Some("test-agent/1.0"));
    }

    #[test]
    fn test_parse_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, LoaderConfig::default());
        assert_eq!(config.restriction, LoadRestriction::RootOnly);
        assert_eq!(config.git.command, "git");
        assert!(config.git.submodules);
        assert!(config.http.timeout_secs.is_none());

        let partial = parse("git:\n  submodules: false\n").unwrap();
        assert_eq!(partial.git.command, "git");
        assert!(!partial.git.submodules);
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let err = parse("restrictoin: none\n").unwrap_err();
        match err {
            Error::ConfigParse { message, hint } => {
                assert!(message.contains("restrictoin"));
                assert!(hint.unwrap().contains("valid keys"));
            }
            other => panic!("expected ConfigParse, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_restriction() {
        let err = parse("restriction: everywhere\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { hint: Some(_), .. }));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse("git: [unclosed");
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_from_file_nonexistent() {
        let result = from_file("nonexistent_file.yaml");
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_from_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "restriction: none\n").unwrap();
        assert_eq!(from_file(temp.path()).unwrap().restriction, LoadRestriction::None);
    }

    #[test]
    fn test_builds_capabilities() {
        let config = parse("http:\n  timeout_secs: 5\n").unwrap();
        assert!(config.http_client().is_ok());
        let _cloner = config.cloner();
    }
}
