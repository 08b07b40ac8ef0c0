//! Configuration management for Palisade
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (PALISADE_* prefix, `__` between section and key)
//! 2. palisade.local.toml (gitignored, local overrides)
//! 3. palisade.toml (git-tracked, project config)
//! 4. ~/.config/palisade/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! ```toml
//! [policy]
//! path = "policies/active.json"
//! reload = true
//! min_check_interval_ms = 500
//!
//! [audit]
//! path = "var/audit/decisions.jsonl"
//! ```

use anyhow::Result;
use palisade_provider::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Palisade configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PalisadeConfig {
    pub policy: PolicyConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Policy document location. Left unset, the provider reports
    /// `not_configured` instead of serving an empty policy.
    pub path: Option<PathBuf>,
    pub reload: bool,
    pub min_check_interval_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            path: None,
            reload: true,
            min_check_interval_ms: 500,
        }
    }
}

/// Audit settings. Auditing is disabled when `path` is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub path: Option<PathBuf>,
}

impl PalisadeConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Parse a single TOML file, without layering.
    pub fn from_toml_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self =
            toml::from_str(&contents).map_err(|source| ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        config.normalize();
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Treat empty paths as unset.
    pub fn normalize(&mut self) {
        if self.policy.path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            self.policy.path = None;
        }
        if self.audit.path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            self.audit.path = None;
        }
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        for path in [&mut self.policy.path, &mut self.audit.path]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Reject settings that would corrupt state at runtime.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if let (Some(policy), Some(audit)) = (&self.policy.path, &self.audit.path) {
            if policy == audit {
                return Err(ConfigError::Conflict(format!(
                    "audit.path and policy.path both point at {}; audit lines would be appended to the policy",
                    policy.display()
                )));
            }
        }
        Ok(())
    }

    /// Provider settings derived from the `[policy]` section.
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            policy_path: self.policy.path.clone(),
            reload_enabled: self.policy.reload,
            min_check_interval: Duration::from_millis(self.policy.min_check_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = PalisadeConfig::default();
        assert!(config.policy.path.is_none());
        assert!(config.policy.reload);
        assert_eq!(config.policy.min_check_interval_ms, 500);
        assert!(config.audit.path.is_none());
    }

    #[test]
    fn test_provider_config_conversion() {
        let config = PalisadeConfig {
            policy: PolicyConfig {
                path: Some(PathBuf::from("/etc/palisade/policy.json")),
                reload: false,
                min_check_interval_ms: 1500,
            },
            ..Default::default()
        };

        let provider = config.provider_config();
        assert_eq!(
            provider.policy_path,
            Some(PathBuf::from("/etc/palisade/policy.json"))
        );
        assert!(!provider.reload_enabled);
        assert_eq!(provider.min_check_interval, Duration::from_millis(1500));
    }

    #[test]
    fn test_path_resolution() {
        let mut config = PalisadeConfig::default();
        config.policy.path = Some(PathBuf::from("policies/active.json"));
        config.audit.path = Some(PathBuf::from("/var/log/palisade.jsonl"));
        config.resolve_paths("/srv/app");

        assert_eq!(
            config.policy.path,
            Some(PathBuf::from("/srv/app/policies/active.json"))
        );
        assert_eq!(
            config.audit.path,
            Some(PathBuf::from("/var/log/palisade.jsonl"))
        );
    }

    #[test]
    fn test_empty_paths_normalize_to_unset() {
        let mut config = PalisadeConfig::default();
        config.policy.path = Some(PathBuf::new());
        config.audit.path = Some(PathBuf::new());
        config.normalize();

        assert!(config.policy.path.is_none());
        assert!(config.audit.path.is_none());
    }

    #[test]
    fn test_audit_path_must_differ_from_policy_path() {
        let mut config = PalisadeConfig::default();
        config.policy.path = Some(PathBuf::from("/srv/policy.json"));
        config.audit.path = Some(PathBuf::from("/srv/policy.json"));

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Conflict(_))
        ));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let file = dir.path().join("palisade.toml");
        std::fs::write(
            &file,
            r#"
[policy]
path = "active.json"
min_check_interval_ms = 100

[audit]
path = "audit.jsonl"
"#,
        )
        .expect("Failed to write config");

        let config = PalisadeConfig::from_toml_file(&file).expect("Failed to load config");
        assert_eq!(config.policy.path, Some(dir.path().join("active.json")));
        assert!(config.policy.reload);
        assert_eq!(config.policy.min_check_interval_ms, 100);
        assert_eq!(config.audit.path, Some(dir.path().join("audit.jsonl")));
    }

    #[test]
    fn test_from_toml_file_parse_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        let file = dir.path().join("palisade.toml");
        std::fs::write(&file, "[policy\npath = 1").expect("Failed to write config");

        assert!(matches!(
            PalisadeConfig::from_toml_file(&file),
            Err(ConfigError::Malformed { .. })
        ));
        assert!(matches!(
            PalisadeConfig::from_toml_file(dir.path().join("missing.toml")),
            Err(ConfigError::Unreadable { .. })
        ));
    }
}
