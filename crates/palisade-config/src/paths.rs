//! Where Palisade looks for settings files.

use crate::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const USER_FILE: &str = "config.toml";
const PROJECT_FILE: &str = "palisade.toml";
const LOCAL_FILE: &str = "palisade.local.toml";

/// Settings file locations, per user and per project.
pub struct Paths {
    user_dir: Option<PathBuf>,
}

impl Paths {
    pub fn new() -> Self {
        Self {
            user_dir: ProjectDirs::from("dev", "Palisade", "palisade")
                .map(|dirs| dirs.config_dir().to_path_buf()),
        }
    }

    /// `config.toml` under the platform's per-user config directory
    /// (`$XDG_CONFIG_HOME/palisade` on Linux).
    pub fn user_config_file(&self) -> Result<PathBuf, ConfigError> {
        self.user_dir
            .as_ref()
            .map(|dir| dir.join(USER_FILE))
            .ok_or(ConfigError::NoUserDir)
    }

    /// The shared settings file checked into a project.
    pub fn project_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join(PROJECT_FILE)
    }

    /// Machine-local overrides layered on top of the project file.
    pub fn local_config_file(project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join(LOCAL_FILE)
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
