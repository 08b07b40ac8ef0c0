//! Layered settings: defaults, user file, project files, environment.

use crate::{PalisadeConfig, Paths};
use anyhow::{Context, Result};
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};

/// Merges every settings source into one [`PalisadeConfig`].
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    user_config: bool,
}

impl ConfigLoader {
    /// Loader rooted at the current directory, reading `PALISADE_*` variables.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "PALISADE".to_string(),
            user_config: true,
        }
    }

    /// Directory holding `palisade.toml`; relative paths resolve against it.
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Prefix for environment overrides (default `PALISADE`).
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/palisade/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Merges the sources (later wins), then normalizes, resolves and validates.
    pub fn load(self) -> Result<PalisadeConfig> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&PalisadeConfig::default())?);

        if self.user_config {
            if let Ok(file) = Paths::new().user_config_file() {
                builder = with_toml_file(builder, file);
            }
        }
        builder = with_toml_file(builder, Paths::project_config_file(&self.project_dir));
        builder = with_toml_file(builder, Paths::local_config_file(&self.project_dir));

        // PALISADE_POLICY__PATH -> policy.path
        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: PalisadeConfig = builder
            .build()
            .context("merging settings sources")?
            .try_deserialize()
            .context("settings do not match the expected shape")?;

        settings.normalize();
        settings.resolve_paths(&self.project_dir);
        settings.validate().context("settings rejected")?;

        Ok(settings)
    }
}

/// Layers `path` on top of `builder` if the file exists.
fn with_toml_file(
    builder: ConfigBuilder<DefaultState>,
    path: PathBuf,
) -> ConfigBuilder<DefaultState> {
    if path.is_file() {
        builder.add_source(File::from(path).format(FileFormat::Toml))
    } else {
        builder
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
