//! Errors raised while reading or checking Palisade settings.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A settings file exists but could not be read.
    #[error("cannot read settings file {}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A settings file is not TOML, or does not have the settings shape.
    #[error("settings file {} is invalid: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Each setting is fine on its own, but together they cannot work.
    #[error("conflicting settings: {0}")]
    Conflict(String),

    /// The platform reports no home directory, so per-user settings have no location.
    #[error("cannot locate a per-user settings directory")]
    NoUserDir,
}
