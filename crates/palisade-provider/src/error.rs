//! Provider error types

use std::sync::Arc;

use palisade_policy::LoadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// No storage location was configured. Never treated as an empty policy.
    #[error("no policy storage location is configured")]
    NotConfigured,

    /// The storage probe or read failed; the cache is not served.
    #[error("cannot access policy storage `{locator}`")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    /// The stored document was rejected by the loader. The same rejection is
    /// shared by every call until the document changes.
    #[error("policy at `{locator}` failed validation")]
    Validation {
        locator: String,
        #[source]
        source: Arc<LoadError>,
    },
}

impl ProviderError {
    /// Stable tag for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Io { .. } => "io_error",
            Self::Validation { .. } => "validation_error",
        }
    }

    /// Operator-facing description including the underlying cause.
    pub fn hint(&self) -> String {
        match self {
            Self::NotConfigured => {
                "no storage locator configured; supply a policy location".to_string()
            }
            Self::Io { source, .. } => format!("{self}: {source}"),
            Self::Validation { source, .. } => {
                format!("{self}: {}: {}", source.kind(), source.hint())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
