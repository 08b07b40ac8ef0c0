//! Error types for the authorize surface.

use palisade_audit::AuditError;
use palisade_provider::ProviderError;
use thiserror::Error;

/// Result type for authorize operations.
pub type Result<T> = std::result::Result<T, AuthorizeError>;

/// Errors surfaced by [`crate::Authorizer::authorize`].
///
/// A policy that cannot be obtained never degrades into an allow or a
/// silent deny; callers always see which of the two stages failed.
#[derive(Debug, Error)]
pub enum AuthorizeError {
    /// The active policy could not be obtained.
    #[error("policy unavailable: {0}")]
    PolicyUnavailable(#[from] ProviderError),

    /// A decision was computed but its audit record could not be written.
    #[error("audit write failed: {0}")]
    AuditWriteFailed(#[from] AuditError),
}

impl AuthorizeError {
    /// Stable code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PolicyUnavailable(_) => "policy_unavailable",
            Self::AuditWriteFailed(_) => "audit_write_failed",
        }
    }

    /// Detail string for operators, naming the underlying tag.
    pub fn hint(&self) -> String {
        match self {
            Self::PolicyUnavailable(e) => format!("{}: {}", e.kind(), e.hint()),
            Self::AuditWriteFailed(e) => e.hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err = AuthorizeError::from(ProviderError::NotConfigured);
        assert_eq!(err.code(), "policy_unavailable");
        assert!(err.hint().starts_with("not_configured: "));

        let err = AuthorizeError::from(AuditError::Unavailable("closed".into()));
        assert_eq!(err.code(), "audit_write_failed");
        assert!(err.hint().contains("closed"));
    }
}
