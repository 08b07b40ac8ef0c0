//! # Palisade
//!
//! Deny-overrides authorization over a declarative, versioned JSON policy.
//!
//! - **Strict loading** - Unknown keys and wrong shapes are rejected, never ignored
//! - **Deterministic decisions** - Full rule scan, deny-overrides, deny-by-default
//! - **Hot reload** - Policy changes are picked up without restart, bounded I/O
//! - **Audit trail** - One immutable record per decision, written before returning
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Authorizer                          │
//! │  ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌──────────┐ │
//! │  │ Provider │ → │ Evaluator │ → │  Record   │ → │   Sink   │ │
//! │  │ (cache)  │   │  (pure)   │   │ (builder) │   │ (append) │ │
//! │  └──────────┘   └───────────┘   └───────────┘   └──────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use palisade::{AuthorizationRequest, Authorizer, PalisadeConfig, Resource, Subject, claims};
//!
//! let config = PalisadeConfig::load()?;
//! let authorizer = Authorizer::from_config(&config);
//!
//! let request = AuthorizationRequest::new(
//!     Subject::new("u1").with_claims(claims([("role", "analyst")])),
//!     "read",
//!     Resource::new("report").with_id("q3"),
//! );
//!
//! let response = authorizer.authorize(&request, "req-1234")?;
//! println!("{} ({})", response.decision.as_str(), response.reason.as_str());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod authorizer;
mod error;

pub use authorizer::{AuthorizeResponse, Authorizer};
pub use error::{AuthorizeError, Result};

// Policy model, loader and evaluator
pub use palisade_policy::{
    AuthorizationDecision, AuthorizationRequest, ClaimValue, Claims, Decision, Effect, LoadError,
    Policy, PolicyRule, Reason, Resource, Subject, claims, evaluate, load_policy_from_file,
    load_policy_from_slice, load_policy_from_str,
};

// Provider
pub use palisade_provider::{
    FileStore, PolicyProvider, PolicyStore, ProviderConfig, ProviderError, Revision,
};

// Audit
pub use palisade_audit::{AuditError, AuditRecord, AuditSink, JsonlAuditSink, MemoryAuditSink};

// Configuration
pub use palisade_config::{ConfigLoader, PalisadeConfig};
