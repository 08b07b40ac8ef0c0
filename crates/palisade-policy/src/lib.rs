//! # palisade-policy: Policy model, loader, and evaluator
//!
//! Turns a declarative, versioned JSON policy into deterministic allow/deny
//! decisions with a traceable rationale.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Policy document (JSON bytes)                │
//! └─────────────────┬───────────────────────────┘
//!                   │  loader: strict, closed-world
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Policy { id, version, rules[] }             │
//! │  (immutable, rule order preserved)           │
//! └─────────────────┬───────────────────────────┘
//!                   │  evaluator: full scan,
//!                   │  deny-overrides, deny-by-default
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  AuthorizationDecision                       │
//! │  - decision (allow/deny)                     │
//! │  - reason                                    │
//! │  - matched rule ids (listing order)          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Matching is intentionally narrow: exact action and resource-type
//! equality, plus subset-equality on three flat predicate maps. There are
//! no wildcards, ranges, regexes, or nested attribute paths.
//!
//! ## Example
//!
//! ```
//! use palisade_policy::{
//!     AuthorizationRequest, Decision, Reason, Resource, Subject, claims, evaluate,
//!     load_policy_from_str,
//! };
//!
//! let policy = load_policy_from_str(r#"{
//!     "id": "reports",
//!     "version": "1",
//!     "rules": [{
//!         "id": "r1",
//!         "effect": "allow",
//!         "actions": ["read"],
//!         "resource_type": "report",
//!         "subject_claims": {"role": "analyst"}
//!     }]
//! }"#)?;
//!
//! let request = AuthorizationRequest::new(
//!     Subject::new("u1").with_claims(claims([("role", "analyst")])),
//!     "read",
//!     Resource::new("report"),
//! );
//!
//! let decision = evaluate(&request, &policy);
//! assert_eq!(decision.decision, Decision::Allow);
//! assert_eq!(decision.reason, Reason::MatchedAllow);
//! assert_eq!(decision.matched_rule_ids, vec!["r1"]);
//! # Ok::<(), palisade_policy::LoadError>(())
//! ```

pub mod evaluator;
pub mod loader;
pub mod policy;
pub mod request;
pub mod value;

pub use evaluator::{
    AuthorizationDecision, Decision, Reason, evaluate, rule_matches, subset_match,
};
pub use loader::{LoadError, load_policy_from_file, load_policy_from_slice, load_policy_from_str};
pub use policy::{Effect, Policy, PolicyRule};
pub use request::{AuthorizationRequest, Resource, Subject};
pub use value::{ClaimValue, Claims, claims};
