//! Policy evaluation engine.
//!
//! Every rule is checked in listed order with no short-circuit, so the
//! decision carries a complete trail of matched rule ids. Resolution is
//! deny-overrides with deny-by-default.

use serde::{Deserialize, Serialize};

use crate::policy::{Effect, Policy, PolicyRule};
use crate::request::AuthorizationRequest;
use crate::value::Claims;

// ============================================================================
// Decision
// ============================================================================

/// Whether the request is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }

    pub fn is_allow(self) -> bool {
        self == Self::Allow
    }
}

/// Why the decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// At least one matching rule has effect `deny`.
    ExplicitDeny,
    /// Only `allow` rules matched.
    MatchedAllow,
    /// Nothing matched.
    DenyByDefault,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExplicitDeny => "explicit_deny",
            Self::MatchedAllow => "matched_allow",
            Self::DenyByDefault => "deny_by_default",
        }
    }
}

/// The result of evaluating one request against one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub decision: Decision,
    pub reason: Reason,
    /// Matched rule ids in policy order. Empty for `deny_by_default`.
    pub matched_rule_ids: Vec<String>,
}

impl AuthorizationDecision {
    fn deny_by_default() -> Self {
        Self {
            decision: Decision::Deny,
            reason: Reason::DenyByDefault,
            matched_rule_ids: Vec::new(),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Evaluates a request against a policy.
///
/// - Any matching `deny` rule yields `deny/explicit_deny` with the ids of
///   every matching rule, both effects, in listed order.
/// - Otherwise any matching `allow` rule yields `allow/matched_allow` with
///   the matching allow ids in listed order.
/// - Otherwise `deny/deny_by_default` with no ids.
///
/// # Postcondition
///
/// Always returns exactly one decision; never panics.
pub fn evaluate(request: &AuthorizationRequest, policy: &Policy) -> AuthorizationDecision {
    let matched: Vec<&PolicyRule> = policy
        .rules()
        .iter()
        .filter(|rule| rule_matches(rule, request))
        .collect();

    let decision = if matched.iter().any(|rule| rule.effect() == Effect::Deny) {
        AuthorizationDecision {
            decision: Decision::Deny,
            reason: Reason::ExplicitDeny,
            matched_rule_ids: matched.iter().map(|rule| rule.id().to_string()).collect(),
        }
    } else if !matched.is_empty() {
        // No deny matched, so every match is an allow.
        AuthorizationDecision {
            decision: Decision::Allow,
            reason: Reason::MatchedAllow,
            matched_rule_ids: matched.iter().map(|rule| rule.id().to_string()).collect(),
        }
    } else {
        AuthorizationDecision::deny_by_default()
    };

    tracing::trace!(
        policy_id = policy.id(),
        action = %request.action,
        resource_type = %request.resource.resource_type,
        decision = decision.decision.as_str(),
        reason = decision.reason.as_str(),
        matched = decision.matched_rule_ids.len(),
        "evaluated request"
    );

    decision
}

/// True if every constraint of `rule` holds for `request`.
pub fn rule_matches(rule: &PolicyRule, request: &AuthorizationRequest) -> bool {
    if !rule.actions().iter().any(|a| *a == request.action) {
        return false;
    }

    if rule.resource_type() != request.resource.resource_type {
        return false;
    }

    let predicates = [
        (rule.subject_claims(), &request.subject.claims),
        (rule.resource_attrs(), request.resource.attrs_or_empty()),
        (rule.context_claims(), &request.context),
    ];

    predicates
        .into_iter()
        .all(|(expected, actual)| expected.is_none_or(|expected| subset_match(expected, actual)))
}

/// Subset-equality: every key of `expected` exists in `actual` with an
/// identical value. Extra keys in `actual` are ignored.
pub fn subset_match(expected: &Claims, actual: &Claims) -> bool {
    expected
        .iter()
        .all(|(key, value)| actual.get(key) == Some(value))
}

// ============================================================================
// Tests
// ============================================================================
