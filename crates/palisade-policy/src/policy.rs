//! Policy definitions.
//!
//! A policy is an ordered list of rules. Each rule constrains the action,
//! the resource type, and optionally three flat predicate maps. Policies are
//! immutable once built: a reload produces a new `Policy`, never an edit.

use serde::Serialize;

use crate::value::Claims;

// ============================================================================
// Effect
// ============================================================================

/// The effect of a policy rule: allow or deny access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Grant access.
    Allow,
    /// Deny access.
    Deny,
}

impl Effect {
    /// Parses the exact wire spelling. Anything else is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "allow" => Some(Self::Allow),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }
}

// ============================================================================
// PolicyRule
// ============================================================================

/// A single access control rule within a policy.
///
/// All constraints are combined with AND. An absent predicate map places no
/// constraint on its dimension; a present map must subset-match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRule {
    id: String,
    effect: Effect,
    actions: Vec<String>,
    resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_claims: Option<Claims>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_attrs: Option<Claims>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context_claims: Option<Claims>,
}

impl PolicyRule {
    /// Creates a rule with no predicate maps.
    ///
    /// # Panics
    ///
    /// Panics if `actions` is empty. The loader rejects such documents before
    /// ever reaching this constructor.
    pub fn new<A, S>(
        id: impl Into<String>,
        effect: Effect,
        actions: A,
        resource_type: impl Into<String>,
    ) -> Self
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let actions: Vec<String> = actions.into_iter().map(Into::into).collect();
        assert!(!actions.is_empty(), "a policy rule needs at least one action");

        Self {
            id: id.into(),
            effect,
            actions,
            resource_type: resource_type.into(),
            subject_claims: None,
            resource_attrs: None,
            context_claims: None,
        }
    }

    /// Requires the subject's claims to contain every entry of `claims`.
    pub fn with_subject_claims(mut self, claims: Claims) -> Self {
        self.subject_claims = Some(claims);
        self
    }

    /// Requires the resource's attributes to contain every entry of `attrs`.
    pub fn with_resource_attrs(mut self, attrs: Claims) -> Self {
        self.resource_attrs = Some(attrs);
        self
    }

    /// Requires the request context to contain every entry of `claims`.
    pub fn with_context_claims(mut self, claims: Claims) -> Self {
        self.context_claims = Some(claims);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Actions in the order they were declared. Never empty.
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn subject_claims(&self) -> Option<&Claims> {
        self.subject_claims.as_ref()
    }

    pub fn resource_attrs(&self) -> Option<&Claims> {
        self.resource_attrs.as_ref()
    }

    pub fn context_claims(&self) -> Option<&Claims> {
        self.context_claims.as_ref()
    }
}

// ============================================================================
// Policy
// ============================================================================

/// A versioned, ordered set of rules.
///
/// Rule order is preserved verbatim from the source document. It decides the
/// order of `matched_rule_ids` in a decision but never the allow/deny outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Policy {
    id: String,
    version: String,
    rules: Vec<PolicyRule>,
}

impl Policy {
    /// Creates an empty policy. With no rules every request is denied by default.
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            rules: Vec::new(),
        }
    }

    /// Appends a rule (builder pattern).
    pub fn with_rule(mut self, rule: PolicyRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Rule ids that occur more than once, in first-seen order.
    ///
    /// Duplicates are legal; each matching copy shows up in a decision's
    /// matched ids.
    pub fn duplicate_rule_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !seen.insert(rule.id()) && !duplicates.contains(&rule.id()) {
                duplicates.push(rule.id());
            }
        }
        duplicates
    }
}
