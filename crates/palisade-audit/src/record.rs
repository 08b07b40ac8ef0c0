//! Audit record construction.

use chrono::{DateTime, Utc};
use palisade_policy::{
    AuthorizationDecision, AuthorizationRequest, Claims, Decision, Policy, Reason,
};
use serde::{Deserialize, Serialize};

/// One authorization decision, as handed to an audit sink.
///
/// Built exactly once per call, after the decision exists, and never
/// modified afterwards. Fields are declared in alphabetical order so that
/// serialized records have sorted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub action: String,
    /// Request context, copied verbatim.
    pub context: Claims,
    /// Caller-supplied id linking this record to the surrounding request.
    pub correlation_id: String,
    pub created_at: DateTime<Utc>,
    pub decision: Decision,
    pub decision_id: String,
    pub matched_rule_ids: Vec<String>,
    pub policy_id: String,
    pub policy_version: String,
    pub reason: Reason,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub subject_id: String,
}

impl AuditRecord {
    /// Builds the record for a completed decision.
    ///
    /// Taking the `AuthorizationDecision` by reference is what ties record
    /// construction to a decision that already exists.
    pub fn for_decision(
        request: &AuthorizationRequest,
        decision: &AuthorizationDecision,
        policy: &Policy,
        decision_id: impl Into<String>,
        correlation_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action: request.action.clone(),
            context: request.context.clone(),
            correlation_id: correlation_id.into(),
            created_at,
            decision: decision.decision,
            decision_id: decision_id.into(),
            matched_rule_ids: decision.matched_rule_ids.clone(),
            policy_id: policy.id().to_string(),
            policy_version: policy.version().to_string(),
            reason: decision.reason,
            resource_id: request.resource.id.clone(),
            resource_type: request.resource.resource_type.clone(),
            subject_id: request.subject.id.clone(),
        }
    }
}
