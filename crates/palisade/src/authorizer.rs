//! The authorize entry point: provider → evaluator → audit.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use palisade_audit::{AuditRecord, AuditSink, JsonlAuditSink};
use palisade_config::PalisadeConfig;
use palisade_policy::{AuthorizationRequest, Decision, Reason, evaluate};
use palisade_provider::PolicyProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;

/// What a caller learns about one authorization call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub decision: Decision,
    pub reason: Reason,
    /// Fresh per call; matches the `decision_id` of the audit record.
    pub decision_id: String,
    pub policy_id: String,
    pub policy_version: String,
    pub matched_rule_ids: Vec<String>,
}

impl AuthorizeResponse {
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allow()
    }
}

/// Authorizes requests against the provider's current policy.
///
/// When an audit sink is attached, every decision is recorded before the
/// response is returned, and a failed write fails the call.
pub struct Authorizer {
    provider: PolicyProvider,
    audit: Option<Arc<dyn AuditSink>>,
}

impl Authorizer {
    /// Creates an authorizer with auditing disabled.
    pub fn new(provider: PolicyProvider) -> Self {
        Self {
            provider,
            audit: None,
        }
    }

    /// Attaches an audit sink.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Wires a file-backed provider and, if `audit.path` is set, a JSONL sink.
    pub fn from_config(config: &PalisadeConfig) -> Self {
        let authorizer = Self::new(PolicyProvider::new(config.provider_config()));
        match &config.audit.path {
            Some(path) => authorizer.with_audit_sink(Arc::new(JsonlAuditSink::new(path))),
            None => authorizer,
        }
    }

    pub fn provider(&self) -> &PolicyProvider {
        &self.provider
    }

    pub fn is_auditing(&self) -> bool {
        self.audit.is_some()
    }

    /// Evaluates `request` against the current policy.
    ///
    /// Steps, each of which can end the call:
    /// 1. fetch the policy (`policy_unavailable` on any provider error)
    /// 2. evaluate and assign a new decision id
    /// 3. if auditing, write the record (`audit_write_failed` on error)
    pub fn authorize(
        &self,
        request: &AuthorizationRequest,
        correlation_id: &str,
    ) -> Result<AuthorizeResponse> {
        let policy = self.provider.get().inspect_err(|e| {
            warn!(
                correlation_id,
                kind = e.kind(),
                error = %e,
                "policy unavailable, refusing to authorize"
            );
        })?;

        let decision = evaluate(request, &policy);
        let decision_id = Uuid::new_v4().to_string();

        if let Some(sink) = &self.audit {
            let record = AuditRecord::for_decision(
                request,
                &decision,
                &policy,
                decision_id.as_str(),
                correlation_id,
                Utc::now(),
            );
            sink.write(&record).inspect_err(|e| {
                warn!(
                    decision_id = %decision_id,
                    correlation_id,
                    error = %e,
                    "decision computed but audit write failed"
                );
            })?;
            debug!(decision_id = %decision_id, "decision audited");
        }

        if decision.decision.is_allow() {
            info!(
                decision_id = %decision_id,
                correlation_id,
                subject = %request.subject.id,
                action = %request.action,
                resource_type = %request.resource.resource_type,
                reason = decision.reason.as_str(),
                "access allowed"
            );
        } else {
            warn!(
                decision_id = %decision_id,
                correlation_id,
                subject = %request.subject.id,
                action = %request.action,
                resource_type = %request.resource.resource_type,
                reason = decision.reason.as_str(),
                "access denied"
            );
        }

        Ok(AuthorizeResponse {
            decision: decision.decision,
            reason: decision.reason,
            decision_id,
            policy_id: policy.id().to_string(),
            policy_version: policy.version().to_string(),
            matched_rule_ids: decision.matched_rule_ids,
        })
    }
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("provider", &self.provider)
            .field("auditing", &self.is_auditing())
            .finish()
    }
}
