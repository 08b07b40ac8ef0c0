//! Authorization request types.
//!
//! A request describes an already-authenticated subject attempting an action
//! on a resource, plus a flat bag of environmental context. Requests are
//! built per call and dropped once the decision is made.

use serde::{Deserialize, Serialize};

use crate::value::Claims;

static NO_ATTRS: Claims = Claims::new();

/// The caller identity as seen by the authorizer.
///
/// Authentication happens upstream; the claims are trusted as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Subject {
    pub id: String,
    #[serde(default)]
    pub claims: Claims,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            claims: Claims::new(),
        }
    }

    pub fn with_claims(mut self, claims: Claims) -> Self {
        self.claims = claims;
        self
    }
}

/// The target of an action. Only the type is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Claims>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            attrs: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attrs(mut self, attrs: Claims) -> Self {
        self.attrs = Some(attrs);
        self
    }

    /// The attributes to match against; an omitted bag behaves as empty.
    pub fn attrs_or_empty(&self) -> &Claims {
        self.attrs.as_ref().unwrap_or(&NO_ATTRS)
    }
}

/// A single access check: may `subject` perform `action` on `resource`?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorizationRequest {
    pub subject: Subject,
    pub action: String,
    pub resource: Resource,
    #[serde(default)]
    pub context: Claims,
}

impl AuthorizationRequest {
    pub fn new(subject: Subject, action: impl Into<String>, resource: Resource) -> Self {
        Self {
            subject,
            action: action.into(),
            resource,
            context: Claims::new(),
        }
    }

    pub fn with_context(mut self, context: Claims) -> Self {
        self.context = context;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ClaimValue;
    use serde_json::json;

    #[test]
    fn test_deserialize_minimal_request() {
        let request: AuthorizationRequest = serde_json::from_value(json!({
            "subject": {"id": "u1"},
            "action": "read",
            "resource": {"type": "report"}
        }))
        .unwrap();

        assert!(request.subject.claims.is_empty());
        assert!(request.context.is_empty());
        assert!(request.resource.attrs.is_none());
        assert!(request.resource.attrs_or_empty().is_empty());
    }

    #[test]
    fn test_deserialize_full_request() {
        let request: AuthorizationRequest = serde_json::from_value(json!({
            "subject": {"id": "u1", "claims": {"role": "analyst"}},
            "action": "read",
            "resource": {"type": "report", "id": "r-9", "attrs": {"owner": "u1"}},
            "context": {"env": "prod"}
        }))
        .unwrap();

        assert_eq!(
            request.subject.claims.get("role"),
            Some(&ClaimValue::from("analyst"))
        );
        assert_eq!(request.resource.id.as_deref(), Some("r-9"));
        assert_eq!(request.context.get("env"), Some(&ClaimValue::from("prod")));
    }

    #[test]
    fn test_unknown_request_field_rejected() {
        let result = serde_json::from_value::<AuthorizationRequest>(json!({
            "subject": {"id": "u1"},
            "action": "read",
            "resource": {"type": "report"},
            "tenant": "t1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_nested_claim_rejected() {
        let result = serde_json::from_value::<Subject>(json!({
            "id": "u1",
            "claims": {"groups": ["a", "b"]}
        }));
        assert!(result.is_err());
    }
}
