#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use palisade_policy::{
    AuthorizationDecision, AuthorizationRequest, ClaimValue, Claims, Decision, Effect, Policy,
    PolicyRule, Reason, Resource, Subject, evaluate, rule_matches,
};

// Small alphabets keep collisions (and therefore matches) frequent.
const KEYS: [&str; 4] = ["role", "dept", "env", "tier"];
const ACTIONS: [&str; 3] = ["read", "write", "delete"];
const TYPES: [&str; 2] = ["report", "ledger"];

#[derive(Debug, Clone, Arbitrary)]
enum FuzzValue {
    Null,
    Bool(bool),
    Int(i8),
    Str(u8),
}

impl From<&FuzzValue> for ClaimValue {
    fn from(v: &FuzzValue) -> Self {
        match v {
            FuzzValue::Null => ClaimValue::Null,
            FuzzValue::Bool(b) => ClaimValue::from(*b),
            FuzzValue::Int(i) => ClaimValue::from(i64::from(*i)),
            FuzzValue::Str(s) => ClaimValue::from(format!("v{}", s % 4)),
        }
    }
}

fn to_claims(entries: &[(u8, FuzzValue)]) -> Claims {
    entries
        .iter()
        .map(|(k, v)| (KEYS[usize::from(*k) % KEYS.len()].to_string(), v.into()))
        .collect()
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzRule {
    id: u8,
    deny: bool,
    actions: Vec<u8>,
    resource_type: u8,
    subject_claims: Option<Vec<(u8, FuzzValue)>>,
    resource_attrs: Option<Vec<(u8, FuzzValue)>>,
    context_claims: Option<Vec<(u8, FuzzValue)>>,
}

impl FuzzRule {
    fn to_rule(&self) -> PolicyRule {
        let mut actions: Vec<&str> = self
            .actions
            .iter()
            .map(|a| ACTIONS[usize::from(*a) % ACTIONS.len()])
            .collect();
        if actions.is_empty() {
            actions.push(ACTIONS[0]);
        }
        let effect = if self.deny { Effect::Deny } else { Effect::Allow };

        let mut rule = PolicyRule::new(
            format!("r{}", self.id),
            effect,
            actions,
            TYPES[usize::from(self.resource_type) % TYPES.len()],
        );
        if let Some(entries) = &self.subject_claims {
            rule = rule.with_subject_claims(to_claims(entries));
        }
        if let Some(entries) = &self.resource_attrs {
            rule = rule.with_resource_attrs(to_claims(entries));
        }
        if let Some(entries) = &self.context_claims {
            rule = rule.with_context_claims(to_claims(entries));
        }
        rule
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzRequest {
    subject_claims: Vec<(u8, FuzzValue)>,
    action: u8,
    resource_type: u8,
    resource_attrs: Option<Vec<(u8, FuzzValue)>>,
    context: Vec<(u8, FuzzValue)>,
}

impl FuzzRequest {
    fn to_request(&self) -> AuthorizationRequest {
        let mut resource = Resource::new(TYPES[usize::from(self.resource_type) % TYPES.len()]);
        if let Some(entries) = &self.resource_attrs {
            resource = resource.with_attrs(to_claims(entries));
        }
        AuthorizationRequest::new(
            Subject::new("fuzz").with_claims(to_claims(&self.subject_claims)),
            ACTIONS[usize::from(self.action) % ACTIONS.len()],
            resource,
        )
        .with_context(to_claims(&self.context))
    }
}

fuzz_target!(|input: (Vec<FuzzRule>, FuzzRequest)| {
    let (rules, request) = input;

    let policy = rules
        .iter()
        .fold(Policy::new("fuzz", "1"), |policy, rule| policy.with_rule(rule.to_rule()));
    let request = request.to_request();

    let decision = evaluate(&request, &policy);
    validate_decision_invariants(&policy, &request, &decision);

    // Evaluation is pure.
    assert_eq!(decision, evaluate(&request, &policy));
});

/// Checks the decision against an independent recomputation.
///
/// 1. Any matching deny yields `deny/explicit_deny` listing every match
/// 2. Otherwise any matching allow yields `allow/matched_allow`
/// 3. Otherwise `deny/deny_by_default` with no ids
fn validate_decision_invariants(
    policy: &Policy,
    request: &AuthorizationRequest,
    decision: &AuthorizationDecision,
) {
    let matched: Vec<&PolicyRule> = policy
        .rules()
        .iter()
        .filter(|rule| rule_matches(rule, request))
        .collect();
    let ids = |rules: &[&PolicyRule]| -> Vec<String> {
        rules.iter().map(|rule| rule.id().to_string()).collect()
    };

    if matched.iter().any(|rule| rule.effect() == Effect::Deny) {
        assert_eq!(decision.decision, Decision::Deny);
        assert_eq!(decision.reason, Reason::ExplicitDeny);
        assert_eq!(decision.matched_rule_ids, ids(&matched));
    } else if !matched.is_empty() {
        assert_eq!(decision.decision, Decision::Allow);
        assert_eq!(decision.reason, Reason::MatchedAllow);
        assert_eq!(decision.matched_rule_ids, ids(&matched));
    } else {
        assert_eq!(decision.decision, Decision::Deny);
        assert_eq!(decision.reason, Reason::DenyByDefault);
        assert!(decision.matched_rule_ids.is_empty());
    }
}
