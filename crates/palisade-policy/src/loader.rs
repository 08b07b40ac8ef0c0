//! Strict policy document loader.
//!
//! Decoding happens in two phases. The raw bytes are first parsed as JSON,
//! which yields `malformed_syntax` errors carrying a line and column. The
//! resulting tree is then walked by a closed-world decoder: every object
//! declares the exact keys it accepts, and any violation is reported as
//! `schema_violation` with the offending field path (e.g. `rules[2].effect`).
//!
//! A `Policy` returned from here needs no further validation downstream.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::policy::{Effect, Policy, PolicyRule};
use crate::value::{ClaimValue, Claims};

/// Nesting depth at which serde_json stops parsing.
const MAX_NESTING_DEPTH: usize = 128;

const POLICY_FIELDS: &[&str] = &["id", "version", "rules"];
const RULE_FIELDS: &[&str] = &[
    "id",
    "effect",
    "actions",
    "resource_type",
    "subject_claims",
    "resource_attrs",
    "context_claims",
];

/// Error type for policy loading.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The document is not well-formed JSON.
    #[error("malformed policy document: {message}")]
    MalformedSyntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// The document is well-formed but does not have the policy shape.
    #[error("policy schema violation at `{path}`: {message}")]
    SchemaViolation { path: String, message: String },

    /// The policy file could not be read.
    #[error("failed to read policy file `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// Stable tag for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedSyntax { .. } => "malformed_syntax",
            Self::SchemaViolation { .. } => "schema_violation",
            Self::Io { .. } => "io_error",
        }
    }

    /// Operator-facing description including the source error, if any.
    pub fn hint(&self) -> String {
        match self {
            Self::Io { source, .. } => format!("{self}: {source}"),
            _ => self.to_string(),
        }
    }

    fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        // serde_json reports its recursion limit as a syntax error even when
        // the text itself is well-formed.
        if err.to_string().starts_with("recursion limit exceeded") {
            return Self::schema(
                "$",
                format!(
                    "document nests deeper than {MAX_NESTING_DEPTH} levels (line {}, column {})",
                    err.line(),
                    err.column()
                ),
            );
        }
        Self::MalformedSyntax {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoadError>;

// ============================================================================
// Public API
// ============================================================================

/// Parses and validates a policy document from raw bytes.
pub fn load_policy_from_slice(raw: &[u8]) -> Result<Policy> {
    let document: Value = serde_json::from_slice(raw)?;
    let policy = decode_policy(&document)?;

    let duplicates = policy.duplicate_rule_ids();
    if !duplicates.is_empty() {
        warn!(
            policy_id = policy.id(),
            duplicates = ?duplicates,
            "policy contains duplicate rule ids; each match is reported separately"
        );
    }

    debug!(
        policy_id = policy.id(),
        version = policy.version(),
        rules = policy.rules().len(),
        "decoded policy document"
    );

    Ok(policy)
}

/// Parses and validates a policy document from a string.
pub fn load_policy_from_str(raw: &str) -> Result<Policy> {
    load_policy_from_slice(raw.as_bytes())
}

/// Reads and validates a policy document from a file.
pub fn load_policy_from_file(path: impl AsRef<Path>) -> Result<Policy> {
    let path = path.as_ref();
    let raw = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_policy_from_slice(&raw)
}

// ============================================================================
// Decoder
// ============================================================================

/// A JSON object being decoded, paired with its location in the document.
struct ObjectDecoder<'a> {
    path: String,
    fields: &'a Map<String, Value>,
}

impl<'a> ObjectDecoder<'a> {
    fn new(value: &'a Value, path: String) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { path, fields }),
            other => Err(LoadError::schema(
                display_path(&path),
                format!("expected an object, found {}", json_type(other)),
            )),
        }
    }

    /// Rejects any key outside `allowed`.
    fn deny_unknown(&self, allowed: &[&str]) -> Result<()> {
        match self.fields.keys().find(|key| !allowed.contains(&key.as_str())) {
            Some(key) => Err(LoadError::schema(
                self.child(key),
                format!("unknown field; expected one of: {}", allowed.join(", ")),
            )),
            None => Ok(()),
        }
    }

    fn child(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        }
    }

    fn required(&self, key: &str) -> Result<&'a Value> {
        self.fields
            .get(key)
            .ok_or_else(|| LoadError::schema(self.child(key), "missing required field"))
    }

    fn string(&self, key: &str) -> Result<String> {
        match self.required(key)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(LoadError::schema(
                self.child(key),
                format!("expected a string, found {}", json_type(other)),
            )),
        }
    }

    fn array(&self, key: &str) -> Result<&'a Vec<Value>> {
        match self.required(key)? {
            Value::Array(items) => Ok(items),
            other => Err(LoadError::schema(
                self.child(key),
                format!("expected an array, found {}", json_type(other)),
            )),
        }
    }

    /// An optional flat map: absent stays `None`, present must be an object
    /// of scalars. Explicit `null` is not accepted as "absent".
    fn optional_claims(&self, key: &str) -> Result<Option<Claims>> {
        let Some(value) = self.fields.get(key) else {
            return Ok(None);
        };
        let path = self.child(key);
        let Value::Object(entries) = value else {
            return Err(LoadError::schema(
                path,
                format!("expected an object of scalar values, found {}", json_type(value)),
            ));
        };

        let mut claims = Claims::new();
        for (name, entry) in entries {
            let scalar = ClaimValue::from_json(entry).ok_or_else(|| {
                LoadError::schema(
                    format!("{path}.{name}"),
                    format!(
                        "expected a scalar (string, number, boolean, or null), found {}",
                        json_type(entry)
                    ),
                )
            })?;
            claims.insert(name.clone(), scalar);
        }
        Ok(Some(claims))
    }
}

fn decode_policy(document: &Value) -> Result<Policy> {
    let top = ObjectDecoder::new(document, String::new())?;
    top.deny_unknown(POLICY_FIELDS)?;

    let id = top.string("id")?;
    let version = top.string("version")?;
    let rules = top.array("rules")?;

    rules
        .iter()
        .enumerate()
        .try_fold(Policy::new(id, version), |policy, (index, raw)| {
            Ok(policy.with_rule(decode_rule(raw, format!("rules[{index}]"))?))
        })
}

fn decode_rule(raw: &Value, path: String) -> Result<PolicyRule> {
    let rule = ObjectDecoder::new(raw, path)?;
    rule.deny_unknown(RULE_FIELDS)?;

    let id = rule.string("id")?;

    let effect_raw = rule.string("effect")?;
    let effect = Effect::parse(&effect_raw).ok_or_else(|| {
        LoadError::schema(
            rule.child("effect"),
            format!("expected \"allow\" or \"deny\", found {effect_raw:?}"),
        )
    })?;

    let actions = decode_actions(&rule)?;
    let resource_type = rule.string("resource_type")?;

    let mut decoded = PolicyRule::new(id, effect, actions, resource_type);
    if let Some(claims) = rule.optional_claims("subject_claims")? {
        decoded = decoded.with_subject_claims(claims);
    }
    if let Some(attrs) = rule.optional_claims("resource_attrs")? {
        decoded = decoded.with_resource_attrs(attrs);
    }
    if let Some(claims) = rule.optional_claims("context_claims")? {
        decoded = decoded.with_context_claims(claims);
    }
    Ok(decoded)
}

fn decode_actions(rule: &ObjectDecoder<'_>) -> Result<Vec<String>> {
    let items = rule.array("actions")?;
    if items.is_empty() {
        return Err(LoadError::schema(
            rule.child("actions"),
            "must contain at least one action",
        ));
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(action) => Ok(action.clone()),
            other => Err(LoadError::schema(
                format!("{}[{index}]", rule.child("actions")),
                format!("expected a string, found {}", json_type(other)),
            )),
        })
        .collect()
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        path.to_string()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
