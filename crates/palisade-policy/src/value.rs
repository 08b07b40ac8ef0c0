//! Scalar claim values and flat claim maps.
//!
//! Every predicate map in a policy and every attribute bag on a request is a
//! flat `string -> scalar` map. Nested arrays and objects are rejected at the
//! decoding boundary, so matching never has to traverse paths.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};

/// A flat map of claim names to scalar values.
///
/// `BTreeMap` keeps iteration (and therefore serialization) order stable.
pub type Claims = BTreeMap<String, ClaimValue>;

/// A single scalar value inside a [`Claims`] map.
///
/// Equality is exact: there is no numeric coercion, so `1`, `1.0`, `"1"`
/// and `true` are four distinct values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClaimValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl ClaimValue {
    /// Converts a JSON value into a scalar, or `None` for arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ClaimValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ClaimValue {
    fn from(n: i64) -> Self {
        Self::Number(Number::from(n))
    }
}

impl From<u64> for ClaimValue {
    fn from(n: u64) -> Self {
        Self::Number(Number::from(n))
    }
}

impl Serialize for ClaimValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for ClaimValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ClaimValueVisitor)
    }
}

struct ClaimValueVisitor;

impl<'de> Visitor<'de> for ClaimValueVisitor {
    type Value = ClaimValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar value (string, number, boolean, or null)")
    }

    fn visit_unit<E: de::Error>(self) -> Result<ClaimValue, E> {
        Ok(ClaimValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<ClaimValue, E> {
        Ok(ClaimValue::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ClaimValue, E> {
        Ok(ClaimValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ClaimValue, E> {
        Ok(ClaimValue::Number(Number::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ClaimValue, E> {
        Ok(ClaimValue::Number(Number::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ClaimValue, E> {
        Number::from_f64(v)
            .map(ClaimValue::Number)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Float(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ClaimValue, E> {
        Ok(ClaimValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ClaimValue, E> {
        Ok(ClaimValue::String(v))
    }
}

/// Builds a [`Claims`] map from `(key, value)` pairs.
///
/// ```
/// use palisade_policy::claims;
///
/// let c = claims([("role", "analyst"), ("dept", "finance")]);
/// assert_eq!(c.len(), 2);
/// ```
pub fn claims<K, V, I>(pairs: I) -> Claims
where
    K: Into<String>,
    V: Into<ClaimValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_numeric_coercion() {
        let int: ClaimValue = serde_json::from_value(json!(1)).unwrap();
        let float: ClaimValue = serde_json::from_value(json!(1.0)).unwrap();
        let string: ClaimValue = serde_json::from_value(json!("1")).unwrap();
        let boolean: ClaimValue = serde_json::from_value(json!(true)).unwrap();

        assert_ne!(int, float);
        assert_ne!(int, string);
        assert_ne!(int, boolean);
        assert_eq!(int, ClaimValue::from(1_i64));
    }

    #[test]
    fn test_nested_values_rejected() {
        assert!(serde_json::from_value::<ClaimValue>(json!(["a"])).is_err());
        assert!(serde_json::from_value::<ClaimValue>(json!({"a": 1})).is_err());
        assert!(ClaimValue::from_json(&json!([1])).is_none());
    }

    #[test]
    fn test_serialize_matches_json() {
        let c = claims([("role", ClaimValue::from("analyst")), ("level", 3_i64.into())]);
        let encoded = serde_json::to_value(&c).unwrap();
        assert_eq!(encoded, json!({"level": 3, "role": "analyst"}));
    }

    #[test]
    fn test_null_is_a_scalar() {
        let v: ClaimValue = serde_json::from_value(Value::Null).unwrap();
        assert_eq!(v, ClaimValue::Null);
        assert_eq!(ClaimValue::from_json(&Value::Null), Some(ClaimValue::Null));
    }
}
