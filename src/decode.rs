//! Crate-private accessors for pulling typed fields out of `serde_json`
//! objects, producing [`ValidationError`]s that name the full field path.
//!
//! A JSON `null` is treated the same as an absent member throughout: the
//! feeds emit explicit nulls for optional fields they have no value for.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::time::parse_milliseconds;

pub(crate) type Obj = Map<String, Value>;

pub(crate) fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

pub(crate) fn index(path: &str, i: usize) -> String {
    format!("{path}[{i}]")
}

pub(crate) fn structural(
    path: &str,
    expected: impl Into<String>,
    got: impl Into<String>,
) -> ValidationError {
    ValidationError::Structural {
        path: path.to_string(),
        expected: expected.into(),
        got: got.into(),
    }
}

pub(crate) fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Obj, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| structural(path, "object", type_of(value)))
}

pub(crate) fn as_array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, ValidationError> {
    value
        .as_array()
        .ok_or_else(|| structural(path, "array", type_of(value)))
}

pub(crate) fn number(value: &Value, path: &str) -> Result<f64, ValidationError> {
    value
        .as_f64()
        .ok_or_else(|| structural(path, "number", type_of(value)))
}

pub(crate) fn require_str(obj: &Obj, path: &str, key: &str) -> Result<String, ValidationError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(structural(&join(path, key), "string", type_of(other))),
        None => Err(structural(&join(path, key), "string", "missing")),
    }
}

pub(crate) fn require_i64(obj: &Obj, path: &str, key: &str) -> Result<i64, ValidationError> {
    match obj.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| structural(&join(path, key), "integer", n.to_string())),
        Some(other) => Err(structural(&join(path, key), "integer", type_of(other))),
        None => Err(structural(&join(path, key), "integer", "missing")),
    }
}

pub(crate) fn require_u64(obj: &Obj, path: &str, key: &str) -> Result<u64, ValidationError> {
    match obj.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| structural(&join(path, key), "non-negative integer", n.to_string())),
        Some(other) => Err(structural(
            &join(path, key),
            "non-negative integer",
            type_of(other),
        )),
        None => Err(structural(&join(path, key), "non-negative integer", "missing")),
    }
}

/// Epoch-millisecond field decoded to a UTC instant.
pub(crate) fn require_ms(obj: &Obj, path: &str, key: &str) -> Result<DateTime<Utc>, ValidationError> {
    let ms = require_i64(obj, path, key)?;
    parse_milliseconds(ms).ok_or_else(|| {
        structural(
            &join(path, key),
            "millisecond timestamp",
            format!("{ms} (out of range)"),
        )
    })
}

pub(crate) fn opt_str(obj: &Obj, path: &str, key: &str) -> Result<Option<String>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(structural(&join(path, key), "string", type_of(other))),
    }
}

pub(crate) fn opt_i64(obj: &Obj, path: &str, key: &str) -> Result<Option<i64>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| structural(&join(path, key), "integer", n.to_string())),
        Some(other) => Err(structural(&join(path, key), "integer", type_of(other))),
    }
}

pub(crate) fn opt_f64(obj: &Obj, path: &str, key: &str) -> Result<Option<f64>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(structural(&join(path, key), "number", type_of(other))),
    }
}

/// Checks a fixed discriminant member such as `"type": "Feature"`.
pub(crate) fn literal(
    obj: &Obj,
    path: &str,
    key: &str,
    expected: &str,
) -> Result<(), ValidationError> {
    let found = require_str(obj, path, key)?;
    if found == expected {
        Ok(())
    } else {
        Err(structural(
            &join(path, key),
            format!("\"{expected}\""),
            format!("\"{found}\""),
        ))
    }
}

/// Members not consumed by the typed record, kept verbatim for round-trips.
pub(crate) fn extras(obj: &Obj, known: &[&str]) -> Obj {
    obj.iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Implements `Serialize`/`Deserialize` by delegating to the type's
/// `to_value`/`from_value`, so records interoperate with `serde_json`
/// entry points while keeping typed errors on the direct constructors.
macro_rules! serde_via_value {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serde::Serialize::serialize(&self.to_value(), serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value: serde_json::Value = serde::Deserialize::deserialize(deserializer)?;
                Self::from_value(&value).map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use serde_via_value;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Obj {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn null_counts_as_absent_for_optionals() {
        let fields = obj(json!({ "mag": null }));
        assert_eq!(opt_f64(&fields, "", "mag").unwrap(), None);
        assert_eq!(opt_str(&fields, "", "magType").unwrap(), None);
    }

    #[test]
    fn missing_required_field_names_the_path() {
        let fields = obj(json!({}));
        let err = require_str(&fields, "properties", "code").unwrap_err();
        assert_eq!(
            err.to_string(),
            "properties.code: expected string, got missing"
        );
    }

    #[test]
    fn wrong_type_is_reported() {
        let fields = obj(json!({ "sig": "600" }));
        let err = require_i64(&fields, "properties", "sig").unwrap_err();
        assert_eq!(err.to_string(), "properties.sig: expected integer, got string");
    }

    #[test]
    fn fractional_number_is_not_an_integer() {
        let fields = obj(json!({ "sig": 3.5 }));
        let err = require_i64(&fields, "", "sig").unwrap_err();
        assert_eq!(err.to_string(), "sig: expected integer, got 3.5");
    }

    #[test]
    fn millisecond_fields_decode_through_the_epoch_path() {
        let fields = obj(json!({ "time": -1000 }));
        let decoded = require_ms(&fields, "", "time").unwrap();
        assert_eq!(decoded.timestamp_millis(), -1000);
    }

    #[test]
    fn extras_keep_unknown_members() {
        let fields = obj(json!({ "type": "Feature", "metadata": { "count": 2 } }));
        let rest = extras(&fields, &["type"]);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest["metadata"]["count"], 2);
    }
}
