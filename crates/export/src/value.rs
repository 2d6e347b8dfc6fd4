//! Dynamic record values.
//!
//! Source rows arrive as heterogeneous mappings (inline JSON payloads or
//! adapter results). They are represented as an ordered `field → Value`
//! map where [`Value`] is a tagged union over the scalar kinds the
//! transformer understands, plus a nested map for join chains. Field
//! absence and an explicit `null` are equivalent everywhere.

use indexmap::IndexMap;
use serde::Deserialize;

/// A single field value in a [`Record`].
///
/// Deserialization accepts JSON scalars and nested objects. JSON arrays
/// are not part of the record model and are rejected with a
/// deserialization error, which surfaces as a validation failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Explicit null; treated identically to an absent field.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Text. Dates and datetimes arrive in this form and are parsed by
    /// the date transforms.
    Text(String),
    /// A nested record, reachable through `join_lookup` chains.
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Renders the value in its natural string form.
    ///
    /// `Null` and nested maps render as the empty string; floats drop a
    /// trailing `.0` so integral amounts read as integers.
    pub fn natural_string(&self) -> String {
        match self {
            Value::Null | Value::Map(_) => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            Value::Text(s) => s.clone(),
        }
    }

    /// Interprets the value as a boolean.
    ///
    /// Numbers are truthy when non-zero; text is truthy unless empty or
    /// one of the conventional negatives ("no", "false", "0", "n").
    /// `Null` and nested maps are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null | Value::Map(_) => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => {
                let s = s.trim();
                !s.is_empty() && !matches!(s.to_ascii_lowercase().as_str(), "no" | "false" | "0" | "n")
            }
        }
    }

    /// Interprets the value as an integer status code where possible.
    pub fn as_status_code(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interprets the value as a numeric amount where possible.
    pub fn as_amount(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
            // Arrays are outside the record model; render them opaque-empty
            // rather than failing a whole export after validation.
            serde_json::Value::Array(_) => Value::Null,
        }
    }
}

/// An ordered mapping from field name to [`Value`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Record(IndexMap::new())
    }

    /// Returns the value for `field`, treating explicit null as absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    /// Follows a chain of fields through nested maps.
    ///
    /// A missing link anywhere in the chain yields `None`.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.get(first)?;
        for segment in rest {
            match current {
                Value::Map(map) => {
                    current = map.get(*segment).filter(|v| !v.is_null())?;
                }
                _ => return None,
            }
        }
        Some(current)
    }

    /// Sets a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// Number of fields present (including explicit nulls).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the record carries no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(field, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: serde_json::Value) -> Record {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn absent_and_null_are_equivalent() {
        let rec = record(serde_json::json!({"a": null, "b": 1}));
        assert!(rec.get("a").is_none());
        assert!(rec.get("missing").is_none());
        assert_eq!(rec.get("b"), Some(&Value::Int(1)));
    }

    #[test]
    fn natural_string_forms() {
        assert_eq!(Value::Text("x".into()).natural_string(), "x");
        assert_eq!(Value::Int(42).natural_string(), "42");
        assert_eq!(Value::Float(2.0).natural_string(), "2");
        assert_eq!(Value::Float(2.5).natural_string(), "2.5");
        assert_eq!(Value::Bool(true).natural_string(), "true");
        assert_eq!(Value::Null.natural_string(), "");
    }

    #[test]
    fn truthiness() {
        assert!(Value::Bool(true).truthy());
        assert!(Value::Int(1).truthy());
        assert!(Value::Text("yes".into()).truthy());
        assert!(!Value::Text("no".into()).truthy());
        assert!(!Value::Text("0".into()).truthy());
        assert!(!Value::Text("".into()).truthy());
        assert!(!Value::Null.truthy());
    }

    #[test]
    fn path_traversal() {
        let rec = record(serde_json::json!({
            "program": {"name": "Summit 2025", "region": {"code": "EU"}}
        }));
        assert_eq!(
            rec.get_path(&["program", "name"]),
            Some(&Value::Text("Summit 2025".into()))
        );
        assert_eq!(
            rec.get_path(&["program", "region", "code"]),
            Some(&Value::Text("EU".into()))
        );
        assert!(rec.get_path(&["program", "missing"]).is_none());
        assert!(rec.get_path(&["program", "name", "deeper"]).is_none());
    }

    #[test]
    fn status_code_coercion() {
        assert_eq!(Value::Int(2).as_status_code(), Some(2));
        assert_eq!(Value::Text("2".into()).as_status_code(), Some(2));
        assert_eq!(Value::Float(2.0).as_status_code(), Some(2));
        assert_eq!(Value::Text("abc".into()).as_status_code(), None);
    }

    #[test]
    fn preserves_field_order() {
        // Parse from text: deserialization goes straight into the ordered
        // map, which is the same path HTTP payloads take.
        let rec: Record = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let fields: Vec<&String> = rec.iter().map(|(k, _)| k).collect();
        assert_eq!(fields, ["z", "a", "m"]);
    }
}
