//! Attribute values.
//!
//! [`Value`] is the format-neutral representation of anything that can be
//! stored under an attribute key. Conversion to and from the on-disk TOML
//! representation lives here so the rest of the crate never touches
//! `toml::Value` directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A persisted attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the string contents, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this is an integer.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float, widening integers.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the nested mapping, if this is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Convert from the document representation. Datetimes have no
    /// counterpart and are kept as their string form.
    #[must_use]
    pub fn from_toml(value: toml::Value) -> Self {
        match value {
            toml::Value::Boolean(b) => Self::Boolean(b),
            toml::Value::Integer(i) => Self::Integer(i),
            toml::Value::Float(f) => Self::Float(f),
            toml::Value::String(s) => Self::String(s),
            toml::Value::Datetime(dt) => Self::String(dt.to_string()),
            toml::Value::Array(items) => Self::List(items.into_iter().map(Self::from_toml).collect()),
            toml::Value::Table(table) => Self::Map(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_toml(v)))
                    .collect(),
            ),
        }
    }

    /// Convert into the document representation.
    #[must_use]
    pub fn to_toml(&self) -> toml::Value {
        match self {
            Self::Boolean(b) => toml::Value::Boolean(*b),
            Self::Integer(i) => toml::Value::Integer(*i),
            Self::Float(f) => toml::Value::Float(*f),
            Self::String(s) => toml::Value::String(s.clone()),
            Self::List(items) => toml::Value::Array(items.iter().map(Self::to_toml).collect()),
            Self::Map(map) => toml::Value::Table(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_toml()))
                    .collect(),
            ),
        }
    }

    /// Parse a TOML literal (`5`, `true`, `"text"`, `[1, 2]`, `{ a = 1 }`).
    /// Anything that is not a valid literal is taken verbatim as a string.
    #[must_use]
    pub fn parse_literal(input: &str) -> Self {
        #[derive(Deserialize)]
        struct Literal {
            v: toml::Value,
        }

        match toml::from_str::<Literal>(&format!("v = {input}")) {
            Ok(literal) => Self::from_toml(literal.v),
            Err(_) => Self::String(input.to_string()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_toml()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal_scalars() {
        assert_eq!(Value::parse_literal("5"), Value::Integer(5));
        assert_eq!(Value::parse_literal("2.5"), Value::Float(2.5));
        assert_eq!(Value::parse_literal("true"), Value::Boolean(true));
        assert_eq!(Value::parse_literal("\"hi\""), Value::from("hi"));
    }

    #[test]
    fn test_parse_literal_falls_back_to_string() {
        assert_eq!(Value::parse_literal("alex"), Value::from("alex"));
        assert_eq!(Value::parse_literal("two words"), Value::from("two words"));
    }

    #[test]
    fn test_parse_literal_composites() {
        assert_eq!(
            Value::parse_literal("[1, 2]"),
            Value::List(vec![Value::Integer(1), Value::Integer(2)])
        );
        let map = Value::parse_literal("{ hp = 10, name = \"x\" }");
        let map = map.as_map().unwrap();
        assert_eq!(map.get("hp"), Some(&Value::Integer(10)));
        assert_eq!(map.get("name"), Some(&Value::from("x")));
    }

    #[test]
    fn test_datetime_reads_as_string() {
        let value = Value::parse_literal("1979-05-27");
        assert_eq!(value, Value::from("1979-05-27"));
    }

    #[test]
    fn test_as_float_widens_integers() {
        assert_eq!(Value::Integer(3).as_float(), Some(3.0));
        assert_eq!(Value::from("3").as_float(), None);
    }

    #[test]
    fn test_json_form_is_untagged() {
        let mut map = BTreeMap::new();
        map.insert("level".to_string(), Value::Integer(5));
        map.insert("boss".to_string(), Value::Boolean(false));
        let json = serde_json::to_string(&Value::Map(map)).unwrap();
        assert_eq!(json, r#"{"boss":false,"level":5}"#);
    }
}
