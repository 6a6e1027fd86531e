//! value representation
//!
//! Every resolved attribute is one of
//! - null (also used for values that are unknown until apply time)
//! - boolean
//! - number (integer or float, see [hcl::Number])
//! - string (utf-8)
//! - list (ordered sequence of values)
//! - map (insertion-ordered, string keys)
//!
//! Equality is structural. Map equality ignores key order, but iteration and
//! serialization keep insertion order so output is reproducible.
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

pub use hcl::Number;

pub type Map = indexmap::IndexMap<String, Value>;

/// All possible value types
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Map(Map),
}

impl Value {
    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Looks up `key` when this value is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Renders a primitive the way string interpolation does.
    /// Returns `None` for null and for collections.
    pub fn to_template_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Number::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(Number::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(Number::from(value as u64))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

impl From<hcl::Value> for Value {
    fn from(value: hcl::Value) -> Value {
        match value {
            hcl::Value::Null => Value::Null,
            hcl::Value::Bool(b) => Value::Bool(b),
            hcl::Value::Number(n) => Value::Number(n),
            hcl::Value::String(s) => Value::String(s),
            hcl::Value::Array(a) => Value::List(a.into_iter().map(Into::into).collect()),
            hcl::Value::Object(o) => Value::Map(o.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl From<Value> for hcl::Value {
    fn from(value: Value) -> hcl::Value {
        match value {
            Value::Null => hcl::Value::Null,
            Value::Bool(b) => hcl::Value::Bool(b),
            Value::Number(n) => hcl::Value::Number(n),
            Value::String(s) => hcl::Value::String(s),
            Value::List(l) => hcl::Value::Array(l.into_iter().map(Into::into).collect()),
            Value::Map(m) => hcl::Value::Object(m.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Number(value) => {
                if let Some(int) = value.as_i64() {
                    serializer.serialize_i64(int)
                } else if let Some(int) = value.as_u64() {
                    serializer.serialize_u64(int)
                } else {
                    serializer.serialize_f64(value.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(value) => serializer.serialize_str(value),
            Value::List(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Map(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
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
                    Value::from(i)
                } else if let Some(u) = n.as_u64() {
                    Value::from(u)
                } else {
                    Value::from(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::List(a.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// Builds a [Map] from key/value pairs.
///
/// ```
/// use tfresolve::{map, value::Value};
/// let m = map! { "name" => "first", "port" => 8000i64 };
/// assert_eq!(m.get("name"), Some(&Value::from("first")));
/// ```
#[macro_export]
macro_rules! map {
    { $($key:expr => $value:expr),* $(,)? } => {{
        let mut map = $crate::value::Map::new();
        $(
            map.insert(String::from($key), $crate::value::Value::from($value));
        )*
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_insertion_order() {
        let mut m = Map::new();
        m.insert("b".into(), Value::from(1i64));
        m.insert("a".into(), Value::Null);
        m.insert("c".into(), Value::from(vec![Value::from(true), Value::from("x")]));
        let json = serde_json::to_string(&Value::Map(m)).unwrap();
        assert_eq!(json, r#"{"b":1,"a":null,"c":[true,"x"]}"#);
    }

    #[test]
    fn map_equality_ignores_order() {
        let a = crate::map! { "x" => 1i64, "y" => 2i64 };
        let b = crate::map! { "y" => 2i64, "x" => 1i64 };
        assert_eq!(Value::Map(a), Value::Map(b));
    }

    #[test]
    fn hcl_value_conversion_keeps_shape() {
        let v = hcl::Value::from(vec![hcl::Value::Null, hcl::Value::from("a")]);
        let ours = Value::from(v.clone());
        assert_eq!(ours, Value::List(vec![Value::Null, Value::from("a")]));
        assert_eq!(hcl::Value::from(ours), v);
    }

    #[test]
    fn template_string_only_for_primitives() {
        assert_eq!(Value::from(3i64).to_template_string(), Some("3".to_string()));
        assert_eq!(Value::from(false).to_template_string(), Some("false".to_string()));
        assert_eq!(Value::Null.to_template_string(), None);
        assert_eq!(Value::List(vec![]).to_template_string(), None);
    }
}
