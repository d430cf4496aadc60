//! Resolved setting values.
//!
//! [`Value`] is what every key in a [`Store`] holds once resolution has run.
//! Values read from the settings file are normalized here: `toml_edit`'s
//! formatted wrappers are reduced to plain strings, booleans, integers and
//! floats, inline and standard tables become nested [`Store`]s, and datetimes
//! keep their textual form.

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::store::Store;

/// A single resolved setting.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Explicitly unset, e.g. a `${NAME}` reference to a missing variable.
    #[default]
    Null,
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    Array(Vec<Value>),
    Table(Store),
}

impl Value {
    /// Short, human-readable name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
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

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Store> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Convert into a `toml::Value` for typed extraction and TOML output.
    ///
    /// Returns `None` for [`Value::Null`]; TOML has no null, so callers drop
    /// such entries. Nulls inside arrays and tables are dropped the same way.
    pub fn to_toml(&self) -> Option<toml::Value> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(toml::Value::String(s.clone())),
            Value::Bool(b) => Some(toml::Value::Boolean(*b)),
            Value::Integer(i) => Some(toml::Value::Integer(*i)),
            Value::Float(f) => Some(toml::Value::Float(*f)),
            Value::Array(items) => Some(toml::Value::Array(
                items.iter().filter_map(Value::to_toml).collect(),
            )),
            Value::Table(store) => Some(toml::Value::Table(store.to_toml())),
        }
    }
}

impl From<&toml_edit::Value> for Value {
    fn from(value: &toml_edit::Value) -> Self {
        match value {
            toml_edit::Value::String(s) => Value::String(s.value().clone()),
            toml_edit::Value::Integer(i) => Value::Integer(*i.value()),
            toml_edit::Value::Float(f) => Value::Float(*f.value()),
            toml_edit::Value::Boolean(b) => Value::Bool(*b.value()),
            toml_edit::Value::Datetime(dt) => Value::String(dt.value().to_string()),
            toml_edit::Value::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            toml_edit::Value::InlineTable(table) => Value::Table(
                table
                    .iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&toml_edit::Table> for Value {
    fn from(table: &toml_edit::Table) -> Self {
        Value::Table(
            table
                .iter()
                .filter_map(|(key, item)| Value::from_item(item).map(|value| (key, value)))
                .collect(),
        )
    }
}

impl Value {
    /// Normalize a `toml_edit` item. `Item::None` has no value and yields `None`.
    pub fn from_item(item: &toml_edit::Item) -> Option<Value> {
        match item {
            toml_edit::Item::None => None,
            toml_edit::Item::Value(value) => Some(Value::from(value)),
            toml_edit::Item::Table(table) => Some(Value::from(table)),
            toml_edit::Item::ArrayOfTables(tables) => {
                Some(Value::Array(tables.iter().map(Value::from).collect()))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Store> for Value {
    fn from(store: Store) -> Self {
        Value::Table(store)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Table(store) => store.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> toml_edit::DocumentMut {
        toml_str.parse().unwrap()
    }

    #[test]
    fn scalars_lose_their_formatting_wrappers() {
        let doc = parse("s = \"abc\"\nb = true\ni = 205\nf = 0.2\n");
        assert_eq!(Value::from_item(&doc["s"]), Some(Value::String("abc".into())));
        assert_eq!(Value::from_item(&doc["b"]), Some(Value::Bool(true)));
        assert_eq!(Value::from_item(&doc["i"]), Some(Value::Integer(205)));
        assert_eq!(Value::from_item(&doc["f"]), Some(Value::Float(0.2)));
    }

    #[test]
    fn datetime_keeps_text() {
        let doc = parse("at = 1979-05-27T07:32:00Z\n");
        let value = Value::from_item(&doc["at"]).unwrap();
        assert_eq!(value.as_str(), Some("1979-05-27T07:32:00Z"));
    }

    #[test]
    fn inline_table_becomes_store() {
        let doc = parse("t = { a = 1, b = \"two\" }\n");
        let value = Value::from_item(&doc["t"]).unwrap();
        let table = value.as_table().unwrap();
        assert_eq!(table.get("a"), Some(&Value::Integer(1)));
        assert_eq!(table.get("b"), Some(&Value::String("two".into())));
    }

    #[test]
    fn standard_table_preserves_order() {
        let doc = parse("[t]\nzeta = 1\nalpha = 2\nmid = 3\n");
        let value = Value::from_item(&doc["t"]).unwrap();
        let keys: Vec<&str> = value.as_table().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn arrays_are_normalized() {
        let doc = parse("hosts = [\"a\", \"b\"]\n");
        let value = Value::from_item(&doc["hosts"]).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn to_toml_drops_nulls() {
        let mut store = Store::new();
        store.insert("kept", 1);
        store.insert("unset", Value::Null);
        let table = store.to_toml();
        assert_eq!(table.len(), 1);
        assert_eq!(table["kept"].as_integer(), Some(1));
    }

    #[test]
    fn option_none_is_null() {
        assert!(Value::from(None::<String>).is_null());
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }

    #[test]
    fn serializes_to_json() {
        let value = Value::Array(vec![Value::Null, Value::Integer(3), Value::from("s")]);
        assert_eq!(serde_json::to_string(&value).unwrap(), "[null,3,\"s\"]");
    }
}
