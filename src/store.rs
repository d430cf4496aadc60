//! The nested, insertion-ordered key-value store behind [`Settings`](crate::Settings).
//!
//! Keys are normalized to lowercase on every write and every lookup, so
//! `PROJECT_NAME`, `Project_Name` and `project_name` all address the same
//! entry. Iteration follows insertion order; overwriting a key keeps its
//! original position.

use std::ops::Index;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::Value;

static NULL: Value = Value::Null;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    entries: Vec<(String, Value)>,
}

fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, key: &str) -> Option<usize> {
        let key = normalize_key(key);
        self.entries.iter().position(|(k, _)| *k == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    /// Attribute-style read: a missing key reads as [`Value::Null`].
    pub fn attr(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }

    /// Insert or replace `key`, returning the previous value if there was one.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        let value = value.into();
        match self.position(key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((normalize_key(key), value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    /// Nested store under `key`, created if absent.
    ///
    /// A non-table value already at `key` is replaced by an empty store.
    pub fn child_mut(&mut self, key: &str) -> &mut Store {
        let i = match self.position(key) {
            Some(i) => {
                if !matches!(self.entries[i].1, Value::Table(_)) {
                    self.entries[i].1 = Value::Table(Store::new());
                }
                i
            }
            None => {
                self.entries
                    .push((normalize_key(key), Value::Table(Store::new())));
                self.entries.len() - 1
            }
        };
        match &mut self.entries[i].1 {
            Value::Table(store) => store,
            _ => unreachable!("entry was just made a table"),
        }
    }

    /// Write `name = value` at the root, or inside the nested store reached by
    /// walking `parent` (intermediate stores are created as needed).
    pub fn set_attr<S: AsRef<str>>(&mut self, name: &str, value: impl Into<Value>, parent: &[S]) {
        let mut target = self;
        for segment in parent {
            target = target.child_mut(segment.as_ref());
        }
        target.insert(name, value);
    }

    /// Navigate by dotted key path (e.g. `"snowflake.user"`).
    pub fn lookup(&self, dotted_key: &str) -> Option<&Value> {
        let (path, leaf) = match dotted_key.rsplit_once('.') {
            Some((p, l)) => (Some(p), l),
            None => (None, dotted_key),
        };

        let store = match path {
            Some(path) => {
                let mut current = self;
                for segment in path.split('.') {
                    current = current.get(segment)?.as_table()?;
                }
                current
            }
            None => self,
        };

        store.get(leaf)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_toml(&self) -> toml::Table {
        let mut table = toml::Table::new();
        for (key, value) in &self.entries {
            if let Some(v) = value.to_toml() {
                table.insert(key.clone(), v);
            }
        }
        table
    }
}

impl Index<&str> for Store {
    type Output = Value;

    /// Mapping-style read. Panics if `key` is absent; use [`Store::get`] to
    /// handle that case.
    fn index(&self, key: &str) -> &Value {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not found: {key}"),
        }
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Store {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Store::new();
        for (key, value) in iter {
            store.insert(key.as_ref(), value);
        }
        store
    }
}

impl IntoIterator for Store {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Store {
    type Item = (&'a str, &'a Value);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, Value)>,
        fn(&'a (String, Value)) -> (&'a str, &'a Value),
    >;

    fn into_iter(self) -> Self::IntoIter {
        let pair: fn(&'a (String, Value)) -> (&'a str, &'a Value) = |(k, v)| (k.as_str(), v);
        self.entries.iter().map(pair)
    }
}

impl Serialize for Store {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
