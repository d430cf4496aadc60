//! Settings operations: listing, key lookup, dumping, and result types.
//!
//! Provides the logic behind `configur list`, `configur get` and
//! `configur dump`, and the `ConfigResult` enum that callers use to display
//! results.

use std::fmt;

use crate::error::SettingsError;
use crate::store::Store;
use crate::types::OutputFormat;
use crate::value::Value;

/// Result of a settings operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// A key's resolved value.
    KeyValue { key: String, value: String },
    /// All resolved leaves as flattened dotted key-value pairs.
    Listing { entries: Vec<(String, String)> },
    /// The whole store rendered as a document.
    Document(String),
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::KeyValue { key, value } => write!(f, "{key} = {value}"),
            ConfigResult::Listing { entries } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                Ok(())
            }
            ConfigResult::Document(doc) => write!(f, "{doc}"),
        }
    }
}

/// Flatten a store into `(dotted_key, leaf)` pairs in store order.
///
/// Nested stores are recursed into; an empty nested store produces no entry.
pub fn flatten(store: &Store) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    flatten_into(store, "", &mut out);
    out
}

fn flatten_into<'a>(store: &'a Store, prefix: &str, out: &mut Vec<(String, &'a Value)>) {
    for (key, value) in store {
        let dotted = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Table(nested) => flatten_into(nested, &dotted, out),
            leaf => out.push((dotted, leaf)),
        }
    }
}

/// List every resolved leaf as a flattened dotted key-value pair.
pub fn list_values(store: &Store) -> ConfigResult {
    let entries = flatten(store)
        .into_iter()
        .map(|(key, value)| (key, format_value(value)))
        .collect();
    ConfigResult::Listing { entries }
}

/// Look up a dotted key with mapping semantics: absent and null keys are
/// [`SettingsError::KeyNotFound`].
pub fn get_value(store: &Store, key: &str) -> Result<ConfigResult, SettingsError> {
    match store.lookup(key) {
        Some(value) if !value.is_null() => Ok(ConfigResult::KeyValue {
            key: key.into(),
            value: format_value(value),
        }),
        _ => Err(SettingsError::KeyNotFound(key.into())),
    }
}

/// Render the whole store as TOML or pretty-printed JSON.
pub fn render(store: &Store, format: OutputFormat) -> Result<ConfigResult, SettingsError> {
    let rendered = match format {
        OutputFormat::Toml => toml::to_string(&store.to_toml()).map_err(|e| {
            SettingsError::InvalidValue {
                key: "<dump>".into(),
                reason: e.to_string(),
            }
        })?,
        OutputFormat::Json => {
            serde_json::to_string_pretty(store).map_err(|e| SettingsError::InvalidValue {
                key: "<dump>".into(),
                reason: e.to_string(),
            })?
        }
    };
    Ok(ConfigResult::Document(rendered))
}

/// Format a value for display.
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "<not set>".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Array(_) | Value::Table(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Store {
        let mut store = Store::new();
        store.insert("project_name", "configur");
        store.insert("max_workers", 4);
        store.set_attr("user", Value::Null, &["snowflake"]);
        store.set_attr("port", 443, &["snowflake"]);
        store.insert("hosts", vec![Value::from("a"), Value::from("b")]);
        store
    }

    #[test]
    fn flatten_dots_nested_keys_in_order() {
        let store = sample();
        let keys: Vec<String> = flatten(&store).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["project_name", "max_workers", "snowflake.user", "snowflake.port", "hosts"]
        );
    }

    #[test]
    fn list_values_formats_leaves() {
        let store = sample();
        match list_values(&store) {
            ConfigResult::Listing { entries } => {
                let user = entries.iter().find(|(k, _)| k == "snowflake.user").unwrap();
                assert_eq!(user.1, "<not set>");
                let port = entries.iter().find(|(k, _)| k == "snowflake.port").unwrap();
                assert_eq!(port.1, "443");
                let hosts = entries.iter().find(|(k, _)| k == "hosts").unwrap();
                assert_eq!(hosts.1, r#"["a","b"]"#);
            }
            other => panic!("Expected Listing, got {other:?}"),
        }
    }

    #[test]
    fn get_nested_key() {
        let store = sample();
        let result = get_value(&store, "snowflake.port").unwrap();
        assert_eq!(
            result,
            ConfigResult::KeyValue {
                key: "snowflake.port".into(),
                value: "443".into()
            }
        );
    }

    #[test]
    fn get_missing_or_null_key() {
        let store = sample();
        assert!(matches!(
            get_value(&store, "nope"),
            Err(SettingsError::KeyNotFound(_))
        ));
        assert!(matches!(
            get_value(&store, "snowflake.user"),
            Err(SettingsError::KeyNotFound(_))
        ));
    }

    #[test]
    fn render_toml_skips_nulls() {
        let store = sample();
        let ConfigResult::Document(doc) = render(&store, OutputFormat::Toml).unwrap() else {
            panic!("Expected Document");
        };
        assert!(doc.contains("project_name = \"configur\""));
        assert!(doc.contains("[snowflake]"));
        assert!(!doc.contains("user"));
    }

    #[test]
    fn render_json_keeps_nulls() {
        let store = sample();
        let ConfigResult::Document(doc) = render(&store, OutputFormat::Json).unwrap() else {
            panic!("Expected Document");
        };
        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert!(parsed["snowflake"]["user"].is_null());
        assert_eq!(parsed["max_workers"], 4);
    }

    #[test]
    fn listing_display_format() {
        let result = ConfigResult::Listing {
            entries: vec![
                ("host".into(), "localhost".into()),
                ("port".into(), "8080".into()),
            ],
        };
        assert_eq!(format!("{result}"), "host = localhost\nport = 8080");
    }
}
