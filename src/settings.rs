use std::borrow::Cow;
use std::ops::Index;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::builder::SettingsBuilder;
use crate::env::EnvVars;
use crate::error::SettingsError;
use crate::file;
use crate::ops::{self, ConfigResult};
use crate::resolve::{self, Resolver};
use crate::secret::SecretProvider;
use crate::store::Store;
use crate::types::ConfigAction;
use crate::value::Value;

/// Names that address the settings object itself rather than the store.
pub const RESERVED_FIELDS: [&str; 3] = ["store", "secret_provider", "env"];

static NULL: Value = Value::Null;

/// The configured snapshot, or the process environment as of now.
fn env_snapshot(configured: &Option<EnvVars>) -> Cow<'_, EnvVars> {
    match configured {
        Some(vars) => Cow::Borrowed(vars),
        None => Cow::Owned(EnvVars::from_process()),
    }
}

/// Resolved, environment-aware settings loaded from a sectioned TOML file.
///
/// Construct with [`Settings::builder()`]. A load applies the `default`
/// section and then every section matching the environment tag, resolving
/// each key against environment overrides, `${NAME}` interpolation and
/// `ssm:` secret references.
///
/// Reads come in two flavours that deliberately disagree on missing keys:
/// [`attr`](Self::attr) returns [`Value::Null`], while [`get`](Self::get)
/// and indexing fail.
#[derive(Debug, Clone)]
pub struct Settings {
    store: Store,
    env: String,
    secrets: Option<Arc<dyn SecretProvider>>,
    env_vars: Option<EnvVars>,
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    pub(crate) fn from_parts(
        env: String,
        secrets: Option<Arc<dyn SecretProvider>>,
        env_vars: Option<EnvVars>,
    ) -> Self {
        Self {
            store: Store::new(),
            env,
            secrets,
            env_vars,
        }
    }

    /// Load `path`, replacing everything previously loaded.
    ///
    /// The store is emptied first. On any error it is left empty, so a failed
    /// load never exposes values from an earlier one.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        self.store.clear();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = file::read_settings_file(path)?;
        let sections = file::parse_sections(&content, path)?;
        let selected = resolve::sections_for_env(&sections, &self.env)
            .ok_or_else(|| SettingsError::MissingDefaultSection(path.to_path_buf()))?;

        let env_vars = env_snapshot(&self.env_vars);

        let resolver = Resolver::new(&env_vars, self.secrets.as_deref());
        if let Err(e) = resolver.apply_sections(&mut self.store, &selected) {
            self.store.clear();
            return Err(e);
        }

        info!(
            path = %path.display(),
            env = %self.env,
            sections = selected.len(),
            keys = self.store.len(),
            "loaded settings"
        );
        Ok(())
    }

    /// Empty the store. The environment tag and secret provider are kept.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn secret_provider(&self) -> Option<&dyn SecretProvider> {
        self.secrets.as_deref()
    }

    /// Resolve `raw` through the full precedence chain (environment
    /// overrides, interpolation, secrets) and write it under `parent`.
    pub fn resolve_key(
        &mut self,
        name: &str,
        raw: impl Into<Value>,
        parent: &[&str],
    ) -> Result<(), SettingsError> {
        let env_vars = env_snapshot(&self.env_vars);
        Resolver::new(&env_vars, self.secrets.as_deref()).resolve(
            &mut self.store,
            name,
            raw.into(),
            parent,
        )
    }

    /// Write `name = value` as-is at the root or under `parent`, creating
    /// intermediate tables as needed.
    pub fn set_attr(&mut self, name: &str, value: impl Into<Value>, parent: &[&str]) {
        self.store.set_attr(name, value, parent);
    }

    /// Write a value at a dotted path (e.g. `"snowflake.user"`).
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let mut segments: Vec<&str> = key.split('.').collect();
        let name = segments.pop().unwrap_or(key);
        self.store.set_attr(name, value, &segments[..]);
    }

    /// Attribute-style read of a root key. Missing keys read as
    /// [`Value::Null`].
    pub fn attr(&self, key: &str) -> &Value {
        self.store.attr(key)
    }

    /// Attribute-style read of a dotted path. Missing keys read as
    /// [`Value::Null`].
    pub fn attr_path(&self, dotted_key: &str) -> &Value {
        self.store.lookup(dotted_key).unwrap_or(&NULL)
    }

    /// Mapping-style read of a root key.
    pub fn get(&self, key: &str) -> Result<&Value, SettingsError> {
        match self.store.get(key) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(SettingsError::KeyNotFound(key.to_string())),
        }
    }

    /// Mapping-style read of a dotted path.
    pub fn get_path(&self, dotted_key: &str) -> Result<&Value, SettingsError> {
        match self.store.lookup(dotted_key) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(SettingsError::KeyNotFound(dotted_key.to_string())),
        }
    }

    /// Whether `key` exists at the root, in any letter case.
    pub fn contains(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.store.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.store.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.store.iter()
    }

    /// Reserved field names followed by every root key, for tooling.
    pub fn completions(&self) -> Vec<String> {
        RESERVED_FIELDS
            .iter()
            .map(|s| s.to_string())
            .chain(self.store.keys().map(str::to_string))
            .collect()
    }

    /// Extract a typed struct from the resolved store. Null entries are
    /// omitted, so `Option` fields read as `None`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, SettingsError> {
        toml::Value::Table(self.store.to_toml())
            .try_into()
            .map_err(|e: toml::de::Error| SettingsError::InvalidValue {
                key: "<settings>".into(),
                reason: e.to_string(),
            })
    }

    /// Run a settings operation against the resolved store.
    pub fn handle(&self, action: &ConfigAction) -> Result<ConfigResult, SettingsError> {
        match action {
            ConfigAction::List => Ok(ops::list_values(&self.store)),
            ConfigAction::Get { key } => ops::get_value(&self.store, key),
            ConfigAction::Dump { format } => ops::render(&self.store, *format),
        }
    }
}

impl Index<&str> for Settings {
    type Output = Value;

    /// Mapping-style read. Panics if `key` is absent or null; use
    /// [`Settings::get`] to handle that case.
    fn index(&self, key: &str) -> &Value {
        match self.get(key) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<'a> IntoIterator for &'a Settings {
    type Item = (&'a str, &'a Value);
    type IntoIter = <&'a Store as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        (&self.store).into_iter()
    }
}
