//! Key resolution: turn raw section entries into store values.
//!
//! Each entry walks a precedence chain; the first rule that applies wins:
//!
//! 1. A root-level key with a `UPPERCASE(KEY)` environment variable takes the
//!    variable's text as-is.
//! 2. A nested key with a `PARENT_KEY` variable takes the variable's text,
//!    cast back to the raw value's type when possible.
//! 3. A table recurses into its children, the key joining the parent path.
//! 4. A `${NAME}` string takes the variable `NAME`, or null when it is unset.
//! 5. An `ssm:NAME` string takes the secret `NAME` from the secret provider.
//! 6. Anything else is stored as read.
//!
//! Operates on pre-loaded inputs (sections, an [`EnvVars`] snapshot and an
//! optional provider) with no I/O of its own beyond the provider call.

use tracing::{debug, error, info};

use crate::env::{self, EnvVars};
use crate::error::SettingsError;
use crate::file::Section;
use crate::secret::{SECRET_PREFIX, SecretProvider};
use crate::store::Store;
use crate::value::Value;

/// Whether a non-default section applies under `env_tag`.
pub fn section_applies(section: &str, env_tag: &str) -> bool {
    section.starts_with(env_tag)
}

/// The sections to apply under `env_tag`, in application order.
///
/// `default` comes first, then every matching section in file order.
/// Returns `None` when there is no `default` section.
pub fn sections_for_env<'s>(sections: &'s [Section], env_tag: &str) -> Option<Vec<&'s Section>> {
    let default = sections.iter().find(|s| s.is_default())?;
    let mut selected = vec![default];
    selected.extend(
        sections
            .iter()
            .filter(|s| !s.is_default() && section_applies(&s.name, env_tag)),
    );
    Some(selected)
}

fn dotted<S: AsRef<str>>(parent: &[S], name: &str) -> String {
    let mut key = String::new();
    for segment in parent {
        key.push_str(segment.as_ref());
        key.push('.');
    }
    key.push_str(name);
    key
}

pub struct Resolver<'a> {
    env: &'a EnvVars,
    secrets: Option<&'a dyn SecretProvider>,
}

impl<'a> Resolver<'a> {
    pub fn new(env: &'a EnvVars, secrets: Option<&'a dyn SecretProvider>) -> Self {
        Self { env, secrets }
    }

    /// Resolve every entry of each section, in order, into `store`.
    pub fn apply_sections(&self, store: &mut Store, sections: &[&Section]) -> Result<(), SettingsError> {
        for section in sections {
            debug!(section = %section.name, "applying section");
            for (name, raw) in &section.entries {
                self.resolve(store, name, raw.clone(), &[] as &[String])?;
            }
        }
        Ok(())
    }

    /// Resolve one key through the precedence chain and write the result.
    ///
    /// The only error is [`SettingsError::SecretProviderUnavailable`]; every
    /// other failure degrades to a logged, best-effort value.
    pub fn resolve<S: AsRef<str>>(
        &self,
        store: &mut Store,
        name: &str,
        raw: Value,
        parent: &[S],
    ) -> Result<(), SettingsError> {
        if parent.is_empty() {
            if let Some(text) = self.env.direct_override(name) {
                debug!(key = name, "environment variable overrides setting");
                store.set_attr(name, text, parent);
                return Ok(());
            }
        } else if let Some(text) = self.env.nested_override(parent, name) {
            let value = match env::cast_back(&raw, text) {
                Ok(value) => value,
                Err(e) => {
                    info!(key = %dotted(parent, name), error = %e, "could not cast environment override; keeping it as a string");
                    Value::String(text.to_string())
                }
            };
            debug!(key = %dotted(parent, name), "environment variable overrides nested setting");
            store.set_attr(name, value, parent);
            return Ok(());
        }

        match raw {
            Value::Table(table) => {
                let mut path: Vec<String> = parent.iter().map(|s| s.as_ref().to_string()).collect();
                path.push(name.to_string());
                for (key, value) in table {
                    self.resolve(store, &key, value, &path)?;
                }
                Ok(())
            }
            Value::String(s) => {
                if let Some(var) = env::interpolation_target(&s) {
                    let value = match self.env.get(var) {
                        Some(text) => Value::from(text),
                        None => {
                            debug!(key = %dotted(parent, name), var, "interpolated variable is not set");
                            Value::Null
                        }
                    };
                    store.set_attr(name, value, parent);
                    Ok(())
                } else if let Some(secret) = s.strip_prefix(SECRET_PREFIX) {
                    self.resolve_secret(store, name, secret, parent)
                } else {
                    store.set_attr(name, s, parent);
                    Ok(())
                }
            }
            other => {
                store.set_attr(name, other, parent);
                Ok(())
            }
        }
    }

    fn resolve_secret<S: AsRef<str>>(
        &self,
        store: &mut Store,
        name: &str,
        secret: &str,
        parent: &[S],
    ) -> Result<(), SettingsError> {
        let Some(provider) = self.secrets else {
            return Err(SettingsError::SecretProviderUnavailable {
                key: dotted(parent, name),
                name: secret.to_string(),
            });
        };

        match provider.fetch_parameter(secret, true) {
            Ok(value) => {
                debug!(key = %dotted(parent, name), provider = provider.name(), "resolved secret");
                store.set_attr(name, value, parent);
            }
            Err(e) => {
                error!(key = %dotted(parent, name), secret, provider = provider.name(), error = %e, "failed to fetch secret; leaving setting unchanged");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{DeniedProvider, EXAMPLE_SETTINGS, env_vars};
    use crate::file::parse_sections;
    use crate::secret::MemorySecretProvider;
    use std::path::Path;

    const ROOT: &[&str] = &[];

    fn resolve_one(env: &EnvVars, name: &str, raw: Value, parent: &[&str]) -> Store {
        let mut store = Store::new();
        Resolver::new(env, None)
            .resolve(&mut store, name, raw, parent)
            .unwrap();
        store
    }

    #[test]
    fn direct_override_replaces_value_as_string() {
        let env = env_vars(&[("PROJECT_NAME", "abc"), ("MAX_WORKERS", "9")]);
        let store = resolve_one(&env, "project_name", Value::from("test"), ROOT);
        assert_eq!(store.attr("project_name"), &Value::from("abc"));

        let store = resolve_one(&env, "max_workers", Value::Integer(4), ROOT);
        assert_eq!(store.attr("max_workers"), &Value::from("9"));
    }

    #[test]
    fn direct_override_replaces_whole_table() {
        let env = env_vars(&[("SNOWFLAKE", "flat")]);
        let table: Store = [("user", "u")].into_iter().collect();
        let store = resolve_one(&env, "snowflake", Value::Table(table), ROOT);
        assert_eq!(store.attr("snowflake"), &Value::from("flat"));
    }

    #[test]
    fn direct_override_ignored_for_nested_keys() {
        let env = env_vars(&[("CHILD", "root-level")]);
        let store = resolve_one(&env, "child", Value::from("test"), &["parent"]);
        assert_eq!(store.lookup("parent.child"), Some(&Value::from("test")));
    }

    #[test]
    fn nested_override_string() {
        let env = env_vars(&[("PARENT_CHILD", "abc")]);
        let store = resolve_one(&env, "child", Value::from("test"), &["parent"]);
        assert_eq!(store.lookup("parent.child"), Some(&Value::from("abc")));
    }

    #[test]
    fn nested_override_casts_bool() {
        let env = env_vars(&[("PARENT_CHILD", "false")]);
        let store = resolve_one(&env, "child", Value::Bool(true), &["parent"]);
        assert_eq!(store.lookup("parent.child"), Some(&Value::Bool(false)));
    }

    #[test]
    fn nested_override_casts_numbers() {
        let env = env_vars(&[("DB_PORT", "6543"), ("DB_RATIO", "0.75")]);
        let store = resolve_one(&env, "port", Value::Integer(5432), &["db"]);
        assert_eq!(store.lookup("db.port"), Some(&Value::Integer(6543)));
        let store = resolve_one(&env, "ratio", Value::Float(0.5), &["db"]);
        assert_eq!(store.lookup("db.ratio"), Some(&Value::Float(0.75)));
    }

    #[test]
    fn nested_override_cast_failure_keeps_string() {
        let env = env_vars(&[("PARENT_CHILD", "abc")]);
        let store = resolve_one(&env, "child", Value::Integer(123), &["parent"]);
        assert_eq!(store.lookup("parent.child"), Some(&Value::from("abc")));
    }

    #[test]
    fn tables_expand_into_nested_stores() {
        let env = EnvVars::default();
        let table: Store = [("a", 1), ("b", 2)].into_iter().collect();
        let store = resolve_one(&env, "new_table", Value::Table(table), ROOT);
        assert_eq!(store.lookup("new_table.a"), Some(&Value::Integer(1)));
        assert_eq!(store.lookup("new_table.b"), Some(&Value::Integer(2)));
    }

    #[test]
    fn deep_tables_use_full_path_for_overrides() {
        let env = env_vars(&[("A_B_LEAF", "7")]);
        let inner: Store = [("leaf", 1)].into_iter().collect();
        let outer: Store = [("b", Value::Table(inner))].into_iter().collect();
        let store = resolve_one(&env, "a", Value::Table(outer), ROOT);
        assert_eq!(store.lookup("a.b.leaf"), Some(&Value::Integer(7)));
    }

    #[test]
    fn scalars_stored_as_read() {
        let env = EnvVars::default();
        let store = resolve_one(&env, "new_float", Value::Float(0.2), ROOT);
        assert_eq!(store.attr("new_float"), &Value::Float(0.2));
        let store = resolve_one(&env, "new_int", Value::Integer(205), ROOT);
        assert_eq!(store.attr("new_int"), &Value::Integer(205));
    }

    #[test]
    fn interpolation_unset_is_null() {
        let env = EnvVars::default();
        let store = resolve_one(&env, "env_var", Value::from("${SOME_ENV_VAR}"), ROOT);
        assert!(store.contains_key("env_var"));
        assert!(store.attr("env_var").is_null());
    }

    #[test]
    fn interpolation_set_takes_variable() {
        let env = env_vars(&[("SOME_ENV_VAR", "abc")]);
        let store = resolve_one(&env, "env_var", Value::from("${SOME_ENV_VAR}"), ROOT);
        assert_eq!(store.attr("env_var"), &Value::from("abc"));
    }

    #[test]
    fn secret_resolved_through_provider() {
        let env = EnvVars::default();
        let provider = MemorySecretProvider::new().with("/data/test/my_var", "test");
        let mut store = Store::new();
        Resolver::new(&env, Some(&provider))
            .resolve(&mut store, "ssm_var", Value::from("ssm:/data/test/my_var"), ROOT)
            .unwrap();
        assert_eq!(store.attr("ssm_var"), &Value::from("test"));
    }

    #[test]
    fn secret_without_provider_is_fatal() {
        let env = EnvVars::default();
        let mut store = Store::new();
        let err = Resolver::new(&env, None)
            .resolve(&mut store, "password", Value::from("ssm:/data/pw"), &["db"])
            .unwrap_err();
        match err {
            SettingsError::SecretProviderUnavailable { key, name } => {
                assert_eq!(key, "db.password");
                assert_eq!(name, "/data/pw");
            }
            other => panic!("Expected SecretProviderUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn secret_fetch_failure_leaves_previous_value() {
        let env = EnvVars::default();
        let mut store = Store::new();
        store.insert("password", "from-default");

        let missing = MemorySecretProvider::new();
        Resolver::new(&env, Some(&missing))
            .resolve(&mut store, "password", Value::from("ssm:/missing"), ROOT)
            .unwrap();
        assert_eq!(store.attr("password"), &Value::from("from-default"));

        let denied = DeniedProvider;
        Resolver::new(&env, Some(&denied))
            .resolve(&mut store, "token", Value::from("ssm:/locked"), ROOT)
            .unwrap();
        assert!(!store.contains_key("token"));
    }

    #[test]
    fn section_prefix_matching() {
        assert!(section_applies("dev", "dev"));
        assert!(section_applies("dev.snowflake", "dev"));
        assert!(!section_applies("prod", "dev"));
    }

    #[test]
    fn sections_for_env_orders_default_first() {
        let sections = parse_sections(
            "[dev]\na = 1\n[default]\na = 0\n",
            Path::new("test.toml"),
        )
        .unwrap();
        let selected = sections_for_env(&sections, "dev").unwrap();
        let names: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["default", "dev"]);
    }

    #[test]
    fn sections_for_env_requires_default() {
        let sections = parse_sections("[dev]\na = 1\n", Path::new("test.toml")).unwrap();
        assert!(sections_for_env(&sections, "dev").is_none());
    }

    #[test]
    fn environment_section_overrides_default() {
        let sections = parse_sections(EXAMPLE_SETTINGS, Path::new("example.toml")).unwrap();
        let env = EnvVars::default();
        let mut store = Store::new();
        let selected = sections_for_env(&sections, "dev").unwrap();
        Resolver::new(&env, None)
            .apply_sections(&mut store, &selected)
            .unwrap();
        assert_eq!(store.attr("project_name"), &Value::from("configur-dev"));
        assert_eq!(store.lookup("snowflake.warehouse"), Some(&Value::from("dev_wh")));
        assert_eq!(store.lookup("snowflake.account"), Some(&Value::from("acme")));
    }

    #[test]
    fn every_prefixed_section_applies_in_file_order() {
        let sections = parse_sections(
            "[default]\nregion = \"eu\"\ntier = \"base\"\n\
             [dev]\nregion = \"us\"\ntier = \"dev\"\n\
             [devops]\ntier = \"ops\"\n\
             [prod]\ntier = \"prod\"\n",
            Path::new("test.toml"),
        )
        .unwrap();
        let env = EnvVars::default();
        let mut store = Store::new();
        let selected = sections_for_env(&sections, "dev").unwrap();
        let names: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["default", "dev", "devops"]);

        Resolver::new(&env, None)
            .apply_sections(&mut store, &selected)
            .unwrap();
        assert_eq!(store.attr("tier"), &Value::from("ops"));
        assert_eq!(store.attr("region"), &Value::from("us"));
    }

    #[test]
    fn default_only_when_no_section_matches() {
        let sections = parse_sections(EXAMPLE_SETTINGS, Path::new("example.toml")).unwrap();
        let env = EnvVars::default();
        let mut store = Store::new();
        let selected = sections_for_env(&sections, "staging").unwrap();
        assert_eq!(selected.len(), 1);
        Resolver::new(&env, None)
            .apply_sections(&mut store, &selected)
            .unwrap();
        assert_eq!(store.attr("project_name"), &Value::from("configur"));
    }
}
