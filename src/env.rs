use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::file::{self, DOTENV_FILE};
use crate::value::Value;

/// A snapshot of environment variables used for one resolution pass.
///
/// Built from the process environment at load time, or from synthetic pairs
/// so tests and embedders can resolve without touching the process
/// environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    /// Snapshot the process environment. Variables whose name or value is
    /// not valid Unicode cannot be referenced from a settings file and are
    /// skipped.
    pub fn from_process() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    fn from_os_pairs(pairs: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        let vars = pairs
            .into_iter()
            .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
                (Ok(name), Ok(value)) => Some((name, value)),
                (name, _) => {
                    let name = match name {
                        Ok(name) => name,
                        Err(raw) => raw.to_string_lossy().into_owned(),
                    };
                    debug!(var = %name, "skipping environment variable that is not valid unicode");
                    None
                }
            })
            .collect();
        Self { vars }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Override for a root-level key: the variable named `UPPERCASE(key)`.
    pub fn direct_override(&self, key: &str) -> Option<&str> {
        self.get(&key.to_uppercase())
    }

    /// Override for a nested key: `PARENT_KEY`, or `A_B_KEY` for deeper paths.
    pub fn nested_override<S: AsRef<str>>(&self, parent: &[S], key: &str) -> Option<&str> {
        self.get(&nested_var_name(parent, key))
    }
}

/// Environment variable name addressing `key` under `parent`.
pub fn nested_var_name<S: AsRef<str>>(parent: &[S], key: &str) -> String {
    let mut name = String::new();
    for segment in parent {
        name.push_str(&segment.as_ref().to_uppercase());
        name.push('_');
    }
    name.push_str(&key.to_uppercase());
    name
}

/// The variable named by a `${NAME}` reference, if `raw` is exactly one.
pub fn interpolation_target(raw: &str) -> Option<&str> {
    raw.strip_prefix("${")?.strip_suffix('}')
}

#[derive(Debug, Error)]
#[error("cannot cast '{text}' to {target}")]
pub struct CastError {
    pub text: String,
    pub target: &'static str,
}

/// Cast an override string back to the type of the value it replaces.
///
/// Booleans are `true` only for `"true"` (any case). Integers and floats are
/// parsed after trimming. Arrays and tables cannot be produced from a string.
pub fn cast_back(original: &Value, text: &str) -> Result<Value, CastError> {
    let fail = || CastError {
        text: text.to_string(),
        target: original.type_name(),
    };
    match original {
        Value::Null | Value::String(_) => Ok(Value::String(text.to_string())),
        Value::Bool(_) => Ok(Value::Bool(text.trim().eq_ignore_ascii_case("true"))),
        Value::Integer(_) => text.trim().parse().map(Value::Integer).map_err(|_| fail()),
        Value::Float(_) => text.trim().parse().map(Value::Float).map_err(|_| fail()),
        Value::Array(_) | Value::Table(_) => Err(fail()),
    }
}

/// Load a `.env` overlay into the process environment.
///
/// With `explicit` set, that file is loaded; otherwise the nearest `.env` at
/// or above the working directory is. Variables that are already set are not
/// overridden. A missing file is not an error; a malformed one is logged and
/// skipped. Returns the path that was loaded.
pub fn load_dotenv(explicit: Option<&Path>) -> Option<PathBuf> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().ok()?;
            match file::find_upwards(&cwd, DOTENV_FILE) {
                Some(path) => path,
                None => {
                    debug!(start = %cwd.display(), "no .env file found");
                    return None;
                }
            }
        }
    };

    match dotenvy::from_path(&path) {
        Ok(()) => {
            debug!(path = %path.display(), "loaded environment overlay");
            Some(path)
        }
        Err(e) if e.not_found() => {
            debug!(path = %path.display(), "environment overlay not found");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load environment overlay");
            None
        }
    }
}
