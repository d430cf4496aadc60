//! Logging bootstrap keyed on the environment tag.
//!
//! `local` and `dev` log at DEBUG, every other environment at INFO. An
//! explicit level always wins. Individual targets can be pinned to their own
//! level; the secret backend logs at INFO unless told otherwise.

use std::collections::BTreeMap;

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::SettingsError;

/// Per-target levels applied before any caller-supplied ones.
pub const DEFAULT_TARGETS: &[(&str, &str)] = &[("configur::secret", "info")];

/// Default level for an environment tag.
pub fn default_level_for_env(env: &str) -> Level {
    match env {
        "local" | "dev" => Level::DEBUG,
        _ => Level::INFO,
    }
}

/// Parse a level name, case-insensitively. `warning` and `critical` are
/// accepted as aliases of `warn` and `error`.
pub fn parse_level(name: &str) -> Result<Level, SettingsError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" | "critical" => Ok(Level::ERROR),
        _ => Err(SettingsError::InvalidLogLevel(name.to_string())),
    }
}

/// The root level [`init_logging`] would install.
pub fn resolve_level(env: &str, root_level: Option<&str>) -> Result<Level, SettingsError> {
    match root_level {
        Some(name) => parse_level(name),
        None => Ok(default_level_for_env(env)),
    }
}

/// `EnvFilter` directives for the root level plus per-target levels.
///
/// [`DEFAULT_TARGETS`] come first; a caller entry for the same target
/// replaces it. Every level is validated.
pub fn filter_directives(
    env: &str,
    root_level: Option<&str>,
    targets: &[(&str, &str)],
) -> Result<String, SettingsError> {
    let root = resolve_level(env, root_level)?;

    let mut levels: BTreeMap<&str, Level> = BTreeMap::new();
    for (target, level) in DEFAULT_TARGETS.iter().chain(targets) {
        levels.insert(*target, parse_level(level)?);
    }

    let mut directives = root.as_str().to_ascii_lowercase();
    for (target, level) in levels {
        directives.push_str(&format!(",{target}={}", level.as_str().to_ascii_lowercase()));
    }
    Ok(directives)
}

/// Install a `tracing-subscriber` fmt subscriber writing to stderr.
///
/// Returns the root level that was installed, or `None` if a global
/// subscriber was already in place and this call changed nothing.
pub fn init_logging(
    env: &str,
    root_level: Option<&str>,
    targets: &[(&str, &str)],
) -> Result<Option<Level>, SettingsError> {
    let level = resolve_level(env, root_level)?;
    let directives = filter_directives(env, root_level, targets)?;
    let filter = EnvFilter::try_new(&directives)
        .map_err(|_| SettingsError::InvalidLogLevel(directives.clone()))?;

    let installed = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .is_ok();
    Ok(installed.then_some(level))
}
