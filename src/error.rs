use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not load settings file {0}: no such file")]
    FileNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml_edit::TomlError,
    },

    #[error("Settings file {0} is missing required section 'default'")]
    MissingDefaultSection(PathBuf),

    #[error(
        "Setting '{key}' references secret '{name}' but no secret provider is available"
    )]
    SecretProviderUnavailable { key: String, name: String },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Invalid log level '{0}' (expected trace, debug, info, warn or error)")]
    InvalidLogLevel(String),
}
