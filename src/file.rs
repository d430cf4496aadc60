//! Settings file loading and `.env` overlay discovery.
//!
//! A settings file is a TOML document whose top-level tables are *sections*:
//! the mandatory `default` section plus any number of environment sections
//! (`[local]`, `[dev]`, `[prod]`, ...). Nested tables such as
//! `[dev.snowflake]` stay inside their section as table-valued entries.
//!
//! Parsing goes through `toml_edit` so section and key order match the file.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::SettingsError;
use crate::value::Value;

/// Name of the section that is always applied.
pub const DEFAULT_SECTION: &str = "default";

/// File name searched for when loading the environment overlay.
pub const DOTENV_FILE: &str = ".env";

/// One top-level table of the settings file, entries in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<(String, Value)>,
}

impl Section {
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_SECTION
    }
}

/// Read a settings file. A missing file is [`SettingsError::FileNotFound`].
pub fn read_settings_file(path: &Path) -> Result<String, SettingsError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SettingsError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => Err(SettingsError::IoError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Parse settings content into its sections, in file order.
///
/// Top-level keys that are not tables belong to no section; they are skipped
/// with a warning. `path` is only used for error messages.
pub fn parse_sections(content: &str, path: &Path) -> Result<Vec<Section>, SettingsError> {
    let doc: toml_edit::DocumentMut =
        content
            .parse()
            .map_err(|e: toml_edit::TomlError| SettingsError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

    let mut sections = Vec::new();
    for (name, item) in doc.iter() {
        let entries = match Value::from_item(item) {
            Some(Value::Table(store)) => store.into_iter().collect(),
            _ => {
                warn!(key = name, path = %path.display(), "ignoring top-level key outside any section");
                continue;
            }
        };
        sections.push(Section {
            name: name.to_string(),
            entries,
        });
    }
    Ok(sections)
}

/// Find the nearest `file_name`, starting in `start` and walking up toward the
/// filesystem root.
pub fn find_upwards(start: &Path, file_name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}
