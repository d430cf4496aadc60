#[cfg(test)]
pub mod test {
    use std::path::{Path, PathBuf};

    use crate::builder::SettingsBuilder;
    use crate::env::EnvVars;
    use crate::secret::{SecretError, SecretProvider, SecretResult};
    use crate::settings::Settings;

    /// A representative settings file: a default section with a nested table,
    /// plus `local`, `dev` and `prod` environment sections.
    pub const EXAMPLE_SETTINGS: &str = r#"
[default]
project_name = "configur"
debug = false
max_workers = 4
ratio = 0.5
login = "${SNOWFLAKE_LOGIN}"

[default.snowflake]
account = "acme"
warehouse = "compute_wh"
port = 443
ssl = true

[local]
debug = true

[dev]
project_name = "configur-dev"

[dev.snowflake]
warehouse = "dev_wh"

[prod]
project_name = "configur-prod"

[prod.snowflake]
password = "ssm:/data/snowflake/password"
"#;

    /// Same shape as [`EXAMPLE_SETTINGS`] with disjoint keys, for reload tests.
    pub const OTHER_SETTINGS: &str = r#"
[default]
service = "other"
"#;

    pub fn env_vars(pairs: &[(&str, &str)]) -> EnvVars {
        EnvVars::from_pairs(pairs.iter().copied())
    }

    /// Write `content` to `name` inside `dir`, returning the full path.
    pub fn write_settings(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// A hermetic builder: no `.env` overlay, no provider detection, and an
    /// environment snapshot made only of `vars`.
    pub fn hermetic(env: &str, vars: &[(&str, &str)]) -> SettingsBuilder {
        Settings::builder()
            .env(env)
            .no_dotenv()
            .no_secret_provider()
            .env_vars(vars.iter().copied())
    }

    /// Provider that refuses every request.
    #[derive(Debug)]
    pub struct DeniedProvider;

    impl SecretProvider for DeniedProvider {
        fn name(&self) -> &str {
            "denied"
        }

        fn fetch_parameter(&self, name: &str, _decrypt: bool) -> SecretResult<String> {
            Err(SecretError::AccessDenied {
                name: name.to_string(),
                reason: "not authorized".into(),
            })
        }
    }

    #[test]
    fn example_settings_parse() {
        let sections =
            crate::file::parse_sections(EXAMPLE_SETTINGS, Path::new("example.toml")).unwrap();
        assert!(sections.iter().any(|s| s.is_default()));
    }
}
