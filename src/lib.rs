//! Environment-aware settings for services. Point at one TOML file, name
//! the environment, and read resolved values.
//!
//! ```ignore
//! let settings = Settings::builder()
//!     .env("dev")
//!     .file("settings.toml")
//!     .build()?;
//! let warehouse = settings.get_path("snowflake.warehouse")?;
//! ```
//!
//! # File layout
//!
//! A settings file is a set of sections. `[default]` is mandatory and always
//! applied first. Every other top-level table is an environment section,
//! applied on top of `default` when its name starts with the environment tag,
//! in file order. Nested tables (`[dev.snowflake]`) merge key by key into the
//! matching nested table of `default`.
//!
//! ```toml
//! [default]
//! project_name = "billing"
//! login = "${SNOWFLAKE_LOGIN}"
//!
//! [default.snowflake]
//! warehouse = "compute_wh"
//! port = 443
//!
//! [dev.snowflake]
//! warehouse = "dev_wh"
//!
//! [prod.snowflake]
//! password = "ssm:/data/snowflake/password"
//! ```
//!
//! # Resolution
//!
//! Each key walks a precedence chain; the first rule that applies wins:
//!
//! | Source | Example | Result |
//! |--------|---------|--------|
//! | Root env var | `PROJECT_NAME=x` | `"x"`, always a string |
//! | Nested env var | `SNOWFLAKE_PORT=8443` | `8443`, cast to the file's type |
//! | Interpolation | `"${SNOWFLAKE_LOGIN}"` | the variable, or null if unset |
//! | Secret | `"ssm:/data/pw"` | fetched from the [`SecretProvider`] |
//! | Literal | `port = 443` | as written |
//!
//! Nested variable names join the whole parent path with `_`, so
//! `a.b.key` is overridden by `A_B_KEY`. A cast that fails (say
//! `SNOWFLAKE_PORT=abc`) keeps the string and logs it.
//!
//! # Environment
//!
//! The tag comes from [`SettingsBuilder::env`], else the `PROJECT_ENV`
//! variable, else `"local"`. Before loading, the nearest `.env` file is read
//! into the process environment without overriding variables that are
//! already set. Tests can pin the whole environment with
//! [`SettingsBuilder::env_vars`].
//!
//! # Secrets
//!
//! `ssm:` values are fetched through a [`SecretProvider`]. By default the
//! AWS CLI is used if it is installed; every fetch is bounded by a timeout.
//! If no provider is available, loading a file that references a secret
//! fails with [`SettingsError::SecretProviderUnavailable`]. A fetch that
//! fails (missing parameter, denied, timed out) is logged and the key is
//! left as it was.
//!
//! # Reading values
//!
//! - [`Settings::attr`] and [`Settings::attr_path`] return [`Value::Null`]
//!   for missing keys.
//! - [`Settings::get`], [`Settings::get_path`] and indexing treat missing
//!   and null keys as errors.
//! - [`Settings::deserialize`] extracts a typed struct.
//!
//! Keys are case-insensitive everywhere.
//!
//! # Clap adapter
//!
//! With the `clap` feature (on by default), [`ConfigArgs`] gives an
//! application `list|get|dump` subcommands that feed
//! [`Settings::handle`]. Without it, build a [`ConfigAction`] directly.

pub mod error;
pub mod logging;
pub mod secret;
pub mod types;

mod builder;
#[cfg(feature = "clap")]
mod cli;
mod env;
mod file;
mod ops;
mod resolve;
mod settings;
mod store;
mod value;

#[cfg(test)]
mod fixtures;

pub use builder::{DEFAULT_ENV_TAG, ENV_TAG_VAR, SettingsBuilder, default_env_tag};
#[cfg(feature = "clap")]
pub use cli::{ConfigArgs, ConfigSubcommand};
pub use env::EnvVars;
pub use error::SettingsError;
pub use ops::ConfigResult;
pub use secret::{
    AwsCliSecretProvider, MemorySecretProvider, SecretError, SecretProvider,
    TimeoutSecretProvider,
};
pub use settings::{RESERVED_FIELDS, Settings};
pub use store::Store;
pub use types::{ConfigAction, OutputFormat};
pub use value::Value;
