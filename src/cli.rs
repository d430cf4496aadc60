//! Clap adapter for configur.
//!
//! Compiled only when the `clap` Cargo feature is enabled (on by default).
//! [`ConfigArgs`] and [`ConfigSubcommand`] can be flattened into an
//! application's own `#[derive(Parser)]` struct to expose
//! `list|get|dump` over the resolved settings.
//!
//! The only bridge to the core is [`ConfigArgs::into_action()`], which
//! converts parsed arguments into a [`ConfigAction`](crate::ConfigAction)
//! for [`Settings::handle()`](crate::Settings::handle). Other CLI parsers
//! can construct `ConfigAction` values directly and skip this module.

use clap::{Args, Subcommand};

use crate::types::{ConfigAction, OutputFormat};

/// Clap-derived args for the settings subcommand group.
///
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     settings: ConfigArgs,
/// }
/// ```
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigSubcommand>,
}

/// Available settings subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show every resolved key-value pair.
    List,
    /// Show the resolved value of one key.
    Get {
        /// Dotted key path (e.g. "snowflake.user").
        key: String,
    },
    /// Print the whole resolved store.
    Dump {
        #[arg(long, value_enum, default_value_t = OutputFormat::Toml)]
        format: OutputFormat,
    },
}

impl ConfigArgs {
    /// Convert clap-parsed args into a framework-agnostic `ConfigAction`.
    ///
    /// A bare invocation and an explicit `list` both map to
    /// `ConfigAction::List`.
    pub fn into_action(self) -> ConfigAction {
        match self.action {
            None | Some(ConfigSubcommand::List) => ConfigAction::List,
            Some(ConfigSubcommand::Get { key }) => ConfigAction::Get { key },
            Some(ConfigSubcommand::Dump { format }) => ConfigAction::Dump { format },
        }
    }
}
