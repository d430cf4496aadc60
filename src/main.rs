//! `configur` command-line tool: load a settings file for an environment
//! and inspect the resolved values.
//!
//! ```sh
//! configur --file settings.toml --env dev list
//! configur --env prod get snowflake.warehouse
//! configur dump --format json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use configur::{ConfigArgs, Settings, SettingsError, default_env_tag, logging};

/// Resolve layered settings for an environment.
#[derive(Parser, Debug)]
#[command(name = "configur", version)]
struct Cli {
    /// Settings file to load.
    #[arg(short, long, default_value = "settings.toml")]
    file: PathBuf,

    /// Environment tag (defaults to $PROJECT_ENV, else "local").
    #[arg(long)]
    env: Option<String>,

    /// Log level: trace, debug, info, warn or error.
    #[arg(long)]
    log_level: Option<String>,

    /// Per-target log level, e.g. `configur::secret=debug`. Repeatable.
    #[arg(long = "log-target", value_name = "TARGET=LEVEL")]
    log_targets: Vec<String>,

    #[command(flatten)]
    settings: ConfigArgs,
}

fn run(cli: Cli) -> Result<(), SettingsError> {
    let env = cli.env.unwrap_or_else(default_env_tag);
    let targets = cli
        .log_targets
        .iter()
        .map(|spec| {
            spec.split_once('=')
                .ok_or_else(|| SettingsError::InvalidLogLevel(spec.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(level) = logging::init_logging(&env, cli.log_level.as_deref(), &targets)? {
        debug!(%level, env = %env, "logging initialised");
    }

    let settings = Settings::builder().env(env).file(&cli.file).build()?;
    let result = settings.handle(&cli.settings.into_action())?;
    println!("{result}");
    Ok(())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
