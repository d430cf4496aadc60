use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::env::{self, EnvVars};
use crate::error::SettingsError;
use crate::secret::{
    AwsCliSecretProvider, DEFAULT_SECRET_TIMEOUT, SecretProvider, TimeoutSecretProvider,
};
use crate::settings::Settings;

/// Process variable consulted for the environment tag when none is given.
pub const ENV_TAG_VAR: &str = "PROJECT_ENV";

/// Environment tag used when neither the builder nor [`ENV_TAG_VAR`] sets one.
pub const DEFAULT_ENV_TAG: &str = "local";

/// The environment tag from [`ENV_TAG_VAR`], or [`DEFAULT_ENV_TAG`].
pub fn default_env_tag() -> String {
    std::env::var(ENV_TAG_VAR).unwrap_or_else(|_| DEFAULT_ENV_TAG.to_string())
}

#[derive(Debug, Clone)]
enum SecretSource {
    Detect,
    Provided(Arc<dyn SecretProvider>),
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
enum DotenvSource {
    Search,
    Path(PathBuf),
    Disabled,
}

/// Builder for constructing [`Settings`].
///
/// Defaults mirror a typical service start-up: the environment tag comes from
/// `PROJECT_ENV` (else `"local"`), the nearest `.env` is loaded into the
/// process environment, and the AWS CLI is used for `ssm:` references if it is
/// installed. Every default can be replaced, which is how tests stay hermetic.
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct SettingsBuilder {
    file: Option<PathBuf>,
    env: Option<String>,
    secrets: SecretSource,
    secret_timeout: Duration,
    dotenv: DotenvSource,
    env_vars: Option<EnvVars>,
}

impl SettingsBuilder {
    pub(crate) fn new() -> Self {
        Self {
            file: None,
            env: None,
            secrets: SecretSource::Detect,
            secret_timeout: DEFAULT_SECRET_TIMEOUT,
            dotenv: DotenvSource::Search,
            env_vars: None,
        }
    }

    /// Load this settings file as the last step of [`build()`](Self::build).
    ///
    /// Without a file the settings start empty; call
    /// [`Settings::load`] later.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment tag selecting which sections apply.
    pub fn env(mut self, tag: impl Into<String>) -> Self {
        self.env = Some(tag.into());
        self
    }

    /// Resolve `ssm:` references through `provider`.
    pub fn secret_provider<P: SecretProvider + 'static>(self, provider: P) -> Self {
        self.shared_secret_provider(Arc::new(provider))
    }

    /// Like [`secret_provider`](Self::secret_provider), for a provider that is
    /// already shared.
    pub fn shared_secret_provider(mut self, provider: Arc<dyn SecretProvider>) -> Self {
        self.secrets = SecretSource::Provided(provider);
        self
    }

    /// Run without a secret provider. Loading a file that references a secret
    /// then fails with [`SettingsError::SecretProviderUnavailable`].
    pub fn no_secret_provider(mut self) -> Self {
        self.secrets = SecretSource::Disabled;
        self
    }

    /// Bound on each secret fetch (default: 10 seconds).
    pub fn secret_timeout(mut self, timeout: Duration) -> Self {
        self.secret_timeout = timeout;
        self
    }

    /// Load this overlay file instead of searching for `.env`.
    pub fn dotenv_path(mut self, path: impl AsRef<Path>) -> Self {
        self.dotenv = DotenvSource::Path(path.as_ref().to_path_buf());
        self
    }

    /// Skip loading any `.env` overlay.
    pub fn no_dotenv(mut self) -> Self {
        self.dotenv = DotenvSource::Disabled;
        self
    }

    /// Resolve against these variables instead of the process environment.
    pub fn env_vars<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(EnvVars::from_pairs(pairs));
        self
    }

    fn effective_env(&self) -> String {
        match &self.env {
            Some(tag) => tag.clone(),
            None => default_env_tag(),
        }
    }

    /// The provider to install, wrapped in the timeout guard.
    fn effective_secret_provider(&self) -> Option<Arc<dyn SecretProvider>> {
        let inner: Arc<dyn SecretProvider> = match &self.secrets {
            SecretSource::Provided(provider) => Arc::clone(provider),
            SecretSource::Disabled => return None,
            SecretSource::Detect => match AwsCliSecretProvider::detect() {
                Some(provider) => Arc::new(provider),
                None => {
                    warn!("aws CLI is not available; install it to resolve `ssm:` settings");
                    return None;
                }
            },
        };
        Some(Arc::new(TimeoutSecretProvider::new(inner, self.secret_timeout)))
    }

    /// Construct the settings: record the environment tag, set up the secret
    /// provider, load the `.env` overlay and, if a file was given, load it.
    pub fn build(self) -> Result<Settings, SettingsError> {
        let env = self.effective_env();
        let secrets = self.effective_secret_provider();

        match &self.dotenv {
            DotenvSource::Search => {
                env::load_dotenv(None);
            }
            DotenvSource::Path(path) => {
                env::load_dotenv(Some(path));
            }
            DotenvSource::Disabled => {}
        }

        let mut settings = Settings::from_parts(env, secrets, self.env_vars);
        if let Some(path) = &self.file {
            settings.load(path)?;
        }
        Ok(settings)
    }
}
