//! Secret providers for `ssm:`-prefixed setting values.
//!
//! A [`SecretProvider`] answers a single question: "what is the value of the
//! parameter with this name?". Settings hold one optionally; a missing provider
//! only becomes an error when a setting actually references a secret.
//!
//! - [`AwsCliSecretProvider`] asks AWS Systems Manager Parameter Store through
//!   the `aws` command-line tool.
//! - [`MemorySecretProvider`] serves parameters from an in-process map.
//! - [`TimeoutSecretProvider`] bounds how long any other provider may take.

use std::collections::HashMap;
use std::process::Command;
use std::sync::{Arc, RwLock, mpsc};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Value prefix marking a setting as a secret reference.
pub const SECRET_PREFIX: &str = "ssm:";

/// Default bound on a single secret fetch.
pub const DEFAULT_SECRET_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Parameter not found: {0}")]
    NotFound(String),

    #[error("Access denied to parameter {name}: {reason}")]
    AccessDenied { name: String, reason: String },

    #[error("Timed out after {after:?} fetching parameter {name}")]
    Timeout { name: String, after: Duration },

    #[error("Secret backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SecretResult<T> = Result<T, SecretError>;

/// Source of secret parameter values.
pub trait SecretProvider: Send + Sync + std::fmt::Debug {
    /// Human-readable name, used in diagnostics.
    fn name(&self) -> &str;

    /// Fetch the parameter `name`, decrypting it when `decrypt` is set.
    fn fetch_parameter(&self, name: &str, decrypt: bool) -> SecretResult<String>;
}

/// Parameter Store access through the AWS CLI.
///
/// Credentials, region and profile resolution follow the CLI's own rules;
/// [`region`](Self::region) and [`profile`](Self::profile) pin them explicitly.
#[derive(Debug, Clone)]
pub struct AwsCliSecretProvider {
    program: String,
    region: Option<String>,
    profile: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetParameterOutput {
    parameter: Option<Parameter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Parameter {
    value: String,
}

impl AwsCliSecretProvider {
    pub fn new() -> Self {
        Self::with_program("aws")
    }

    /// Use a different executable in place of `aws`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            region: None,
            profile: None,
        }
    }

    /// A provider if the CLI can be executed, `None` otherwise.
    pub fn detect() -> Option<Self> {
        let provider = Self::new();
        match Command::new(&provider.program).arg("--version").output() {
            Ok(output) if output.status.success() => Some(provider),
            Ok(output) => {
                debug!(status = %output.status, "aws --version failed");
                None
            }
            Err(e) => {
                debug!(error = %e, "aws CLI not executable");
                None
            }
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    fn command(&self, name: &str, decrypt: bool) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["ssm", "get-parameter", "--name", name, "--output", "json"]);
        if decrypt {
            cmd.arg("--with-decryption");
        }
        if let Some(region) = &self.region {
            cmd.args(["--region", region.as_str()]);
        }
        if let Some(profile) = &self.profile {
            cmd.args(["--profile", profile.as_str()]);
        }
        cmd
    }
}

impl Default for AwsCliSecretProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a failed `get-parameter` call to a [`SecretError`] by its stderr.
fn classify_failure(name: &str, stderr: &str) -> SecretError {
    let reason = stderr.trim().to_string();
    if reason.contains("ParameterNotFound") {
        SecretError::NotFound(name.to_string())
    } else if reason.contains("AccessDenied") || reason.contains("UnrecognizedClient") {
        SecretError::AccessDenied {
            name: name.to_string(),
            reason,
        }
    } else {
        SecretError::Backend(reason)
    }
}

fn parse_parameter_output(name: &str, stdout: &[u8]) -> SecretResult<String> {
    let output: GetParameterOutput = serde_json::from_slice(stdout)
        .map_err(|e| SecretError::Backend(format!("unexpected get-parameter output: {e}")))?;
    output
        .parameter
        .map(|p| p.value)
        .ok_or_else(|| SecretError::NotFound(name.to_string()))
}

impl SecretProvider for AwsCliSecretProvider {
    fn name(&self) -> &str {
        "aws-ssm"
    }

    fn fetch_parameter(&self, name: &str, decrypt: bool) -> SecretResult<String> {
        let output = self.command(name, decrypt).output()?;
        if !output.status.success() {
            return Err(classify_failure(
                name,
                &String::from_utf8_lossy(&output.stderr),
            ));
        }
        parse_parameter_output(name, &output.stdout)
    }
}

/// Secret provider backed by an in-memory map.
///
/// Values are returned as stored; `decrypt` is ignored.
#[derive(Debug, Default)]
pub struct MemorySecretProvider {
    parameters: RwLock<HashMap<String, String>>,
}

impl MemorySecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut parameters = self
            .parameters
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        parameters.insert(name.into(), value.into());
    }
}

impl SecretProvider for MemorySecretProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_parameter(&self, name: &str, _decrypt: bool) -> SecretResult<String> {
        let parameters = self
            .parameters
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        parameters
            .get(name)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(name.to_string()))
    }
}

/// Wraps a provider so that no fetch takes longer than `timeout`.
///
/// The inner fetch runs on its own thread. When the bound is hit the caller
/// gets [`SecretError::Timeout`]; the abandoned thread finishes in the
/// background and its result is discarded.
#[derive(Debug, Clone)]
pub struct TimeoutSecretProvider {
    inner: Arc<dyn SecretProvider>,
    timeout: Duration,
}

impl TimeoutSecretProvider {
    pub fn new(inner: Arc<dyn SecretProvider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl SecretProvider for TimeoutSecretProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch_parameter(&self, name: &str, decrypt: bool) -> SecretResult<String> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let owned = name.to_string();
        thread::Builder::new()
            .name("configur-secret-fetch".into())
            .spawn(move || {
                // The receiver is gone if the caller already timed out.
                let _ = tx.send(inner.fetch_parameter(&owned, decrypt));
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(SecretError::Timeout {
                name: name.to_string(),
                after: self.timeout,
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(SecretError::Backend(
                "secret fetch thread exited without a result".into(),
            )),
        }
    }
}
