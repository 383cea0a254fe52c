//! Chat source process spawner.
//!
//! Spawns the external chat-tailing program for one token with:
//! - `kill_on_drop(true)` so the process never outlives its handle.
//! - `env_clear()` + a safe variable allowlist so the backend API key and
//!   other secrets in the server's environment never reach the child.
//! - stdout and stderr both piped; chat lines may arrive on either.

use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::info;

use crate::config::SourceConfig;
use crate::{AppError, Result};

/// Environment variables inherited by the chat source process.
pub const ALLOWED_ENV_VARS: &[&str] = &[
    "PATH",
    "HOME",
    "LANG",
    "RUST_LOG",
    "NODE_PATH",
    "NODE_ENV",
    // Windows-specific variables.
    "USERPROFILE",
    "SystemRoot",
    "TEMP",
    "TMP",
    "APPDATA",
    "LOCALAPPDATA",
    "COMSPEC",
];

/// Environment variable carrying the token address to the child.
pub const TOKEN_ENV: &str = "CHAT_HERALD_TOKEN";

/// Environment variable carrying the token display name to the child.
pub const TOKEN_NAME_ENV: &str = "CHAT_HERALD_TOKEN_NAME";

/// Longest accepted token address.
pub const MAX_TOKEN_ADDRESS_LEN: usize = 128;

/// The token whose chat is being monitored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTarget {
    /// Token address; passed as the final CLI argument.
    pub token_address: String,
    /// Optional human-readable name.
    pub token_name: Option<String>,
}

impl SourceTarget {
    /// Validate and normalize a monitoring target.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the address is blank, starts with `-`
    /// (it would be read as an option), contains whitespace, or exceeds
    /// [`MAX_TOKEN_ADDRESS_LEN`].
    pub fn new(token_address: &str, token_name: Option<&str>) -> Result<Self> {
        let address = token_address.trim();
        if address.is_empty() {
            return Err(AppError::Config("token address must not be empty".into()));
        }
        if address.starts_with('-') {
            return Err(AppError::Config(
                "token address must not start with '-'".into(),
            ));
        }
        if address.chars().any(char::is_whitespace) {
            return Err(AppError::Config(
                "token address must not contain whitespace".into(),
            ));
        }
        if address.len() > MAX_TOKEN_ADDRESS_LEN {
            return Err(AppError::Config(format!(
                "token address exceeds {MAX_TOKEN_ADDRESS_LEN} characters"
            )));
        }

        Ok(Self {
            token_address: address.to_owned(),
            token_name: token_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned),
        })
    }
}

/// A running chat source with its captured output streams.
#[derive(Debug)]
pub struct SourceProcess {
    /// Child handle; dropping it kills the process.
    pub child: Child,
    /// Captured standard output.
    pub stdout: ChildStdout,
    /// Captured standard error.
    pub stderr: ChildStderr,
}

/// Spawn the chat source for `target`.
///
/// # Errors
///
/// Returns `AppError::Source` if the process cannot be spawned or its
/// output streams cannot be captured.
pub fn spawn_source(config: &SourceConfig, target: &SourceTarget) -> Result<SourceProcess> {
    let mut cmd = Command::new(&config.program);
    cmd.args(&config.args).arg(&target.token_address);

    cmd.env_clear();
    for &key in ALLOWED_ENV_VARS {
        if let Ok(val) = std::env::var(key) {
            cmd.env(key, val);
        }
    }
    cmd.env(TOKEN_ENV, &target.token_address);
    if let Some(ref name) = target.token_name {
        cmd.env(TOKEN_NAME_ENV, name);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|err| AppError::Source(format!("failed to spawn {}: {err}", config.program)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Source("failed to capture chat source stdout".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::Source("failed to capture chat source stderr".into()))?;

    info!(
        pid = child.id().unwrap_or(0),
        program = %config.program,
        token = %target.token_address,
        "chat source spawned"
    );

    Ok(SourceProcess {
        child,
        stdout,
        stderr,
    })
}
