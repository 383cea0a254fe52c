//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::pipeline::intake::DedupScope;
use crate::speech::command::TextInput;
use crate::{AppError, Result};

/// Keychain service name under which credentials are stored.
pub const KEYRING_SERVICE: &str = "chat-herald";

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct HttpConfig {
    /// Interface to bind.
    #[serde(default = "default_http_host")]
    pub host: String,
    /// Port to bind; 0 lets the OS choose.
    #[serde(default = "default_http_port")]
    pub port: u16,
    /// Optional directory of static assets served as the router fallback.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
            static_dir: None,
        }
    }
}

fn default_http_host() -> String {
    "127.0.0.1".into()
}

fn default_http_port() -> u16 {
    3000
}

/// Chat source subprocess settings and restart policy.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    /// Program that tails the live chat (e.g., `node`, `python3`).
    #[serde(default = "default_source_program")]
    pub program: String,
    /// Arguments placed before the token address.
    #[serde(default)]
    pub args: Vec<String>,
    /// Delay before the first restart after an unexpected exit.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_seconds: u64,
    /// Upper bound on the restart delay.
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: u64,
    /// Consecutive failures before giving up; 0 means never give up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Uptime after which the failure counter resets.
    #[serde(default = "default_stable_after")]
    pub stable_after_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            program: default_source_program(),
            args: Vec::new(),
            initial_delay_seconds: default_initial_delay(),
            max_delay_seconds: default_max_delay(),
            max_attempts: default_max_attempts(),
            stable_after_seconds: default_stable_after(),
        }
    }
}

impl SourceConfig {
    /// Delay before the first restart.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_seconds)
    }

    /// Cap on the restart delay.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_seconds)
    }

    /// Uptime after which the failure counter resets.
    #[must_use]
    pub fn stable_after(&self) -> Duration {
        Duration::from_secs(self.stable_after_seconds)
    }
}

fn default_source_program() -> String {
    "pump-chat-monitor".into()
}

fn default_initial_delay() -> u64 {
    5
}

fn default_max_delay() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    10
}

fn default_stable_after() -> u64 {
    60
}

/// Sequential processor settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ProcessorConfig {
    /// Polling cadence of the processor.
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
    /// Which ids gate intake.
    #[serde(default)]
    pub dedup_scope: DedupScope,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            tick_millis: default_tick_millis(),
            dedup_scope: DedupScope::default(),
        }
    }
}

impl ProcessorConfig {
    /// Polling cadence as a [`Duration`].
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }
}

fn default_tick_millis() -> u64 {
    1000
}

/// Canned response pools and classification tokens.
///
/// Empty lists fall back to the built-in defaults in
/// [`crate::respond::pools`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub struct GeneratorConfig {
    /// Slang tokens that route a comment to the slang pool.
    #[serde(default)]
    pub slang_tokens: Vec<String>,
    /// Templates used for slang-flavored comments; `{user}` is interpolated.
    #[serde(default)]
    pub slang_pool: Vec<String>,
    /// Templates used for all other comments.
    #[serde(default)]
    pub generic_pool: Vec<String>,
}

/// Optional text generation backend used to enhance canned replies.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BackendConfig {
    /// Whether enhancement is attempted at all.
    #[serde(default)]
    pub enabled: bool,
    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_backend_endpoint")]
    pub endpoint: String,
    /// Model identifier sent with each request.
    #[serde(default = "default_backend_model")]
    pub model: String,
    /// System prompt framing the persona.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Per-request timeout.
    #[serde(default = "default_backend_timeout")]
    pub timeout_seconds: u64,
    /// Shortest acceptable enhanced reply, in characters.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    /// Longest acceptable enhanced reply, in characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// API key (populated at runtime, never read from the file).
    #[serde(skip)]
    pub api_key: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_backend_endpoint(),
            model: default_backend_model(),
            system_prompt: default_system_prompt(),
            timeout_seconds: default_backend_timeout(),
            min_chars: default_min_chars(),
            max_chars: default_max_chars(),
            api_key: String::new(),
        }
    }
}

impl BackendConfig {
    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_backend_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".into()
}

fn default_backend_model() -> String {
    "gpt-4o-mini".into()
}

fn default_system_prompt() -> String {
    "You are a friendly livestream host replying to token chat. \
     Rewrite the draft reply in one short, upbeat sentence. \
     Keep the viewer's name. No hashtags, no financial advice."
        .into()
}

fn default_backend_timeout() -> u64 {
    8
}

fn default_min_chars() -> usize {
    8
}

fn default_max_chars() -> usize {
    280
}

/// System text-to-speech settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SpeechConfig {
    /// When false the announcer starts disabled and only notifies observers.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// TTS program.
    #[serde(default = "default_speech_program")]
    pub program: String,
    /// Program arguments. The defaults make `say`/`espeak` read stdin.
    #[serde(default = "default_speech_args")]
    pub args: Vec<String>,
    /// How the reply text reaches the program.
    #[serde(default)]
    pub input: TextInput,
    /// Hard timeout for one synthesis.
    #[serde(default = "default_speech_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_speech_program(),
            args: default_speech_args(),
            input: TextInput::default(),
            timeout_seconds: default_speech_timeout(),
        }
    }
}

impl SpeechConfig {
    /// Synthesis timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_true() -> bool {
    true
}

fn default_speech_program() -> String {
    if cfg!(target_os = "macos") {
        "say".into()
    } else {
        "espeak".into()
    }
}

fn default_speech_args() -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec!["-f".into(), "-".into()]
    } else {
        vec!["--stdin".into()]
    }
}

fn default_speech_timeout() -> u64 {
    5
}

fn default_ipc_name() -> String {
    "chat-herald".into()
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Named pipe / Unix socket identifier for `chat-herald-ctl`.
    #[serde(default = "default_ipc_name")]
    pub ipc_name: String,
    /// HTTP and WebSocket listener.
    #[serde(default)]
    pub http: HttpConfig,
    /// Chat source subprocess.
    #[serde(default)]
    pub source: SourceConfig,
    /// Sequential processor.
    #[serde(default)]
    pub processor: ProcessorConfig,
    /// Canned reply pools.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Reply enhancement backend.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Speech synthesis.
    #[serde(default)]
    pub speech: SpeechConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            ipc_name: default_ipc_name(),
            http: HttpConfig::default(),
            source: SourceConfig::default(),
            processor: ProcessorConfig::default(),
            generator: GeneratorConfig::default(),
            backend: BackendConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the backend API key from OS keychain with env-var fallback.
    ///
    /// Does nothing when the backend is disabled. A missing key is not an
    /// error: the backend is switched off with a warning and canned replies
    /// are used.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the keychain task panics.
    pub async fn load_credentials(&mut self) -> Result<()> {
        if !self.backend.enabled {
            return Ok(());
        }

        match load_credential("backend_api_key", "CHAT_HERALD_API_KEY").await? {
            Some(key) => self.backend.api_key = key,
            None => {
                warn!("no backend api key found; reply enhancement disabled");
                self.backend.enabled = false;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.processor.tick_millis == 0 {
            return Err(AppError::Config(
                "processor.tick_millis must be greater than zero".into(),
            ));
        }

        if self.speech.timeout_seconds == 0 {
            return Err(AppError::Config(
                "speech.timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.source.program.trim().is_empty() {
            return Err(AppError::Config("source.program must not be empty".into()));
        }

        if self.source.max_delay_seconds < self.source.initial_delay_seconds {
            return Err(AppError::Config(
                "source.max_delay_seconds must be at least initial_delay_seconds".into(),
            ));
        }

        if self.backend.min_chars > self.backend.max_chars {
            return Err(AppError::Config(
                "backend.min_chars must not exceed backend.max_chars".into(),
            ));
        }

        if self.ipc_name.trim().is_empty() {
            return Err(AppError::Config("ipc_name must not be empty".into()));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
///
/// Returns `Ok(None)` when neither source provides a value.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<Option<String>> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(Some(value)),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    Ok(env::var(env_key).ok().filter(|value| !value.is_empty()))
}
