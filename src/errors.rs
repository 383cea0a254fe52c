//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// Chat source subprocess spawn, stream, or lifecycle failure.
    Source(String),
    /// A chat event failed validation (empty text, bad identifier).
    InvalidEvent(String),
    /// Reply enhancement backend failure or unusable output.
    Generation(String),
    /// Speech synthesis failure.
    Speech(String),
    /// IPC communication failure.
    Ipc(String),
    /// HTTP transport failure.
    Http(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Source(msg) => write!(f, "source: {msg}"),
            Self::InvalidEvent(msg) => write!(f, "invalid event: {msg}"),
            Self::Generation(msg) => write!(f, "generation: {msg}"),
            Self::Speech(msg) => write!(f, "speech: {msg}"),
            Self::Ipc(msg) => write!(f, "ipc: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
