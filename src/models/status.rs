//! Status report returned by the HTTP, IPC, and WebSocket surfaces.

use serde::{Deserialize, Serialize};

/// Lifecycle of the supervised chat source subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceState {
    /// No token configured, or monitoring was stopped.
    #[default]
    Stopped,
    /// Spawning the subprocess.
    Starting,
    /// Subprocess is running.
    Running {
        /// OS process id, when available.
        pid: Option<u32>,
    },
    /// Waiting before the next restart attempt.
    Backoff {
        /// Consecutive failed attempts so far (1-based).
        attempt: u32,
        /// Delay before the next attempt.
        delay_ms: u64,
    },
    /// Restart budget exhausted; the supervisor gave up.
    Failed {
        /// Last failure reason.
        reason: String,
    },
}

/// Point-in-time view of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StatusReport {
    /// Token address being monitored, if any.
    pub token_address: Option<String>,
    /// Optional display name of the token.
    pub token_name: Option<String>,
    /// Events waiting in the intake queue.
    pub queue_depth: usize,
    /// Whether a processing cycle is in flight.
    pub processing: bool,
    /// Whether speech synthesis is currently playing.
    pub speaking: bool,
    /// Whether speech synthesis is still enabled.
    pub speech_enabled: bool,
    /// Distinct comments ever handed to the processor.
    pub processed_count: usize,
    /// Chat source subprocess state.
    pub source: SourceState,
}
