//! Events pushed to live observers (browser clients over WebSocket).

use serde::{Deserialize, Serialize};

use crate::models::status::StatusReport;

/// Outbound event delivered to every connected observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// The announcer is about to speak `text`, whether or not audio plays.
    Speak {
        /// Reply text to be spoken.
        text: String,
        /// Sender of the comment being answered.
        user: String,
        /// The comment being answered.
        comment: String,
    },
    /// Snapshot of pipeline status, sent when an observer connects.
    Status {
        /// Current status report.
        status: StatusReport,
    },
}
