//! Self-disabling speech announcer.
//!
//! ```text
//! Enabled  --success-------->  Enabled
//! Enabled  --failure|timeout-> Disabled
//! Disabled --any------------>  Disabled   (no-op, completes immediately)
//! ```
//!
//! Every call publishes [`LiveEvent::Speak`] to observers first, so text
//! delivery never depends on audio.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::models::chat::ChatEvent;
use crate::models::live::LiveEvent;
use crate::speech::command::Synthesizer;
use crate::speech::observers::ObserverHub;

/// Whether synthesis is still attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncerState {
    /// Synthesis is attempted.
    Enabled,
    /// Synthesis failed or timed out once; never attempted again.
    Disabled,
}

/// How one announcement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// Audio played to completion.
    Spoken,
    /// Synthesis failed; announcer is now disabled.
    Failed,
    /// Synthesis exceeded the timeout; announcer is now disabled.
    TimedOut,
    /// Announcer was already disabled; only observers were notified.
    Skipped,
}

/// A reply to be spoken, with the comment it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Reply text.
    pub text: String,
    /// Sender of the comment.
    pub user: String,
    /// The comment being answered.
    pub comment: String,
}

impl Announcement {
    /// Pair a reply with the event it answers.
    #[must_use]
    pub fn reply_to(event: &ChatEvent, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user: event.user.clone(),
            comment: event.text.clone(),
        }
    }
}

/// Speaks replies through a [`Synthesizer`] with a hard timeout.
pub struct Announcer {
    synthesizer: Arc<dyn Synthesizer>,
    hub: ObserverHub,
    timeout: Duration,
    enabled: AtomicBool,
    speaking: AtomicBool,
}

impl Announcer {
    /// Create an enabled announcer.
    #[must_use]
    pub fn new(synthesizer: Arc<dyn Synthesizer>, hub: ObserverHub, timeout: Duration) -> Self {
        Self {
            synthesizer,
            hub,
            timeout,
            enabled: AtomicBool::new(true),
            speaking: AtomicBool::new(false),
        }
    }

    /// Create an announcer that never attempts synthesis.
    #[must_use]
    pub fn disabled(synthesizer: Arc<dyn Synthesizer>, hub: ObserverHub, timeout: Duration) -> Self {
        let announcer = Self::new(synthesizer, hub, timeout);
        announcer.enabled.store(false, Ordering::Release);
        announcer
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AnnouncerState {
        if self.enabled.load(Ordering::Acquire) {
            AnnouncerState::Enabled
        } else {
            AnnouncerState::Disabled
        }
    }

    /// Whether audio is playing right now.
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Acquire)
    }

    /// Observer hub this announcer publishes to.
    #[must_use]
    pub fn hub(&self) -> &ObserverHub {
        &self.hub
    }

    /// Notify observers, then attempt synthesis if still enabled.
    ///
    /// Completes within the configured timeout (plus scheduling slack).
    pub async fn announce(&self, announcement: &Announcement) -> AnnounceOutcome {
        self.hub.publish(LiveEvent::Speak {
            text: announcement.text.clone(),
            user: announcement.user.clone(),
            comment: announcement.comment.clone(),
        });

        if self.state() == AnnouncerState::Disabled {
            return AnnounceOutcome::Skipped;
        }

        let result = {
            let _speaking = Speaking::begin(&self.speaking);
            tokio::time::timeout(self.timeout, self.synthesizer.speak(&announcement.text)).await
        };

        match result {
            Ok(Ok(())) => AnnounceOutcome::Spoken,
            Ok(Err(err)) => {
                self.disable(&err.to_string());
                AnnounceOutcome::Failed
            }
            Err(_elapsed) => {
                self.disable("synthesis timed out");
                AnnounceOutcome::TimedOut
            }
        }
    }

    fn disable(&self, reason: &str) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            warn!(reason, "speech synthesis disabled for this process");
        } else {
            info!(reason, "speech synthesis already disabled");
        }
    }
}

/// Holds the `speaking` flag for as long as it lives, including when the
/// announce future is dropped mid-synthesis.
struct Speaking<'a>(&'a AtomicBool);

impl<'a> Speaking<'a> {
    fn begin(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for Speaking<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
