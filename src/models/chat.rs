//! Chat event model and content-derived identity.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{AppError, Result};

/// Placeholder display name for senders that arrive without one.
pub const ANONYMOUS_USER: &str = "anon";

/// Separator placed between user and text before hashing so that
/// `("ab", "c")` and `("a", "bc")` never share a digest.
const DIGEST_SEPARATOR: u8 = 0x1F;

/// Longest upstream identifier accepted verbatim.
const MAX_PROVIDED_ID_LEN: usize = 256;

/// Stable identity of a chat message.
///
/// Either an identifier supplied by the chat source (`ext:` prefix) or a
/// SHA-256 digest of `(user, text)` (`sha256:` prefix). Never includes time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Wrap an identifier supplied by the upstream chat source.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidEvent` if the identifier is blank or longer
    /// than 256 bytes.
    pub fn provided(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidEvent("provided id is blank".into()));
        }
        if trimmed.len() > MAX_PROVIDED_ID_LEN {
            return Err(AppError::InvalidEvent(format!(
                "provided id exceeds {MAX_PROVIDED_ID_LEN} bytes"
            )));
        }
        Ok(Self(format!("ext:{trimmed}")))
    }

    /// Derive an identifier from the sender and message body.
    #[must_use]
    pub fn from_content(user: &str, text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(user.as_bytes());
        hasher.update([DIGEST_SEPARATOR]);
        hasher.update(text.as_bytes());
        Self(format!("sha256:{:x}", hasher.finalize()))
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw output of the line parser before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChat {
    /// Sender display name as written by the source.
    pub user: String,
    /// Message body as written by the source.
    pub text: String,
    /// Upstream identifier, when the source supplied one.
    pub id: Option<String>,
}

impl ParsedChat {
    /// Build a parse result with no upstream identifier.
    pub fn new(user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            text: text.into(),
            id: None,
        }
    }

    /// Attach an upstream identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// One observed chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatEvent {
    /// Stable identity used for deduplication.
    pub id: EventId,
    /// Sender display name (untrusted).
    pub user: String,
    /// Message body (untrusted, non-empty).
    pub text: String,
    /// Capture time; used for ordering and metrics only.
    pub observed_at: DateTime<Utc>,
}

impl ChatEvent {
    /// Validate and construct an event.
    ///
    /// `user` and `text` are trimmed. A blank user becomes [`ANONYMOUS_USER`].
    /// When `provided_id` is `None`, blank, or oversized, the identity is
    /// derived from the trimmed user and text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidEvent` if the text is blank.
    pub fn new(user: &str, text: &str, provided_id: Option<&str>) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::InvalidEvent("message text is blank".into()));
        }

        let user = match user.trim() {
            "" => ANONYMOUS_USER,
            trimmed => trimmed,
        };

        let id = match provided_id.map(EventId::provided) {
            Some(Ok(id)) => id,
            Some(Err(err)) => {
                debug!(%err, "unusable upstream id, deriving from content");
                EventId::from_content(user, text)
            }
            None => EventId::from_content(user, text),
        };

        Ok(Self {
            id,
            user: user.to_owned(),
            text: text.to_owned(),
            observed_at: Utc::now(),
        })
    }

    /// Validate a parser result into an event.
    ///
    /// # Errors
    ///
    /// See [`ChatEvent::new`].
    pub fn from_parsed(parsed: &ParsedChat) -> Result<Self> {
        Self::new(&parsed.user, &parsed.text, parsed.id.as_deref())
    }
}
