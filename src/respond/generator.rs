//! Reply generation with a degrading fallback chain.
//!
//! 1. Classify the comment as slang or generic by substring match.
//! 2. Pick a template uniformly at random from the matching pool and
//!    interpolate the sender's name.
//! 3. Optionally ask a [`TextBackend`] to rewrite it; keep the canned
//!    reply on error, timeout, or implausible output.
//!
//! [`ResponseGenerator::generate`] never fails and never returns an empty
//! string.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::{BackendConfig, GeneratorConfig};
use crate::models::chat::ChatEvent;
use crate::respond::backend::TextBackend;
use crate::respond::pools::{self, APOLOGY_LITERAL, APOLOGY_TEMPLATE};

/// Which canned pool a comment is answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// Comment contains domain slang.
    Slang,
    /// Any other comment.
    Generic,
}

/// Bounds applied to enhanced output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enhancement {
    /// Backend call timeout.
    pub timeout: Duration,
    /// Shortest acceptable reply, in characters.
    pub min_chars: usize,
    /// Longest acceptable reply, in characters.
    pub max_chars: usize,
}

impl From<&BackendConfig> for Enhancement {
    fn from(config: &BackendConfig) -> Self {
        Self {
            timeout: config.timeout(),
            min_chars: config.min_chars,
            max_chars: config.max_chars,
        }
    }
}

/// Produces reply text for chat events.
pub struct ResponseGenerator {
    slang_tokens: Vec<String>,
    slang_pool: Vec<String>,
    generic_pool: Vec<String>,
    backend: Option<(Arc<dyn TextBackend>, Enhancement)>,
}

impl ResponseGenerator {
    /// Build a generator from configuration; empty lists use the built-in
    /// defaults.
    #[must_use]
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            slang_tokens: or_default(&config.slang_tokens, pools::DEFAULT_SLANG_TOKENS)
                .into_iter()
                .map(|token| token.to_lowercase())
                .collect(),
            slang_pool: or_default(&config.slang_pool, pools::DEFAULT_SLANG_POOL),
            generic_pool: or_default(&config.generic_pool, pools::DEFAULT_GENERIC_POOL),
            backend: None,
        }
    }

    /// Attach an enhancement backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn TextBackend>, bounds: Enhancement) -> Self {
        self.backend = Some((backend, bounds));
        self
    }

    /// Whether an enhancement backend is attached.
    #[must_use]
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Classify `text` by case-insensitive substring match on slang tokens.
    #[must_use]
    pub fn classify(&self, text: &str) -> Flavor {
        let lowered = text.to_lowercase();
        if self
            .slang_tokens
            .iter()
            .any(|token| !token.is_empty() && lowered.contains(token.as_str()))
        {
            Flavor::Slang
        } else {
            Flavor::Generic
        }
    }

    /// Templates for `flavor`.
    #[must_use]
    pub fn pool(&self, flavor: Flavor) -> &[String] {
        match flavor {
            Flavor::Slang => &self.slang_pool,
            Flavor::Generic => &self.generic_pool,
        }
    }

    /// Pick and render a canned reply. Never empty.
    #[must_use]
    pub fn canned(&self, event: &ChatEvent) -> String {
        let pool = self.pool(self.classify(&event.text));
        let rendered = if pool.is_empty() {
            String::new()
        } else {
            let index = rand::rng().random_range(0..pool.len());
            pools::render(&pool[index], &event.user)
        };

        if rendered.trim().is_empty() {
            apology(&event.user)
        } else {
            rendered
        }
    }

    /// Produce a reply for `event`. Never fails; never empty.
    pub async fn generate(&self, event: &ChatEvent) -> String {
        let canned = self.canned(event);

        let Some((backend, bounds)) = &self.backend else {
            return canned;
        };

        match tokio::time::timeout(bounds.timeout, backend.complete(&canned, event)).await {
            Ok(Ok(raw)) => match accept_enhanced(&raw, bounds) {
                Some(enhanced) => {
                    debug!(event_id = %event.id, "using enhanced reply");
                    enhanced
                }
                None => {
                    debug!(
                        event_id = %event.id,
                        chars = raw.chars().count(),
                        "enhanced reply rejected, using canned reply"
                    );
                    canned
                }
            },
            Ok(Err(err)) => {
                warn!(event_id = %event.id, %err, "enhancement failed, using canned reply");
                canned
            }
            Err(_elapsed) => {
                warn!(
                    event_id = %event.id,
                    timeout_ms = u64::try_from(bounds.timeout.as_millis()).unwrap_or(u64::MAX),
                    "enhancement timed out, using canned reply"
                );
                canned
            }
        }
    }
}

/// Trim and unquote backend output; `None` if its length is out of bounds.
fn accept_enhanced(raw: &str, bounds: &Enhancement) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim();

    let chars = unquoted.chars().count();
    if chars == 0 || chars < bounds.min_chars || chars > bounds.max_chars {
        return None;
    }
    Some(unquoted.to_owned())
}

fn or_default(configured: &[String], fallback: &[&str]) -> Vec<String> {
    if configured.is_empty() {
        pools::owned(fallback)
    } else {
        configured.to_vec()
    }
}

fn apology(user: &str) -> String {
    if user.trim().is_empty() {
        APOLOGY_LITERAL.to_owned()
    } else {
        pools::render(APOLOGY_TEMPLATE, user)
    }
}
