//! Chat source output parser.
//!
//! Turns raw subprocess text into [`ParsedChat`] tuples by running every
//! non-blank line through a prioritized chain of decoders. Each decoder is
//! a pure function `&str -> Option<ParsedChat>`; the first one to return
//! `Some` wins.
//!
//! | Priority | Decoder                    | Shape                                      |
//! |----------|----------------------------|--------------------------------------------|
//! | 1        | [`decode_record`]          | `{"type":"message","user":..,"text":..}`   |
//! | 2        | [`decode_new_message`]     | `New message from <user>: <text>`          |
//! | 3        | [`decode_colon_heuristic`] | `<word>: <rest>`                           |
//! | *(none)* | -                          | Discarded; assumed to be a diagnostic line |

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::chat::ParsedChat;

/// A single decoder in the chain.
pub type LineDecoder = fn(&str) -> Option<ParsedChat>;

/// Decoders in the order they are tried.
pub const DECODER_CHAIN: &[LineDecoder] =
    &[decode_record, decode_new_message, decode_colon_heuristic];

/// Record `type` values that mark a JSON line as a chat message.
const MESSAGE_KINDS: &[&str] = &["message", "chat", "new_message", "chat_message"];

/// Field aliases, in lookup order.
const KIND_FIELDS: &[&str] = &["type", "kind", "event"];
const USER_FIELDS: &[&str] = &["user", "username", "author", "from"];
const TEXT_FIELDS: &[&str] = &["text", "message", "content"];
const ID_FIELDS: &[&str] = &["id", "message_id", "mid"];

/// Tokens before a colon that identify log output rather than a sender.
const DIAGNOSTIC_TOKENS: &[&str] = &[
    "error", "err", "warn", "warning", "info", "debug", "trace", "fatal", "http", "https",
    "ws", "wss", "stack", "at", "note",
];

static NEW_MESSAGE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static COLON_RE: OnceLock<Option<Regex>> = OnceLock::new();
static ANSI_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Parse a raw chunk (possibly multi-line) into zero or more chat tuples.
///
/// Lines are handled independently: a line no decoder accepts is skipped
/// and never affects the lines after it.
#[must_use]
pub fn parse_chunk(chunk: &str) -> Vec<ParsedChat> {
    chunk.lines().filter_map(parse_line).collect()
}

/// Parse a single line through the decoder chain.
///
/// Returns `None` for blank lines and lines no decoder accepts.
#[must_use]
pub fn parse_line(line: &str) -> Option<ParsedChat> {
    let cleaned = strip_ansi(line);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    let parsed = DECODER_CHAIN.iter().find_map(|decode| decode(cleaned));
    if parsed.is_none() {
        debug!(line = cleaned, "chat source line skipped");
    }
    parsed
}

/// Strict structured decoding of a self-describing JSON record.
///
/// Accepts an object whose kind field names a chat message and which has a
/// non-blank user and text. An `id` may be a string or an integer.
#[must_use]
pub fn decode_record(line: &str) -> Option<ParsedChat> {
    if !line.starts_with('{') {
        return None;
    }

    let value: Value = serde_json::from_str(line).ok()?;
    let record = value.as_object()?;

    let kind = first_string(record, KIND_FIELDS)?;
    if !MESSAGE_KINDS.iter().any(|k| kind.eq_ignore_ascii_case(k)) {
        return None;
    }

    let user = first_string(record, USER_FIELDS)?;
    let text = first_string(record, TEXT_FIELDS)?;
    let (user, text) = (user.trim(), text.trim());
    if user.is_empty() || text.is_empty() {
        return None;
    }

    let parsed = ParsedChat::new(user, text);
    Some(match first_id(record) {
        Some(id) => parsed.with_id(id),
        None => parsed,
    })
}

/// Match the `New message from <user>: <text>` shape.
///
/// Any prefix before `New message` (timestamps, emoji, log tags) is
/// ignored. The user ends at the first `": "` so that a colon inside the
/// text is preserved.
#[must_use]
pub fn decode_new_message(line: &str) -> Option<ParsedChat> {
    let re = compiled(&NEW_MESSAGE_RE, r"New message from\s+(.+?):\s*(.+)$")?;
    let caps = re.captures(line)?;
    let user = caps.get(1)?.as_str().trim();
    let text = caps.get(2)?.as_str().trim();
    if user.is_empty() || text.is_empty() {
        return None;
    }
    Some(ParsedChat::new(user, text))
}

/// Best-effort `<word>: <rest>` heuristic.
///
/// The token must be a single word (letters, digits, `_`, `.`, `-`) of at
/// most 64 characters and must not look like a log level or URL scheme.
#[must_use]
pub fn decode_colon_heuristic(line: &str) -> Option<ParsedChat> {
    let re = compiled(&COLON_RE, r"^\s*([\w.\-]{1,64})\s*:\s*(.+)$")?;
    let caps = re.captures(line)?;
    let token = caps.get(1)?.as_str();
    let rest = caps.get(2)?.as_str().trim();

    if rest.is_empty() || rest.starts_with("//") {
        return None;
    }
    if DIAGNOSTIC_TOKENS
        .iter()
        .any(|d| token.eq_ignore_ascii_case(d))
    {
        return None;
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        // Clock prefixes such as `12:30:01 ...`.
        return None;
    }

    Some(ParsedChat::new(token, rest))
}

fn strip_ansi(line: &str) -> Cow<'_, str> {
    match compiled(&ANSI_RE, r"\x1b\[[0-9;?]*[ -/]*[@-~]") {
        Some(re) => re.replace_all(line, ""),
        None => Cow::Borrowed(line),
    }
}

fn first_string<'a>(record: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_str))
}

fn first_id(record: &Map<String, Value>) -> Option<String> {
    ID_FIELDS.iter().find_map(|field| match record.get(*field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
