//! Built-in canned reply pools and slang classification tokens.

/// Placeholder replaced with the sender's display name.
pub const USER_PLACEHOLDER: &str = "{user}";

/// Last-resort reply when a pool yields nothing usable.
pub const APOLOGY_TEMPLATE: &str = "Sorry {user}, I lost my train of thought!";

/// Last-resort reply when even the sender's name is unusable.
pub const APOLOGY_LITERAL: &str = "Thanks for the message!";

/// Substrings (matched case-insensitively) that mark a comment as slang.
pub const DEFAULT_SLANG_TOKENS: &[&str] = &[
    "gm",
    "gn",
    "wagmi",
    "ngmi",
    "lfg",
    "hodl",
    "moon",
    "pump",
    "dump",
    "rug",
    "degen",
    "fren",
    "wen",
    "based",
    "bullish",
    "bearish",
    "diamond hands",
    "paper hands",
    "hopium",
    "fud",
];

/// Replies for slang-flavored comments.
pub const DEFAULT_SLANG_POOL: &[&str] = &[
    "GM {user}! We're all gonna make it!",
    "{user} speaking the language, LFG!",
    "Diamond hands, {user}. Diamond hands.",
    "Ser {user}, this is the way.",
    "{user} brought the hopium, love to see it!",
    "WAGMI {user}, stay based!",
    "{user}, fren, the chart is looking spicy today.",
    "Degens unite! Thanks {user}!",
];

/// Replies for every other comment.
pub const DEFAULT_GENERIC_POOL: &[&str] = &[
    "Thanks for stopping by, {user}!",
    "Great point, {user}!",
    "Appreciate you, {user}!",
    "{user}, thanks for hanging out in chat!",
    "Hey {user}, glad you're here!",
    "Good question, {user}. Let's keep an eye on it together.",
    "Love the energy, {user}!",
];

/// Interpolate `user` into `template`.
#[must_use]
pub fn render(template: &str, user: &str) -> String {
    template.replace(USER_PLACEHOLDER, user)
}

/// Owned copy of a static pool, used when configuration leaves it empty.
#[must_use]
pub fn owned(pool: &[&str]) -> Vec<String> {
    pool.iter().map(|s| (*s).to_owned()).collect()
}
