//! Single-key substitution for instance `.kvp` config files.
//!
//! A `.kvp` file is a list of `Key=Value` lines. Only the `Rust.LevelUrl`
//! line is ever touched; every other byte (ordering, blank lines, `\r\n`
//! terminators) is carried through unchanged.

use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Config key holding the map the instance loads on start.
pub const LEVEL_URL_KEY: &str = "Rust.LevelUrl";

/// Line-start anchored match for the level URL line. The value stops at the
/// line terminator so a `\r` is never swallowed into the value.
pub const LEVEL_URL_PATTERN: &str = r"(?m)^Rust\.LevelUrl=([^\r\n]*)";

static LEVEL_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LEVEL_URL_PATTERN).expect("valid regex"));

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

/// Result of splicing a new level URL into config text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    /// Full config text with the level URL line replaced.
    pub text: String,
    /// Value the line carried before the substitution.
    pub previous: String,
}

/// Render the full config line for `url`, e.g. `Rust.LevelUrl=http://x`.
pub fn level_url_line(url: &str) -> String {
    format!("{LEVEL_URL_KEY}={url}")
}

/// Current level URL value, if the text carries a `Rust.LevelUrl=` line.
pub fn find_level_url(text: &str) -> Option<&str> {
    LEVEL_URL_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Replace the first `Rust.LevelUrl=` line with one carrying `new_url`.
///
/// Returns `None` when no line matches; the caller decides whether that is
/// an error. The value is inserted verbatim (no `$` expansion).
pub fn replace_level_url(text: &str, new_url: &str) -> Option<Substitution> {
    let caps = LEVEL_URL_RE.captures(text)?;
    let line = caps.get(0)?;
    let previous = caps.get(1).map(|m| m.as_str()).unwrap_or_default();

    let mut out = String::with_capacity(text.len() + new_url.len());
    out.push_str(&text[..line.start()]);
    out.push_str(&level_url_line(new_url));
    out.push_str(&text[line.end()..]);

    Some(Substitution {
        text: out,
        previous: previous.to_string(),
    })
}

/// A level URL must stay on one line, otherwise it would inject extra keys.
pub fn is_valid_level_url(url: &str) -> bool {
    !url.contains(|c: char| c == '\r' || c == '\n')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
