//! Classifier for replies to "who's a good boy?"

use regex::Regex;
use std::sync::LazyLock;

static BARE_ME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^me+!?$").expect("valid regex"));
static I_AM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(i\s*am|i['’]?m)\b").expect("valid regex"));
static ITS_ME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^it['’]?s me\b").expect("valid regex"));

/// Lowercase, trim, and collapse internal whitespace runs to one space
fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether `raw` claims to be the good boy.
///
/// Accepts "me" (any number of e's, optional `!`), replies opening with
/// "I am" / "I'm" / "im", anything mentioning "good boy", and replies opening
/// with "me " or "it's me". Everything else, the empty string included, is a
/// miss.
#[must_use]
pub fn matches_good_boy_answer(raw: &str) -> bool {
    let s = normalize(raw);
    if s.is_empty() {
        return false;
    }

    BARE_ME.is_match(&s)
        || I_AM.is_match(&s)
        || s.contains("good boy")
        || s.starts_with("me ")
        || ITS_ME.is_match(&s)
}
