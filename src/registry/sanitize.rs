//! Display-name cleanup applied where names enter the system.
//!
//! Names are shown to the other player, so markup and control characters are
//! removed before a name is stored.

use std::borrow::Cow;

/// Name used when nothing printable is left after cleanup, itself capped.
pub const FALLBACK_NAME: &str = "Player";

/// Strip markup tags and control characters, trim, and cap at `max_chars`.
///
/// # Examples
///
/// ```
/// use guesswho::registry::sanitize_name;
///
/// assert_eq!(sanitize_name("<b>Alice</b>", 20), "Alice");
/// assert_eq!(sanitize_name(&"A".repeat(30), 20).chars().count(), 20);
/// assert_eq!(sanitize_name("   ", 20), "Player");
/// ```
pub fn sanitize_name(input: &str, max_chars: usize) -> String {
    let stripped = strip_markup(input);
    let capped: String = stripped.trim().chars().take(max_chars).collect();
    let name = capped.trim();
    if name.is_empty() {
        FALLBACK_NAME.chars().take(max_chars).collect()
    } else {
        name.to_string()
    }
}

/// Remove `<...>` tags, stray angle brackets and control characters.
fn strip_markup(input: &str) -> Cow<'_, str> {
    if !input.chars().any(|c| c == '<' || c == '>' || c.is_control()) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if in_tag || c.is_control() => {}
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}
