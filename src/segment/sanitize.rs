//! Speakable text sanitization and word splitting

use std::sync::LazyLock;

use regex::Regex;

/// Anything that is not a letter, combining mark, number, punctuation or
/// whitespace, plus emoji variation selectors
static UNSPEAKABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{L}\p{Mn}\p{Mc}\p{N}\p{P}\s]|[\x{FE00}-\x{FE0F}\x{E0100}-\x{E01EF}]")
        .expect("valid regex")
});

/// Strip code points a synthesizer should not receive (emoji, symbols)
#[must_use]
pub fn speakable(display: &str) -> String {
    UNSPEAKABLE.replace_all(display, "").into_owned()
}

/// Split text into alternating whitespace and non-whitespace runs
///
/// Returns `(is_whitespace, run)` pairs covering the input exactly.
pub fn split_runs(text: &str) -> Vec<(bool, &str)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;

    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        match current {
            Some(prev) if prev != space => {
                runs.push((prev, &text[start..i]));
                start = i;
                current = Some(space);
            }
            None => current = Some(space),
            _ => {}
        }
    }
    if let Some(space) = current {
        runs.push((space, &text[start..]));
    }
    runs
}
