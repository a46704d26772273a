//! Code detection in message text.

use std::sync::LazyLock;

use regex::Regex;

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-zA-Z0-9]{5,6}\b").expect("code pattern is a valid regex")
});

/// Characters that render nearly identically in most chat fonts.
const LOOKALIKES: [(char, char); 2] = [('l', 'I'), ('I', 'l')];

/// Return the first 5-6 character alphanumeric token in `text`.
pub fn extract(text: &str) -> Option<String> {
    CODE_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// Expand a code into its lookalike spellings.
///
/// Every `l` and `I` position may be either glyph. The original spelling is
/// always first and the list never exceeds `max` entries.
pub fn variants(code: &str, max: usize) -> Vec<String> {
    if max == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = code.chars().collect();
    let ambiguous: Vec<usize> = chars
        .iter()
        .enumerate()
        .filter(|(_, c)| swap(**c).is_some())
        .map(|(i, _)| i)
        .collect();

    let mut out = Vec::new();
    // Bit i of `mask` flips ambiguous position i; mask 0 is the original.
    let combinations = 1usize.checked_shl(ambiguous.len() as u32).unwrap_or(usize::MAX);
    for mask in 0..combinations {
        if out.len() == max {
            break;
        }
        let mut spelled = chars.clone();
        for (bit, &pos) in ambiguous.iter().enumerate() {
            if mask & (1 << bit) != 0
                && let Some(other) = swap(spelled[pos])
            {
                spelled[pos] = other;
            }
        }
        out.push(spelled.into_iter().collect());
    }
    out
}

fn swap(c: char) -> Option<char> {
    LOOKALIKES
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
}
