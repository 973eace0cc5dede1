// Text normalization — the canonical form every match and cache lookup uses.
//
// Cosmetic evasion ("Ѕ-l-u-u-u-r", "y0u", "s l u r", zero-width splits) is
// undone here so the pattern tables only need to describe plain lowercase
// words. The stages run in a fixed order:
//
//   1. fold:        lowercase, confusables -> ASCII, drop invisible characters,
//                   leetspeak inside words that contain a letter
//   2. separators:  remove punctuation wedged between letters, join runs of
//                   single spaced-out letters
//   3. repeats:     three or more of the same character collapse to one
//   4. whitespace:  trim and collapse whitespace runs to a single space
//
// One pass can expose work for an earlier stage (collapsing "aaa b c d" to
// "a b c d" creates a spaced-out word), so the pipeline is re-run until the
// text stops changing. Every stage only drops characters or maps them onto
// ASCII letters, so this settles after a pass or two, and the result is a
// fixed point by construction: normalizing normalized text is a no-op.

use serde::Serialize;

use super::confusables;

/// Spaced-out words shorter than this are left alone, so chat shorthand like
/// "u r a" keeps its word boundaries.
const MIN_SPACED_LETTERS: usize = 4;

/// Canonical message text. Only `normalize` can construct one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize raw message text. Pure and deterministic.
pub fn normalize(raw: &str) -> NormalizedText {
    let mut current = raw.to_string();
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return NormalizedText(next);
        }
        current = next;
    }
}

fn normalize_pass(text: &str) -> String {
    let folded = fold_leetspeak(&fold_characters(text));
    let joined = join_spaced_letters(&strip_inner_separators(&folded));
    collapse_whitespace(&collapse_repeats(&joined))
}

// --- Stage 1: character folding ---

fn fold_characters(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| !confusables::is_invisible(*c))
        .map(|c| confusables::fold(c).unwrap_or(c))
        .collect()
}

fn is_leet_symbol(c: char) -> bool {
    matches!(c, '@' | '$' | '!' | '|')
}

fn leet_digit(c: char) -> Option<char> {
    match c {
        '0' => Some('o'),
        '1' => Some('i'),
        '3' => Some('e'),
        '4' => Some('a'),
        '5' => Some('s'),
        '7' => Some('t'),
        '8' => Some('b'),
        _ => None,
    }
}

/// Rewrite digits and symbols as letters, but only inside "words" (runs of
/// alphanumerics and leet symbols) that already contain a real letter, so
/// plain numbers like "2024" and prices like "$15" survive.
fn fold_leetspeak(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if !(c.is_alphanumeric() || is_leet_symbol(c)) {
            out.push(c);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && (chars[i].is_alphanumeric() || is_leet_symbol(chars[i])) {
            i += 1;
        }
        let word = &chars[start..i];

        if !word.iter().any(|c| c.is_alphabetic()) {
            out.extend(word);
            continue;
        }

        for (pos, &c) in word.iter().enumerate() {
            let replacement = match c {
                '@' => Some('a'),
                '$' => Some('s'),
                // "sh!t" yes, "hello!" and "wow!!" no
                '!' | '|' => {
                    let before = pos.checked_sub(1).map(|p| word[p]);
                    let after = word.get(pos + 1).copied();
                    match (before, after) {
                        (Some(b), Some(a)) if b.is_alphanumeric() && a.is_alphanumeric() => {
                            Some('i')
                        }
                        _ => None,
                    }
                }
                _ => leet_digit(c),
            };
            out.push(replacement.unwrap_or(c));
        }
    }

    out
}

// --- Stage 2: separators ---

/// Remove punctuation runs (no whitespace) sitting between two letters:
/// "s-l-u-r" -> "slur", "f.u.c.k" -> "fuck", "you're" -> "youre".
fn strip_inner_separators(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let is_separator = !c.is_alphanumeric() && !c.is_whitespace();
        if !is_separator {
            out.push(c);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && !chars[i].is_alphanumeric() && !chars[i].is_whitespace() {
            i += 1;
        }

        let letter_before = start > 0 && chars[start - 1].is_alphabetic();
        let letter_after = i < chars.len() && chars[i].is_alphabetic();
        if !(letter_before && letter_after) {
            out.extend(&chars[start..i]);
        }
    }

    out
}

/// Join runs of single letters separated only by whitespace or punctuation:
/// "s l u r" -> "slur", "f . u . c . k" -> "fuck".
fn join_spaced_letters(text: &str) -> String {
    // Split into alternating (is_word, chunk) segments
    let mut segments: Vec<(bool, String)> = Vec::new();
    for c in text.chars() {
        let is_word = c.is_alphanumeric();
        match segments.last_mut() {
            Some((kind, chunk)) if *kind == is_word => chunk.push(c),
            _ => segments.push((is_word, c.to_string())),
        }
    }

    let is_single_letter = |seg: &(bool, String)| {
        let mut chars = seg.1.chars();
        seg.0 && matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
    };

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < segments.len() {
        if !is_single_letter(&segments[i]) {
            out.push_str(&segments[i].1);
            i += 1;
            continue;
        }

        // Walk letter, gap, letter, gap, ... for as long as the pattern holds
        let mut end = i;
        while end + 2 < segments.len() && is_single_letter(&segments[end + 2]) {
            end += 2;
        }

        // "a" and "i" are words on their own: "you are a s l u r" should
        // leave the article alone when the rest still spells something out
        let letters = (end - i) / 2 + 1;
        if letters > MIN_SPACED_LETTERS && matches!(segments[i].1.as_str(), "a" | "i") {
            out.push_str(&segments[i].1);
            out.push_str(&segments[i + 1].1);
            i += 2;
            continue;
        }

        if letters >= MIN_SPACED_LETTERS {
            for seg in segments[i..=end].iter().step_by(2) {
                out.push_str(&seg.1);
            }
        } else {
            for seg in &segments[i..=end] {
                out.push_str(&seg.1);
            }
        }
        i = end + 1;
    }

    out
}

// --- Stage 3: repeats ---

/// Collapse runs of three or more identical characters to one ("sluuuur" ->
/// "slur", "!!!!" -> "!"). Digits are exempt so "1000" stays a number, and
/// whitespace is left for the final stage.
fn collapse_repeats(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        let exempt = c.is_numeric() || c.is_whitespace();
        if run >= 3 && !exempt {
            out.push(c);
        } else {
            out.extend(std::iter::repeat(c).take(run));
        }
        i += run;
    }

    out
}

// --- Stage 4: whitespace ---

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
