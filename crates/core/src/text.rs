//! Heuristic cleanup for archive captions.
//!
//! Captions were ingested from several legacy systems and frequently carry
//! mis-decoded UTF-8, agency credit lines and ragged whitespace. Everything
//! here is a total function over `&str`: bad input degrades to a fallback
//! value instead of an error.

use crate::models::Language;
use regex::Regex;
use std::sync::OnceLock;

pub const UNTITLED: &str = "Untitled Image";
pub const NO_DESCRIPTION: &str = "No description available";

const TITLE_WORDS: usize = 6;
const TITLE_MIN_WORD_CHARS: usize = 3;
const DESCRIPTION_MAX_CHARS: usize = 200;
const LANGUAGE_RATIO: f64 = 1.5;

/// Ordered literal substitutions applied by [`clean`]. Multi-character
/// mojibake sequences come before the single-character fallbacks so the
/// longer match wins.
pub const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("\u{e2}\u{20ac}\u{2122}", "'"),
    ("\u{e2}\u{20ac}\u{2dc}", "'"),
    ("\u{e2}\u{20ac}\u{153}", "\""),
    ("\u{e2}\u{20ac}\u{9d}", "\""),
    ("\u{e2}\u{20ac}\u{a6}", "..."),
    ("\u{e2}\u{20ac}\u{201c}", "-"),
    ("\u{e2}\u{20ac}\u{201d}", "-"),
    ("\u{2019}", "'"),
    ("\u{2018}", "'"),
    ("\u{201c}", "\""),
    ("\u{201d}", "\""),
    ("\u{2026}", "..."),
    ("?", "'"),
    ("\u{fffd}", "'"),
];

/// Agencies whose credit lines get appended to captions.
pub const AGENCIES: &[&str] = &[
    "dpa",
    "ap",
    "afp",
    "reuters",
    "imago",
    "getty images",
    "keystone",
    "ullstein bild",
    "epa",
];

fn agency_credit() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            let names = AGENCIES
                .iter()
                .map(|name| regex::escape(name).replace(' ', r"\s+"))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!(
                r"(?i)\s*(?:\x{{c2}}\x{{a9}}|\x{{c2}}|\x{{fffd}})\s*(?:{names})\b.*$"
            ))
            .ok()
        })
        .as_ref()
}

/// Fixes encoding artifacts, drops a trailing agency credit and collapses
/// whitespace.
pub fn clean(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let mut cleaned = match agency_credit() {
        Some(pattern) => pattern.replace(text, "").into_owned(),
        None => text.to_string(),
    };

    for (from, to) in SUBSTITUTIONS {
        if cleaned.contains(from) {
            cleaned = cleaned.replace(from, to);
        }
    }

    normalize_whitespace(&cleaned)
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the cleaned existing title, or one built from the first words
/// of the caption.
pub fn generate_title(existing: Option<&str>, cleaned_text: &str) -> String {
    if let Some(title) = existing.filter(|title| !title.trim().is_empty()) {
        return clean(title);
    }

    let words = cleaned_text
        .split_whitespace()
        .filter(|word| word.chars().count() >= TITLE_MIN_WORD_CHARS)
        .take(TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    if words.is_empty() {
        return UNTITLED.to_string();
    }
    capitalize_first(&words)
}

pub fn generate_description(existing: Option<&str>, cleaned_text: &str) -> String {
    if let Some(description) = existing.filter(|description| !description.trim().is_empty()) {
        return clean(description);
    }

    if cleaned_text.is_empty() {
        return NO_DESCRIPTION.to_string();
    }
    if cleaned_text.chars().count() > DESCRIPTION_MAX_CHARS {
        let truncated: String = cleaned_text.chars().take(DESCRIPTION_MAX_CHARS).collect();
        return format!("{truncated}...");
    }
    cleaned_text.to_string()
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

const GERMAN_STOP_WORDS: &[&str] = &[
    "der", "die", "das", "und", "ist", "nicht", "mit", "auf", "für", "von", "ein", "eine", "im",
    "den", "dem", "zu", "bei", "aus", "nach", "wird", "sich", "auch", "als", "über", "vor", "des",
];

const ENGLISH_STOP_WORDS: &[&str] = &[
    "the", "and", "is", "are", "with", "on", "for", "of", "a", "an", "in", "to", "at", "from",
    "by", "this", "that", "was", "were", "be", "it", "his", "her", "after",
];

/// Coarse German/English guess from stop-word frequency.
pub fn detect_language(text: &str) -> Language {
    if text.trim().is_empty() {
        return Language::Unknown;
    }

    let mut german = 0usize;
    let mut english = 0usize;
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let lowered = word.to_lowercase();
        if GERMAN_STOP_WORDS.contains(&lowered.as_str()) {
            german += 1;
        }
        if ENGLISH_STOP_WORDS.contains(&lowered.as_str()) {
            english += 1;
        }
    }

    if german as f64 > english as f64 * LANGUAGE_RATIO {
        Language::De
    } else if english as f64 > german as f64 * LANGUAGE_RATIO {
        Language::En
    } else {
        Language::Mixed
    }
}

/// Strips characters that could break out of the query structure.
pub fn sanitize_query_text(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '<' | '>' | '{' | '}' | '[' | ']' | '(' | ')'))
        .collect::<String>()
        .trim()
        .to_string()
}
