//! Sensitive-data masking
//!
//! Replaces card-like, email-like and phone-like substrings with sequential
//! placeholder tokens (`CARD_TOKEN_1`, `EMAIL_TOKEN_1`, `PHONE_TOKEN_1`, ...).
//!
//! ## Ordering
//!
//! Patterns run in a fixed order: cards, then emails, then phones. Card and
//! phone patterns overlap on raw digit runs, so cards must be consumed first
//! or a card number would be partially replaced as a phone number.
//!
//! ## Residual Risk
//!
//! This is a heuristic control. Three patterns will not catch every form of
//! personal data (names, addresses, national IDs, unusual number grouping).
//! Treat the pattern set as a placeholder policy: widening it here is not a
//! substitute for a real PII classifier upstream.
//!
//! Masking is not idempotent for chained addresses. The email pattern stops
//! at the first `@...\.tld` it can close, so `a@b.c@d.com` masks to
//! `EMAIL_TOKEN_1@d.com`, and a second pass masks the remainder again.
//! Only the leading part of such a string is hidden on the first pass.

use regex::{Captures, Regex};

/// Kind of sensitive value a token stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskKind {
    /// 13-16 digits, optionally separated by spaces or hyphens.
    Card,
    /// `local@domain.tld`
    Email,
    /// Loosely grouped phone numbers with optional country prefix.
    Phone,
}

impl MaskKind {
    /// Token prefix for this kind.
    pub fn token_prefix(&self) -> &'static str {
        match self {
            MaskKind::Card => "CARD_TOKEN",
            MaskKind::Email => "EMAIL_TOKEN",
            MaskKind::Phone => "PHONE_TOKEN",
        }
    }
}

/// Per-kind replacement counts from one masking call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaskReport {
    pub cards: usize,
    pub emails: usize,
    pub phones: usize,
}

impl MaskReport {
    /// Total replacements.
    pub fn total(&self) -> usize {
        self.cards + self.emails + self.phones
    }

    fn record(&mut self, kind: MaskKind, count: usize) {
        match kind {
            MaskKind::Card => self.cards += count,
            MaskKind::Email => self.emails += count,
            MaskKind::Phone => self.phones += count,
        }
    }
}

struct MaskPattern {
    pattern: Regex,
    kind: MaskKind,
}

/// Pattern-based tokenizer for sensitive substrings.
///
/// Pure and deterministic: the same input always produces the same output,
/// and token numbering restarts at 1 on every call.
pub struct Masker {
    patterns: Vec<MaskPattern>,
}

impl Masker {
    /// Create a masker with the default pattern set.
    pub fn new() -> Self {
        Self {
            patterns: Self::build_patterns(),
        }
    }

    /// Build the ordered pattern list. Order is significant.
    fn build_patterns() -> Vec<MaskPattern> {
        vec![
            MaskPattern {
                pattern: Regex::new(r"\b(?:\d[ -]*?){13,16}\b").unwrap(),
                kind: MaskKind::Card,
            },
            MaskPattern {
                pattern: Regex::new(r"[\w.\-]+@[\w.\-]+\.\w+").unwrap(),
                kind: MaskKind::Email,
            },
            MaskPattern {
                pattern: Regex::new(r"\b\+?\d{1,3}[- ]?\d{3,5}[- ]?\d{4,10}\b").unwrap(),
                kind: MaskKind::Phone,
            },
        ]
    }

    /// Mask sensitive substrings. Empty input is returned unchanged.
    pub fn mask(&self, input: &str) -> String {
        self.mask_with_report(input).0
    }

    /// Mask sensitive substrings and report how many of each kind were
    /// replaced.
    pub fn mask_with_report(&self, input: &str) -> (String, MaskReport) {
        let mut report = MaskReport::default();
        if input.is_empty() {
            return (String::new(), report);
        }

        let mut text = input.to_string();
        for entry in &self.patterns {
            let prefix = entry.kind.token_prefix();
            let mut index = 0usize;
            let replaced = entry.pattern.replace_all(&text, |_: &Captures| {
                index += 1;
                format!("{}_{}", prefix, index)
            });
            if index > 0 {
                text = replaced.into_owned();
                report.record(entry.kind, index);
            }
        }

        (text, report)
    }
}

impl Default for Masker {
    fn default() -> Self {
        Self::new()
    }
}
