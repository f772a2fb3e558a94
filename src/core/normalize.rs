//! Text normalizer - canonical token representation of document text
//!
//! Normalization keeps line structure (the field extractor needs it to find
//! section headers) and sentence boundary marks, but strips every other
//! punctuation character and folds case. Tokens are whole words with a small
//! stop-word set removed. There is no stemming.

use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Stop words removed from token bags unless the configuration overrides them
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "being", "but", "by", "for", "from", "if",
    "in", "into", "is", "it", "its", "of", "on", "or", "s", "so", "t", "than", "that", "the",
    "then", "these", "this", "those", "to", "was", "were", "with",
];

/// Canonicalize a single line: NFKC, lower case, punctuation other than
/// sentence boundaries replaced by spaces, whitespace collapsed
pub fn canonical_line(line: &str) -> String {
    let folded: String = line
        .nfkc()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '!' | '?') {
                c
            } else {
                ' '
            }
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Errors raised by normalization
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("input text is empty after normalization")]
    EmptyInput,
}

/// A multiset of normalized tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenBag {
    counts: BTreeMap<String, u32>,
}

impl TokenBag {
    /// Add one occurrence of a token
    pub fn add(&mut self, token: &str) {
        *self.counts.entry(token.to_string()).or_insert(0) += 1;
    }

    /// Occurrences of a token
    pub fn count(&self, token: &str) -> u32 {
        self.counts.get(token).copied().unwrap_or(0)
    }

    /// Number of distinct tokens
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Total number of token occurrences
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate (token, count) pairs in token order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(t, c)| (t.as_str(), *c))
    }
}

impl<'a> FromIterator<&'a str> for TokenBag {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut bag = TokenBag::default();
        for token in iter {
            bag.add(token);
        }
        bag
    }
}

/// Output of [`Normalizer::normalize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    /// Canonical text, one normalized line per non-empty source line
    pub text: String,
    /// Token multiset of `text` with stop words removed
    pub tokens: TokenBag,
}

/// Pure text normalizer parameterized by a stop-word set
#[derive(Debug, Clone)]
pub struct Normalizer {
    stop_words: HashSet<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_WORDS.iter().copied())
    }
}

impl Normalizer {
    /// Create a normalizer with the given stop words (matched case-insensitively)
    pub fn new<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stop_words: stop_words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Whether a (lower-case) token is a stop word
    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    /// Normalize a whole document
    pub fn normalize(&self, raw_text: &str) -> Result<NormalizedText, NormalizeError> {
        let lines: Vec<String> = raw_text
            .lines()
            .map(|line| self.normalize_line(line))
            .filter(|line| line.chars().any(char::is_alphanumeric))
            .collect();

        if lines.is_empty() {
            return Err(NormalizeError::EmptyInput);
        }

        let text = lines.join("\n");
        let tokens = self.tokenize(&text);
        Ok(NormalizedText { text, tokens })
    }

    /// Canonicalize a single line (see [`canonical_line`])
    pub fn normalize_line(&self, line: &str) -> String {
        canonical_line(line)
    }

    /// Split already-normalized text into a token bag
    pub fn tokenize(&self, normalized: &str) -> TokenBag {
        normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty() && !self.is_stop_word(t))
            .collect()
    }

    /// Tokens of arbitrary raw text; empty input yields an empty bag
    pub fn tokens_of(&self, raw_text: &str) -> TokenBag {
        self.normalize(raw_text)
            .map(|n| n.tokens)
            .unwrap_or_default()
    }
}
