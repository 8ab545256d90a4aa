//! Transcript normalization

use std::fmt;

/// A case-folded word of a transcript containing only letters and digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Splits a raw transcript on whitespace, lowercases each word and strips
/// everything that is not a letter or digit. Words that end up empty are
/// dropped; a word is never split into several tokens.
pub fn normalize(transcript: &str) -> Vec<Token> {
    transcript
        .split_whitespace()
        .filter_map(|word| {
            let cleaned: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            (!cleaned.is_empty()).then_some(Token(cleaned))
        })
        .collect()
}
