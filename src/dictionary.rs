//! Reading word lists.
//!
//! A word list is whitespace-separated tokens. Tokens are lowercased; anything that is not purely
//! ASCII letters is either an error or skipped, depending on the loader.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::error::DictionaryError;

fn is_word(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Parse a word list, failing on the first token that is not a word. Order and duplicates are
/// kept.
pub fn parse_words(text: &str) -> Result<Vec<String>, DictionaryError> {
    text.split_whitespace()
        .enumerate()
        .map(|(position, token)| {
            if is_word(token) {
                Ok(token.to_ascii_lowercase())
            } else {
                Err(DictionaryError::InvalidWord {
                    word: token.to_string(),
                    position,
                })
            }
        })
        .collect()
}

/// Parse a word list, skipping tokens that are not words. The result is sorted and deduplicated.
pub fn parse_words_lenient(text: &str) -> Vec<String> {
    let mut skipped = 0;
    let words: BTreeSet<String> = text
        .split_whitespace()
        .filter(|token| {
            let keep = is_word(token);
            if !keep {
                skipped += 1;
            }
            keep
        })
        .map(|token| token.to_ascii_lowercase())
        .collect();

    if skipped > 0 {
        warn!("skipped {} tokens that are not words", skipped);
    }
    words.into_iter().collect()
}

/// Read and strictly parse a word list file.
pub fn load_dictionary(path: impl AsRef<Path>) -> Result<Vec<String>, DictionaryError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let words = parse_words(&text)?;
    debug!("loaded {} words from {}", words.len(), path.display());
    Ok(words)
}
