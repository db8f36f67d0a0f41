use thiserror::Error;

use crate::SlotId;

/// Errors raised while inserting into a trie.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrieError {
    #[error("word {0:?} is empty or contains characters outside a-z")]
    InvalidWord(String),
}

/// Errors raised while loading a word list.
#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("dictionary token {position} ({word:?}) is not alphabetic")]
    InvalidWord { word: String, position: usize },
    #[error("failed to read dictionary")]
    Io(#[from] std::io::Error),
}

/// Errors raised while parsing a grid template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("grid has no rows")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unexpected character {found:?} at row {row}, column {col}")]
    InvalidCell { row: usize, col: usize, found: char },
}

/// Structural problems in a slot network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("slot {0} has length zero")]
    EmptySlot(SlotId),
    #[error("slot {slot} does not exist")]
    UnknownSlot { slot: SlotId },
    #[error("slot {slot} has no cell {cell}")]
    CellOutOfRange { slot: SlotId, cell: usize },
    #[error("slot {slot} cell {cell} links to itself")]
    SelfLink { slot: SlotId, cell: usize },
    #[error("slot {slot} cell {cell} is already linked")]
    AlreadyLinked { slot: SlotId, cell: usize },
    #[error("link from slot {slot} cell {cell} has no matching link back")]
    AsymmetricLink { slot: SlotId, cell: usize },
    #[error("slot {slot} cell {cell} disagrees with the letter on its linked cell")]
    ConflictingLetters { slot: SlotId, cell: usize },
    #[error("slot {slot} cell {cell} holds {found:?}, which is not a lowercase letter")]
    InvalidLetter {
        slot: SlotId,
        cell: usize,
        found: char,
    },
}

/// Errors raised by `solve` before the search starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("processing order has {found} entries for {expected} slots, or repeats a slot")]
    BadOrder { expected: usize, found: usize },
    #[error("exhaustive ordering is limited to {limit} slots, grid has {slots}")]
    OrderTooLarge { slots: usize, limit: usize },
}
