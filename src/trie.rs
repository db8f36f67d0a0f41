//! Prefix tree over the dictionary.
//!
//! Nodes live in a single arena and refer to each other by index. Besides the
//! usual terminal flag, every node tracks its `height` (the longest chain of
//! descendants below it), from which `max_length`, the longest word that can
//! still be reached through the node, is derived. The search uses that value to
//! abandon prefixes that can never grow into a word of the length it needs.

use crate::error::TrieError;

/// Number of distinct letters a node can branch on.
pub const ALPHABET_SIZE: usize = 26;

/// An identifier for a trie node, based on its index in the arena.
pub type NodeId = usize;

/// The root is always the first node in the arena. Since it can never be a child, its id doubles
/// as the "no child" marker inside `TrieNode::children`.
pub const ROOT: NodeId = 0;

/// Index of a lowercase ASCII letter within a node's children.
#[inline]
pub fn letter_index(letter: u8) -> Option<usize> {
    if letter.is_ascii_lowercase() {
        Some((letter - b'a') as usize)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
struct TrieNode {
    letter: u8,
    parent: u32,
    depth: usize,
    height: usize,
    is_terminal: bool,
    children: [u32; ALPHABET_SIZE],
}

impl TrieNode {
    fn new(letter: u8, parent: NodeId, depth: usize) -> TrieNode {
        TrieNode {
            letter,
            parent: parent as u32,
            depth,
            height: 0,
            is_terminal: false,
            children: [0; ALPHABET_SIZE],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trie {
    nodes: Vec<TrieNode>,
    word_count: usize,
}

impl Default for Trie {
    fn default() -> Self {
        Trie::new()
    }
}

impl Trie {
    pub fn new() -> Trie {
        Trie {
            nodes: vec![TrieNode::new(0, ROOT, 0)],
            word_count: 0,
        }
    }

    /// Build a trie holding every word in the list. Duplicates are harmless.
    pub fn from_words<I, S>(words: I) -> Result<Trie, TrieError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = Trie::new();
        for word in words {
            trie.insert(word.as_ref())?;
        }
        Ok(trie)
    }

    /// Insert a lowercase word, returning the node it ends on.
    pub fn insert(&mut self, word: &str) -> Result<NodeId, TrieError> {
        if word.is_empty() || !word.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(TrieError::InvalidWord(word.to_string()));
        }

        let mut node = ROOT;
        let mut created = false;

        for letter in word.bytes() {
            let idx = (letter - b'a') as usize;
            let child = self.nodes[node].children[idx] as usize;

            node = if child != ROOT {
                child
            } else {
                let id = self.nodes.len();
                let depth = self.nodes[node].depth + 1;
                self.nodes.push(TrieNode::new(letter, node, depth));
                self.nodes[node].children[idx] = id as u32;
                created = true;
                id
            };
        }

        if !self.nodes[node].is_terminal {
            self.nodes[node].is_terminal = true;
            self.word_count += 1;
        }

        // A word that only walked existing nodes can't lengthen any chain.
        if created {
            self.raise_heights(node);
        }

        Ok(node)
    }

    /// Walk upward from a freshly created leaf, raising heights until an ancestor already reaches
    /// at least as deep.
    fn raise_heights(&mut self, leaf: NodeId) {
        let leaf_depth = self.nodes[leaf].depth;
        let mut node = leaf;

        while node != ROOT {
            node = self.nodes[node].parent as usize;
            let height = leaf_depth - self.nodes[node].depth;
            if self.nodes[node].height >= height {
                break;
            }
            self.nodes[node].height = height;
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// The child of `node` reached by `letter`, if any.
    #[inline]
    pub fn child_at(&self, node: NodeId, letter: u8) -> Option<NodeId> {
        let idx = letter_index(letter)?;
        match self.nodes[node].children[idx] as usize {
            ROOT => None,
            child => Some(child),
        }
    }

    #[inline]
    pub fn is_terminal(&self, node: NodeId) -> bool {
        self.nodes[node].is_terminal
    }

    #[inline]
    pub fn letter(&self, node: NodeId) -> Option<char> {
        match node {
            ROOT => None,
            _ => Some(self.nodes[node].letter as char),
        }
    }

    #[inline]
    pub fn depth(&self, node: NodeId) -> usize {
        self.nodes[node].depth
    }

    #[inline]
    pub fn height(&self, node: NodeId) -> usize {
        self.nodes[node].height
    }

    /// Length of the longest word whose path passes through `node`.
    #[inline]
    pub fn max_length(&self, node: NodeId) -> usize {
        self.nodes[node].depth + self.nodes[node].height
    }

    /// Reconstruct the string spelled from the root down to `node`.
    pub fn word_at(&self, node: NodeId) -> String {
        let mut bytes = Vec::with_capacity(self.nodes[node].depth);
        let mut current = node;
        while current != ROOT {
            bytes.push(self.nodes[current].letter);
            current = self.nodes[current].parent as usize;
        }
        bytes.reverse();
        bytes.into_iter().map(char::from).collect()
    }

    /// Follow `word` from the root, returning the node it ends on.
    pub fn find(&self, word: &str) -> Option<NodeId> {
        word.bytes()
            .try_fold(ROOT, |node, letter| self.child_at(node, letter))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.find(word).map_or(false, |node| self.is_terminal(node))
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct words stored.
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// Every stored word, in alphabetical order.
    pub fn words(&self) -> Vec<String> {
        let mut result = Vec::with_capacity(self.word_count);
        let mut stack = vec![ROOT];

        while let Some(node) = stack.pop() {
            if self.nodes[node].is_terminal {
                result.push(self.word_at(node));
            }
            // Push in reverse so 'a' is popped first.
            for &child in self.nodes[node].children.iter().rev() {
                if child as usize != ROOT {
                    stack.push(child as usize);
                }
            }
        }

        result
    }

    /// `result[n]` is the number of stored words of length `n`.
    pub fn length_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.max_length(ROOT) + 1];
        for node in &self.nodes {
            if node.is_terminal {
                counts[node.depth] += 1;
            }
        }
        counts
    }

    /// All words matching `pattern`, where `None` stands for any letter. Results are alphabetical.
    pub fn matching(&self, pattern: &[Option<u8>]) -> Vec<String> {
        let mut result = vec![];
        self.collect_matching(ROOT, pattern, &mut result);
        result
    }

    fn collect_matching(&self, node: NodeId, pattern: &[Option<u8>], result: &mut Vec<String>) {
        let depth = self.nodes[node].depth;
        if depth == pattern.len() {
            if self.nodes[node].is_terminal {
                result.push(self.word_at(node));
            }
            return;
        }

        let mut visit = |child: NodeId| {
            if self.max_length(child) >= pattern.len() {
                self.collect_matching(child, pattern, result);
            }
        };

        match pattern[depth] {
            Some(letter) => {
                if let Some(child) = self.child_at(node, letter) {
                    visit(child);
                }
            }
            None => {
                for &child in &self.nodes[node].children {
                    if child as usize != ROOT {
                        visit(child as usize);
                    }
                }
            }
        }
    }
}
