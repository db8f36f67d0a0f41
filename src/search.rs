//! Backtracking search over a slot network.
//!
//! Slots are taken off a stack in rank order. Each one is matched letter by letter against the
//! trie; a complete match is written into the network, pushed onto downstream crossings, and the
//! rest of the stack is searched before the write is taken back again.

use std::ops::{Deref, DerefMut};

use instant::{Duration, Instant};
use log::{debug, trace};
use smallvec::SmallVec;

use crate::error::SolveError;
use crate::order::OrderStrategy;
use crate::slot::SlotNetwork;
use crate::trie::{NodeId, Trie};
use crate::{SlotId, MAX_SLOT_COUNT};

/// Whether to stop at the first fill or keep going until the search space is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveMode {
    #[default]
    FirstSolution,
    AllSolutions,
}

#[derive(Debug, Clone, Default)]
pub struct SolveConfig {
    pub mode: SolveMode,
    pub order: OrderStrategy,
    /// Give up after this long, keeping whatever complete fills were already found.
    pub deadline: Option<Duration>,
}

impl SolveConfig {
    pub fn all_solutions() -> SolveConfig {
        SolveConfig {
            mode: SolveMode::AllSolutions,
            ..SolveConfig::default()
        }
    }
}

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Number of trie steps taken.
    pub states: u64,
    /// Number of complete words tried in some slot.
    pub candidates: u64,
    /// Number of candidate words that led nowhere.
    pub backtracks: u64,
    pub duration: Duration,
    pub timed_out: bool,
}

/// One complete fill: a word for every slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    words: Vec<String>,
}

impl Solution {
    /// The search collects words from the deepest slot upward, so `raw[0]` belongs to the last slot
    /// in `order`.
    fn from_reverse_order(raw: Vec<String>, order: &[SlotId]) -> Solution {
        let mut words = vec![String::new(); order.len()];
        for (word, &slot_id) in raw.into_iter().zip(order.iter().rev()) {
            words[slot_id] = word;
        }
        Solution { words }
    }

    /// Words indexed by slot id.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn word(&self, slot_id: SlotId) -> &str {
        &self.words[slot_id]
    }

    /// Words listed in the given slot order.
    pub fn in_order(&self, order: &[SlotId]) -> Vec<&str> {
        order.iter().map(|&slot_id| self.word(slot_id)).collect()
    }

    /// Words listed from the last processed slot back to the first, which is the order the search
    /// itself produces them in.
    pub fn in_reverse_processing_order(&self, order: &[SlotId]) -> Vec<&str> {
        order.iter().rev().map(|&slot_id| self.word(slot_id)).collect()
    }
}

/// A struct representing the results of a fill operation.
#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub solutions: Vec<Solution>,
    /// The processing order the search used; `order[rank]` is a slot id.
    pub order: Vec<SlotId>,
    pub statistics: Statistics,
}

/// Words found so far for one partial fill, deepest slot first.
type PartialFill = Vec<String>;

struct Search<'a> {
    trie: &'a Trie,
    network: &'a mut SlotNetwork,
    mode: SolveMode,
    /// Slots still to fill; the next one is on top.
    stack: SmallVec<[SlotId; MAX_SLOT_COUNT]>,
    deadline: Option<Instant>,
    statistics: Statistics,
}

/// Keeps a confirmed word written into the network for as long as it lives, and takes it back
/// when dropped.
struct Committed<'s, 'a> {
    inner: &'s mut Search<'a>,
    slot_id: SlotId,
}

impl<'s, 'a> Committed<'s, 'a> {
    fn new(inner: &'s mut Search<'a>, slot_id: SlotId, word: &[u8]) -> Committed<'s, 'a> {
        inner.network.commit(slot_id, word);
        Committed { inner, slot_id }
    }
}

impl<'a> Deref for Committed<'_, 'a> {
    type Target = Search<'a>;

    fn deref(&self) -> &Search<'a> {
        self.inner
    }
}

impl<'a> DerefMut for Committed<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Search<'a> {
        self.inner
    }
}

impl Drop for Committed<'_, '_> {
    fn drop(&mut self) {
        self.inner.network.retract(self.slot_id);
    }
}

impl Search<'_> {
    fn search(&mut self) -> Vec<PartialFill> {
        let Some(slot_id) = self.stack.pop() else {
            return vec![vec![]];
        };

        let fills = self.match_slot(slot_id, 0, self.trie.root());

        // The stack is shared by every frame, so put the slot back for our caller.
        self.stack.push(slot_id);

        fills
    }

    fn expired(&mut self) -> bool {
        if self.statistics.timed_out {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                debug!("deadline reached after {} states", self.statistics.states);
                self.statistics.timed_out = true;
                return true;
            }
        }
        false
    }

    /// The child of `node` for `letter`, unless no word of `length` letters passes through it.
    #[inline]
    fn viable_child(&self, node: NodeId, letter: u8, length: usize) -> Option<NodeId> {
        self.trie
            .child_at(node, letter)
            .filter(|&child| self.trie.max_length(child) >= length)
    }

    fn match_slot(&mut self, slot_id: SlotId, pos: usize, node: NodeId) -> Vec<PartialFill> {
        self.statistics.states += 1;
        if self.expired() {
            return vec![];
        }

        let slot = self.network.slot(slot_id);
        let length = slot.length();

        if pos == length {
            return self.confirm(slot_id, node);
        }

        match slot.cell(pos) {
            Some(letter) => match self.viable_child(node, letter, length) {
                Some(child) => self.match_slot(slot_id, pos + 1, child),
                None => vec![],
            },
            None => {
                let mut fills = vec![];
                for letter in b'a'..=b'z' {
                    let Some(child) = self.viable_child(node, letter, length) else {
                        continue;
                    };

                    let found = self.match_slot(slot_id, pos + 1, child);
                    if !found.is_empty() {
                        fills.extend(found);
                        if self.mode == SolveMode::FirstSolution {
                            break;
                        }
                    }
                }
                fills
            }
        }
    }

    /// The whole slot matched a path in the trie. If that path spells a word, try the rest of the
    /// grid with it in place.
    fn confirm(&mut self, slot_id: SlotId, node: NodeId) -> Vec<PartialFill> {
        if !self.trie.is_terminal(node) {
            return vec![];
        }

        let word = self.trie.word_at(node);
        self.statistics.candidates += 1;
        trace!("slot {} <- {}", slot_id, word);

        let mut fills = Committed::new(self, slot_id, word.as_bytes()).search();

        if fills.is_empty() {
            self.statistics.backtracks += 1;
        }
        for fill in &mut fills {
            fill.push(word.clone());
        }
        fills
    }
}

/// Fill every slot of the network with words from the trie.
///
/// The network's letters are back to their starting state when this returns, apart from
/// crossings that were given a letter on one side only, which get the letter on both sides.
pub fn solve(network: &mut SlotNetwork, trie: &Trie, config: &SolveConfig) -> Result<FillOutcome, SolveError> {
    let start = Instant::now();

    network.validate()?;
    let order = config.order.determine(network)?;
    network.prepare(&order);

    debug!(
        "solving {} slots against {} words ({:?}, order {:?})",
        network.len(),
        trie.word_count(),
        config.mode,
        order
    );

    let mut search = Search {
        trie,
        network,
        mode: config.mode,
        stack: order.iter().rev().copied().collect(),
        deadline: config.deadline.map(|deadline| start + deadline),
        statistics: Statistics::default(),
    };

    let fills = search.search();

    let mut statistics = search.statistics;
    statistics.duration = start.elapsed();

    debug!("found {} solutions: {:?}", fills.len(), statistics);

    let solutions = fills
        .into_iter()
        .map(|raw| Solution::from_reverse_order(raw, &order))
        .collect();

    Ok(FillOutcome {
        solutions,
        order,
        statistics,
    })
}

#[cfg(test)]
mod tests {
    use instant::Duration;

    use crate::error::SolveError;
    use crate::order::OrderStrategy;
    use crate::slot::SlotNetwork;
    use crate::trie::Trie;

    use super::{solve, Solution, SolveConfig, SolveMode};

    const CHAIN_WORDS: &[&str] = &[
        "able", "also", "bird", "act", "add", "bet", "other", "stone", "apple", "after", "these",
        "tiger", "a", "in", "on",
    ];

    /// Lengths 4, 3, 5 with 0[0]-1[0] and 1[2]-2[1].
    fn chain() -> SlotNetwork {
        let mut network = SlotNetwork::new();
        let a = network.add_slot(4);
        let b = network.add_slot(3);
        let c = network.add_slot(5);
        network.link(a, 0, b, 0).unwrap();
        network.link(b, 2, c, 1).unwrap();
        network
    }

    /// Four slots around the edge of a square, clockwise from the top.
    fn ring(length: usize) -> SlotNetwork {
        let last = length - 1;
        let mut network = SlotNetwork::new();
        let top = network.add_slot(length);
        let right = network.add_slot(length);
        let bottom = network.add_slot(length);
        let left = network.add_slot(length);
        network.link(top, 0, left, 0).unwrap();
        network.link(top, last, right, 0).unwrap();
        network.link(right, last, bottom, last).unwrap();
        network.link(bottom, 0, left, last).unwrap();
        network
    }

    fn assert_valid(network: &SlotNetwork, trie: &Trie, solution: &Solution) {
        assert_eq!(solution.words().len(), network.len());

        for slot in network.slots() {
            let word = solution.word(slot.id());
            assert_eq!(word.len(), slot.length(), "slot {} got {:?}", slot.id(), word);
            assert!(trie.contains(word), "{:?} is not in the dictionary", word);

            for (cell, &letter) in slot.cells().iter().enumerate() {
                if let Some(letter) = letter {
                    assert_eq!(word.as_bytes()[cell], letter);
                }
            }

            for (cell, link) in slot.links() {
                let other = solution.word(link.slot);
                assert_eq!(word.as_bytes()[cell], other.as_bytes()[link.cell]);
            }
        }
    }

    /// Every assignment of dictionary words to slots that agrees on all crossings and pre-filled
    /// letters, in no particular order.
    fn brute_force(network: &SlotNetwork, words: &[&str]) -> Vec<Vec<String>> {
        fn extend(network: &SlotNetwork, words: &[&str], partial: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
            let id = partial.len();
            if id == network.len() {
                out.push(partial.clone());
                return;
            }
            let slot = network.slot(id);
            for word in words.iter().filter(|word| word.len() == slot.length()) {
                let bytes = word.as_bytes();
                let fits_letters = slot
                    .cells()
                    .iter()
                    .enumerate()
                    .all(|(cell, letter)| letter.map_or(true, |letter| bytes[cell] == letter));
                let fits_links = slot.links().all(|(cell, link)| {
                    link.slot > id || partial[link.slot].as_bytes()[link.cell] == bytes[cell]
                });
                if fits_letters && fits_links {
                    partial.push(word.to_string());
                    extend(network, words, partial, out);
                    partial.pop();
                }
            }
        }

        let mut out = vec![];
        extend(network, words, &mut vec![], &mut out);
        out
    }

    #[test]
    fn test_independent_slots() {
        let trie = Trie::from_words(["act", "a", "at", "acts", "actor"]).unwrap();
        let mut network = SlotNetwork::new();
        network.add_slot(3);
        network.add_slot(3);

        let outcome = solve(&mut network, &trie, &SolveConfig::all_solutions()).unwrap();

        assert_eq!(outcome.solutions.len(), 1);
        assert_eq!(outcome.solutions[0].words(), &["act", "act"]);
    }

    #[test]
    fn test_three_by_three_ring() {
        let trie = Trie::from_words(["ba", "abad", "aba", "adb"]).unwrap();
        let mut network = ring(3);

        let outcome = solve(&mut network, &trie, &SolveConfig::all_solutions()).unwrap();
        let solutions: Vec<&[String]> = outcome.solutions.iter().map(|s| s.words()).collect();

        assert_eq!(
            solutions,
            vec![
                &["aba", "aba", "aba", "aba"][..],
                &["aba", "adb", "adb", "aba"][..],
            ]
        );
        for solution in &outcome.solutions {
            assert_valid(&network, &trie, solution);
        }

        let first = solve(&mut network, &trie, &SolveConfig::default()).unwrap();
        assert_eq!(first.solutions, outcome.solutions[..1]);
    }

    #[test]
    fn test_two_by_two_ring() {
        let trie = Trie::from_words(["am", "me", "mad", "a"]).unwrap();
        let mut network = ring(2);

        let outcome = solve(&mut network, &trie, &SolveConfig::all_solutions()).unwrap();

        assert_eq!(outcome.solutions.len(), 1);
        assert_eq!(
            outcome.solutions[0].in_reverse_processing_order(&outcome.order),
            vec!["am", "me", "me", "am"]
        );
    }

    #[test]
    fn test_chain_first_solution() {
        let trie = Trie::from_words(CHAIN_WORDS).unwrap();
        let mut network = chain();

        let outcome = solve(&mut network, &trie, &SolveConfig::default()).unwrap();

        assert_eq!(outcome.order, vec![0, 1, 2]);
        assert_eq!(outcome.solutions.len(), 1);
        let solution = &outcome.solutions[0];
        assert_eq!(solution.in_reverse_processing_order(&outcome.order), vec!["other", "act", "able"]);
        assert_eq!(solution.in_order(&outcome.order), vec!["able", "act", "other"]);
        assert_valid(&network, &trie, solution);
    }

    #[test]
    fn test_chain_all_solutions_match_brute_force() {
        let trie = Trie::from_words(CHAIN_WORDS).unwrap();
        let mut network = chain();

        let outcome = solve(&mut network, &trie, &SolveConfig::all_solutions()).unwrap();

        let mut found: Vec<Vec<String>> = outcome.solutions.iter().map(|s| s.words().to_vec()).collect();
        let mut expected = brute_force(&network, CHAIN_WORDS);
        found.sort();
        expected.sort();
        assert_eq!(found.len(), 6);
        assert_eq!(found, expected);
    }

    #[test]
    fn test_solutions_are_alphabetical_in_exhaustive_mode() {
        let trie = Trie::from_words(CHAIN_WORDS).unwrap();
        let mut network = chain();

        let outcome = solve(&mut network, &trie, &SolveConfig::all_solutions()).unwrap();
        let keys: Vec<Vec<&str>> = outcome.solutions.iter().map(|s| s.in_order(&outcome.order)).collect();
        let mut sorted = keys.clone();
        sorted.sort();

        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_every_processing_order_finds_the_same_fills() {
        let trie = Trie::from_words(CHAIN_WORDS).unwrap();
        let mut expected = brute_force(&chain(), CHAIN_WORDS);
        expected.sort();

        for order in [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]] {
            let mut network = chain();
            let config = SolveConfig {
                order: OrderStrategy::Explicit(order.to_vec()),
                ..SolveConfig::all_solutions()
            };

            let outcome = solve(&mut network, &trie, &config).unwrap();
            let mut found: Vec<Vec<String>> = outcome.solutions.iter().map(|s| s.words().to_vec()).collect();
            found.sort();

            assert_eq!(outcome.order, order.to_vec());
            assert_eq!(found, expected, "order {:?}", order);
        }
    }

    #[test]
    fn test_prefilled_letters_constrain_and_survive() {
        let trie = Trie::from_words(CHAIN_WORDS).unwrap();
        let mut network = chain();
        network.set_letter(2, 4, Some(b'e')).unwrap();
        let before = network.cell_buffers();

        let outcome = solve(&mut network, &trie, &SolveConfig::all_solutions()).unwrap();

        assert_eq!(outcome.solutions.len(), 3);
        for solution in &outcome.solutions {
            assert_eq!(solution.word(2), "stone");
            assert_valid(&network, &trie, solution);
        }
        assert_eq!(network.cell_buffers(), before);
    }

    #[test]
    fn test_buffers_restored_after_solve() {
        let trie = Trie::from_words(CHAIN_WORDS).unwrap();

        for config in [SolveConfig::default(), SolveConfig::all_solutions()] {
            let mut network = chain();
            let before = network.cell_buffers();
            solve(&mut network, &trie, &config).unwrap();
            assert_eq!(network.cell_buffers(), before);
        }

        let trie = Trie::from_words(["zzz"]).unwrap();
        let mut network = chain();
        let before = network.cell_buffers();
        let outcome = solve(&mut network, &trie, &SolveConfig::default()).unwrap();
        assert!(outcome.solutions.is_empty());
        assert_eq!(network.cell_buffers(), before);
    }

    #[test]
    fn test_single_mode_never_returns_more_than_exhaustive() {
        let trie = Trie::from_words(CHAIN_WORDS).unwrap();

        for words in [&CHAIN_WORDS[..], &["able", "act"][..]] {
            let trie_for_case = Trie::from_words(words).unwrap();
            let mut network = chain();
            let single = solve(&mut network, &trie_for_case, &SolveConfig::default()).unwrap();
            let all = solve(&mut network, &trie_for_case, &SolveConfig::all_solutions()).unwrap();

            assert!(single.solutions.len() <= 1);
            assert!(all.solutions.len() >= single.solutions.len());
            if let Some(first) = single.solutions.first() {
                assert_eq!(first, &all.solutions[0]);
            }
        }

        // Dropping the first slot word of the first fill removes exactly the fills that used it.
        let mut network = chain();
        let all = solve(&mut network, &trie, &SolveConfig::all_solutions()).unwrap();
        let first_word = all.solutions[0].word(0).to_string();
        let remaining: Vec<&str> = CHAIN_WORDS.iter().copied().filter(|w| *w != first_word).collect();
        let reduced_trie = Trie::from_words(&remaining).unwrap();
        let reduced = solve(&mut network, &reduced_trie, &SolveConfig::all_solutions()).unwrap();
        let using_first = all.solutions.iter().filter(|s| s.words().contains(&first_word)).count();
        assert_eq!(reduced.solutions.len(), all.solutions.len() - using_first);
    }

    #[test]
    fn test_unsolvable_is_empty_not_error() {
        let trie = Trie::from_words(["cat", "dog"]).unwrap();
        let mut network = SlotNetwork::new();
        network.add_slot(4);

        let outcome = solve(&mut network, &trie, &SolveConfig::all_solutions()).unwrap();

        assert!(outcome.solutions.is_empty());
        assert_eq!(outcome.statistics.candidates, 0);
    }

    #[test]
    fn test_pruning_skips_short_branches() {
        // Every path through 'b' is too short for a four-letter slot.
        let trie = Trie::from_words(["be", "bee", "dove"]).unwrap();
        let mut network = SlotNetwork::new();
        network.add_slot(4);

        let outcome = solve(&mut network, &trie, &SolveConfig::default()).unwrap();

        assert_eq!(outcome.solutions[0].words(), &["dove"]);
        // Root, then d-o-v-e, then the terminal check.
        assert_eq!(outcome.statistics.states, 5);
        assert_eq!(outcome.statistics.candidates, 1);
        assert_eq!(outcome.statistics.backtracks, 0);
    }

    #[test]
    fn test_invalid_network_is_rejected() {
        let trie = Trie::from_words(["cat"]).unwrap();
        let mut network = SlotNetwork::new();
        network.add_slot(0);

        assert!(matches!(
            solve(&mut network, &trie, &SolveConfig::default()),
            Err(SolveError::Network(_))
        ));
    }

    #[test]
    fn test_deadline() {
        let trie = Trie::from_words(CHAIN_WORDS).unwrap();
        let mut network = chain();
        let before = network.cell_buffers();
        let config = SolveConfig {
            mode: SolveMode::AllSolutions,
            deadline: Some(Duration::ZERO),
            ..SolveConfig::default()
        };

        let outcome = solve(&mut network, &trie, &config).unwrap();

        assert!(outcome.statistics.timed_out);
        assert!(outcome.solutions.is_empty());
        assert_eq!(network.cell_buffers(), before);
    }

    #[test]
    fn test_empty_network_has_one_empty_solution() {
        let trie = Trie::from_words(["cat"]).unwrap();
        let mut network = SlotNetwork::new();

        let outcome = solve(&mut network, &trie, &SolveConfig::default()).unwrap();

        assert_eq!(outcome.solutions.len(), 1);
        assert!(outcome.solutions[0].words().is_empty());
    }
}
