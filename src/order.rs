//! Choosing the order in which slots are filled.
//!
//! The heuristic orders rely on a branching table: for a slot of a given length with a given
//! number of letters already known, roughly how many dictionary words still fit. A processing
//! order is rated by walking it and multiplying those estimates together, giving later factors
//! less weight than earlier ones so that tight slots are preferred at the top of the tree.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use bit_set::BitSet;
use itertools::Itertools;
use log::debug;
use smallvec::SmallVec;

use crate::error::SolveError;
use crate::slot::SlotNetwork;
use crate::{SlotId, MAX_SLOT_LENGTH};

/// Refuse exhaustive ordering beyond this many slots; it tries every permutation.
pub const MAX_EXHAUSTIVE_SLOTS: usize = 8;

/// Exponent applied to the running rating after each slot, before rounding it down.
pub const RATING_BIAS: f64 = 1.2;

/// Words longer than this are not expanded into every pattern when building a branching table.
pub const MAX_PATTERN_LENGTH: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchingTable {
    estimates: HashMap<(usize, usize), u64>,
}

impl BranchingTable {
    /// Build the table from a word list. For every word length and every count of known letters,
    /// the estimate is the average number of words matching each distinct pattern of that shape,
    /// rounded down.
    ///
    /// Lengths above `MAX_PATTERN_LENGTH` are estimated as "every word of the length" with no
    /// letters known and a single word otherwise.
    pub fn from_words<I, S>(words: I) -> BranchingTable
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        BranchingTable::build(words, |_| true)
    }

    /// Like `from_words`, but only for words of the given lengths. Every other length estimates
    /// to zero.
    pub fn for_lengths<I, S>(words: I, lengths: &[usize]) -> BranchingTable
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        BranchingTable::build(words, |length| lengths.contains(&length))
    }

    /// A table covering exactly the slot lengths that occur in `network`.
    pub fn for_network<I, S>(words: I, network: &SlotNetwork) -> BranchingTable
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lengths: Vec<usize> = network.slots().iter().map(|slot| slot.length()).unique().collect();
        BranchingTable::for_lengths(words, &lengths)
    }

    fn build<I, S>(words: I, wanted: impl Fn(usize) -> bool) -> BranchingTable
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut by_length: HashMap<usize, HashSet<Vec<u8>>> = HashMap::new();
        for word in words {
            let word = word.as_ref().as_bytes();
            if !word.is_empty() && wanted(word.len()) {
                by_length.entry(word.len()).or_default().insert(word.to_vec());
            }
        }

        let mut estimates = HashMap::new();

        for (&length, words) in &by_length {
            if length > MAX_PATTERN_LENGTH {
                estimates.insert((length, 0), words.len() as u64);
                for set in 1..=length {
                    estimates.insert((length, set), 1);
                }
                continue;
            }

            let mut totals = vec![0u64; length + 1];
            let mut patterns = vec![0u64; length + 1];

            for mask in 0u32..(1 << length) {
                let set = mask.count_ones() as usize;
                let distinct: HashSet<SmallVec<[u8; MAX_SLOT_LENGTH]>> = words
                    .iter()
                    .map(|word| {
                        word.iter()
                            .enumerate()
                            .map(|(i, &letter)| if mask & (1 << i) != 0 { letter } else { 0 })
                            .collect()
                    })
                    .collect();

                totals[set] += words.len() as u64;
                patterns[set] += distinct.len() as u64;
            }

            for set in 0..=length {
                estimates.insert((length, set), totals[set] / patterns[set]);
            }
        }

        BranchingTable { estimates }
    }

    /// Estimated number of words fitting a slot of `length` cells with `set` of them known.
    /// Shapes the dictionary has no words for estimate to zero.
    pub fn estimate(&self, length: usize, set: usize) -> u64 {
        self.estimates.get(&(length, set.min(length))).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }
}

/// Tracks how many letters each slot would have known at the point it is reached, as slots are
/// placed one after another.
struct Walk<'a> {
    network: &'a SlotNetwork,
    placed: BitSet,
    known: Vec<usize>,
}

impl<'a> Walk<'a> {
    fn new(network: &'a SlotNetwork) -> Walk<'a> {
        Walk {
            network,
            placed: BitSet::with_capacity(network.len()),
            known: network.slots().iter().map(|slot| slot.filled_count()).collect(),
        }
    }

    fn estimate(&self, table: &BranchingTable, slot_id: SlotId) -> u64 {
        table.estimate(self.network.slot(slot_id).length(), self.known[slot_id])
    }

    fn place(&mut self, slot_id: SlotId) {
        self.placed.insert(slot_id);
        for (_, link) in self.network.slot(slot_id).links() {
            // Crossings that were already lettered are counted in `known` from the start.
            if !self.placed.contains(link.slot) && !self.network.slot(link.slot).is_set(link.cell) {
                self.known[link.slot] += 1;
            }
        }
    }
}

/// Rate a processing order against a branching table. Lower is better.
pub fn rating(network: &SlotNetwork, order: &[SlotId], table: &BranchingTable) -> f64 {
    let mut walk = Walk::new(network);
    let mut rating = 1.0f64;

    for &slot_id in order {
        rating *= walk.estimate(table, slot_id) as f64;
        rating = rating.powf(RATING_BIAS).trunc();
        walk.place(slot_id);
    }

    rating
}

/// Repeatedly take the unplaced slot with the smallest estimate, preferring slots with more
/// crossings and then lower ids.
pub fn greedy_order(network: &SlotNetwork, table: &BranchingTable) -> Vec<SlotId> {
    let mut walk = Walk::new(network);
    let mut order = Vec::with_capacity(network.len());

    while order.len() < network.len() {
        let Some(next) = (0..network.len())
            .filter(|&slot_id| !walk.placed.contains(slot_id))
            .min_by_key(|&slot_id| {
                (
                    walk.estimate(table, slot_id),
                    Reverse(network.slot(slot_id).num_constrained()),
                    slot_id,
                )
            })
        else {
            break;
        };

        walk.place(next);
        order.push(next);
    }

    order
}

/// Try every permutation and keep the first one with the lowest rating.
pub fn exhaustive_order(network: &SlotNetwork, table: &BranchingTable) -> Result<Vec<SlotId>, SolveError> {
    let slots = network.len();
    if slots > MAX_EXHAUSTIVE_SLOTS {
        return Err(SolveError::OrderTooLarge {
            slots,
            limit: MAX_EXHAUSTIVE_SLOTS,
        });
    }

    let mut best: Option<(f64, Vec<SlotId>)> = None;
    for order in (0..slots).permutations(slots) {
        let candidate = rating(network, &order, table);
        if best.as_ref().map_or(true, |(best_rating, _)| candidate < *best_rating) {
            best = Some((candidate, order));
        }
    }

    Ok(best.map(|(_, order)| order).unwrap_or_default())
}

/// Slots sorted by number of crossings, most first; ties keep id order.
pub fn most_constrained_order(network: &SlotNetwork) -> Vec<SlotId> {
    let mut order: Vec<SlotId> = (0..network.len()).collect();
    order.sort_by_key(|&slot_id| Reverse(network.slot(slot_id).num_constrained()));
    order
}

/// How `solve` picks its processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OrderStrategy {
    /// Slot ids in ascending order.
    #[default]
    AsGiven,
    /// A caller-chosen permutation of the slot ids.
    Explicit(Vec<SlotId>),
    MostConstrained,
    Greedy(BranchingTable),
    Exhaustive(BranchingTable),
}

impl OrderStrategy {
    pub fn determine(&self, network: &SlotNetwork) -> Result<Vec<SlotId>, SolveError> {
        let order = match self {
            OrderStrategy::AsGiven => (0..network.len()).collect(),
            OrderStrategy::Explicit(order) => {
                check_permutation(order, network.len())?;
                order.clone()
            }
            OrderStrategy::MostConstrained => most_constrained_order(network),
            OrderStrategy::Greedy(table) => greedy_order(network, table),
            OrderStrategy::Exhaustive(table) => exhaustive_order(network, table)?,
        };

        if let OrderStrategy::Greedy(table) | OrderStrategy::Exhaustive(table) = self {
            debug!("order {:?} rated {}", order, rating(network, &order, table));
        }

        Ok(order)
    }
}

fn check_permutation(order: &[SlotId], slots: usize) -> Result<(), SolveError> {
    let bad_order = SolveError::BadOrder {
        expected: slots,
        found: order.len(),
    };
    if order.len() != slots {
        return Err(bad_order);
    }

    let mut seen = BitSet::with_capacity(slots);
    for &slot_id in order {
        if slot_id >= slots || !seen.insert(slot_id) {
            return Err(bad_order);
        }
    }
    Ok(())
}
