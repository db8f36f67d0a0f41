//! The slot network: every across/down entry of a puzzle, the letters currently written into it,
//! and the crossings that tie its cells to cells of other entries.
//!
//! Slots live in one arena and refer to each other by `SlotId`. Once a processing order is chosen,
//! each linked cell is classified as downstream (the neighbor is filled later, so we write onto it
//! and must take the letter back) or upstream (the neighbor was filled earlier, so the letter must
//! survive when we clear ourselves).

use std::fmt::{self, Display, Formatter};

use smallvec::SmallVec;

use crate::error::NetworkError;
use crate::{SlotId, MAX_SLOT_LENGTH};

/// A crossing from one slot's cell to a cell of another slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub slot: SlotId,
    pub cell: usize,
}

/// How a cell relates to its crossing under the current processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellRole {
    /// Not linked to anything.
    #[default]
    Free,
    /// Linked to a slot that is filled later.
    Downstream,
    /// Linked to a slot that is filled earlier.
    Upstream,
}

#[derive(Debug, Clone)]
pub struct Slot {
    id: SlotId,
    cells: SmallVec<[Option<u8>; MAX_SLOT_LENGTH]>,
    links: SmallVec<[Option<Link>; MAX_SLOT_LENGTH]>,
    roles: SmallVec<[CellRole; MAX_SLOT_LENGTH]>,
    /// Cells that already held a letter when the current search started.
    fixed: SmallVec<[bool; MAX_SLOT_LENGTH]>,
    rank: usize,
}

impl Slot {
    fn new(id: SlotId, length: usize) -> Slot {
        Slot {
            id,
            cells: SmallVec::from_elem(None, length),
            links: SmallVec::from_elem(None, length),
            roles: SmallVec::from_elem(CellRole::Free, length),
            fixed: SmallVec::from_elem(false, length),
            rank: 0,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn length(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[Option<u8>] {
        &self.cells
    }

    #[inline]
    pub fn cell(&self, cell: usize) -> Option<u8> {
        self.cells[cell]
    }

    #[inline]
    pub fn is_set(&self, cell: usize) -> bool {
        self.cells[cell].is_some()
    }

    pub fn link(&self, cell: usize) -> Option<Link> {
        self.links[cell]
    }

    pub fn links(&self) -> impl Iterator<Item = (usize, Link)> + '_ {
        self.links
            .iter()
            .enumerate()
            .filter_map(|(cell, link)| link.map(|link| (cell, link)))
    }

    /// Number of cells shared with another slot.
    pub fn num_constrained(&self) -> usize {
        self.links.iter().filter(|link| link.is_some()).count()
    }

    /// Number of cells currently holding a letter.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn role(&self, cell: usize) -> CellRole {
        self.roles[cell]
    }

    /// The slot's letters, if every cell is filled.
    pub fn word(&self) -> Option<String> {
        self.cells.iter().map(|cell| cell.map(char::from)).collect()
    }
}

/// Renders the slot as a pattern, with `.` for unset cells.
impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for cell in &self.cells {
            write!(f, "{}", cell.map_or('.', char::from))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SlotNetwork {
    slots: Vec<Slot>,
}

impl SlotNetwork {
    pub fn new() -> SlotNetwork {
        SlotNetwork::default()
    }

    /// Add an empty slot with the given number of cells.
    pub fn add_slot(&mut self, length: usize) -> SlotId {
        let id = self.slots.len();
        self.slots.push(Slot::new(id, length));
        id
    }

    /// Add a slot from a pattern like `"c.t"`, where `.` is an unset cell.
    pub fn add_pattern(&mut self, pattern: &str) -> Result<SlotId, NetworkError> {
        let id = self.slots.len();
        let mut slot = Slot::new(id, pattern.chars().count());
        for (cell, c) in pattern.chars().enumerate() {
            match c {
                '.' => {}
                'a'..='z' => slot.cells[cell] = Some(c as u8),
                _ => return Err(NetworkError::InvalidLetter { slot: id, cell, found: c }),
            }
        }
        self.slots.push(slot);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id]
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    fn check_cell(&self, slot: SlotId, cell: usize) -> Result<(), NetworkError> {
        let target = self.slots.get(slot).ok_or(NetworkError::UnknownSlot { slot })?;
        if cell >= target.length() {
            return Err(NetworkError::CellOutOfRange { slot, cell });
        }
        Ok(())
    }

    /// Write (or erase) a letter before solving.
    pub fn set_letter(&mut self, slot: SlotId, cell: usize, letter: Option<u8>) -> Result<(), NetworkError> {
        self.check_cell(slot, cell)?;
        if let Some(letter) = letter {
            if !letter.is_ascii_lowercase() {
                return Err(NetworkError::InvalidLetter { slot, cell, found: letter as char });
            }
        }
        self.slots[slot].cells[cell] = letter;
        Ok(())
    }

    /// Declare that cell `a_cell` of slot `a` and cell `b_cell` of slot `b` are the same grid
    /// square. Both directions are recorded.
    pub fn link(&mut self, a: SlotId, a_cell: usize, b: SlotId, b_cell: usize) -> Result<(), NetworkError> {
        self.check_cell(a, a_cell)?;
        self.check_cell(b, b_cell)?;

        if a == b {
            return Err(NetworkError::SelfLink { slot: a, cell: a_cell });
        }
        if self.slots[a].links[a_cell].is_some() {
            return Err(NetworkError::AlreadyLinked { slot: a, cell: a_cell });
        }
        if self.slots[b].links[b_cell].is_some() {
            return Err(NetworkError::AlreadyLinked { slot: b, cell: b_cell });
        }

        self.slots[a].links[a_cell] = Some(Link { slot: b, cell: b_cell });
        self.slots[b].links[b_cell] = Some(Link { slot: a, cell: a_cell });
        Ok(())
    }

    /// Check the structural invariants the search relies on.
    pub fn validate(&self) -> Result<(), NetworkError> {
        for slot in &self.slots {
            if slot.length() == 0 {
                return Err(NetworkError::EmptySlot(slot.id));
            }

            for (cell, link) in slot.links() {
                if link.slot == slot.id {
                    return Err(NetworkError::SelfLink { slot: slot.id, cell });
                }
                self.check_cell(link.slot, link.cell)?;

                let other = &self.slots[link.slot];
                if other.links[link.cell] != Some(Link { slot: slot.id, cell }) {
                    return Err(NetworkError::AsymmetricLink { slot: slot.id, cell });
                }

                if let (Some(ours), Some(theirs)) = (slot.cells[cell], other.cells[link.cell]) {
                    if ours != theirs {
                        return Err(NetworkError::ConflictingLetters { slot: slot.id, cell });
                    }
                }
            }
        }
        Ok(())
    }

    /// A copy of every slot's letters, indexed by slot id.
    pub fn cell_buffers(&self) -> Vec<Vec<Option<u8>>> {
        self.slots.iter().map(|slot| slot.cells.to_vec()).collect()
    }

    /// Assign ranks from a processing order and derive the per-cell roles. A letter present on only
    /// one side of a crossing is copied to the other side, and every letter present at this point
    /// is marked fixed so that clearing never erases it.
    ///
    /// `order` must be a permutation of the slot ids, and the network must have passed `validate`.
    pub(crate) fn prepare(&mut self, order: &[SlotId]) {
        for (rank, &id) in order.iter().enumerate() {
            self.slots[id].rank = rank;
        }

        for id in 0..self.slots.len() {
            for cell in 0..self.slots[id].length() {
                let Some(link) = self.slots[id].links[cell] else {
                    self.slots[id].roles[cell] = CellRole::Free;
                    continue;
                };

                if self.slots[id].cells[cell].is_none() {
                    self.slots[id].cells[cell] = self.slots[link.slot].cells[link.cell];
                }

                self.slots[id].roles[cell] = if self.slots[link.slot].rank > self.slots[id].rank {
                    CellRole::Downstream
                } else {
                    CellRole::Upstream
                };
            }
        }

        for slot in &mut self.slots {
            for (fixed, cell) in slot.fixed.iter_mut().zip(&slot.cells) {
                *fixed = cell.is_some();
            }
        }
    }

    /// Write a confirmed word into a slot and onto its downstream crossings.
    pub(crate) fn commit(&mut self, id: SlotId, word: &[u8]) {
        for (cell, &letter) in word.iter().enumerate() {
            let slot = &mut self.slots[id];
            slot.cells[cell] = Some(letter);

            if let (CellRole::Downstream, Some(link)) = (slot.roles[cell], slot.links[cell]) {
                let other = &mut self.slots[link.slot];
                if !other.fixed[link.cell] {
                    other.cells[link.cell] = Some(letter);
                }
            }
        }
    }

    /// Undo `commit`: take letters back from downstream crossings, then clear the slot except
    /// for cells set by earlier slots or fixed before the search.
    pub(crate) fn retract(&mut self, id: SlotId) {
        for cell in 0..self.slots[id].length() {
            let slot = &mut self.slots[id];
            let role = slot.roles[cell];

            if !slot.fixed[cell] && role != CellRole::Upstream {
                slot.cells[cell] = None;
            }

            if let (CellRole::Downstream, Some(link)) = (role, slot.links[cell]) {
                let other = &mut self.slots[link.slot];
                if !other.fixed[link.cell] {
                    other.cells[link.cell] = None;
                }
            }
        }
    }
}
