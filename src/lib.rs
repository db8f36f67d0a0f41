use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

pub mod dictionary;
pub mod error;
pub mod order;
pub mod search;
pub mod slot;
pub mod trie;

pub use error::{DictionaryError, GridError, NetworkError, SolveError, TrieError};
pub use order::{BranchingTable, OrderStrategy};
pub use search::{solve, FillOutcome, Solution, SolveConfig, SolveMode, Statistics};
pub use slot::SlotNetwork;
pub use trie::Trie;

/// The expected maximum number of slots appearing in a grid.
pub const MAX_SLOT_COUNT: usize = 256;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

/// An identifier for a given slot, based on its index in the `SlotNetwork`, which also corresponds
/// to an index in a `Solution`'s words.
pub type SlotId = usize;

/// Zero-indexed x and y coords for a cell in the grid, where y = 0 in the top row.
pub type GridCoord = (usize, usize);

/// Direction that a slot is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Across,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Blocked,
    Empty,
    Letter(u8),
}

impl Cell {
    fn is_open(self) -> bool {
        self != Cell::Blocked
    }

    fn letter(self) -> Option<u8> {
        match self {
            Cell::Letter(letter) => Some(letter),
            _ => None,
        }
    }
}

/// A rectangular crossword grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// A grid with every cell empty.
    pub fn new(width: usize, height: usize) -> Grid {
        Grid {
            width,
            height,
            cells: vec![Cell::Empty; width * height],
        }
    }

    /// Parse a template, with . representing empty cells, # representing blocks, and letters
    /// representing themselves. Lines are trimmed and blank lines skipped.
    pub fn parse(template: &str) -> Result<Grid, GridError> {
        let rows: Vec<&str> = template.lines().map(str::trim).filter(|line| !line.is_empty()).collect();

        let width = rows.first().ok_or(GridError::Empty)?.chars().count();
        let mut cells = Vec::with_capacity(width * rows.len());

        for (row, line) in rows.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(GridError::RaggedRow {
                    row,
                    expected: width,
                    found,
                });
            }

            for (col, c) in line.chars().enumerate() {
                cells.push(match c {
                    '#' => Cell::Blocked,
                    '.' => Cell::Empty,
                    c if c.is_ascii_alphabetic() => Cell::Letter(c.to_ascii_lowercase() as u8),
                    found => return Err(GridError::InvalidCell { row, col, found }),
                });
            }
        }

        Ok(Grid {
            width,
            height: rows.len(),
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, (x, y): GridCoord) -> Cell {
        self.cells[y * self.width + x]
    }

    pub fn set(&mut self, (x, y): GridCoord, cell: Cell) {
        self.cells[y * self.width + x] = cell;
    }

    fn is_open(&self, (x, y): GridCoord) -> bool {
        x < self.width && y < self.height && self.get((x, y)).is_open()
    }

    /// Whether a run of at least two open cells starts at `loc` going in `direction`.
    fn starts_slot(&self, loc: GridCoord, direction: Direction) -> bool {
        let (x, y) = loc;
        let (before, after) = match direction {
            Direction::Across => (x.checked_sub(1).map(|x| (x, y)), (x + 1, y)),
            Direction::Down => (y.checked_sub(1).map(|y| (x, y)), (x, y + 1)),
        };

        self.is_open(loc) && !before.map_or(false, |before| self.is_open(before)) && self.is_open(after)
    }

    /// Clue numbers in row-major order: each cell that starts an across or down slot gets the next
    /// number.
    pub fn numbering(&self) -> Vec<Option<usize>> {
        let mut next = 1;
        let mut numbers = Vec::with_capacity(self.cells.len());

        for y in 0..self.height {
            for x in 0..self.width {
                if self.starts_slot((x, y), Direction::Across) || self.starts_slot((x, y), Direction::Down) {
                    numbers.push(Some(next));
                    next += 1;
                } else {
                    numbers.push(None);
                }
            }
        }

        numbers
    }

    /// The template form of the grid, which `parse` reads back.
    pub fn to_template(&self) -> String {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| row.iter().map(|&cell| cell_char(cell, '.')).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn cell_char(cell: Cell, empty: char) -> char {
    match cell {
        Cell::Blocked => '#',
        Cell::Empty => empty,
        Cell::Letter(letter) => char::from(letter),
    }
}

impl FromStr for Grid {
    type Err = GridError;

    fn from_str(template: &str) -> Result<Grid, GridError> {
        Grid::parse(template)
    }
}

/// Draws the grid inside a `-`/`|` border, with empty cells left blank.
impl Display for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let edge = "-".repeat(self.width + 2);
        writeln!(f, "{}", edge)?;
        for y in 0..self.height {
            write!(f, "|")?;
            for x in 0..self.width {
                write!(f, "{}", cell_char(self.get((x, y)), ' '))?;
            }
            writeln!(f, "|")?;
        }
        write!(f, "{}", edge)
    }
}

/// Where a slot sits in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub start: GridCoord,
    pub direction: Direction,
    pub length: usize,
    /// The clue number of the start cell.
    pub number: usize,
}

impl Placement {
    /// Generate the coords for each cell of this slot.
    pub fn cell_coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.length).map(|cell| match self.direction {
            Direction::Across => (self.start.0 + cell, self.start.1),
            Direction::Down => (self.start.0, self.start.1 + cell),
        })
    }
}

impl Display for Placement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.number, self.direction)
    }
}

/// Find every slot of the grid: across slots row by row, then down slots column by column.
pub fn find_placements(grid: &Grid) -> Vec<Placement> {
    let numbers = grid.numbering();
    let number_at = |(x, y): GridCoord| numbers[y * grid.width() + x].unwrap_or(0);

    let mut placements = vec![];

    for (direction, outer, inner) in [
        (Direction::Across, grid.height(), grid.width()),
        (Direction::Down, grid.width(), grid.height()),
    ] {
        let coord = |line: usize, step: usize| match direction {
            Direction::Across => (step, line),
            Direction::Down => (line, step),
        };

        for line in 0..outer {
            for step in 0..inner {
                let start = coord(line, step);
                if !grid.starts_slot(start, direction) {
                    continue;
                }

                let length = (step..inner).take_while(|&s| grid.is_open(coord(line, s))).count();
                placements.push(Placement {
                    start,
                    direction,
                    length,
                    number: number_at(start),
                });
            }
        }
    }

    placements
}

/// Build the slot network for a grid: one slot per placement, crossings linked, and pre-filled
/// letters copied into the slots.
pub fn build_network(grid: &Grid) -> Result<(SlotNetwork, Vec<Placement>), NetworkError> {
    let placements = find_placements(grid);
    let mut network = SlotNetwork::new();

    // Build a map from cell location to slots involved, which we can then use to link crossings.
    let mut slots_by_loc: HashMap<GridCoord, Vec<(SlotId, usize)>> = HashMap::new();

    for placement in &placements {
        let slot_id = network.add_slot(placement.length);

        for (cell, loc) in placement.cell_coords().enumerate() {
            if let Some(letter) = grid.get(loc).letter() {
                network.set_letter(slot_id, cell, Some(letter))?;
            }
            slots_by_loc.entry(loc).or_default().push((slot_id, cell));
        }
    }

    let mut crossings: Vec<_> = slots_by_loc.into_values().filter(|slots| slots.len() == 2).collect();
    crossings.sort();
    for crossing in crossings {
        let [(a, a_cell), (b, b_cell)] = crossing[..] else {
            continue;
        };
        network.link(a, a_cell, b, b_cell)?;
    }

    Ok((network, placements))
}

/// Write a solution's words into a copy of the grid, pairing placements and words in order.
/// Placements without a word and cells outside the grid are left out.
pub fn render_grid(grid: &Grid, placements: &[Placement], solution: &Solution) -> Grid {
    let mut rendered = grid.clone();

    for (placement, word) in placements.iter().zip(solution.words()) {
        for (loc, letter) in placement.cell_coords().zip(word.bytes()) {
            if loc.0 >= rendered.width() || loc.1 >= rendered.height() {
                break;
            }
            rendered.set(loc, Cell::Letter(letter));
        }
    }

    rendered
}

/// A parsed grid together with its slots, ready to solve.
#[derive(Debug, Clone)]
pub struct GridConfig {
    pub grid: Grid,
    pub placements: Vec<Placement>,
    pub network: SlotNetwork,
}

impl GridConfig {
    pub fn new(grid: Grid) -> Result<GridConfig, NetworkError> {
        let (network, placements) = build_network(&grid)?;
        Ok(GridConfig {
            grid,
            placements,
            network,
        })
    }

    pub fn solve(&mut self, trie: &Trie, config: &SolveConfig) -> Result<FillOutcome, SolveError> {
        solve(&mut self.network, trie, config)
    }

    pub fn render(&self, solution: &Solution) -> Grid {
        render_grid(&self.grid, &self.placements, solution)
    }
}
