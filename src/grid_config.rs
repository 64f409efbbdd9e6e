//! The static description of a grid: which cells are open, which slots they form, where those
//! slots cross, and which words are available to fill them. Nothing here changes while filling.

use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bit_set::BitSet;
use log::info;
use smallvec::{smallvec, SmallVec};

use crate::{GridCoord, SlotId, WordId, MAX_NEIGHBOR_COUNT, MAX_SLOT_LENGTH};

/// Character marking an open cell in a structure file.
pub const OPEN_CELL: char = '_';

/// Character marking a blocked cell in a structure file.
pub const BLOCKED_CELL: char = '#';

/// Direction that a slot is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Across,
    Down,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Across => write!(f, "across"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A struct representing a word that can be chosen for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub string: String,
    pub glyphs: SmallVec<[char; MAX_SLOT_LENGTH]>,
}

impl Word {
    fn new(string: String) -> Word {
        let glyphs = string.chars().collect();
        Word { string, glyphs }
    }

    /// Length in characters, which is what slot lengths are measured in.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// A crossing between one slot and another, referencing the other slot's id and the location of
/// the shared cell within each slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub cell: usize,
    pub other_slot_id: SlotId,
    pub other_slot_cell: usize,
}

/// A maximal run of open cells in one direction. Slots are identified by their start cell and
/// direction; `id` is the dense index used everywhere else in the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub id: SlotId,
    pub start_cell: GridCoord,
    pub direction: Direction,
    pub length: usize,

    /// Crossings ordered by cell index. A cell is shared by at most one other slot, so each
    /// neighboring slot appears exactly once.
    pub crossings: SmallVec<[Crossing; MAX_NEIGHBOR_COUNT]>,
}

impl Slot {
    /// Generate the coords for each cell of this slot.
    pub fn cell_coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        let (row, col) = self.start_cell;
        (0..self.length).map(move |cell_idx| match self.direction {
            Direction::Across => (row, col + cell_idx),
            Direction::Down => (row + cell_idx, col),
        })
    }

    /// The number of slots crossing this one.
    pub fn degree(&self) -> usize {
        self.crossings.len()
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) {} [{}]",
            self.start_cell.0, self.start_cell.1, self.direction, self.length
        )
    }
}

/// Reasons a structure or word list can't be turned into a `GridConfig`.
#[derive(Debug)]
pub enum GridConfigError {
    Io { path: PathBuf, source: io::Error },
    EmptyStructure,
    InvalidCell { row: usize, col: usize, found: char },
}

impl Display for GridConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GridConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            GridConfigError::EmptyStructure => write!(f, "structure contains no cells"),
            GridConfigError::InvalidCell { row, col, found } => write!(
                f,
                "invalid cell {:?} at row {}, column {} (expected '{}' or '{}')",
                found, row, col, OPEN_CELL, BLOCKED_CELL
            ),
        }
    }
}

impl Error for GridConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GridConfigError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A struct representing the aspects of a grid that are static during filling.
pub struct GridConfig {
    width: usize,
    height: usize,

    /// Indexed by row, then column; `true` for open cells.
    structure: Vec<Vec<bool>>,

    slots: Vec<Slot>,

    /// The deduplicated, upper-cased vocabulary in sorted order, so that word ids (and hence the
    /// order in which the search tries words) don't depend on the order of the input file.
    words: Vec<Word>,
}

impl Debug for GridConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridConfig")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("slots", &self.slots)
            .field("words", &format!("({} entries)", self.words.len()))
            .finish()
    }
}

impl GridConfig {
    /// Build a config from an open/blocked cell matrix and a list of words. Rows may be ragged;
    /// missing cells are treated as blocked.
    pub fn from_parts<W, S>(structure: Vec<Vec<bool>>, words: W) -> GridConfig
    where
        W: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let height = structure.len();
        let width = structure.iter().map(|row| row.len()).max().unwrap_or(0);
        let structure: Vec<Vec<bool>> = structure
            .into_iter()
            .map(|mut row| {
                row.resize(width, false);
                row
            })
            .collect();

        let words: BTreeSet<String> = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_uppercase())
            .filter(|word| !word.is_empty())
            .collect();

        let mut config = GridConfig {
            width,
            height,
            structure,
            slots: vec![],
            words: words.into_iter().map(Word::new).collect(),
        };
        config.slots = config.build_slots();

        info!(
            "Built {}x{} grid with {} slots and {} words",
            config.width,
            config.height,
            config.slots.len(),
            config.words.len()
        );

        config
    }

    /// Parse a structure template and a newline-separated word list. In the template, `_` marks an
    /// open cell and `#` a blocked one. Leading and trailing blank lines and the template's common
    /// indentation are ignored; any other whitespace inside the grid is an invalid cell.
    pub fn from_strings(structure: &str, words: &str) -> Result<GridConfig, GridConfigError> {
        let structure = parse_structure(structure)?;
        Ok(GridConfig::from_parts(structure, words.lines()))
    }

    /// Read and parse a structure file and a word list file.
    pub fn from_files<P, Q>(structure_path: P, words_path: Q) -> Result<GridConfig, GridConfigError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let structure = read_file(structure_path.as_ref())?;
        let words = read_file(words_path.as_ref())?;
        GridConfig::from_strings(&structure, &words)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Is the given cell open? Cells outside the grid count as blocked.
    pub fn is_open(&self, row: usize, col: usize) -> bool {
        self.structure
            .get(row)
            .and_then(|cells| cells.get(col))
            .copied()
            .unwrap_or(false)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, slot_id: SlotId) -> &Slot {
        self.slots
            .get(slot_id)
            .unwrap_or_else(|| panic!("Unknown slot id {}", slot_id))
    }

    /// The ids of every slot sharing a cell with the given slot.
    pub fn neighbors(&self, slot_id: SlotId) -> impl Iterator<Item = SlotId> + '_ {
        self.slot(slot_id)
            .crossings
            .iter()
            .map(|crossing| crossing.other_slot_id)
    }

    /// If slots `x` and `y` cross, the index of the shared cell within `x` and within `y`.
    pub fn overlap(&self, x: SlotId, y: SlotId) -> Option<(usize, usize)> {
        self.slot(x)
            .crossings
            .iter()
            .find(|crossing| crossing.other_slot_id == y)
            .map(|crossing| (crossing.cell, crossing.other_slot_cell))
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn word(&self, word_id: WordId) -> &Word {
        self.words
            .get(word_id)
            .unwrap_or_else(|| panic!("Unknown word id {}", word_id))
    }

    /// The candidate set every slot starts from before node consistency.
    pub fn vocabulary(&self) -> BitSet {
        (0..self.words.len()).collect()
    }

    /// Find every run of two or more open cells. Across slots come first, then down slots, each in
    /// row-major order of their start cells.
    fn build_slots(&self) -> Vec<Slot> {
        let mut slots: Vec<Slot> = vec![];

        for direction in [Direction::Across, Direction::Down] {
            for row in 0..self.height {
                for col in 0..self.width {
                    if !self.is_open(row, col) {
                        continue;
                    }

                    // Only start a slot at the first cell of a run.
                    let (step, starts_run) = match direction {
                        Direction::Across => ((0, 1), col == 0 || !self.is_open(row, col - 1)),
                        Direction::Down => ((1, 0), row == 0 || !self.is_open(row - 1, col)),
                    };
                    if !starts_run {
                        continue;
                    }

                    let mut length = 1;
                    while self.is_open(row + step.0 * length, col + step.1 * length) {
                        length += 1;
                    }

                    if length > 1 {
                        slots.push(Slot {
                            id: slots.len(),
                            start_cell: (row, col),
                            direction,
                            length,
                            crossings: smallvec![],
                        });
                    }
                }
            }
        }

        // Build a map from cell location to the slots covering it, which we can then use to
        // calculate crossings.
        let mut entries_by_loc: HashMap<GridCoord, SmallVec<[(SlotId, usize); 2]>> =
            HashMap::new();
        for slot in &slots {
            for (cell_idx, loc) in slot.cell_coords().enumerate() {
                entries_by_loc
                    .entry(loc)
                    .or_insert_with(SmallVec::new)
                    .push((slot.id, cell_idx));
            }
        }

        for slot in &mut slots {
            let slot_id = slot.id;
            let crossings: SmallVec<[Crossing; MAX_NEIGHBOR_COUNT]> = slot
                .cell_coords()
                .enumerate()
                .filter_map(|(cell_idx, loc)| {
                    let mut others = entries_by_loc[&loc]
                        .iter()
                        .filter(|&&(other_slot_id, _)| other_slot_id != slot_id);

                    match (others.next(), others.next()) {
                        (None, _) => None,
                        (Some(&(other_slot_id, other_slot_cell)), None) => Some(Crossing {
                            cell: cell_idx,
                            other_slot_id,
                            other_slot_cell,
                        }),
                        _ => panic!("More than two slots crossing in cell {:?}", loc),
                    }
                })
                .collect();
            slot.crossings = crossings;
        }

        slots
    }
}

fn read_file(path: &Path) -> Result<String, GridConfigError> {
    fs::read_to_string(path).map_err(|source| GridConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Turn a structure template into an open/blocked cell matrix. Blank lines before the first row
/// and after the last are dropped, as are trailing whitespace (including `\r`) and the indentation
/// shared by every row. A blank line between rows is a row of blocked cells.
fn parse_structure(structure: &str) -> Result<Vec<Vec<bool>>, GridConfigError> {
    let lines: Vec<&str> = structure.lines().map(str::trim_end).collect();

    let first = lines.iter().position(|line| !line.is_empty());
    let last = lines.iter().rposition(|line| !line.is_empty());
    let rows = match (first, last) {
        (Some(first), Some(last)) => &lines[first..=last],
        _ => return Err(GridConfigError::EmptyStructure),
    };

    let indent = rows
        .iter()
        .filter(|line| !line.is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    rows.iter()
        .enumerate()
        .map(|(row, line)| {
            line.chars()
                .skip(indent)
                .enumerate()
                .map(|(col, cell)| match cell {
                    OPEN_CELL => Ok(true),
                    BLOCKED_CELL => Ok(false),
                    found => Err(GridConfigError::InvalidCell { row, col, found }),
                })
                .collect::<Result<Vec<bool>, _>>()
        })
        .collect()
}
