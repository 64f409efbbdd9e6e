//! Fill a crossword grid with words from a vocabulary by treating it as a constraint satisfaction
//! problem. Each slot (a maximal across or down run of open cells) is a variable whose domain is
//! the word list; unary constraints require a word's length to match its slot, and binary
//! constraints require crossing slots to agree on their shared cell.
//!
//! Filling happens in three stages:
//!
//! - node consistency, which drops every word of the wrong length from each slot
//!   ([`DomainStore::enforce_node_consistency`]);
//! - a single AC-3 pass over every crossing ([`establish_arc_consistency`]);
//! - a backtracking search using the MRV heuristic (with a degree tie-break) to pick slots and the
//!   least-constraining-value heuristic to order words ([`find_fill`]).

pub mod arc_consistency;
pub mod backtracking_search;
pub mod domains;
pub mod grid_config;
pub mod render;

pub use arc_consistency::{
    establish_arc_consistency, revise, Arc, ArcConsistencyFailure, ArcConsistencyResult,
    ArcConsistencySuccess,
};
pub use backtracking_search::{
    consistent, find_fill, solve, Assignment, Choice, FillFailure, FillOptions, FillSuccess,
    Statistics,
};
pub use domains::DomainStore;
pub use grid_config::{Direction, GridConfig, GridConfigError, Slot, Word};
pub use render::{letter_grid, render_grid};

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

/// The expected maximum number of slots crossing a single slot. Every cell of a slot can be crossed
/// by at most one other slot, so this is bounded by the slot length.
pub const MAX_NEIGHBOR_COUNT: usize = MAX_SLOT_LENGTH;

/// An identifier for a given slot, based on its index in the grid config's `slots` field.
pub type SlotId = usize;

/// An identifier for a given word, based on its index in the grid config's `words` field.
pub type WordId = usize;

/// Zero-indexed (row, column) coords for a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);
