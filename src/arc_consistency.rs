//! A crossword-specific implementation of the AC-3 algorithm. For our purposes, a grid is
//! arc-consistent when every option for every slot has, in each crossing slot, at least one option
//! placing the same letter in the shared cell. For example, if 1D doesn't have any options starting
//! with the letter A, we want to remove any options for 1A that start with the letter A.
//!
//! We keep revising until no more eliminations are possible or some slot runs out of options.

use std::collections::{HashSet, VecDeque};

use log::{debug, trace};

use crate::domains::DomainStore;
use crate::grid_config::GridConfig;
use crate::{SlotId, WordId};

/// A directed consistency obligation: every option for `x` must be supported by some option for
/// `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arc {
    pub x: SlotId,
    pub y: SlotId,
}

impl Arc {
    pub fn new(x: SlotId, y: SlotId) -> Arc {
        Arc { x, y }
    }
}

/// Every arc in the grid: one in each direction for each pair of crossing slots.
pub fn all_arcs(config: &GridConfig) -> Vec<Arc> {
    config
        .slots()
        .iter()
        .flat_map(|slot| config.neighbors(slot.id).map(move |y| Arc::new(slot.id, y)))
        .collect()
}

/// FIFO queue of arcs waiting to be revised. An arc that is already waiting isn't added a second
/// time.
#[derive(Debug)]
struct ArcQueue {
    queue: VecDeque<Arc>,
    queued: HashSet<Arc>,
}

impl ArcQueue {
    fn with_initial_queue<Items>(items: Items) -> ArcQueue
    where
        Items: IntoIterator<Item = Arc>,
    {
        let mut queue = ArcQueue {
            queue: VecDeque::new(),
            queued: HashSet::new(),
        };
        for arc in items {
            queue.enqueue(arc);
        }
        queue
    }

    fn pop_front(&mut self) -> Option<Arc> {
        let arc = self.queue.pop_front()?;
        self.queued.remove(&arc);
        Some(arc)
    }

    fn enqueue(&mut self, arc: Arc) {
        if self.queued.insert(arc) {
            self.queue.push_back(arc);
        }
    }
}

/// Result of a successful call to `establish_arc_consistency`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcConsistencySuccess {
    /// How many calls to `revise` removed at least one option.
    pub revisions: usize,

    /// How many options were removed in total.
    pub eliminations: usize,
}

/// Result of a failed call to `establish_arc_consistency`: the slot whose options ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    pub slot_id: SlotId,
}

pub type ArcConsistencyResult = Result<ArcConsistencySuccess, ArcConsistencyFailure>;

/// Make `x` consistent with `y` by removing every option for `x` whose letter in the shared cell
/// doesn't appear in that cell for any option of `y`. Returns whether anything was removed.
///
/// Panics if the two slots don't cross.
pub fn revise(config: &GridConfig, domains: &mut DomainStore, x: SlotId, y: SlotId) -> bool {
    let (x_cell, y_cell) = config
        .overlap(x, y)
        .unwrap_or_else(|| panic!("Slots {} and {} don't cross", x, y));

    // Which letters can `y` still place in the shared cell?
    let available_glyphs: HashSet<char> = domains
        .domain(y)
        .iter()
        .filter_map(|word_id| config.word(word_id).glyphs.get(y_cell).copied())
        .collect();

    let unsupported: Vec<WordId> = domains
        .domain(x)
        .iter()
        .filter(|&word_id| {
            config
                .word(word_id)
                .glyphs
                .get(x_cell)
                .map_or(true, |glyph| !available_glyphs.contains(glyph))
        })
        .collect();

    for &word_id in &unsupported {
        domains.remove(x, word_id);
    }

    if !unsupported.is_empty() {
        trace!(
            "Revising {} against {} removed {} options",
            config.slot(x),
            config.slot(y),
            unsupported.len()
        );
    }

    !unsupported.is_empty()
}

/// Run AC-3 starting from the given arcs, or from every arc in the grid if `arcs` is `None`. When
/// a revision shrinks a slot, every arc pointing into that slot (other than from the slot that
/// caused the revision) is queued again, since its options may have lost their support.
///
/// Fails as soon as any revision empties a slot's domain, leaving the domains partially revised.
pub fn establish_arc_consistency(
    config: &GridConfig,
    domains: &mut DomainStore,
    arcs: Option<Vec<Arc>>,
) -> ArcConsistencyResult {
    let mut queue = ArcQueue::with_initial_queue(arcs.unwrap_or_else(|| all_arcs(config)));

    let initial_option_count = domains.total_len();
    let mut revisions = 0;

    while let Some(Arc { x, y }) = queue.pop_front() {
        if !revise(config, domains, x, y) {
            continue;
        }
        revisions += 1;

        if domains.len(x) == 0 {
            debug!("Arc consistency emptied slot {}", config.slot(x));
            return Err(ArcConsistencyFailure { slot_id: x });
        }

        for z in config.neighbors(x) {
            if z != y {
                queue.enqueue(Arc::new(z, x));
            }
        }
    }

    let eliminations = initial_option_count - domains.total_len();
    debug!(
        "Arc consistency made {} revisions and removed {} options",
        revisions, eliminations
    );

    Ok(ArcConsistencySuccess {
        revisions,
        eliminations,
    })
}
