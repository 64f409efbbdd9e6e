//! Grid filling by chronological backtracking. Before searching we make every slot node-consistent
//! and then arc-consistent; the resulting domains are an upper bound on what each slot can hold
//! for the rest of the search. Slots are chosen by minimum remaining values, breaking ties by
//! degree, and words are tried in least-constraining-value order.

use std::cmp::Reverse;
use std::collections::HashSet;

use instant::{Duration, Instant};
use log::{debug, info, trace};
use smallvec::SmallVec;

use crate::arc_consistency::{establish_arc_consistency, Arc, ArcConsistencyFailure};
use crate::domains::DomainStore;
use crate::grid_config::GridConfig;
use crate::{SlotId, WordId, MAX_NEIGHBOR_COUNT};

/// A struct recording a slot assignment made during the filling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Choice {
    pub slot_id: SlotId,
    pub word_id: WordId,
}

/// A partial mapping from slots to words. Extending an assignment produces a new value, so each
/// level of the search owns its assignment outright and sibling branches never see each other's
/// choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    word_ids: Vec<Option<WordId>>,
    assigned_count: usize,
}

impl Assignment {
    /// An assignment for a grid with `slot_count` slots, none of them filled.
    pub fn new(slot_count: usize) -> Assignment {
        Assignment {
            word_ids: vec![None; slot_count],
            assigned_count: 0,
        }
    }

    /// A copy of this assignment with one more slot filled (or one slot's word replaced).
    pub fn with(&self, choice: Choice) -> Assignment {
        let mut extended = self.clone();
        let previous = extended.word_ids[choice.slot_id].replace(choice.word_id);
        if previous.is_none() {
            extended.assigned_count += 1;
        }
        extended
    }

    pub fn get(&self, slot_id: SlotId) -> Option<WordId> {
        self.word_ids.get(slot_id).copied().flatten()
    }

    pub fn is_assigned(&self, slot_id: SlotId) -> bool {
        self.get(slot_id).is_some()
    }

    /// The number of filled slots.
    pub fn len(&self) -> usize {
        self.assigned_count
    }

    pub fn is_empty(&self) -> bool {
        self.assigned_count == 0
    }

    /// Does every slot have a word?
    pub fn is_complete(&self) -> bool {
        self.assigned_count == self.word_ids.len()
    }

    /// The filled slots, in slot id order.
    pub fn choices(&self) -> impl Iterator<Item = Choice> + '_ {
        self.word_ids
            .iter()
            .enumerate()
            .filter_map(|(slot_id, word_id)| word_id.map(|word_id| Choice { slot_id, word_id }))
    }

    /// The word placed in the given slot, as a string.
    pub fn word<'a>(&self, config: &'a GridConfig, slot_id: SlotId) -> Option<&'a str> {
        self.get(slot_id)
            .map(|word_id| config.word(word_id).string.as_str())
    }
}

/// Run-time settings for `find_fill`.
#[derive(Debug, Clone, Default)]
pub struct FillOptions {
    /// After each assignment, re-run arc consistency on a copy of the domains, pruning the branch
    /// if any slot runs out of options. Off by default: the search then relies only on the
    /// initial arc-consistency pass plus the consistency check at each step.
    pub forward_checking: bool,
}

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// How many times a slot was selected to branch on, i.e. recursive calls that didn't already
    /// hold a complete assignment.
    pub states: u64,

    /// How many candidate words were abandoned, whether because they were inconsistent with the
    /// assignment or because everything below them failed.
    pub backtracks: u64,

    /// How many options node and arc consistency removed before the search started.
    pub initial_eliminations: usize,

    pub duration: Duration,

    /// The slot selected at each state, in order.
    pub selection_order: Vec<SlotId>,
}

/// A struct representing the results of a successful fill operation.
#[derive(Debug)]
pub struct FillSuccess {
    pub statistics: Statistics,
    pub assignment: Assignment,
}

/// The grid can't be filled from this vocabulary. We don't distinguish between grids ruled out by
/// consistency checking and grids ruled out by exhausting the search.
#[derive(Debug)]
pub struct FillFailure {
    pub statistics: Statistics,
}

/// Is this (possibly partial) assignment valid? That is: no word is used twice, every word fits
/// its slot, and every pair of filled crossing slots agrees on the shared cell.
pub fn consistent(config: &GridConfig, assignment: &Assignment) -> bool {
    let mut used_word_ids: HashSet<WordId> = HashSet::with_capacity(assignment.len());

    for Choice { slot_id, word_id } in assignment.choices() {
        if !used_word_ids.insert(word_id) {
            return false;
        }

        if config.word(word_id).len() != config.slot(slot_id).length {
            return false;
        }
    }

    // Every filled word has the right length now, so indexing by cell is safe.
    assignment.choices().all(|Choice { slot_id, word_id }| {
        let glyphs = &config.word(word_id).glyphs;

        config.slot(slot_id).crossings.iter().all(|crossing| {
            match assignment.get(crossing.other_slot_id) {
                Some(other_word_id) => {
                    glyphs[crossing.cell]
                        == config.word(other_word_id).glyphs[crossing.other_slot_cell]
                }
                None => true,
            }
        })
    })
}

/// Choose the unfilled slot with the fewest remaining options. Ties go to the slot crossing the
/// most other slots, and then to the lowest slot id, so the choice is deterministic.
pub fn select_unassigned_slot(
    config: &GridConfig,
    domains: &DomainStore,
    assignment: &Assignment,
) -> Option<SlotId> {
    config
        .slots()
        .iter()
        .filter(|slot| !assignment.is_assigned(slot.id))
        .min_by_key(|slot| (domains.len(slot.id), Reverse(slot.degree()), slot.id))
        .map(|slot| slot.id)
}

/// Return the options for a slot ordered so that the words ruling out the fewest options for
/// unfilled crossing slots come first. A word rules out an option for a crossing slot when that
/// slot's domain contains the same word, since it can no longer be used there.
pub fn order_domain_values(
    config: &GridConfig,
    domains: &DomainStore,
    slot_id: SlotId,
    assignment: &Assignment,
) -> Vec<WordId> {
    let unassigned_neighbors: SmallVec<[SlotId; MAX_NEIGHBOR_COUNT]> = config
        .neighbors(slot_id)
        .filter(|&neighbor| !assignment.is_assigned(neighbor))
        .collect();

    // Domains iterate in word id order and the sort is stable, so ties keep that order.
    let mut options: Vec<WordId> = domains.domain(slot_id).iter().collect();
    options.sort_by_cached_key(|&word_id| {
        unassigned_neighbors
            .iter()
            .filter(|&&neighbor| domains.contains(neighbor, word_id))
            .count()
    });
    options
}

struct Search<'a> {
    config: &'a GridConfig,
    options: &'a FillOptions,
    statistics: Statistics,
}

impl<'a> Search<'a> {
    /// Extend `assignment` until it's complete, returning the first complete assignment found or
    /// `None` if every option for the selected slot fails.
    fn backtrack(&mut self, assignment: Assignment, domains: &DomainStore) -> Option<Assignment> {
        let slot_id = match select_unassigned_slot(self.config, domains, &assignment) {
            Some(slot_id) => slot_id,
            None => return Some(assignment),
        };

        self.statistics.states += 1;
        self.statistics.selection_order.push(slot_id);
        trace!(
            "Filling slot {} ({} options, {} filled)",
            self.config.slot(slot_id),
            domains.len(slot_id),
            assignment.len()
        );

        for word_id in order_domain_values(self.config, domains, slot_id, &assignment) {
            let extended = assignment.with(Choice { slot_id, word_id });

            if consistent(self.config, &extended) {
                let result = if self.options.forward_checking {
                    match self.forward_check(domains, slot_id, word_id) {
                        Some(branch_domains) => self.backtrack(extended, &branch_domains),
                        None => None,
                    }
                } else {
                    self.backtrack(extended, domains)
                };

                if result.is_some() {
                    return result;
                }
            }

            self.statistics.backtracks += 1;
        }

        None
    }

    /// Propagate a choice into a private copy of the domains. Returns `None` if that leaves some
    /// slot without options.
    fn forward_check(
        &self,
        domains: &DomainStore,
        slot_id: SlotId,
        word_id: WordId,
    ) -> Option<DomainStore> {
        let mut branch_domains = domains.clone();
        branch_domains.restrict_to(slot_id, word_id);

        let arcs: Vec<Arc> = self
            .config
            .neighbors(slot_id)
            .map(|neighbor| Arc::new(neighbor, slot_id))
            .collect();

        establish_arc_consistency(self.config, &mut branch_domains, Some(arcs))
            .ok()
            .map(|_| branch_domains)
    }
}

/// Search for a valid fill for the given grid.
pub fn find_fill(config: &GridConfig, options: &FillOptions) -> Result<FillSuccess, FillFailure> {
    let start = Instant::now();

    let mut statistics = Statistics::default();
    let mut domains = DomainStore::new(config);
    let seeded_option_count = domains.total_len();

    domains.enforce_node_consistency(config);

    let mut infeasible = domains.empty_slot();
    if let Some(slot_id) = infeasible {
        debug!("No words of the right length for slot {}", config.slot(slot_id));
    } else if let Err(ArcConsistencyFailure { slot_id }) =
        establish_arc_consistency(config, &mut domains, None)
    {
        infeasible = Some(slot_id);
    }
    statistics.initial_eliminations = seeded_option_count - domains.total_len();

    if infeasible.is_some() {
        statistics.duration = start.elapsed();
        info!(
            "Grid is infeasible before search ({} options eliminated)",
            statistics.initial_eliminations
        );
        return Err(FillFailure { statistics });
    }

    let mut search = Search {
        config,
        options,
        statistics,
    };
    let result = search.backtrack(Assignment::new(config.slot_count()), &domains);

    let mut statistics = search.statistics;
    statistics.duration = start.elapsed();

    match result {
        Some(assignment) => {
            debug_assert!(assignment.is_complete() && consistent(config, &assignment));
            info!(
                "Found a fill after {} states and {} backtracks in {:?}",
                statistics.states, statistics.backtracks, statistics.duration
            );
            Ok(FillSuccess {
                statistics,
                assignment,
            })
        }
        None => {
            info!(
                "Search exhausted without a fill after {} states in {:?}",
                statistics.states, statistics.duration
            );
            Err(FillFailure { statistics })
        }
    }
}

/// Fill the grid with default options, returning `None` if no fill exists.
pub fn solve(config: &GridConfig) -> Option<Assignment> {
    find_fill(config, &FillOptions::default())
        .ok()
        .map(|success| success.assignment)
}

#[cfg(test)]
mod tests {
    use super::{
        consistent, find_fill, order_domain_values, select_unassigned_slot, solve, Assignment,
        Choice, FillOptions,
    };
    use crate::arc_consistency::establish_arc_consistency;
    use crate::domains::DomainStore;
    use crate::grid_config::GridConfig;

    fn build_grid_config(structure: &str, words: &str) -> GridConfig {
        GridConfig::from_strings(structure, words).expect("Failed to parse grid")
    }

    fn word_id(config: &GridConfig, word: &str) -> usize {
        config
            .words()
            .iter()
            .position(|candidate| candidate.string == word)
            .unwrap_or_else(|| panic!("{} isn't in the word list", word))
    }

    /// Check a fill against every constraint, looking at every pair of slots.
    fn assert_valid_fill(config: &GridConfig, assignment: &Assignment) {
        assert!(assignment.is_complete());

        for x in config.slots() {
            let x_word = assignment.word(config, x.id).expect("Slot left empty");
            assert_eq!(x_word.chars().count(), x.length, "{} doesn't fit {}", x_word, x);

            for y in config.slots() {
                if x.id == y.id {
                    continue;
                }
                let y_word = assignment.word(config, y.id).unwrap();
                assert_ne!(x_word, y_word, "{} is used twice", x_word);

                if let Some((x_cell, y_cell)) = config.overlap(x.id, y.id) {
                    assert_eq!(
                        x_word.chars().nth(x_cell),
                        y_word.chars().nth(y_cell),
                        "{} and {} disagree where {} crosses {}",
                        x_word,
                        y_word,
                        x,
                        y
                    );
                }
            }
        }
    }

    /// Three slots: two across entries that each cross a single down entry through its middle.
    ///
    /// ___
    /// #_#
    /// ___
    fn h_grid(words: &str) -> GridConfig {
        build_grid_config(
            "
            ___
            #_#
            ___
            ",
            words,
        )
    }

    #[test]
    fn test_consistent() {
        let config = build_grid_config(
            "
            __
            #_
            ",
            "AB\nBA\nBC\nXYZ",
        );
        let ab = word_id(&config, "AB");
        let ba = word_id(&config, "BA");
        let bc = word_id(&config, "BC");
        let xyz = word_id(&config, "XYZ");

        let empty = Assignment::new(config.slot_count());
        assert!(consistent(&config, &empty));

        let partial = empty.with(Choice { slot_id: 0, word_id: ab });
        assert!(consistent(&config, &partial));

        // Across ends in B, so down must start with B.
        assert!(consistent(&config, &partial.with(Choice { slot_id: 1, word_id: ba })));
        assert!(consistent(&config, &partial.with(Choice { slot_id: 1, word_id: bc })));
        assert!(!consistent(&config, &partial.with(Choice { slot_id: 1, word_id: ab })));

        // Wrong length.
        assert!(!consistent(&config, &empty.with(Choice { slot_id: 1, word_id: xyz })));
    }

    #[test]
    fn test_consistent_rejects_repeated_words() {
        // The two slots share their first cell, so AB/AB would agree on letters.
        let config = build_grid_config(
            "
            __
            _#
            ",
            "AB",
        );

        let assignment = Assignment::new(config.slot_count())
            .with(Choice { slot_id: 0, word_id: 0 })
            .with(Choice { slot_id: 1, word_id: 0 });

        assert!(!consistent(&config, &assignment));
    }

    #[test]
    fn test_assignment_values_are_independent() {
        let empty = Assignment::new(3);
        let first = empty.with(Choice { slot_id: 1, word_id: 4 });
        let second = first.with(Choice { slot_id: 1, word_id: 5 });

        assert!(empty.is_empty());
        assert_eq!(first.get(1), Some(4));
        assert_eq!(second.get(1), Some(5));
        assert_eq!(second.len(), 1);
        assert!(!second.is_complete());
        assert_eq!(
            second.choices().collect::<Vec<_>>(),
            vec![Choice { slot_id: 1, word_id: 5 }]
        );
    }

    #[test]
    fn test_two_crossing_slots_with_shared_first_letter() {
        let config = build_grid_config(
            "
            __
            _#
            ",
            "AB\nCD",
        );

        // Arc consistency keeps both words in both slots, but a fill would need to use the same
        // word twice.
        let mut domains = DomainStore::new(&config);
        domains.enforce_node_consistency(&config);
        establish_arc_consistency(&config, &mut domains, None).unwrap();
        assert_eq!(domains.len(0), 2);
        assert_eq!(domains.len(1), 2);
        assert_eq!(solve(&config), None);

        let config = build_grid_config(
            "
            __
            _#
            ",
            "AB\nAD\nCD",
        );

        let assignment = solve(&config).expect("Failed to find a fill");
        let across = assignment.word(&config, 0).unwrap();
        let down = assignment.word(&config, 1).unwrap();
        assert_eq!(across.chars().next(), down.chars().next());
        assert_valid_fill(&config, &assignment);
    }

    #[test]
    fn test_no_words_of_slot_length() {
        let config = build_grid_config(
            "
            ___
            _##
            _##
            ",
            "AB\nCD",
        );

        let failure = find_fill(&config, &FillOptions::default())
            .expect_err("Found an impossible fill??");

        // Node consistency empties both slots, so the search never starts.
        assert_eq!(failure.statistics.states, 0);
        assert!(failure.statistics.selection_order.is_empty());
        assert_eq!(failure.statistics.initial_eliminations, 4);
    }

    #[test]
    fn test_missing_length_in_larger_grid() {
        // The 4-letter slots have nothing to choose from.
        let config = build_grid_config(include_str!("../data/structure0.txt"), "six\nseven\neight");

        assert_eq!(solve(&config), None);
    }

    #[test]
    fn test_disconnected_slots() {
        let config = build_grid_config(
            "
            ___
            ###
            ___
            ###
            ___
            ",
            "CAT\nDOG\nEMU\nOX",
        );

        let result = find_fill(&config, &FillOptions::default()).expect("Failed to find a fill");

        assert_valid_fill(&config, &result.assignment);
        assert_eq!(result.statistics.initial_eliminations, 3);
        // One state per slot; the call that finds the assignment complete isn't counted.
        assert_eq!(result.statistics.states, 3);
        assert_eq!(result.statistics.selection_order.len(), config.slot_count());
    }

    #[test]
    fn test_incompatible_crossing() {
        // Across ends where down starts; no word ends with a letter any word starts with.
        let config = build_grid_config(
            "
            __
            #_
            ",
            "AB\nCD\nEF",
        );

        let failure = find_fill(&config, &FillOptions::default())
            .expect_err("Found an impossible fill??");

        assert_eq!(failure.statistics.states, 0);
    }

    #[test]
    fn test_select_unassigned_slot() {
        let config = h_grid("AAB\nABA\nBAB\nBBA");
        let mut domains = DomainStore::new(&config);
        domains.enforce_node_consistency(&config);
        let empty = Assignment::new(config.slot_count());

        // Every slot has four options, so the down slot wins by crossing two others.
        assert_eq!(config.slot(2).degree(), 2);
        assert_eq!(select_unassigned_slot(&config, &domains, &empty), Some(2));

        // Once it's filled, the across slots tie on both counts and the lower id wins.
        let filled = empty.with(Choice { slot_id: 2, word_id: 0 });
        assert_eq!(select_unassigned_slot(&config, &domains, &filled), Some(0));

        // A smaller domain beats a higher degree.
        domains.remove(1, 3);
        assert_eq!(select_unassigned_slot(&config, &domains, &empty), Some(1));

        let full = filled
            .with(Choice { slot_id: 0, word_id: 2 })
            .with(Choice { slot_id: 1, word_id: 1 });
        assert_eq!(select_unassigned_slot(&config, &domains, &full), None);
    }

    #[test]
    fn test_search_selects_higher_degree_slot_first() {
        let config = h_grid("AAB\nABA\nBAB\nBBA");

        let result = find_fill(&config, &FillOptions::default()).expect("Failed to find a fill");

        assert_eq!(result.statistics.selection_order, vec![2, 0, 1]);
        assert_eq!(result.assignment.word(&config, 2), Some("AAB"));
        assert_eq!(result.assignment.word(&config, 0), Some("BAB"));
        assert_eq!(result.assignment.word(&config, 1), Some("ABA"));
        assert_valid_fill(&config, &result.assignment);
    }

    #[test]
    fn test_order_domain_values() {
        // Word ids: AAB = 0, ABA = 1, BAB = 2, BBA = 3.
        let config = h_grid("AAB\nABA\nBAB\nBBA");
        let mut domains = DomainStore::new(&config);
        domains.enforce_node_consistency(&config);

        // Every word is in both crossing slots, so the order is just word id order.
        let empty = Assignment::new(config.slot_count());
        assert_eq!(order_domain_values(&config, &domains, 2, &empty), vec![0, 1, 2, 3]);

        domains.remove(0, 3);
        domains.remove(1, 3);
        domains.remove(0, 2);
        assert_eq!(order_domain_values(&config, &domains, 2, &empty), vec![3, 2, 0, 1]);

        // Filled slots don't count.
        let filled = empty.with(Choice { slot_id: 1, word_id: 1 });
        assert_eq!(order_domain_values(&config, &domains, 2, &filled), vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_find_fill_for_small_structure() {
        let config = build_grid_config(
            include_str!("../data/structure0.txt"),
            include_str!("../data/words0.txt"),
        );

        for forward_checking in [false, true] {
            let result = find_fill(&config, &FillOptions { forward_checking })
                .expect("Failed to find a fill");

            assert_eq!(result.assignment.word(&config, 0), Some("SIX"));
            assert_eq!(result.assignment.word(&config, 1), Some("NINE"));
            assert_eq!(result.assignment.word(&config, 2), Some("SEVEN"));
            assert_eq!(result.assignment.word(&config, 3), Some("FIVE"));
            assert_valid_fill(&config, &result.assignment);
        }
    }

    #[test]
    fn test_find_fill_for_5x5_lattice() {
        let config = build_grid_config(
            include_str!("../data/structure1.txt"),
            include_str!("../data/words1.txt"),
        );

        let plain = find_fill(&config, &FillOptions::default()).expect("Failed to find a fill");
        assert_valid_fill(&config, &plain.assignment);
        assert!(plain.statistics.initial_eliminations > 0);

        let checked = find_fill(&config, &FillOptions { forward_checking: true })
            .expect("Failed to find a fill");
        assert_valid_fill(&config, &checked.assignment);
    }

    #[test]
    fn test_fill_fails_gracefully() {
        // Only three words fit the six slots, and they can't cross each other anyway.
        let config = build_grid_config(
            include_str!("../data/structure1.txt"),
            include_str!("../data/words0.txt"),
        );

        for forward_checking in [false, true] {
            assert!(find_fill(&config, &FillOptions { forward_checking }).is_err());
        }
        assert_eq!(solve(&config), None);
    }
}
