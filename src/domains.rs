use bit_set::BitSet;
use log::debug;

use crate::grid_config::GridConfig;
use crate::{SlotId, WordId};

/// The live set of candidate words for each slot. Every slot starts with the whole vocabulary and
/// words are only ever removed, so the size of each domain never increases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainStore {
    domains: Vec<BitSet>,
}

impl DomainStore {
    /// Seed every slot in the grid with the full vocabulary.
    pub fn new(config: &GridConfig) -> DomainStore {
        let vocabulary = config.vocabulary();
        DomainStore {
            domains: config.slots().iter().map(|_| vocabulary.clone()).collect(),
        }
    }

    /// Remove every word whose length doesn't match its slot. Returns the number of words removed.
    pub fn enforce_node_consistency(&mut self, config: &GridConfig) -> usize {
        let mut removed = 0;

        for slot in config.slots() {
            let domain = self.domain_mut(slot.id);
            let mismatched: Vec<WordId> = domain
                .iter()
                .filter(|&word_id| config.word(word_id).len() != slot.length)
                .collect();

            for word_id in &mismatched {
                domain.remove(*word_id);
            }
            removed += mismatched.len();
        }

        debug!("Node consistency removed {} options", removed);

        removed
    }

    pub fn domain(&self, slot_id: SlotId) -> &BitSet {
        self.domains
            .get(slot_id)
            .unwrap_or_else(|| panic!("No domain for slot {}", slot_id))
    }

    pub(crate) fn domain_mut(&mut self, slot_id: SlotId) -> &mut BitSet {
        self.domains
            .get_mut(slot_id)
            .unwrap_or_else(|| panic!("No domain for slot {}", slot_id))
    }

    /// How many options are still available for this slot?
    pub fn len(&self, slot_id: SlotId) -> usize {
        self.domain(slot_id).len()
    }

    pub fn contains(&self, slot_id: SlotId, word_id: WordId) -> bool {
        self.domain(slot_id).contains(word_id)
    }

    pub fn remove(&mut self, slot_id: SlotId, word_id: WordId) -> bool {
        self.domain_mut(slot_id).remove(word_id)
    }

    /// Narrow a slot's domain down to a single word, as when the slot is assigned. Returns `false`
    /// if the word wasn't a candidate, in which case the domain is left empty.
    pub fn restrict_to(&mut self, slot_id: SlotId, word_id: WordId) -> bool {
        let domain = self.domain_mut(slot_id);
        let present = domain.contains(word_id);
        domain.clear();
        if present {
            domain.insert(word_id);
        }
        present
    }

    /// The first slot with no options left, if any.
    pub fn empty_slot(&self) -> Option<SlotId> {
        self.domains.iter().position(|domain| domain.is_empty())
    }

    /// The total number of options across all slots.
    pub fn total_len(&self) -> usize {
        self.domains.iter().map(|domain| domain.len()).sum()
    }

    pub fn slot_count(&self) -> usize {
        self.domains.len()
    }
}
