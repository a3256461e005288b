//! Signature hash table: groups nodes by simulated behavior so the
//! equivalence engine only ever SAT-checks pairs that already agree on
//! every simulation pattern seen so far.
//!
//! Same raw-entry get-or-insert shape as [`crate::strash::StrashTable`],
//! keyed on `sig_hash` instead of fanin pair. Unlike the strash table,
//! multiple nodes legitimately share a signature bucket (that's the whole
//! point, they're the candidate set), so insertion returns every existing
//! bucket member as a candidate rather than collapsing to one entry.

use hashbrown::hash_map::RawEntryMut;
use hashbrown::HashMap;
use rapidhash::quality::RandomState;

use crate::handle::FraigHandle;
use crate::node::{NodeArena, NodeFlags};

fn key_hash(hasher_builder: &RandomState, sig_hash: u64) -> u64 {
    use std::hash::BuildHasher;
    hasher_builder.hash_one(sig_hash)
}

/// spec.md §4.4 paragraph 2: "If a node's signature is 'all-0 observed'
/// (only saw_0 set) it is additionally candidate-equivalent to constant 0;
/// symmetrically for constant 1." The constant node always lives at
/// [`FraigHandle::CONST_INDEX`], so the candidate's `partner` is simply
/// that index with `complementary` selecting which polarity (`ZERO` vs
/// `ONE`) of it applies -- no special-casing is needed downstream, the
/// equivalence engine's ordinary `(node, partner)` machinery already
/// treats index 0 like any other node.
fn constant_candidate(arena: &NodeArena, idx: u32) -> Option<Candidate> {
    if idx == FraigHandle::CONST_INDEX {
        return None;
    }
    let flags = arena.state(idx).flags;
    let saw_0 = flags.contains(NodeFlags::SAW_0);
    let saw_1 = flags.contains(NodeFlags::SAW_1);
    if saw_0 && !saw_1 {
        Some(Candidate { node: idx, partner: FraigHandle::CONST_INDEX, complementary: false })
    } else if saw_1 && !saw_0 {
        Some(Candidate { node: idx, partner: FraigHandle::CONST_INDEX, complementary: true })
    } else {
        None
    }
}

/// A candidate equivalence pair emitted when a node is inserted into a
/// bucket that already has a member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub node: u32,
    pub partner: u32,
    /// If true, `node` and `partner` are suspected complementary rather
    /// than directly equal (their signatures matched only after folding).
    pub complementary: bool,
}

/// Signature-hash table. Each bucket is a singly linked list through
/// `NodeState::sig_link`, threaded head-first; the head is tracked here.
pub struct SignatureTable {
    heads: HashMap<u64, u32, RandomState>,
}

impl Default for SignatureTable {
    fn default() -> Self {
        SignatureTable {
            heads: HashMap::with_hasher(RandomState::default()),
        }
    }
}

impl SignatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `idx` (whose `sig_hash`/`PAT_HASH_INV` must already be set
    /// by [`crate::sim::Simulator::update_saw_and_hash`]) and returns every
    /// other live node presently in the same bucket, each tagged with
    /// whether the match was direct or required the fold bit, plus a
    /// constant candidate if `idx`'s pattern has only ever read as all-0 or
    /// all-1 (spec.md §4.4 paragraph 2). The list is sorted by ascending
    /// partner node id (spec.md §4.5 "Ordering / tie-breaks": "when
    /// multiple candidates share the same representative, the one with the
    /// smallest partner node id is processed first") before the caller
    /// enqueues it.
    pub fn insert(&mut self, arena: &mut NodeArena, idx: u32) -> Vec<Candidate> {
        let sig_hash = arena.state(idx).sig_hash;
        let inverted = arena.state(idx).flags.contains(NodeFlags::PAT_HASH_INV);

        let hasher_builder = *self.heads.hasher();
        let hash = key_hash(&hasher_builder, sig_hash);

        let mut candidates = Vec::new();
        if let Some(c) = constant_candidate(arena, idx) {
            candidates.push(c);
        }

        let entry = self
            .heads
            .raw_entry_mut()
            .from_hash(hash, |&h| h == sig_hash);
        match entry {
            RawEntryMut::Occupied(mut entry) => {
                let head = *entry.get();
                let mut cursor = Some(head);
                while let Some(cur) = cursor {
                    if !arena.state(cur).is_deleted() {
                        let partner_inverted = arena.state(cur).flags.contains(NodeFlags::PAT_HASH_INV);
                        candidates.push(Candidate {
                            node: idx,
                            partner: cur,
                            complementary: inverted != partner_inverted,
                        });
                    }
                    cursor = arena.state(cur).sig_link;
                }
                arena.state_mut(idx).sig_link = Some(head);
                entry.insert(idx);
            }
            RawEntryMut::Vacant(entry) => {
                arena.state_mut(idx).sig_link = None;
                entry.insert_with_hasher(hash, sig_hash, idx, |&h| key_hash(&hasher_builder, h));
            }
        }
        candidates.sort_by_key(|c| c.partner);
        candidates
    }

    /// Drops bucket heads pointing only at deleted chains. Chain members
    /// are lazily skipped by [`Self::insert`]'s deleted check, so this only
    /// needs to reclaim fully-dead buckets.
    pub fn rehash_dropping_deleted(&mut self, arena: &NodeArena) {
        self.heads.retain(|_, &mut head| {
            let mut cursor = Some(head);
            while let Some(cur) = cursor {
                if !arena.state(cur).is_deleted() {
                    return true;
                }
                cursor = arena.state(cur).sig_link;
            }
            false
        });
        tracing::trace!(buckets = self.heads.len(), "signature table rehashed");
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FraigNode;
    use crate::sim::Simulator;

    #[test]
    fn second_insert_with_same_signature_is_a_candidate() {
        let mut arena = NodeArena::new();
        let mut sim = Simulator::new(4);
        let mut sigs = SignatureTable::new();

        let a = arena.push(FraigNode::Input { var: 0 });
        sim.init_input(&mut arena, a, 0);
        let b = arena.push(FraigNode::Input { var: 1 });
        // force identical pattern to simulate a genuine candidate
        let pattern = arena.state(a).pattern.clone();
        arena.state_mut(b).pattern = pattern;
        sim.update_saw_and_hash(&mut arena, b);
        sim.update_saw_and_hash(&mut arena, a);

        let c1 = sigs.insert(&mut arena, a);
        assert!(c1.is_empty());
        let c2 = sigs.insert(&mut arena, b);
        assert_eq!(c2.len(), 1);
        assert_eq!(c2[0].partner, a);
    }

    #[test]
    fn all_zero_pattern_emits_a_constant_zero_candidate() {
        let mut arena = NodeArena::new();
        let mut sim = Simulator::new(4);
        let mut sigs = SignatureTable::new();

        let a = arena.push(FraigNode::Input { var: 0 });
        arena.state_mut(a).pattern = vec![0; 4];
        sim.update_saw_and_hash(&mut arena, a);

        let candidates = sigs.insert(&mut arena, a);
        assert!(candidates.iter().any(|c| c.partner == FraigHandle::CONST_INDEX && !c.complementary));
    }

    #[test]
    fn all_one_pattern_emits_a_constant_one_candidate() {
        let mut arena = NodeArena::new();
        let mut sim = Simulator::new(4);
        let mut sigs = SignatureTable::new();

        let a = arena.push(FraigNode::Input { var: 0 });
        arena.state_mut(a).pattern = vec![u64::MAX; 4];
        sim.update_saw_and_hash(&mut arena, a);

        let candidates = sigs.insert(&mut arena, a);
        assert!(candidates.iter().any(|c| c.partner == FraigHandle::CONST_INDEX && c.complementary));
    }

    #[test]
    fn candidates_are_sorted_by_ascending_partner_id() {
        let mut arena = NodeArena::new();
        let mut sim = Simulator::new(4);
        let mut sigs = SignatureTable::new();

        // three nodes sharing one signature bucket, inserted in an order
        // that would otherwise come back newest-partner-first.
        let a = arena.push(FraigNode::Input { var: 0 });
        arena.state_mut(a).pattern = vec![0x1234_5678_9abc_def0; 4];
        sim.update_saw_and_hash(&mut arena, a);
        let b = arena.push(FraigNode::Input { var: 1 });
        arena.state_mut(b).pattern = arena.state(a).pattern.clone();
        sim.update_saw_and_hash(&mut arena, b);
        let c = arena.push(FraigNode::Input { var: 2 });
        arena.state_mut(c).pattern = arena.state(a).pattern.clone();
        sim.update_saw_and_hash(&mut arena, c);

        sigs.insert(&mut arena, a);
        sigs.insert(&mut arena, b);
        let candidates = sigs.insert(&mut arena, c);

        let partners: Vec<u32> = candidates.iter().map(|cand| cand.partner).collect();
        let mut sorted = partners.clone();
        sorted.sort_unstable();
        assert_eq!(partners, sorted, "candidates must be in ascending partner-id order");
        assert_eq!(partners, vec![a, b]);
    }
}
