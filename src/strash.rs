//! Structural hash table: the "strash" in FRAIG. Guarantees at most one
//! live And node exists per distinct `(fanin0, fanin1)` pair.
//!
//! Uses a raw-entry get-or-insert: the table stores node indices, keyed by
//! a hash computed from the *node's* structural content rather than the
//! index itself, so a lookup never allocates a node just to find out it
//! already exists.

use hashbrown::hash_map::RawEntryMut;
use hashbrown::HashMap;
use rapidhash::quality::RandomState;

use crate::handle::FraigHandle;
use crate::node::NodeArena;

fn key_hash(hasher_builder: &RandomState, fanin0: FraigHandle, fanin1: FraigHandle) -> u64 {
    use std::hash::{BuildHasher, Hash, Hasher};
    let mut hasher = hasher_builder.build_hasher();
    fanin0.raw().hash(&mut hasher);
    fanin1.raw().hash(&mut hasher);
    hasher.finish()
}

/// Structural-hash table over And nodes. Input/Const nodes are never
/// looked up here (there's exactly one Const, and inputs aren't subject to
/// structural dedup: two inputs with the same `var` would be a caller
/// error, not a dedup opportunity).
pub struct StrashTable {
    table: HashMap<u32, (), RandomState>,
}

impl Default for StrashTable {
    fn default() -> Self {
        StrashTable {
            table: HashMap::with_hasher(RandomState::default()),
        }
    }
}

impl StrashTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an existing live And node with this exact
    /// (already-canonicalized) fanin pair. On a miss, calls `create` to
    /// push the new `FraigNode::And { fanin0, fanin1 }` and registers its
    /// index, so a node is only ever allocated after confirming no equal
    /// node exists yet.
    pub fn get_or_insert(
        &mut self,
        arena: &mut NodeArena,
        fanin0: FraigHandle,
        fanin1: FraigHandle,
        create: impl FnOnce(&mut NodeArena) -> u32,
    ) -> u32 {
        let hasher_builder = *self.table.hasher();
        let hash = key_hash(&hasher_builder, fanin0, fanin1);

        let entry = self.table.raw_entry_mut().from_hash(hash, |&idx| {
            !arena.state(idx).is_deleted()
                && arena.node(idx).fanins() == Some((fanin0, fanin1))
        });
        match entry {
            RawEntryMut::Occupied(entry) => *entry.key(),
            RawEntryMut::Vacant(entry) => {
                let new_idx = create(arena);
                entry.insert_with_hasher(hash, new_idx, (), |&idx| {
                    let (f0, f1) = arena.node(idx).fanins().expect("strash entry must be And");
                    key_hash(&hasher_builder, f0, f1)
                });
                new_idx
            }
        }
    }

    /// Drops every entry pointing at a node the arena now marks deleted.
    /// Called after a batch of equivalence merges, mirroring the
    /// "rehash drops dead chain members" design note.
    pub fn rehash_dropping_deleted(&mut self, arena: &NodeArena) {
        self.table.retain(|&idx, _| !arena.state(idx).is_deleted());
        tracing::trace!(remaining = self.table.len(), "strash table rehashed");
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
