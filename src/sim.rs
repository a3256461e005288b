//! Bit-parallel random simulation and signature hashing.
//!
//! Every node owns a `Vec<u64>` of simulation words (`sig_size` words per
//! node, configured by [`crate::config::FraigConfig::sig_size`]). Each word
//! packs 64 independent simulation runs, one per bit lane; primary inputs
//! get a fixed pseudorandom pattern generated once at creation time, seeded
//! off the input's own allocation-order index so two managers fed identical
//! construction calls produce byte-identical patterns. And nodes propagate
//! their fanins' patterns word-by-word, dispatching on fanin polarity the
//! way `FraigNode::calc_pat` does in the original implementation's four
//! unrolled loops.

use rand::RngCore;
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;

use crate::handle::FraigHandle;
use crate::node::{NodeArena, NodeFlags};

/// Fixed seed for the simulation PRNG. Construction must be
/// reproducible: two managers fed identical calls must produce
/// byte-identical graphs, which rules out `rand::thread_rng`.
const SIM_SEED: u64 = 0x4652_4149_4753_4944; // "FRAIGSID" in ASCII hex-ish

/// Expands an input's allocation-order index into a 64-bit PRNG seed via a
/// SplitMix64 avalanche, so that sequential indices (0, 1, 2, ...) land on
/// well-separated seeds instead of ones that differ by one bit.
fn seed_for_var(var: u32) -> u64 {
    let mut z = SIM_SEED ^ (var as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Exposes pattern computation over a [`NodeArena`].
pub struct Simulator {
    sig_size: usize,
}

impl Simulator {
    pub fn new(sig_size: usize) -> Self {
        Simulator {
            sig_size: sig_size.max(1),
        }
    }

    pub fn sig_size(&self) -> usize {
        self.sig_size
    }

    /// Generates a fresh deterministic pattern for a newly created input
    /// node and installs it in the arena. `var` is the input's allocation
    /// order index (spec.md §4.1: "the input index expanded as a
    /// pseudo-random 64-bit word ... with per-word mixing so different
    /// inputs have distinguishable signatures"): the pattern is drawn from
    /// a PRNG seeded purely from `var`, so it depends only on which input
    /// this is, not on what else has been constructed so far.
    pub fn init_input(&mut self, arena: &mut NodeArena, idx: u32, var: u32) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed_for_var(var));
        let words: Vec<u64> = (0..self.sig_size).map(|_| rng.next_u64()).collect();
        let state = arena.state_mut(idx);
        state.pattern = words;
        self.update_saw_and_hash(arena, idx);
    }

    /// Overwrites one simulation word (`word_idx`) across every input with
    /// the SAT model's assignment for that input: the *entire* word is set
    /// to all-ones or all-zeros, not a single bit lane. Bit-parallel
    /// propagation (`simulate_and`) operates word-wide (`w0 & w1`), so every
    /// lane of the injected word must carry the same joint assignment for
    /// any lane (in particular lane 0) to actually distinguish the
    /// candidate pair that produced this counter-example.
    pub fn inject_counterexample(
        &mut self,
        arena: &mut NodeArena,
        word_idx: usize,
        assignment: &[(u32, bool)],
    ) {
        for &(input_idx, value) in assignment {
            let state = arena.state_mut(input_idx);
            if word_idx >= state.pattern.len() {
                state.pattern.resize(word_idx + 1, 0);
            }
            state.pattern[word_idx] = if value { u64::MAX } else { 0 };
        }
    }

    /// Propagates the pattern for a freshly created And node from its
    /// already-simulated fanins.
    pub fn simulate_and(&self, arena: &mut NodeArena, idx: u32, fanin0: FraigHandle, fanin1: FraigHandle) {
        let p0 = &arena.state(fanin0.node_index()).pattern;
        let p1 = &arena.state(fanin1.node_index()).pattern;
        let len = p0.len().max(p1.len()).max(self.sig_size);

        let mut out = vec![0u64; len];
        for i in 0..len {
            let w0 = p0.get(i).copied().unwrap_or(0);
            let w0 = if fanin0.is_inverted() { !w0 } else { w0 };
            let w1 = p1.get(i).copied().unwrap_or(0);
            let w1 = if fanin1.is_inverted() { !w1 } else { w1 };
            out[i] = w0 & w1;
        }
        arena.state_mut(idx).pattern = out;
        self.update_saw_and_hash(arena, idx);
    }

    /// Recomputes `sig_hash`/`PAT_HASH_INV`/`SAW_0`/`SAW_1` for a node from
    /// its current pattern. The signature is canonicalized so that a node
    /// and its exact complement hash identically except for the fold bit,
    /// which lets the signature table find both direct and complementary
    /// equivalence candidates.
    pub fn update_saw_and_hash(&self, arena: &mut NodeArena, idx: u32) {
        let pattern = arena.state(idx).pattern.clone();
        let mut saw_0 = false;
        let mut saw_1 = false;
        for &w in &pattern {
            if w != u64::MAX {
                saw_0 = true;
            }
            if w != 0 {
                saw_1 = true;
            }
        }

        let raw_hash = hash_words(&pattern);
        let inv_hash = hash_words_inverted(&pattern);
        let (sig_hash, inverted) = if raw_hash <= inv_hash {
            (raw_hash, false)
        } else {
            (inv_hash, true)
        };

        let state = arena.state_mut(idx);
        state.sig_hash = sig_hash;
        state.flags.set(NodeFlags::SAW_0, saw_0);
        state.flags.set(NodeFlags::SAW_1, saw_1);
        state.flags.set(NodeFlags::PAT_HASH_INV, inverted);
    }
}

fn hash_words(words: &[u64]) -> u64 {
    use std::hash::{BuildHasher, Hash, Hasher};
    let mut hasher = rapidhash::quality::RandomState::default().build_hasher();
    for w in words {
        w.hash(&mut hasher);
    }
    hasher.finish()
}

fn hash_words_inverted(words: &[u64]) -> u64 {
    use std::hash::{BuildHasher, Hash, Hasher};
    let mut hasher = rapidhash::quality::RandomState::default().build_hasher();
    for w in words {
        (!w).hash(&mut hasher);
    }
    hasher.finish()
}

/// Evaluates a handle's current simulated value at a given word/bit
/// position, applying the handle's own inversion. Used by the equivalence
/// engine to read off "are these two handles simulated equal everywhere
/// seen so far".
pub fn sample(arena: &NodeArena, h: FraigHandle, word: usize, bit: u32) -> bool {
    if h.node_index() == FraigHandle::CONST_INDEX {
        return h.is_inverted();
    }
    let state = arena.state(h.node_index());
    let w = state.pattern.get(word).copied().unwrap_or(0);
    let val = (w >> (bit % 64)) & 1 == 1;
    val ^ h.is_inverted()
}
