//! The equivalence engine: drains signature candidates, proves or refutes
//! them with the SAT adapter, and folds proven-equal nodes into a single
//! representative.
//!
//! The per-node drive loop is a fixed-point iteration: keep processing
//! until nothing changes, bounded by a configured iteration cap rather
//! than running forever on a pathological input.

use std::collections::VecDeque;

use crate::handle::FraigHandle;
use crate::node::NodeArena;
use crate::sat::{SatAdapter, SatVerdict};
use crate::sigtable::{Candidate, SignatureTable};
use crate::sim::Simulator;

/// Drives simulation + signature matching + SAT-proving to fold
/// functionally-equivalent nodes together.
pub struct EquivEngine {
    candidates: VecDeque<Candidate>,
    loop_limit: usize,
    stable_rounds: usize,
    /// Total merges performed over this engine's lifetime. Callers that
    /// own the hash tables (`StrashTable`/`SignatureTable`) diff this
    /// across a `drain` call to decide whether a `rehash_dropping_deleted`
    /// pass is worth its cost (spec.md Design Notes: "deleted nodes must
    /// be eligible for removal from the structural bucket to keep lookups
    /// O(1)").
    pub merge_count: u64,
}

impl EquivEngine {
    pub fn new(loop_limit: usize) -> Self {
        EquivEngine {
            candidates: VecDeque::new(),
            loop_limit,
            stable_rounds: 0,
            merge_count: 0,
        }
    }

    pub fn set_loop_limit(&mut self, limit: usize) {
        self.loop_limit = limit;
    }

    /// Registers a freshly simulated node with the signature table, which
    /// may emit new candidates to process.
    pub fn observe(&mut self, sigs: &mut SignatureTable, arena: &mut NodeArena, idx: u32) {
        let new_candidates = sigs.insert(arena, idx);
        self.candidates.extend(new_candidates);
    }

    /// Drains the candidate queue, proving or refuting each pair against
    /// the SAT adapter, merging proven-equal classes, and re-simulating
    /// with injected counter-examples on refutation. Returns once the
    /// queue is empty or `loop_limit` consecutive rounds produced no
    /// change (a defensive bound; well-formed input drains the queue long
    /// before this fires).
    pub fn drain(
        &mut self,
        arena: &mut NodeArena,
        sim: &mut Simulator,
        sigs: &mut SignatureTable,
        sat: &mut SatAdapter,
    ) {
        while let Some(candidate) = self.candidates.pop_front() {
            if self.stable_rounds >= self.loop_limit {
                tracing::warn!(
                    loop_limit = self.loop_limit,
                    "equivalence engine hit its loop limit with candidates still queued"
                );
                break;
            }

            if arena.state(candidate.node).is_deleted() || arena.state(candidate.partner).is_deleted() {
                continue;
            }

            let a = FraigHandle::new(candidate.node, false);
            let b = FraigHandle::new(candidate.partner, candidate.complementary);
            let a = arena.find(a);
            let b = arena.find(b);
            if a.node_index() == b.node_index() {
                // already merged via an earlier candidate in this batch
                self.stable_rounds = 0;
                continue;
            }

            match sat.check_equivalent(arena, a, b) {
                SatVerdict::Equivalent => {
                    // lower node-id wins as representative (spec.md §4.5
                    // step 2), independent of which side of the candidate
                    // pair happened to be the newer node.
                    let (winner, loser) = if a.node_index() <= b.node_index() {
                        (a, b)
                    } else {
                        (b, a)
                    };
                    self.merge(arena, winner, loser);
                    self.stable_rounds = 0;
                    tracing::debug!(?winner, ?loser, "proved equivalent, merged");
                }
                SatVerdict::NotEquivalent => {
                    let model = sat.last_model().to_vec();
                    let word = arena.state(candidate.node).pattern.len();
                    sim.inject_counterexample(arena, word, &model);
                    let indices: Vec<u32> = (0..arena.len() as u32).collect();
                    for idx in indices {
                        if !arena.state(idx).is_deleted() {
                            // only And nodes and inputs carry live patterns;
                            // re-derive And patterns from fanins so the new
                            // counter-example bit propagates through the DAG.
                            if let Some((f0, f1)) = arena.node(idx).fanins() {
                                sim.simulate_and(arena, idx, f0, f1);
                            } else if arena.node(idx).is_input() {
                                sim.update_saw_and_hash(arena, idx);
                            }
                        }
                    }
                    self.stable_rounds = 0;
                    tracing::trace!(?a, ?b, "refuted by SAT, re-simulated");
                }
                SatVerdict::Unknown => {
                    self.stable_rounds += 1;
                    tracing::trace!(?a, ?b, "SAT solver returned unknown, dropping candidate");
                }
            }
        }
    }

    /// Folds `loser` into `winner`'s equivalence class. `winner` is kept as
    /// the arena's canonical survivor (callers resolve through
    /// `NodeArena::find` before ever reading `loser` again).
    fn merge(&mut self, arena: &mut NodeArena, winner: FraigHandle, loser: FraigHandle) {
        let (winner_idx, winner_inv) = (winner.node_index(), winner.is_inverted());
        let (loser_idx, loser_inv) = (loser.node_index(), loser.is_inverted());

        // loser's rep becomes winner's rep; rep_inv composes the two
        // polarity flips so later `find` calls land with the right sign.
        arena.state_mut(loser_idx).rep = winner_idx;
        arena.state_mut(loser_idx).rep_inv = winner_inv != loser_inv;
        arena.state_mut(loser_idx).flags |= crate::node::NodeFlags::DELETED;

        let tail = arena.state(winner_idx).eq_tail.unwrap_or(winner_idx);
        arena.state_mut(tail).eq_next = Some(loser_idx);
        arena.state_mut(winner_idx).eq_tail = Some(loser_idx);
        self.merge_count += 1;
    }
}
