//! The public construction and verification API: [`FraigMgr`].
//!
//! Ties the node arena, simulator, structural/signature hash tables, SAT
//! adapter and equivalence engine together behind one gate-construction
//! and equivalence-query surface, with full constant/identity/complement
//! folding applied before any node is ever allocated.

use std::io;

use hashbrown::HashMap;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::{level_from_int, FraigConfig, SolverKind, SwappableWriter};
use crate::equiv::EquivEngine;
use crate::handle::FraigHandle;
use crate::node::{FraigNode, NodeArena};
use crate::sat::{SatAdapter, SatVerdict};
use crate::sigtable::SignatureTable;
use crate::sim::Simulator;

/// Snapshot of manager state for `dump_stats`.
#[derive(Clone, Copy, Debug)]
pub struct FraigStats {
    pub total_nodes: usize,
    pub live_nodes: usize,
    pub input_nodes: usize,
    pub and_nodes: usize,
    pub strash_entries: usize,
    pub sig_buckets: usize,
}

/// A functionally reduced and-inverter graph manager.
///
/// Construction calls (`make_and`, `make_or`, ...) always return a handle
/// into the manager's *current* canonical representative for the function
/// requested. If an equivalent node already existed (structurally or
/// functionally), no new node is allocated.
pub struct FraigMgr {
    arena: NodeArena,
    sim: Simulator,
    strash: crate::strash::StrashTable,
    sigs: SignatureTable,
    sat: SatAdapter,
    equiv: EquivEngine,
    config: FraigConfig,
    log_writer: SwappableWriter,
    _log_guard: tracing::subscriber::DefaultGuard,
    /// Next input's allocation-order index, handed out by `make_input`.
    next_input: u32,
}

impl FraigMgr {
    /// Creates a new manager. `sig_size` is the number of simulation words
    /// per node (larger catches more spurious candidates before they reach
    /// the SAT adapter, at linear memory cost); `solver` selects the SAT
    /// backend mirroring the AIG.
    pub fn new(sig_size: usize, solver: SolverKind) -> Self {
        let config = FraigConfig {
            sig_size,
            solver,
            ..FraigConfig::default()
        };

        let log_writer = SwappableWriter::new(Box::new(io::stderr()));
        let guard = install_subscriber(&log_writer, config.log_level);

        FraigMgr {
            arena: NodeArena::new(),
            sim: Simulator::new(sig_size),
            strash: crate::strash::StrashTable::new(),
            sigs: SignatureTable::new(),
            sat: SatAdapter::new(solver),
            equiv: EquivEngine::new(config.loop_limit),
            config,
            log_writer,
            _log_guard: guard,
            next_input: 0,
        }
    }

    // ---- constants and literals -------------------------------------

    pub fn make_const(&self, value: bool) -> FraigHandle {
        if value { FraigHandle::ONE } else { FraigHandle::ZERO }
    }

    /// Allocates a fresh primary input. The input's index is assigned in
    /// allocation order (spec.md §4.1/§6.2: "input index assigned in
    /// allocation order") -- callers don't supply or manage it.
    pub fn make_input(&mut self) -> FraigHandle {
        let var = self.next_input;
        self.next_input += 1;

        let idx = self.arena.push(FraigNode::Input { var });
        self.arena.state_mut(idx).rep = idx;
        self.sim.init_input(&mut self.arena, idx, var);
        self.sat.register_input(&mut self.arena, idx);
        self.equiv.observe(&mut self.sigs, &mut self.arena, idx);
        self.drain_and_rehash();
        self.arena.find(FraigHandle::new(idx, false))
    }

    // ---- core gate ----------------------------------------------------

    /// `a AND b`, with full constant/identity/idempotence/complement
    /// folding before ever touching the strash table.
    pub fn make_and(&mut self, a: FraigHandle, b: FraigHandle) -> FraigHandle {
        let a = self.arena.find(a);
        let b = self.arena.find(b);

        if a == FraigHandle::ZERO || b == FraigHandle::ZERO {
            return FraigHandle::ZERO;
        }
        if a == FraigHandle::ONE {
            return b;
        }
        if b == FraigHandle::ONE {
            return a;
        }
        if a == b {
            return a;
        }
        if a == b.not() {
            return FraigHandle::ZERO;
        }

        let (fanin0, fanin1) = if a.raw() <= b.raw() { (a, b) } else { (b, a) };
        self.make_and_raw(fanin0, fanin1)
    }

    fn make_and_raw(&mut self, fanin0: FraigHandle, fanin1: FraigHandle) -> FraigHandle {
        let before = self.arena.len();
        let idx = self.strash.get_or_insert(&mut self.arena, fanin0, fanin1, |arena| {
            arena.push(FraigNode::And { fanin0, fanin1 })
        });

        if self.arena.len() > before {
            self.arena.state_mut(idx).rep = idx;
            self.sim.simulate_and(&mut self.arena, idx, fanin0, fanin1);
            self.sat.register_and(&mut self.arena, idx, fanin0, fanin1);
            self.equiv.observe(&mut self.sigs, &mut self.arena, idx);
            self.drain_and_rehash();
        }
        self.arena.find(FraigHandle::new(idx, false))
    }

    /// Drains the equivalence engine's candidate queue, then drops
    /// deleted nodes from both hash tables' chains if that drain produced
    /// any merges -- the "rebuild by re-inserting live, non-deleted
    /// nodes" design note (spec.md §9), gated on actual merges so an
    /// unproductive drain doesn't pay a full table scan.
    fn drain_and_rehash(&mut self) {
        let before = self.equiv.merge_count;
        self.equiv
            .drain(&mut self.arena, &mut self.sim, &mut self.sigs, &mut self.sat);
        if self.equiv.merge_count > before {
            self.strash.rehash_dropping_deleted(&self.arena);
            self.sigs.rehash_dropping_deleted(&self.arena);
        }
    }

    /// `a OR b`, via De Morgan over `make_and`.
    pub fn make_or(&mut self, a: FraigHandle, b: FraigHandle) -> FraigHandle {
        self.make_and(a.not(), b.not()).not()
    }

    pub fn make_nand(&mut self, a: FraigHandle, b: FraigHandle) -> FraigHandle {
        self.make_and(a, b).not()
    }

    pub fn make_nor(&mut self, a: FraigHandle, b: FraigHandle) -> FraigHandle {
        self.make_or(a, b).not()
    }

    /// `a XOR b`, built as `(a & !b) | (!a & b)`.
    pub fn make_xor(&mut self, a: FraigHandle, b: FraigHandle) -> FraigHandle {
        let t0 = self.make_and(a, b.not());
        let t1 = self.make_and(a.not(), b);
        self.make_or(t0, t1)
    }

    pub fn make_xnor(&mut self, a: FraigHandle, b: FraigHandle) -> FraigHandle {
        self.make_xor(a, b).not()
    }

    /// Identity: returns `a` unchanged. Exists alongside `make_not` so
    /// callers driving a generic gate-kind dispatch (e.g.
    /// [`crate::external::import_subnetwork`]'s `Buff`/`Not` cases) don't
    /// need to special-case the single-fanin gates as handle-level ops.
    pub fn make_buff(&self, a: FraigHandle) -> FraigHandle {
        a
    }

    /// `NOT a`, as an edge complement -- `make_not(x) == ¬x` (spec.md §8).
    pub fn make_not(&self, a: FraigHandle) -> FraigHandle {
        a.not()
    }

    // ---- balanced N-ary reductions ------------------------------------
    //
    // Balanced pairwise recursion: split the list in half, reduce each
    // half, combine. Keeps the resulting subgraph's depth logarithmic in
    // the list length rather than linear, the way a left-fold over
    // `make_and` would.

    /// `AND` of every handle in `items`.
    ///
    /// # Panics
    /// Panics if `items` is empty. There is no well-defined identity
    /// handle to return without a manager-level "true" that callers didn't
    /// ask for.
    pub fn make_and_list(&mut self, items: &[FraigHandle]) -> FraigHandle {
        assert!(!items.is_empty(), "make_and_list: list of fanins must not be empty");
        self.balanced_reduce(items, Self::make_and)
    }

    /// `OR` of every handle in `items`.
    ///
    /// # Panics
    /// Panics if `items` is empty, for the same reason as [`Self::make_and_list`].
    pub fn make_or_list(&mut self, items: &[FraigHandle]) -> FraigHandle {
        assert!(!items.is_empty(), "make_or_list: list of fanins must not be empty");
        self.balanced_reduce(items, Self::make_or)
    }

    /// `XOR` of every handle in `items`.
    ///
    /// # Panics
    /// Panics if `items` is empty, for the same reason as [`Self::make_and_list`].
    pub fn make_xor_list(&mut self, items: &[FraigHandle]) -> FraigHandle {
        assert!(!items.is_empty(), "make_xor_list: list of fanins must not be empty");
        self.balanced_reduce(items, Self::make_xor)
    }

    fn balanced_reduce(
        &mut self,
        items: &[FraigHandle],
        combine: fn(&mut Self, FraigHandle, FraigHandle) -> FraigHandle,
    ) -> FraigHandle {
        if items.len() == 1 {
            return items[0];
        }
        let mid = (items.len() + 1) / 2;
        let lo = self.balanced_reduce(&items[..mid], combine);
        let hi = self.balanced_reduce(&items[mid..], combine);
        combine(self, lo, hi)
    }

    // ---- cofactor -------------------------------------------------------

    /// Substitutes the primary input `var` with the constant `value`
    /// throughout `f`'s transitive fanin, and returns the (possibly newly
    /// built) resulting handle. `var`'s own polarity is ignored -- it only
    /// identifies which input node to substitute.
    ///
    /// Implemented as an explicit-stack, memoized post-order walk rather
    /// than plain recursion, so depth is bounded by available heap, not
    /// stack.
    pub fn cofactor(&mut self, f: FraigHandle, var: FraigHandle, value: bool) -> FraigHandle {
        let var_index = var.node_index();
        let mut memo: HashMap<u32, FraigHandle> = HashMap::new();
        let mut stack = vec![f.node_index()];

        while let Some(&idx) = stack.last() {
            if memo.contains_key(&idx) {
                stack.pop();
                continue;
            }
            match *self.arena.node(idx) {
                FraigNode::Const => {
                    memo.insert(idx, FraigHandle::new(idx, false));
                    stack.pop();
                }
                FraigNode::Input { .. } => {
                    let result = if idx == var_index {
                        self.make_const(value)
                    } else {
                        FraigHandle::new(idx, false)
                    };
                    memo.insert(idx, result);
                    stack.pop();
                }
                FraigNode::And { fanin0, fanin1 } => {
                    let i0 = fanin0.node_index();
                    let i1 = fanin1.node_index();
                    let need0 = !memo.contains_key(&i0);
                    let need1 = !memo.contains_key(&i1);
                    if need0 || need1 {
                        if need0 {
                            stack.push(i0);
                        }
                        if need1 {
                            stack.push(i1);
                        }
                    } else {
                        let c0 = memo[&i0].with_polarity(fanin0.is_inverted());
                        let c1 = memo[&i1].with_polarity(fanin1.is_inverted());
                        let result = self.make_and(c0, c1);
                        memo.insert(idx, result);
                        stack.pop();
                    }
                }
            }
        }

        memo[&f.node_index()].with_polarity(f.is_inverted())
    }

    // ---- verification ---------------------------------------------------

    /// Proves or refutes `a == b`, independent of any construction-time
    /// equivalence already discovered (those short-circuit to
    /// `Equivalent` immediately via union-find).
    pub fn check_equiv(&mut self, a: FraigHandle, b: FraigHandle) -> SatVerdict {
        let a = self.arena.find(a);
        let b = self.arena.find(b);
        if a == b {
            return SatVerdict::Equivalent;
        }
        self.sat.check_equivalent(&self.arena, a, b)
    }

    /// Sets the minimum severity the manager's own logging emits, using
    /// the same integer-level mapping as [`level_from_int`].
    pub fn set_loglevel(&mut self, level: i32) {
        self.config.log_level = level_from_int(level);
        self._log_guard = install_subscriber(&self.log_writer, self.config.log_level);
    }

    /// Redirects the manager's own log output to `writer`.
    pub fn set_logstream(&mut self, writer: Box<dyn io::Write + Send>) {
        self.log_writer.swap(writer);
    }

    /// Bounds how many consecutive SAT-unknown verdicts the equivalence
    /// engine tolerates before abandoning the remaining candidate queue.
    pub fn set_loop_limit(&mut self, limit: usize) {
        self.config.loop_limit = limit;
        self.equiv.set_loop_limit(limit);
    }

    /// A snapshot of node/table counts, for diagnostics.
    pub fn stats(&self) -> FraigStats {
        let mut input_nodes = 0;
        let mut and_nodes = 0;
        let mut live_nodes = 0;
        for (idx, node) in self.arena.iter() {
            if !self.arena.state(idx).is_deleted() {
                live_nodes += 1;
            }
            match node {
                FraigNode::Input { .. } => input_nodes += 1,
                FraigNode::And { .. } => and_nodes += 1,
                FraigNode::Const => {}
            }
        }
        FraigStats {
            total_nodes: self.arena.len(),
            live_nodes,
            input_nodes,
            and_nodes,
            strash_entries: self.strash.len(),
            sig_buckets: self.sigs.len(),
        }
    }

    /// Writes [`Self::stats`] to `sink`, one `key=value` pair per line.
    /// Matches the original `FraigMgr::dump_stats(ostream&)` signature
    /// (spec.md §6.3): an observability knob that never affects
    /// construction results.
    pub fn dump_stats(&self, sink: &mut dyn io::Write) -> io::Result<()> {
        let stats = self.stats();
        writeln!(sink, "total_nodes={}", stats.total_nodes)?;
        writeln!(sink, "live_nodes={}", stats.live_nodes)?;
        writeln!(sink, "input_nodes={}", stats.input_nodes)?;
        writeln!(sink, "and_nodes={}", stats.and_nodes)?;
        writeln!(sink, "strash_entries={}", stats.strash_entries)?;
        writeln!(sink, "sig_buckets={}", stats.sig_buckets)
    }

    pub(crate) fn arena(&self) -> &NodeArena {
        &self.arena
    }
}

fn install_subscriber(
    writer: &SwappableWriter,
    level: tracing::Level,
) -> tracing::subscriber::DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer.clone())
        .finish();
    tracing::subscriber::set_default(subscriber)
}
