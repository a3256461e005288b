//! The node arena: owns every [`FraigNode`] and its mutable bookkeeping.

use bitflags::bitflags;

use crate::handle::FraigHandle;

bitflags! {
    /// Per-node mark bits: `saw_0`/`saw_1`/`pat_hash_inv`/`rep_inv`/`deleted`,
    /// packed into a single byte.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct NodeFlags: u8 {
        /// Simulation ever produced a `0` word for this node.
        const SAW_0 = 1 << 0;
        /// Simulation ever produced a `1` word for this node.
        const SAW_1 = 1 << 1;
        /// The node's canonical signature hash was computed over its
        /// inverted pattern (so candidates must be compared with the fold
        /// bit applied).
        const PAT_HASH_INV = 1 << 2;
        /// This node's representative-class edge is inverted relative to
        /// the node itself.
        const REP_INV = 1 << 3;
        /// The node has been folded into another node's equivalence class
        /// and is no longer live.
        const DELETED = 1 << 4;
    }
}

/// The structural content of a node: what it computes, not what's known
/// about it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FraigNode {
    /// The reserved constant node at arena index 0.
    Const,
    /// A primary input. `var` is this input's allocation-order index
    /// (0, 1, 2, ... in the order `make_input` was called), which seeds
    /// this node's deterministic initial simulation pattern (`sim.rs`).
    Input { var: u32 },
    /// An AND of two (possibly inverted) fanins, held in canonical
    /// (structural-hash key) order.
    And {
        fanin0: FraigHandle,
        fanin1: FraigHandle,
    },
}

impl FraigNode {
    /// `true` for [`FraigNode::Input`].
    pub fn is_input(&self) -> bool {
        matches!(self, FraigNode::Input { .. })
    }

    /// `true` for [`FraigNode::And`].
    pub fn is_and(&self) -> bool {
        matches!(self, FraigNode::And { .. })
    }

    /// The two fanins of an And node, if this is one.
    pub fn fanins(&self) -> Option<(FraigHandle, FraigHandle)> {
        match *self {
            FraigNode::And { fanin0, fanin1 } => Some((fanin0, fanin1)),
            _ => None,
        }
    }
}

/// Mutable per-node state that changes as the graph is built: simulation
/// words, equivalence-class membership, and hash-table bucket chains.
///
/// Kept in a side table parallel to the node arena (rather than inline on
/// `FraigNode`) so simulation/equivalence bookkeeping doesn't bloat the
/// structural key used for strash lookups.
#[derive(Clone, Debug, Default)]
pub struct NodeState {
    pub flags: NodeFlags,
    /// Bit-parallel simulation words for this node (see `crate::sim`).
    pub pattern: Vec<u64>,
    /// Cached signature hash over `pattern`, canonicalized against
    /// `PAT_HASH_INV`.
    pub sig_hash: u64,
    /// Next node in this node's structural-hash bucket chain.
    pub strash_link: Option<u32>,
    /// Next node in this node's signature-hash bucket chain.
    pub sig_link: Option<u32>,
    /// Representative node of this node's equivalence class (self if this
    /// node is its own representative).
    pub rep: u32,
    /// Whether `rep` is reached through this node's own polarity or its
    /// complement.
    pub rep_inv: bool,
    /// Next node folded into the same class as this one (intrusive list,
    /// valid only on a class representative's chain).
    pub eq_next: Option<u32>,
    /// Tail of the `eq_next` chain, valid only on a class representative.
    pub eq_tail: Option<u32>,
    /// Solver variable assigned to this node, if the SAT adapter has
    /// mirrored it yet.
    pub sat_var: Option<rustsat::types::Var>,
}

impl NodeState {
    pub fn is_deleted(&self) -> bool {
        self.flags.contains(NodeFlags::DELETED)
    }
}

/// Owns every node ever allocated plus its mutable state. Indices never get
/// reused or shrunk: a `deleted` node is logically folded away but its slot
/// stays valid so older handles never dangle.
#[derive(Default)]
pub struct NodeArena {
    nodes: Vec<FraigNode>,
    states: Vec<NodeState>,
}

impl NodeArena {
    pub fn new() -> Self {
        let mut arena = NodeArena::default();
        let idx = arena.push(FraigNode::Const);
        debug_assert_eq!(idx, FraigHandle::CONST_INDEX);
        arena.states[idx as usize].flags |= NodeFlags::SAW_0;
        arena
    }

    pub fn push(&mut self, node: FraigNode) -> u32 {
        let idx = self.nodes.len() as u32;
        self.nodes.push(node);
        self.states.push(NodeState::default());
        idx
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, idx: u32) -> &FraigNode {
        &self.nodes[idx as usize]
    }

    pub fn state(&self, idx: u32) -> &NodeState {
        &self.states[idx as usize]
    }

    pub fn state_mut(&mut self, idx: u32) -> &mut NodeState {
        &mut self.states[idx as usize]
    }

    /// Iterate `(index, node)` pairs in allocation order, which is also
    /// topological order since a node's fanins always have smaller indices
    /// than the node itself.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &FraigNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (i as u32, n))
    }

    /// The current representative handle for `h`, resolved by chasing
    /// `rep`/`rep_inv` once (callers keep classes flat by always pointing
    /// `rep` directly at the class representative on merge, so this never
    /// needs to loop).
    pub fn find(&self, h: FraigHandle) -> FraigHandle {
        let idx = h.node_index();
        let state = self.state(idx);
        if state.rep == idx {
            return h;
        }
        let rep = FraigHandle::new(state.rep, state.rep_inv);
        rep.with_polarity(h.is_inverted())
    }
}

impl std::ops::Index<u32> for NodeArena {
    type Output = FraigNode;
    fn index(&self, idx: u32) -> &FraigNode {
        self.node(idx)
    }
}
