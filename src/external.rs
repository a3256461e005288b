//! Read-only import contracts for external Boolean-network representations,
//! and the subnetwork importer built on top of them.
//!
//! Walks a caller-supplied network in topological order, building a handle
//! for each of its nodes from the handles already built for its fanins,
//! and hands back the constructed outputs. This crate never holds a
//! reference to the external network past the single `import_subnetwork`
//! call -- the map from external ids to [`FraigHandle`]s is entirely
//! local to that call.

use hashbrown::HashMap;

use crate::handle::FraigHandle;
use crate::mgr::FraigMgr;

/// One node of an externally-supplied combinational network, as the
/// importer sees it. `Expr`/`TvFunc` carry enough information to be
/// synthesized without consulting the rest of the network.
#[derive(Clone, Debug)]
pub enum ExternalNodeKind {
    Const0,
    Const1,
    Input,
    Buff(usize),
    Not(usize),
    And(Vec<usize>),
    Nand(Vec<usize>),
    Or(Vec<usize>),
    Nor(Vec<usize>),
    Xor(Vec<usize>),
    Xnor(Vec<usize>),
    /// An arbitrary Boolean expression over this node's own fanin list,
    /// synthesized via [`make_expr`].
    Expr(ExprNode),
    /// A raw truth table over this node's fanin list, given as the set of
    /// minterms (each a full assignment to every fanin) for which the
    /// function is `1`.
    TvFunc { num_inputs: usize, minterms: Vec<u64> },
}

/// One node of an externally-supplied network: its kind plus the fanin
/// list referenced by index into the node's own `ExternalNodeKind`
/// variant (for `Buff`/`Not`/`And`/.../`Xnor`) or, for `Expr`/`TvFunc`,
/// the external node ids supplying each input position.
#[derive(Clone, Debug)]
pub struct ExternalNode {
    pub kind: ExternalNodeKind,
    pub fanins: Vec<usize>,
}

/// A read-only combinational network to import. Implementors hand back
/// nodes in any order; the importer itself is responsible for visiting
/// them in dependency order (inputs, then every logic node whose fanins
/// have already been visited).
pub trait LogicNetwork {
    fn node_count(&self) -> usize;
    fn node(&self, id: usize) -> &ExternalNode;
    /// External ids that are this network's designated outputs.
    fn outputs(&self) -> &[usize];
}

/// Builds every node of `net` inside `mgr` and returns the handles
/// corresponding to `net.outputs()`, in order.
///
/// # Panics
/// Panics if a node references a fanin id with no corresponding entry in
/// the in-progress `id -> handle` map at the point it's visited (the
/// external network is not in topological order).
pub fn import_subnetwork(mgr: &mut FraigMgr, net: &dyn LogicNetwork) -> Vec<FraigHandle> {
    let mut built: HashMap<usize, FraigHandle> = HashMap::new();

    for id in 0..net.node_count() {
        let node = net.node(id);
        let handle = build_node(mgr, &built, node);
        built.insert(id, handle);
    }

    net.outputs()
        .iter()
        .map(|id| {
            *built
                .get(id)
                .unwrap_or_else(|| panic!("import_subnetwork: output id {id} was never built"))
        })
        .collect()
}

fn lookup(built: &HashMap<usize, FraigHandle>, id: usize) -> FraigHandle {
    *built
        .get(&id)
        .unwrap_or_else(|| panic!("import_subnetwork: fanin id {id} referenced before it was built"))
}

fn build_node(
    mgr: &mut FraigMgr,
    built: &HashMap<usize, FraigHandle>,
    node: &ExternalNode,
) -> FraigHandle {
    match &node.kind {
        ExternalNodeKind::Const0 => mgr.make_const(false),
        ExternalNodeKind::Const1 => mgr.make_const(true),
        ExternalNodeKind::Input => mgr.make_input(),
        ExternalNodeKind::Buff(a) => mgr.make_buff(lookup(built, *a)),
        ExternalNodeKind::Not(a) => mgr.make_not(lookup(built, *a)),
        ExternalNodeKind::And(fanins) => {
            let handles: Vec<_> = fanins.iter().map(|&id| lookup(built, id)).collect();
            mgr.make_and_list(&handles)
        }
        ExternalNodeKind::Nand(fanins) => {
            let handles: Vec<_> = fanins.iter().map(|&id| lookup(built, id)).collect();
            mgr.make_and_list(&handles).not()
        }
        ExternalNodeKind::Or(fanins) => {
            let handles: Vec<_> = fanins.iter().map(|&id| lookup(built, id)).collect();
            mgr.make_or_list(&handles)
        }
        ExternalNodeKind::Nor(fanins) => {
            let handles: Vec<_> = fanins.iter().map(|&id| lookup(built, id)).collect();
            mgr.make_or_list(&handles).not()
        }
        ExternalNodeKind::Xor(fanins) => {
            let handles: Vec<_> = fanins.iter().map(|&id| lookup(built, id)).collect();
            mgr.make_xor_list(&handles)
        }
        ExternalNodeKind::Xnor(fanins) => {
            let handles: Vec<_> = fanins.iter().map(|&id| lookup(built, id)).collect();
            mgr.make_xor_list(&handles).not()
        }
        ExternalNodeKind::Expr(expr) => {
            let handles: Vec<_> = node.fanins.iter().map(|&id| lookup(built, id)).collect();
            make_expr(mgr, expr, &handles)
        }
        ExternalNodeKind::TvFunc { num_inputs, minterms } => {
            let handles: Vec<_> = node.fanins.iter().map(|&id| lookup(built, id)).collect();
            assert_eq!(
                handles.len(),
                *num_inputs,
                "import_subnetwork: TvFunc node declares {num_inputs} inputs but got {} fanins",
                handles.len()
            );
            import_tv_func(mgr, &handles, minterms)
        }
    }
}

/// A node of an externally-supplied Boolean expression tree (spec.md
/// §6.2's `make_expr`): the "expression datatype" collaborator named in
/// spec.md §1, reduced to the shape this crate actually consumes.
/// Literals name an input by position in the `inputs` slice passed to
/// [`make_expr`]; internal nodes fold their own children with the
/// matching balanced list combinator.
#[derive(Clone, Debug)]
pub enum ExprNode {
    Const(bool),
    Literal { var: usize, positive: bool },
    And(Vec<ExprNode>),
    Or(Vec<ExprNode>),
    Xor(Vec<ExprNode>),
}

/// Recursive descent over an [`ExprNode`] tree, building one handle per
/// node against `mgr`. Grounded on `FraigMgr::make_expr` in
/// `examples/original_source/c++-src/FraigMgr.cc`: a constant maps
/// directly to `make_zero`/`make_one`; a positive literal with var id
/// `v` returns `inputs[v]`, a negative literal its complement; `And`/
/// `Or`/`Xor` fold their already-built children with the matching list
/// combinator.
///
/// # Panics
/// Panics if a literal names a `var` outside `inputs`' bounds, mirroring
/// the original's `ASSERT_COND(id < inputs.size())`.
pub fn make_expr(mgr: &mut FraigMgr, expr: &ExprNode, inputs: &[FraigHandle]) -> FraigHandle {
    match expr {
        ExprNode::Const(value) => mgr.make_const(*value),
        ExprNode::Literal { var, positive } => {
            let h = *inputs.get(*var).unwrap_or_else(|| {
                panic!(
                    "make_expr: literal var id {var} out of range ({} inputs)",
                    inputs.len()
                )
            });
            if *positive { h } else { h.not() }
        }
        ExprNode::And(children) => {
            let built: Vec<FraigHandle> = children.iter().map(|c| make_expr(mgr, c, inputs)).collect();
            mgr.make_and_list(&built)
        }
        ExprNode::Or(children) => {
            let built: Vec<FraigHandle> = children.iter().map(|c| make_expr(mgr, c, inputs)).collect();
            mgr.make_or_list(&built)
        }
        ExprNode::Xor(children) => {
            let built: Vec<FraigHandle> = children.iter().map(|c| make_expr(mgr, c, inputs)).collect();
            mgr.make_xor_list(&built)
        }
    }
}

/// Synthesizes a node from its raw truth table. Each minterm in the
/// on-set becomes one AND-of-literals cube; the cubes are ORed together.
/// `minterms[i]` bit `j` is fanin `j`'s value in minterm `i`'s assignment.
fn import_tv_func(mgr: &mut FraigMgr, fanins: &[FraigHandle], minterms: &[u64]) -> FraigHandle {
    if minterms.is_empty() {
        return mgr.make_const(false);
    }
    let products: Vec<FraigHandle> = minterms
        .iter()
        .map(|&assignment| {
            let literals: Vec<FraigHandle> = fanins
                .iter()
                .enumerate()
                .map(|(j, &h)| {
                    if (assignment >> j) & 1 == 1 { h } else { h.not() }
                })
                .collect();
            mgr.make_and_list(&literals)
        })
        .collect();
    mgr.make_or_list(&products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::{SatVerdict, SolverKind};

    struct TinyNet {
        nodes: Vec<ExternalNode>,
        outputs: Vec<usize>,
    }

    impl LogicNetwork for TinyNet {
        fn node_count(&self) -> usize {
            self.nodes.len()
        }
        fn node(&self, id: usize) -> &ExternalNode {
            &self.nodes[id]
        }
        fn outputs(&self) -> &[usize] {
            &self.outputs
        }
    }

    #[test]
    fn imports_a_two_input_and_gate() {
        let net = TinyNet {
            nodes: vec![
                ExternalNode { kind: ExternalNodeKind::Input, fanins: vec![] },
                ExternalNode { kind: ExternalNodeKind::Input, fanins: vec![] },
                ExternalNode { kind: ExternalNodeKind::And(vec![0, 1]), fanins: vec![] },
            ],
            outputs: vec![2],
        };

        let mut mgr = FraigMgr::new(8, SolverKind::Kissat);
        let outs = import_subnetwork(&mut mgr, &net);
        assert_eq!(outs.len(), 1);

        // arena index 0 is the reserved constant, so the importer's two
        // Input nodes landed at indices 1 and 2, in visitation order.
        let in0 = FraigHandle::new(1, false);
        let in1 = FraigHandle::new(2, false);

        // an AND gate is 1 only when both inputs are 1: check all four
        // corners of the truth table by cofactoring down to a constant.
        for (v0, v1) in [(false, false), (false, true), (true, false), (true, true)] {
            let cof = mgr.cofactor(mgr.cofactor(outs[0], in0, v0), in1, v1);
            let expected = mgr.make_const(v0 && v1);
            assert_eq!(
                mgr.check_equiv(cof, expected),
                SatVerdict::Equivalent,
                "AND({v0}, {v1}) mismatch"
            );
        }
    }

    #[test]
    fn tv_func_synthesizes_the_and_function_from_its_truth_table() {
        let net = TinyNet {
            nodes: vec![
                ExternalNode { kind: ExternalNodeKind::Input, fanins: vec![] },
                ExternalNode { kind: ExternalNodeKind::Input, fanins: vec![] },
                ExternalNode {
                    kind: ExternalNodeKind::TvFunc {
                        num_inputs: 2,
                        minterms: vec![0b11], // only both-true row is on
                    },
                    fanins: vec![0, 1],
                },
            ],
            outputs: vec![2],
        };

        let mut mgr = FraigMgr::new(8, SolverKind::Kissat);
        let outs = import_subnetwork(&mut mgr, &net);

        let in0 = FraigHandle::new(1, false);
        let in1 = FraigHandle::new(2, false);
        for (v0, v1) in [(false, false), (false, true), (true, false), (true, true)] {
            let cof = mgr.cofactor(mgr.cofactor(outs[0], in0, v0), in1, v1);
            let expected = mgr.make_const(v0 && v1);
            assert_eq!(
                mgr.check_equiv(cof, expected),
                SatVerdict::Equivalent,
                "TvFunc(AND)({v0}, {v1}) mismatch"
            );
        }
    }

    #[test]
    fn make_expr_builds_a_majority_function_from_a_literal_tree() {
        let mut mgr = FraigMgr::new(8, SolverKind::Kissat);
        let a = mgr.make_input();
        let b = mgr.make_input();
        let c = mgr.make_input();
        let inputs = [a, b, c];

        // majority(a, b, c) = (a&b) | (a&c) | (b&c)
        let expr = ExprNode::Or(vec![
            ExprNode::And(vec![
                ExprNode::Literal { var: 0, positive: true },
                ExprNode::Literal { var: 1, positive: true },
            ]),
            ExprNode::And(vec![
                ExprNode::Literal { var: 0, positive: true },
                ExprNode::Literal { var: 2, positive: true },
            ]),
            ExprNode::And(vec![
                ExprNode::Literal { var: 1, positive: true },
                ExprNode::Literal { var: 2, positive: true },
            ]),
        ]);
        let via_expr = make_expr(&mut mgr, &expr, &inputs);

        let direct = mgr.make_or_list(&[
            mgr.make_and(a, b),
            mgr.make_and(a, c),
            mgr.make_and(b, c),
        ]);
        assert_eq!(mgr.check_equiv(via_expr, direct), SatVerdict::Equivalent);
    }

    #[test]
    fn make_expr_negative_literal_complements_its_input() {
        let mut mgr = FraigMgr::new(8, SolverKind::Kissat);
        let a = mgr.make_input();
        let expr = ExprNode::Literal { var: 0, positive: false };
        let via_expr = make_expr(&mut mgr, &expr, &[a]);
        assert_eq!(mgr.check_equiv(via_expr, a.not()), SatVerdict::Equivalent);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn make_expr_panics_on_out_of_range_var_id() {
        let mut mgr = FraigMgr::new(8, SolverKind::Kissat);
        let a = mgr.make_input();
        let expr = ExprNode::Literal { var: 5, positive: true };
        let _ = make_expr(&mut mgr, &expr, &[a]);
    }
}
