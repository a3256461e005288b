//! SAT adapter: keeps one persistent CNF mirror of the AIG and answers
//! equivalence queries against it incrementally.
//!
//! Every And node gets a solver variable and three Tseitin clauses the
//! moment it's created; an equivalence query is then just "is `a XOR b`
//! satisfiable under assumption `a != b`", asked as an incremental solve
//! with assumptions so the persistent clause database is never rebuilt.

use rustsat::instances::{BasicVarManager, ManageVars};
use rustsat::solvers::{Solve, SolveIncremental, SolverResult};
use rustsat::types::{Clause, Lit, TernaryVal, Var};

use crate::handle::FraigHandle;
use crate::node::NodeArena;

/// Outcome of an equivalence query. SAT-unknown is a first-class result
/// here rather than an error: the caller decides whether to retry later.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SatVerdict {
    /// The two handles are proven functionally equal.
    Equivalent,
    /// The two handles are proven functionally distinct; a distinguishing
    /// input assignment is attached by the caller via
    /// [`SatAdapter::last_model`].
    NotEquivalent,
    /// The solver could not decide within its resource budget.
    Unknown,
}

/// Which concrete SAT backend to use. `Kissat` is the default (matching
/// `quaigh`'s choice of `rustsat-kissat`); `Cadical` is available behind
/// the `cadical` feature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolverKind {
    #[default]
    Kissat,
    #[cfg(feature = "cadical")]
    Cadical,
}

enum Backend {
    Kissat(rustsat_kissat::Kissat),
    #[cfg(feature = "cadical")]
    Cadical(rustsat_cadical::CaDiCaL<'static, 'static>),
}

/// Persistent CNF mirror of the AIG plus the solver instance querying it.
pub struct SatAdapter {
    backend: Backend,
    var_manager: BasicVarManager,
    const_var: Var,
    last_model: Vec<(u32, bool)>,
}

impl SatAdapter {
    pub fn new(kind: SolverKind) -> Self {
        let mut var_manager = BasicVarManager::default();
        let const_var = var_manager.new_var();

        let mut backend = match kind {
            SolverKind::Kissat => Backend::Kissat(rustsat_kissat::Kissat::default()),
            #[cfg(feature = "cadical")]
            SolverKind::Cadical => Backend::Cadical(rustsat_cadical::CaDiCaL::default()),
        };
        // constant node is always true
        Self::add_clause_to(&mut backend, Clause::from_iter([Lit::positive(const_var)]));

        SatAdapter {
            backend,
            var_manager,
            const_var,
            last_model: Vec::new(),
        }
    }

    fn add_clause_to(backend: &mut Backend, clause: Clause) {
        match backend {
            Backend::Kissat(s) => {
                let _ = s.add_clause(clause);
            }
            #[cfg(feature = "cadical")]
            Backend::Cadical(s) => {
                let _ = s.add_clause(clause);
            }
        }
    }

    fn add_clause(&mut self, clause: Clause) {
        Self::add_clause_to(&mut self.backend, clause);
    }

    fn solve_assuming(&mut self, assumptions: &[Lit]) -> Result<SolverResult, rustsat::solvers::SolverError> {
        match &mut self.backend {
            Backend::Kissat(s) => s.solve_assumps(assumptions),
            #[cfg(feature = "cadical")]
            Backend::Cadical(s) => s.solve_assumps(assumptions),
        }
    }

    fn lit_value(&mut self, lit: Lit) -> TernaryVal {
        match &mut self.backend {
            Backend::Kissat(s) => s.lit_val(lit).unwrap_or(TernaryVal::DontCare),
            #[cfg(feature = "cadical")]
            Backend::Cadical(s) => s.lit_val(lit).unwrap_or(TernaryVal::DontCare),
        }
    }

    /// The solver literal a node's constant-`true` polarity maps to.
    fn var_for(&self, idx: u32, arena: &NodeArena) -> Var {
        arena
            .state(idx)
            .sat_var
            .unwrap_or(self.const_var) // only ever hit for the reserved const node
    }

    fn lit_for(&self, h: FraigHandle, arena: &NodeArena) -> Lit {
        if h.is_const() {
            return if h.is_inverted() {
                Lit::positive(self.const_var)
            } else {
                Lit::negative(self.const_var)
            };
        }
        let var = self.var_for(h.node_index(), arena);
        if h.is_inverted() { Lit::negative(var) } else { Lit::positive(var) }
    }

    /// Allocates a solver variable for a freshly created And node and
    /// asserts the three Tseitin clauses `y = a & b`:
    /// `(!y | a) & (!y | b) & (y | !a | !b)`.
    pub fn register_and(
        &mut self,
        arena: &mut NodeArena,
        idx: u32,
        fanin0: FraigHandle,
        fanin1: FraigHandle,
    ) {
        let y = self.var_manager.new_var();
        arena.state_mut(idx).sat_var = Some(y);

        let a = self.lit_for(fanin0, arena);
        let b = self.lit_for(fanin1, arena);
        let y_lit = Lit::positive(y);

        self.add_clause(Clause::from_iter([!y_lit, a]));
        self.add_clause(Clause::from_iter([!y_lit, b]));
        self.add_clause(Clause::from_iter([y_lit, !a, !b]));
    }

    /// Allocates a solver variable for a primary input (no clauses; its
    /// value is free).
    pub fn register_input(&mut self, arena: &mut NodeArena, idx: u32) {
        let v = self.var_manager.new_var();
        arena.state_mut(idx).sat_var = Some(v);
    }

    /// Proves or refutes `a == b` by checking satisfiability of `a XOR b`
    /// under assumptions. On a `NotEquivalent` verdict, the distinguishing
    /// input assignment is left in [`Self::last_model`].
    pub fn check_equivalent(&mut self, arena: &NodeArena, a: FraigHandle, b: FraigHandle) -> SatVerdict {
        if a == b {
            return SatVerdict::Equivalent;
        }
        let la = self.lit_for(a, arena);
        let lb = self.lit_for(b, arena);

        // introduce an auxiliary variable x = a XOR b, assume x, ask for SAT.
        let x = self.var_manager.new_var();
        let x_lit = Lit::positive(x);
        self.add_clause(Clause::from_iter([!x_lit, la, lb]));
        self.add_clause(Clause::from_iter([!x_lit, !la, !lb]));
        self.add_clause(Clause::from_iter([x_lit, !la, lb]));
        self.add_clause(Clause::from_iter([x_lit, la, !lb]));

        let result = self.solve_assuming(&[x_lit]);
        match result {
            Ok(SolverResult::Unsat) => SatVerdict::Equivalent,
            Ok(SolverResult::Sat) => {
                self.last_model.clear();
                for (idx, node) in arena.iter() {
                    if node.is_input() {
                        if let Some(var) = arena.state(idx).sat_var {
                            let val = self.lit_value(Lit::positive(var));
                            self.last_model.push((idx, val == TernaryVal::True));
                        }
                    }
                }
                SatVerdict::NotEquivalent
            }
            _ => SatVerdict::Unknown,
        }
    }

    /// The input assignment that distinguished the last `NotEquivalent`
    /// query, as `(node_index, value)` pairs for every primary input.
    pub fn last_model(&self) -> &[(u32, bool)] {
        &self.last_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FraigNode;

    #[test]
    fn identical_handle_is_trivially_equivalent() {
        let mut arena = NodeArena::new();
        let mut sat = SatAdapter::new(SolverKind::Kissat);
        let a_idx = arena.push(FraigNode::Input { var: 0 });
        sat.register_input(&mut arena, a_idx);
        let a = FraigHandle::new(a_idx, false);
        assert_eq!(sat.check_equivalent(&arena, a, a), SatVerdict::Equivalent);
    }

    #[test]
    fn an_input_and_its_complement_are_not_equivalent() {
        let mut arena = NodeArena::new();
        let mut sat = SatAdapter::new(SolverKind::Kissat);
        let a_idx = arena.push(FraigNode::Input { var: 0 });
        sat.register_input(&mut arena, a_idx);
        let a = FraigHandle::new(a_idx, false);
        assert_eq!(
            sat.check_equivalent(&arena, a, a.not()),
            SatVerdict::NotEquivalent
        );
    }
}
