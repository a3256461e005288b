//! End-to-end construction/verification scenarios exercised only through
//! the public API, no access to internal arena state, the way an
//! external consumer of the crate would use it.

use fraig::{FraigMgr, SatVerdict, SolverKind};

fn mgr() -> FraigMgr {
    FraigMgr::new(64, SolverKind::Kissat)
}

#[test]
fn tautology_a_or_not_a_is_the_constant_one() {
    let mut m = mgr();
    let a = m.make_input();
    let t = m.make_or(a, a.not());
    assert_eq!(m.check_equiv(t, m.make_const(true)), SatVerdict::Equivalent);
}

#[test]
fn contradiction_a_and_not_a_is_the_constant_zero() {
    let mut m = mgr();
    let a = m.make_input();
    let c = m.make_and(a, a.not());
    assert_eq!(m.check_equiv(c, m.make_const(false)), SatVerdict::Equivalent);
}

#[test]
fn deep_constant_subcircuit_is_folded_to_the_constant_node_by_simulation() {
    let mut m = mgr();
    let a = m.make_input();
    let b = m.make_input();

    // x = a & b, y = a & !b: two distinct, non-complementary AND nodes
    // (neither is shallow-foldable against the other by make_and's own
    // self/complement checks), but x & y is identically 0 since they
    // require opposite values of b. Only bit-parallel simulation noticing
    // x & y's signature is all-0 (never all-1), and the constant-candidate
    // it seeds, collapses this to the constant node.
    let x = m.make_and(a, b);
    let y = m.make_and(a, b.not());
    let g = m.make_and(x, y);

    assert_eq!(
        g,
        m.make_const(false),
        "an identically-0 AND subcircuit must be folded to the constant node itself, \
         not merely provable equivalent to it via check_equiv"
    );
}

#[test]
fn xor_identity_two_unrelated_builds_of_the_same_function_merge() {
    let mut m = mgr();
    let a = m.make_input();
    let b = m.make_input();

    let via_xor = m.make_xor(a, b);
    let via_xnor_complement = m.make_xnor(a, b).not();
    assert_eq!(m.check_equiv(via_xor, via_xnor_complement), SatVerdict::Equivalent);

    // and a three-way xor built as a balanced list reduction should equal
    // the same function built pairwise by hand: (a^b)^c
    let c = m.make_input();
    let listwise = m.make_xor_list(&[a, b, c]);
    let pairwise = m.make_xor(m.make_xor(a, b), c);
    assert_eq!(m.check_equiv(listwise, pairwise), SatVerdict::Equivalent);
}

#[test]
fn double_cofactor_recovers_the_original_function_via_shannon_expansion() {
    let mut m = mgr();
    let a = m.make_input();
    let b = m.make_input();
    let c = m.make_input();

    // f = (a & b) | (!a & c)  -- a 2-to-1 multiplexer selecting b or c on a
    let f = m.make_or(m.make_and(a, b), m.make_and(a.not(), c));

    let f_a1 = m.cofactor(f, a, true);
    let f_a0 = m.cofactor(f, a, false);

    // Shannon expansion: f = a & f|a=1 | !a & f|a=0
    let rebuilt = m.make_or(m.make_and(a, f_a1), m.make_and(a.not(), f_a0));
    assert_eq!(m.check_equiv(f, rebuilt), SatVerdict::Equivalent);

    // and the cofactors themselves should equal b and c respectively
    assert_eq!(m.check_equiv(f_a1, b), SatVerdict::Equivalent);
    assert_eq!(m.check_equiv(f_a0, c), SatVerdict::Equivalent);
}

#[test]
fn a_small_circuit_equivalence_check_across_two_independent_builds() {
    // Two independently-constructed (disjoint variable sets) adder carry
    // circuits for the same 1-bit full-adder carry-out function:
    // carry = majority(a, b, cin) = (a&b) | (a&cin) | (b&cin)
    let mut m = mgr();

    let a1 = m.make_input();
    let b1 = m.make_input();
    let c1 = m.make_input();
    let carry1 = m.make_or_list(&[m.make_and(a1, b1), m.make_and(a1, c1), m.make_and(b1, c1)]);

    let a2 = m.make_input();
    let b2 = m.make_input();
    let c2 = m.make_input();
    // same function, built via a different (De Morgan) gate structure
    let not_majority = m.make_and_list(&[
        m.make_or(a2.not(), b2.not()),
        m.make_or(a2.not(), c2.not()),
        m.make_or(b2.not(), c2.not()),
    ]);
    let carry2 = not_majority.not();

    // substitute the second circuit's inputs to alias the first circuit's,
    // then confirm the two carry functions agree everywhere.
    let aliased = m.cofactor(m.cofactor(m.cofactor(carry2, a2, false), b2, false), c2, false);
    let direct = m.cofactor(m.cofactor(m.cofactor(carry1, a1, false), b1, false), c1, false);
    assert_eq!(m.check_equiv(aliased, direct), SatVerdict::Equivalent);
}

#[test]
fn random_regression_absorbs_repeated_subexpressions_into_one_strash_entry() {
    let mut m = mgr();
    let inputs: Vec<_> = (0..12).map(|_| m.make_input()).collect();

    let mut handles = inputs.clone();
    // deterministic pseudo-random DAG: fold pairs of existing handles
    // together repeatedly, frequently re-deriving already-built pairs so
    // strash absorption has real work to do.
    let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed
    };

    for _ in 0..400 {
        let i = (next() as usize) % handles.len();
        let j = (next() as usize) % handles.len();
        let h = if next() % 2 == 0 {
            m.make_and(handles[i], handles[j])
        } else {
            m.make_or(handles[i], handles[j])
        };
        handles.push(h);
        if handles.len() > 64 {
            handles.remove(0);
        }
    }

    let stats = m.stats();
    // 12 inputs, 400 gate-building calls that heavily overlap in fanin
    // pairs: strash + FRAIG folding must keep the live node count well
    // under one node per call.
    assert!(
        stats.live_nodes < 12 + 400,
        "expected substantial sharing, got {} live nodes",
        stats.live_nodes
    );
}
