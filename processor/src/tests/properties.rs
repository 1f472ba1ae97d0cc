//! Cross-cutting properties: POR soundness, determinism, depth
//! monotonicity, boundary behaviours, and evaluation laws.

use oox_core::{BinOp, Expression};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use super::{programs, run, run_with};
use crate::{eval, state::ExecutionState};

// POR SOUNDNESS
// ================================================================================================

/// The verdict must not depend on whether partial-order reduction is on.
#[rstest]
#[case::independent_counters(programs::concurrent_unit(), "Main.m2", 200)]
#[case::racy_counter(programs::concurrent_unit(), "Main.m3_invalid1", 300)]
#[case::locked_counter(programs::concurrent_unit(), "Main.m2_locked", 200)]
#[case::deadlock(programs::deadlock_unit(), "Main.main", 50)]
fn por_does_not_change_the_verdict(
    #[case] built: super::Built,
    #[case] entry: &str,
    #[case] depth: u64,
) {
    let with_por = run_with(&built, entry, depth, |config| config.apply_por = true);
    let without_por = run_with(&built, entry, depth, |config| config.apply_por = false);
    assert_eq!(with_por.result, without_por.result, "verdict for {entry}");
}

/// POR explores no more transitions than the full product.
#[test]
fn por_prunes_independent_interleavings() {
    let built = programs::concurrent_unit();
    let with_por = run_with(&built, "Main.m2", 200, |config| config.apply_por = true);
    let without_por = run_with(&built, "Main.m2", 200, |config| config.apply_por = false);
    assert!(
        with_por.statistics.states_explored < without_por.statistics.states_explored,
        "{} !< {}",
        with_por.statistics.states_explored,
        without_por.statistics.states_explored
    );
}

// DETERMINISM
// ================================================================================================

/// With random interleaving off, two runs explore identically.
#[test]
fn repeated_runs_are_deterministic() {
    let built = programs::concurrent_unit();
    let first = run(&built, "Main.m2", 200);
    let second = run(&built, "Main.m2", 200);
    assert_eq!(first.result, second.result);
    assert_eq!(first.statistics, second.statistics);
}

/// Shuffling the selection order may reorder the search but not change the
/// verdict of a deadlocking program.
#[test]
fn random_interleaving_still_finds_the_deadlock() {
    let built = programs::deadlock_unit();
    let outcome = run_with(&built, "Main.main", 50, |config| {
        config.apply_random_interleaving = true;
    });
    assert!(outcome.result.is_deadlock());
}

// DEPTH
// ================================================================================================

/// Once a counterexample is within the bound, deeper bounds keep it.
#[rstest]
#[case(30)]
#[case(60)]
#[case(120)]
fn invalidity_is_depth_monotonic(#[case] depth: u64) {
    let built = programs::simple_unit();
    let outcome = run(&built, "SomeClass.m1Invalid", depth);
    assert!(outcome.result.is_invalid(), "depth {depth}");
}

/// A zero budget explores nothing and is vacuously valid.
#[test]
fn zero_depth_is_vacuously_valid() {
    let built = programs::simple_unit();
    let outcome = run(&built, "SomeClass.m1", 0);
    assert!(outcome.result.is_valid());
    assert_eq!(outcome.statistics.states_explored, 0);
    assert_eq!(outcome.statistics.depth_exhausted, 1);
}

/// A zero-length symbolic array cannot satisfy a non-empty access.
#[test]
fn zero_sized_symbolic_arrays_prune_accesses() {
    let built = programs::simple_unit();
    let outcome = run_with(&built, "SomeClass.m3", 100, |config| {
        config.symbolic_array_size = 0;
    });
    assert!(outcome.result.is_valid());
    assert!(outcome.statistics.infeasible_prunes >= 1);
}

// SOLVER PLUMBING
// ================================================================================================

#[test]
fn caching_does_not_change_the_verdict() {
    let built = programs::simple_unit();
    let cached = run_with(&built, "SomeClass.m1", 30, |config| config.cache_formulas = true);
    let uncached = run_with(&built, "SomeClass.m1", 30, |config| config.cache_formulas = false);
    assert_eq!(cached.result, uncached.result);
    assert!(cached.statistics.solver_calls > 0);
}

#[test]
fn local_solver_fast_path_agrees_with_the_oracle() {
    let built = programs::simple_unit();
    let fast = run_with(&built, "SomeClass.m1Invalid", 30, |c| c.apply_local_solver = true);
    let slow = run_with(&built, "SomeClass.m1Invalid", 30, |c| c.apply_local_solver = false);
    assert_eq!(fast.result, slow.result);
}

#[test]
fn benchmark_emission_is_side_effect_free() {
    let built = programs::simple_unit();
    let outcome = run_with(&built, "SomeClass.m1", 30, |config| config.run_benchmark = true);
    assert!(outcome.result.is_valid());
}

// EVALUATION LAWS
// ================================================================================================

fn arb_closed_int_expr() -> impl Strategy<Value = Expression> {
    let leaf = any::<i8>().prop_map(|n| Expression::int(n as i64));
    leaf.prop_recursive(3, 24, 2, |inner| {
        (
            inner.clone(),
            inner,
            prop_oneof![Just(BinOp::Plus), Just(BinOp::Minus), Just(BinOp::Mult)],
        )
            .prop_map(|(lhs, rhs, op)| Expression::binary(op, lhs, rhs))
    })
}

/// Reference interpretation of closed integer trees.
fn interpret(e: &Expression) -> i64 {
    match e {
        Expression::Lit(oox_core::Lit::Int(n)) => *n,
        Expression::Binary { op, lhs, rhs } => {
            let (a, b) = (interpret(lhs), interpret(rhs));
            match op {
                BinOp::Plus => a.wrapping_add(b),
                BinOp::Minus => a.wrapping_sub(b),
                BinOp::Mult => a.wrapping_mul(b),
                other => panic!("unexpected operator {other}"),
            }
        },
        other => panic!("unexpected node {other}"),
    }
}

proptest! {
    /// Closed integer trees fold to the literal a direct interpreter
    /// computes, and evaluation is idempotent.
    #[test]
    fn closed_integer_trees_fold(e in arb_closed_int_expr()) {
        let state = ExecutionState::new(0);
        let folded = eval::evaluate(&state, &e).expect("closed evaluation cannot fail");
        prop_assert_eq!(folded.as_int(), Some(interpret(&e)));
        let refolded = eval::evaluate(&state, &folded).expect("closed evaluation cannot fail");
        prop_assert_eq!(folded, refolded);
    }
}
