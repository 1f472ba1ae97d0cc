//! Partial-order reduction over thread interleavings.
//!
//! One representative per equivalence class of interleavings: threads whose
//! next action was already observed independent of an executed action are
//! pruned, purely local steps advance deterministically, and every selected
//! pair is re-classified so the successor states inherit fresh constraints.

use std::collections::BTreeSet;

use itertools::Itertools;
use oox_core::{
    Expression, Identifier, Lhs, Rhs,
    cfg::{ControlFlowGraph, NodeKind, Step},
};
use tracing::trace;

use crate::{
    exec::{Explore, Explorer},
    state::{Alias, ExecutionState, InterleavingConstraint, Thread, ThreadId},
    value::DependentRef,
};

type RefSet = BTreeSet<DependentRef>;

// ENABLEDNESS
// ================================================================================================

/// A thread is enabled unless its next action is a lock acquisition on a
/// reference held by another thread, or a join with live children. A lock
/// on an unresolved symbolic reference enables the thread; concretization
/// happens inside the lock semantics.
pub(crate) fn is_enabled(
    cfg: &ControlFlowGraph,
    state: &ExecutionState,
    thread: &Thread,
) -> bool {
    match cfg.kind(thread.pc) {
        NodeKind::Statement(Step::Lock { var }) => {
            let Some(value) = local_value(state, thread, var) else {
                return true;
            };
            match value {
                Expression::Ref { r, .. } => {
                    state.locks.holder(r).is_none_or(|holder| holder == thread.tid)
                },
                _ => true,
            }
        },
        NodeKind::Join => state.children_of(thread.tid) == 0,
        _ => true,
    }
}

/// Reads a local of an arbitrary (not necessarily current) thread,
/// collapsing pinned symbolic references.
fn local_value(
    state: &ExecutionState,
    thread: &Thread,
    name: &Identifier,
) -> Option<Expression> {
    let value = thread.top_frame()?.declarations.get(name)?.clone();
    if let Expression::SymbolicRef { name, ty } = &value {
        return match state.alias_map.resolved(name) {
            Some(Alias::Ref(r)) => Some(Expression::Ref { r, ty: ty.clone() }),
            Some(Alias::Null) => Some(Expression::null()),
            None => Some(value),
        };
    }
    Some(value)
}

// REDUCTION
// ================================================================================================

/// Filters `enabled` down to the threads worth exploring and rotates the
/// state's interleaving constraints for its successors.
pub(crate) fn reduce(
    ex: &mut Explorer<'_>,
    mut state: ExecutionState,
    enabled: Vec<ThreadId>,
) -> Explore<(ExecutionState, Vec<ThreadId>)> {
    // Threads whose step is already covered by a previously chosen
    // interleaving lead to visited states.
    let unique: Vec<ThreadId> =
        enabled.into_iter().filter(|tid| is_unique(&state, *tid)).collect();

    // Purely local steps commute with everything; advance the first one
    // deterministically instead of branching.
    let locals: Vec<ThreadId> = unique
        .iter()
        .copied()
        .filter(|tid| next_action_is_local(ex.cfg, &state, *tid))
        .collect();
    let selected = match locals.first() {
        Some(first) => vec![*first],
        None => unique,
    };

    let mut fresh: Vec<InterleavingConstraint> = Vec::new();
    for (x, y) in selected.iter().copied().tuple_combinations::<(ThreadId, ThreadId)>() {
        let (Some(tx), Some(ty_)) = (state.threads.get(&x), state.threads.get(&y)) else {
            continue;
        };
        let (px, py) = (tx.pc, ty_.pc);
        let constraint = if is_independent(ex.cfg, &state, x, y) {
            InterleavingConstraint::Independent(px, py)
        } else {
            InterleavingConstraint::NotIndependent(px, py)
        };
        fresh.push(constraint);
    }
    trace!(selected = selected.len(), fresh = fresh.len(), "por");
    rotate_constraints(&mut state.interleaving_constraints, fresh);

    Ok((state, selected))
}

/// A thread is unique unless some `Independent(prev, cur)` constraint pins
/// its next action as `cur` while `prev` was already executed: the
/// interleaving running `cur` first was explored from a sibling branch.
fn is_unique(state: &ExecutionState, tid: ThreadId) -> bool {
    let Some(thread) = state.threads.get(&tid) else {
        return false;
    };
    state.interleaving_constraints.iter().all(|constraint| match constraint {
        InterleavingConstraint::Independent(prev, cur) => {
            !(thread.pc == *cur && state.trace_contains(*prev))
        },
        InterleavingConstraint::NotIndependent(..) => true,
    })
}

/// Keeps old `NotIndependent` constraints only when their endpoints are
/// disjoint from every fresh `Independent` pair, drops old `Independent`
/// constraints, and appends the fresh observations.
fn rotate_constraints(
    constraints: &mut Vec<InterleavingConstraint>,
    fresh: Vec<InterleavingConstraint>,
) {
    let fresh_independent: Vec<_> =
        fresh.iter().filter(|c| c.is_independent()).map(|c| c.endpoints()).collect();
    constraints.retain(|constraint| match constraint {
        InterleavingConstraint::Independent(..) => false,
        InterleavingConstraint::NotIndependent(a, b) => fresh_independent
            .iter()
            .all(|(x, y)| a != x && a != y && b != x && b != y),
    });
    constraints.extend(fresh);
}

// INDEPENDENCE
// ================================================================================================

/// Whether the next actions of `x` and `y` commute. A left-hand side with
/// no dependent operations forces ordering, and the bottom reference is
/// pessimistically dependent on any non-empty set.
fn is_independent(
    cfg: &ControlFlowGraph,
    state: &ExecutionState,
    x: ThreadId,
    y: ThreadId,
) -> bool {
    let (wx, rx) = dependent_ops(cfg, state, x);
    let (wy, ry) = dependent_ops(cfg, state, y);
    let x_all: RefSet = wx.union(&rx).copied().collect();
    let y_all: RefSet = wy.union(&ry).copied().collect();

    if x_all.is_empty() {
        return false;
    }
    if x_all.contains(&DependentRef::Unknown) && !y_all.is_empty() {
        return false;
    }
    if y_all.contains(&DependentRef::Unknown) && !x_all.is_empty() {
        return false;
    }
    wx.is_disjoint(&wy) && rx.is_disjoint(&wy) && ry.is_disjoint(&wx)
}

/// Whether the thread's next statement touches no heap reference at all.
fn next_action_is_local(cfg: &ControlFlowGraph, state: &ExecutionState, tid: ThreadId) -> bool {
    let (w, r) = dependent_ops(cfg, state, tid);
    w.is_empty() && r.is_empty()
}

// READ/WRITE SETS
// ================================================================================================

/// The (write, read) reference sets of the thread's next statement.
fn dependent_ops(
    cfg: &ControlFlowGraph,
    state: &ExecutionState,
    tid: ThreadId,
) -> (RefSet, RefSet) {
    let Some(thread) = state.threads.get(&tid) else {
        return (RefSet::new(), RefSet::new());
    };
    match cfg.kind(thread.pc) {
        NodeKind::Statement(step) => match step {
            Step::Assign { lhs, rhs } => (
                refs_of_lhs(state, thread, lhs),
                refs_of_rhs(state, thread, rhs),
            ),
            Step::Assert { assertion: e } | Step::Assume { assumption: e } => {
                (RefSet::new(), refs_of_expr(state, thread, e))
            },
            Step::Lock { var } | Step::Unlock { var } => {
                let refs = refs_of_var(state, thread, var);
                (refs.clone(), refs)
            },
            _ => (RefSet::new(), RefSet::new()),
        },
        _ => (RefSet::new(), RefSet::new()),
    }
}

fn refs_of_lhs(state: &ExecutionState, thread: &Thread, lhs: &Lhs) -> RefSet {
    match lhs {
        Lhs::Var { .. } => RefSet::new(),
        Lhs::Field { var, .. } => refs_of_var(state, thread, var),
        Lhs::Elem { var, index } => {
            let mut refs = refs_of_var(state, thread, var);
            refs.extend(refs_of_expr(state, thread, index));
            refs
        },
    }
}

fn refs_of_rhs(state: &ExecutionState, thread: &Thread, rhs: &Rhs) -> RefSet {
    match rhs {
        Rhs::Expression(e) => refs_of_expr(state, thread, e),
        Rhs::Field { var, .. } => refs_of_var(state, thread, var),
        Rhs::Elem { var, index } => {
            let mut refs = refs_of_var(state, thread, var);
            refs.extend(refs_of_expr(state, thread, index));
            refs
        },
        Rhs::NewArray { size, .. } => refs_of_expr(state, thread, size),
        Rhs::Call => RefSet::new(),
    }
}

fn refs_of_expr(state: &ExecutionState, thread: &Thread, e: &Expression) -> RefSet {
    let mut out = RefSet::new();
    collect_refs(state, thread, e, &mut out);
    out
}

fn collect_refs(state: &ExecutionState, thread: &Thread, e: &Expression, out: &mut RefSet) {
    match e {
        Expression::Var(name) | Expression::SizeOf { array: name } => {
            out.extend(refs_of_var(state, thread, name))
        },
        Expression::SymbolicRef { name, .. } => out.extend(refs_of_symbolic(state, name)),
        Expression::Unary { inner, .. } => collect_refs(state, thread, inner, out),
        Expression::Binary { lhs, rhs, .. } => {
            collect_refs(state, thread, lhs, out);
            collect_refs(state, thread, rhs, out);
        },
        Expression::Conditional { guard, if_true, if_false } => {
            collect_refs(state, thread, guard, out);
            collect_refs(state, thread, if_true, out);
            collect_refs(state, thread, if_false, out);
        },
        // The quantifier's domain is a read of the domain reference.
        Expression::Quantified { domain, body, .. } => {
            out.extend(refs_of_var(state, thread, domain));
            collect_refs(state, thread, body, out);
        },
        Expression::Lit(_) | Expression::SymbolicVar { .. } | Expression::Ref { .. } => {},
    }
}

fn refs_of_var(state: &ExecutionState, thread: &Thread, name: &Identifier) -> RefSet {
    let Some(frame) = thread.top_frame() else {
        return RefSet::new();
    };
    let Some(value) = frame.declarations.get(name) else {
        return RefSet::new();
    };
    match value {
        Expression::Ref { r, .. } => RefSet::from([DependentRef::Concrete(*r)]),
        Expression::SymbolicRef { name, .. } => refs_of_symbolic(state, name),
        _ => RefSet::new(),
    }
}

/// The identities a symbolic reference may denote: all non-null aliases, or
/// the bottom marker when nothing is known yet.
fn refs_of_symbolic(state: &ExecutionState, name: &Identifier) -> RefSet {
    match state.alias_map.aliases_of(name) {
        Some(aliases) => aliases
            .iter()
            .filter_map(|alias| match alias {
                Alias::Ref(r) => Some(DependentRef::Concrete(*r)),
                Alias::Null => None,
            })
            .collect(),
        None => RefSet::from([DependentRef::Unknown]),
    }
}

// TESTS
// ================================================================================================
