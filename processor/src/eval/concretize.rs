//! Concretization of symbolic references and arrays.
//!
//! Before any operation that depends on the concrete identity of a symbolic
//! reference, the engine enumerates its possible aliases and branches over
//! them, pinning one identity per branch. Alias sets are populated lazily:
//! the first use of a symbolic reference allocates a fresh symbolic object
//! (or one array per admissible length), and optionally admits null and the
//! identities of other symbolic values of the same type.

use std::collections::{BTreeMap, BTreeSet};

use oox_core::{Expression, Identifier, RuntimeType};

use crate::{
    errors::EngineError,
    exec::Explorer,
    state::{Alias, ExecutionState},
    value::{HeapValue, default_value},
};

// BRANCHING
// ================================================================================================

/// Returns one refined state per combination of alias choices for the
/// unresolved symbolic references reachable from `exprs`, dropping choices
/// that contradict the path constraints. With nothing to concretize this is
/// a single untouched copy of `state`.
pub(crate) fn branches(
    ex: &mut Explorer<'_>,
    state: &ExecutionState,
    exprs: &[Expression],
) -> Result<Vec<ExecutionState>, EngineError> {
    let targets = unresolved_targets(state, exprs);
    if targets.is_empty() {
        return Ok(vec![state.clone()]);
    }

    let mut states = vec![state.clone()];
    for (name, ty) in &targets {
        let mut next = Vec::new();
        for mut st in states {
            if st.alias_map.resolved(name).is_some() {
                next.push(st);
                continue;
            }
            if st.alias_map.aliases_of(name).is_none() {
                initialize(ex, &mut st, name, ty)?;
            }
            let Some(aliases) = st.alias_map.aliases_of(name).cloned() else {
                return Err(EngineError::NoAliases(name.to_string()));
            };
            for alias in aliases {
                let mut branch = st.clone();
                branch.alias_map.refine(name.clone(), alias);
                next.push(branch);
            }
        }
        states = next;
    }

    // A choice may contradict the path constraints; those branches die here.
    let mut feasible = Vec::new();
    for st in states {
        if ex.state_feasible(&st)? {
            feasible.push(st);
        } else {
            ex.stats.infeasible_prunes += 1;
        }
    }
    Ok(feasible)
}

// TARGET COLLECTION
// ================================================================================================

/// The symbolic references reachable from `exprs` whose identity is not yet
/// pinned, in deterministic order.
fn unresolved_targets(
    state: &ExecutionState,
    exprs: &[Expression],
) -> BTreeMap<Identifier, RuntimeType> {
    let mut out = BTreeMap::new();
    for e in exprs {
        collect(state, e, &mut out);
    }
    out
}

fn collect(
    state: &ExecutionState,
    e: &Expression,
    out: &mut BTreeMap<Identifier, RuntimeType>,
) {
    match e {
        Expression::Var(name) | Expression::SizeOf { array: name } => {
            probe_var(state, name, out)
        },
        Expression::SymbolicRef { name, ty } => {
            if state.alias_map.resolved(name).is_none() {
                out.insert(name.clone(), ty.clone());
            }
        },
        Expression::Unary { inner, .. } => collect(state, inner, out),
        Expression::Binary { lhs, rhs, .. } => {
            collect(state, lhs, out);
            collect(state, rhs, out);
        },
        Expression::Conditional { guard, if_true, if_false } => {
            collect(state, guard, out);
            collect(state, if_true, out);
            collect(state, if_false, out);
        },
        Expression::Quantified { domain, body, .. } => {
            probe_var(state, domain, out);
            collect(state, body, out);
        },
        Expression::Lit(_) | Expression::SymbolicVar { .. } | Expression::Ref { .. } => {},
    }
}

fn probe_var(
    state: &ExecutionState,
    name: &Identifier,
    out: &mut BTreeMap<Identifier, RuntimeType>,
) {
    let Ok(value) = state.read_var(name) else {
        return;
    };
    if let Expression::SymbolicRef { name: sym, ty } = value
        && state.alias_map.resolved(&sym).is_none()
    {
        out.insert(sym, ty);
    }
}

// LAZY INITIALISATION
// ================================================================================================

/// Populates the alias set of a fresh symbolic reference: a newly
/// allocated symbolic object (or one array per length up to the bound),
/// plus same-typed symbolic identities and null when configured.
fn initialize(
    ex: &mut Explorer<'_>,
    state: &mut ExecutionState,
    name: &Identifier,
    ty: &RuntimeType,
) -> Result<(), EngineError> {
    let mut candidates = BTreeSet::new();
    if ex.config.symbolic_aliases {
        candidates.extend(same_typed_aliases(state, ty));
    }

    match ty {
        RuntimeType::Reference(class_name) => {
            let class = ex.table.class(class_name).cloned().ok_or_else(|| {
                EngineError::Unresolved {
                    class: class_name.to_string(),
                    member: class_name.to_string(),
                }
            })?;
            let fields = class
                .fields
                .iter()
                .map(|field| {
                    let base = format!("{name}.{}", field.name);
                    (field.name.clone(), fresh_symbolic(ex, &base, &field.ty))
                })
                .collect();
            let r = state.heap.allocate(HeapValue::Object { class: class.name.clone(), fields });
            candidates.insert(Alias::Ref(r));
        },
        RuntimeType::Array(elem_ty) => {
            for len in 0..=ex.config.symbolic_array_size {
                let elements = (0..len)
                    .map(|i| fresh_symbolic(ex, &format!("{name}[{i}]"), elem_ty))
                    .collect();
                let r = state
                    .heap
                    .allocate(HeapValue::Array { elem_ty: (**elem_ty).clone(), elements });
                candidates.insert(Alias::Ref(r));
            }
        },
        other => return Err(EngineError::ExpectedReference(other.to_string())),
    }

    if ex.config.symbolic_nulls {
        candidates.insert(Alias::Null);
    }
    state.alias_map.insert(name.clone(), candidates);
    Ok(())
}

fn fresh_symbolic(ex: &mut Explorer<'_>, base: &str, ty: &RuntimeType) -> Expression {
    match ty {
        RuntimeType::Int | RuntimeType::Bool => {
            Expression::SymbolicVar { name: ex.fresh_name(base), ty: ty.clone() }
        },
        RuntimeType::Reference(_) | RuntimeType::Array(_) => {
            Expression::SymbolicRef { name: ex.fresh_name(base), ty: ty.clone() }
        },
        RuntimeType::Void => default_value(ty),
    }
}

/// Identities already admitted for other symbolic values of the same type.
fn same_typed_aliases(state: &ExecutionState, ty: &RuntimeType) -> BTreeSet<Alias> {
    state
        .alias_map
        .iter()
        .flat_map(|(_, set)| set.iter())
        .filter(|alias| match alias {
            Alias::Ref(r) => state.heap.get(*r).map(HeapValue::ty).as_ref() == Some(ty),
            Alias::Null => false,
        })
        .copied()
        .collect()
}
