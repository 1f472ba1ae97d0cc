//! Statement semantics: per-step transition functions on execution states.

use oox_core::{Expression, Lhs, Lit, Rhs, cfg::{NodeId, Step}};

use super::{Explore, Explorer, exceptions, sync};
use crate::{
    errors::EngineError,
    eval::{self, concretize},
    state::ExecutionState,
    value::{HeapValue, default_value},
};

// OUTCOMES
// ================================================================================================

/// The result of evaluating a right-hand side against the heap.
pub(super) enum RhsOutcome {
    Value(Expression),
    /// A concrete null was dereferenced; the exception machinery takes over.
    Exception,
    /// The access is impossible on this branch (e.g. out of bounds).
    Infeasible,
}

/// The result of a write through a left-hand side.
pub(super) enum WriteOutcome {
    Done,
    Exception,
    Infeasible,
}

// STEP DISPATCH
// ================================================================================================

pub(super) fn exec_step(
    ex: &mut Explorer<'_>,
    mut state: ExecutionState,
    pc: NodeId,
    step: Step,
) -> Explore<Vec<ExecutionState>> {
    match step {
        Step::Declare { ty, var } => {
            state.write_var(var, default_value(&ty))?;
            Ok(ex.advance_to_successors(state, pc)?)
        },
        Step::Assign { lhs, rhs } => exec_assign(ex, state, pc, &lhs, &rhs),
        Step::Assert { assertion } => {
            let branches =
                concretize::branches(ex, &state, std::slice::from_ref(&assertion))?;
            let mut out = Vec::new();
            for branch in branches {
                ex.assert_formula(&branch, &assertion, pc)?;
                out.extend(ex.advance_to_successors(branch, pc)?);
            }
            Ok(out)
        },
        Step::Assume { assumption } => {
            let branches =
                concretize::branches(ex, &state, std::slice::from_ref(&assumption))?;
            let mut out = Vec::new();
            for mut branch in branches {
                if ex.assume_formula(&mut branch, &assumption)? {
                    out.extend(ex.advance_to_successors(branch, pc)?);
                }
            }
            Ok(out)
        },
        Step::Return { expression } => match expression {
            Some(e) => {
                let branches = concretize::branches(ex, &state, std::slice::from_ref(&e))?;
                let mut out = Vec::new();
                for mut branch in branches {
                    let value = eval::evaluate(&branch, &e)?;
                    branch.write_var(oox_core::ident(crate::state::RETVAL), value)?;
                    out.extend(ex.advance_to_successors(branch, pc)?);
                }
                Ok(out)
            },
            None => Ok(ex.advance_to_successors(state, pc)?),
        },
        Step::Lock { var } => sync::exec_lock(ex, state, pc, &var),
        Step::Unlock { var } => sync::exec_unlock(ex, state, pc, &var),
        Step::Fork { invocation } => sync::exec_fork(ex, state, pc, &invocation),
        Step::Skip => Ok(ex.advance_to_successors(state, pc)?),
    }
}

// ASSIGNMENT
// ================================================================================================

fn exec_assign(
    ex: &mut Explorer<'_>,
    state: ExecutionState,
    pc: NodeId,
    lhs: &Lhs,
    rhs: &Rhs,
) -> Explore<Vec<ExecutionState>> {
    // `lhs := call(...)`: the call node pushed a frame whose target is the
    // lhs, and the copy-back happens on the frame pop.
    if matches!(rhs, Rhs::Call) {
        return Ok(ex.advance_to_successors(state, pc)?);
    }

    // Heap accesses need the concrete identity of their receiver.
    let mut probes: Vec<Expression> = Vec::new();
    match lhs {
        Lhs::Field { var, .. } | Lhs::Elem { var, .. } => {
            probes.push(Expression::Var(var.clone()))
        },
        Lhs::Var { .. } => {},
    }
    match rhs {
        Rhs::Field { var, .. } | Rhs::Elem { var, .. } => {
            probes.push(Expression::Var(var.clone()))
        },
        _ => {},
    }

    let branches = concretize::branches(ex, &state, &probes)?;
    let mut out = Vec::new();
    for mut branch in branches {
        match eval_rhs(&mut branch, rhs)? {
            RhsOutcome::Exception => out.extend(exceptions::unwind(ex, branch)?),
            RhsOutcome::Infeasible => ex.stats.infeasible_prunes += 1,
            RhsOutcome::Value(value) => match write_lhs(&mut branch, lhs, value)? {
                WriteOutcome::Done => out.extend(ex.advance_to_successors(branch, pc)?),
                WriteOutcome::Exception => out.extend(exceptions::unwind(ex, branch)?),
                WriteOutcome::Infeasible => ex.stats.infeasible_prunes += 1,
            },
        }
    }
    Ok(out)
}

// RIGHT-HAND SIDES
// ================================================================================================

pub(super) fn eval_rhs(state: &mut ExecutionState, rhs: &Rhs) -> Explore<RhsOutcome> {
    match rhs {
        Rhs::Expression(e) => Ok(RhsOutcome::Value(eval::evaluate(state, e)?)),
        Rhs::Field { var, field } => {
            match receiver(state, var)? {
                Receiver::Null => Ok(RhsOutcome::Exception),
                Receiver::Object(r) => {
                    let Some(HeapValue::Object { fields, .. }) = state.heap.get(r) else {
                        return Err(EngineError::ExpectedReference(r.to_string()).into());
                    };
                    let value = fields
                        .get(field)
                        .cloned()
                        .ok_or_else(|| EngineError::UndeclaredVariable(field.to_string()))?;
                    Ok(RhsOutcome::Value(value))
                },
            }
        },
        Rhs::Elem { var, index } => {
            match receiver(state, var)? {
                Receiver::Null => Ok(RhsOutcome::Exception),
                Receiver::Object(r) => {
                    let idx = eval::evaluate(state, index)?;
                    let Some(HeapValue::Array { elem_ty, elements }) = state.heap.get(r) else {
                        return Err(EngineError::ExpectedReference(r.to_string()).into());
                    };
                    match idx.as_int() {
                        Some(i) if i >= 0 && (i as usize) < elements.len() => {
                            Ok(RhsOutcome::Value(elements[i as usize].clone()))
                        },
                        Some(_) => Ok(RhsOutcome::Infeasible),
                        None => {
                            // Symbolic index: fold the read into a conditional
                            // chain over all slots.
                            let mut value = default_value(elem_ty);
                            for (i, elem) in elements.iter().enumerate().rev() {
                                value = Expression::ite(
                                    Expression::eq(idx.clone(), Expression::int(i as i64)),
                                    elem.clone(),
                                    value,
                                );
                            }
                            Ok(RhsOutcome::Value(value))
                        },
                    }
                },
            }
        },
        Rhs::NewArray { elem_ty, size } => {
            let size = eval::evaluate(state, size)?;
            let Some(n) = size.as_int().filter(|n| *n >= 0) else {
                return Ok(RhsOutcome::Infeasible);
            };
            let elements = (0..n).map(|_| default_value(elem_ty)).collect();
            let r = state
                .heap
                .allocate(HeapValue::Array { elem_ty: elem_ty.clone(), elements });
            Ok(RhsOutcome::Value(Expression::Ref {
                r,
                ty: oox_core::RuntimeType::array_of(elem_ty.clone()),
            }))
        },
        Rhs::Call => Ok(RhsOutcome::Value(Expression::null())),
    }
}

// LEFT-HAND SIDES
// ================================================================================================

pub(super) fn write_lhs(
    state: &mut ExecutionState,
    lhs: &Lhs,
    value: Expression,
) -> Explore<WriteOutcome> {
    match lhs {
        Lhs::Var { var } => {
            state.write_var(var.clone(), value)?;
            Ok(WriteOutcome::Done)
        },
        Lhs::Field { var, field } => {
            match receiver(state, var)? {
                Receiver::Null => Ok(WriteOutcome::Exception),
                Receiver::Object(r) => {
                    let Some(HeapValue::Object { fields, .. }) = state.heap.get_mut(r) else {
                        return Err(EngineError::ExpectedReference(r.to_string()).into());
                    };
                    fields.insert(field.clone(), value);
                    Ok(WriteOutcome::Done)
                },
            }
        },
        Lhs::Elem { var, index } => {
            match receiver(state, var)? {
                Receiver::Null => Ok(WriteOutcome::Exception),
                Receiver::Object(r) => {
                    let idx = eval::evaluate(state, index)?;
                    let Some(HeapValue::Array { elements, .. }) = state.heap.get_mut(r) else {
                        return Err(EngineError::ExpectedReference(r.to_string()).into());
                    };
                    match idx.as_int() {
                        Some(i) if i >= 0 && (i as usize) < elements.len() => {
                            elements[i as usize] = value;
                            Ok(WriteOutcome::Done)
                        },
                        Some(_) => Ok(WriteOutcome::Infeasible),
                        None => {
                            // Symbolic index: every slot becomes a conditional
                            // between the new value and its old content.
                            for (i, elem) in elements.iter_mut().enumerate() {
                                *elem = Expression::ite(
                                    Expression::eq(idx.clone(), Expression::int(i as i64)),
                                    value.clone(),
                                    elem.clone(),
                                );
                            }
                            Ok(WriteOutcome::Done)
                        },
                    }
                },
            }
        },
    }
}

// RECEIVERS
// ================================================================================================

enum Receiver {
    Null,
    Object(oox_core::Reference),
}

/// The concrete identity behind the reference held by local `var`. Callers
/// concretize first, so an unresolved symbolic reference here is a bug.
fn receiver(
    state: &ExecutionState,
    var: &oox_core::Identifier,
) -> Result<Receiver, EngineError> {
    let value = eval::evaluate(state, &Expression::Var(var.clone()))?;
    match value {
        Expression::Lit(Lit::Null) => Ok(Receiver::Null),
        Expression::Ref { r, .. } => Ok(Receiver::Object(r)),
        Expression::SymbolicRef { .. } => {
            Err(EngineError::ExpectedConcreteReference(value.to_string()))
        },
        other => Err(EngineError::ExpectedReference(other.to_string())),
    }
}
