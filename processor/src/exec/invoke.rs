//! Calls, member entries, and member exits.

use std::collections::BTreeMap;

use oox_core::{
    DeclarationMember, Expression, Invocation, Lhs, Lit, RuntimeType, cfg::NodeId, ident,
};

use super::{Explore, Explorer, advance, exceptions, statement};
use crate::{
    errors::EngineError,
    eval::{self, concretize},
    state::{ExecutionState, RETVAL, StackFrame, THIS},
    value::{HeapValue, default_value},
};

// CALL NODES
// ================================================================================================

/// Resolves the invocation, concretizes the receiver and the arguments, and
/// pushes a frame whose return point is the call node's unique successor.
pub(super) fn exec_call(
    ex: &mut Explorer<'_>,
    state: ExecutionState,
    pc: NodeId,
    invocation: &Invocation,
    target: Option<Lhs>,
) -> Explore<Vec<ExecutionState>> {
    let return_point = ex.neighbours_exactly(pc, 1)?[0];

    let mut probes: Vec<Expression> = invocation.arguments.clone();
    if let Some(receiver) = &invocation.callee {
        probes.push(Expression::Var(receiver.clone()));
    }
    let branches = concretize::branches(ex, &state, &probes)?;

    let mut out = Vec::new();
    for branch in branches {
        out.extend(enter_member(ex, branch, invocation, target.clone(), return_point)?);
    }
    Ok(out)
}

fn enter_member(
    ex: &mut Explorer<'_>,
    mut state: ExecutionState,
    invocation: &Invocation,
    target: Option<Lhs>,
    return_point: NodeId,
) -> Explore<Vec<ExecutionState>> {
    let member = ex
        .table
        .lookup(&invocation.class, &invocation.member)
        .cloned()
        .ok_or_else(|| unresolved(invocation))?;

    // Arguments are evaluated in the caller's frame, before the push.
    let mut declarations = BTreeMap::new();
    for (param, argument) in member.params().iter().zip(&invocation.arguments) {
        declarations.insert(param.name.clone(), eval::evaluate(&state, argument)?);
    }

    match &member {
        DeclarationMember::Method(method) if !method.is_static => {
            let receiver_var =
                invocation.callee.as_ref().ok_or_else(|| unresolved(invocation))?;
            let receiver =
                eval::evaluate(&state, &Expression::Var(receiver_var.clone()))?;
            match receiver {
                Expression::Lit(Lit::Null) => return exceptions::unwind(ex, state),
                Expression::Ref { .. } => {
                    declarations.insert(ident(THIS), receiver);
                },
                other => {
                    return Err(EngineError::ExpectedReference(other.to_string()).into());
                },
            }
        },
        DeclarationMember::Method(_) => {},
        DeclarationMember::Constructor(_) => {
            let class = ex
                .table
                .class(&invocation.class)
                .cloned()
                .ok_or_else(|| unresolved(invocation))?;
            let fields = class
                .fields
                .iter()
                .map(|field| (field.name.clone(), default_value(&field.ty)))
                .collect();
            let r = state.heap.allocate(HeapValue::Object { class: class.name.clone(), fields });
            let this = Expression::Ref { r, ty: RuntimeType::Reference(class.name.clone()) };
            declarations.insert(ident(THIS), this.clone());
            // A constructor returns its receiver.
            declarations.insert(ident(RETVAL), this);
        },
        DeclarationMember::Field(_) => {
            return Err(EngineError::ExpectedMethodMember(invocation.to_string()).into());
        },
    }

    let entry = ex
        .cfg
        .entry_of(&invocation.class, &invocation.member)
        .ok_or_else(|| unresolved(invocation))?;

    let thread = state.current_mut()?;
    thread.increment_last_handler_pops();
    thread.call_stack.push(StackFrame { return_point, target, declarations, member });
    thread.pc = entry;
    Ok(vec![state])
}

fn unresolved(invocation: &Invocation) -> EngineError {
    EngineError::Unresolved {
        class: invocation.class.to_string(),
        member: invocation.member.to_string(),
    }
}

// MEMBER ENTRY
// ================================================================================================

/// At the root call the precondition is assumed; at every other entry it is
/// discharged as an assertion (when `verifyRequires` is set).
pub(super) fn exec_member_entry(
    ex: &mut Explorer<'_>,
    state: ExecutionState,
    pc: NodeId,
) -> Explore<Vec<ExecutionState>> {
    let successors = ex.neighbours_exactly(pc, 1)?;
    let next = successors[0];

    let thread = state.current()?;
    let tid = thread.tid;
    let frame = thread.top_frame().ok_or(EngineError::EmptyCallStack(tid))?;
    let requires = frame.member.specification().and_then(|spec| spec.requires.clone());

    let Some(requires) = requires else {
        return Ok(vec![advance(state, next)?]);
    };

    // The entry node itself is the first trace entry exactly at the root.
    let is_root_call = state.trace.len() <= 1;
    if is_root_call {
        let branches = concretize::branches(ex, &state, std::slice::from_ref(&requires))?;
        let mut out = Vec::new();
        for mut branch in branches {
            if ex.assume_formula(&mut branch, &requires)? {
                out.push(advance(branch, next)?);
            }
        }
        Ok(out)
    } else if ex.config.verify_requires {
        let branches = concretize::branches(ex, &state, std::slice::from_ref(&requires))?;
        let mut out = Vec::new();
        for branch in branches {
            ex.assert_formula(&branch, &requires, pc)?;
            out.push(advance(branch, next)?);
        }
        Ok(out)
    } else {
        Ok(vec![advance(state, next)?])
    }
}

// MEMBER EXIT
// ================================================================================================

/// Discharges `ensures`, then either despawns the thread (last frame) or
/// pops the frame and performs the deferred `target := retval` copy-back.
pub(super) fn exec_member_exit(
    ex: &mut Explorer<'_>,
    state: ExecutionState,
    pc: NodeId,
    _return_ty: &RuntimeType,
) -> Explore<Vec<ExecutionState>> {
    ex.neighbours_exactly(pc, 0)?;

    let thread = state.current()?;
    let tid = thread.tid;
    let frame = thread.top_frame().ok_or(EngineError::EmptyCallStack(tid))?;
    let ensures = frame.member.specification().and_then(|spec| spec.ensures.clone());

    if ex.config.verify_ensures
        && let Some(ensures) = ensures
    {
        let branches = concretize::branches(ex, &state, std::slice::from_ref(&ensures))?;
        let mut out = Vec::new();
        for branch in branches {
            ex.assert_formula(&branch, &ensures, pc)?;
            out.extend(pop_frame(ex, branch)?);
        }
        return Ok(out);
    }
    pop_frame(ex, state)
}

fn pop_frame(ex: &mut Explorer<'_>, mut state: ExecutionState) -> Explore<Vec<ExecutionState>> {
    let thread = state.current_mut()?;
    let tid = thread.tid;

    if thread.call_stack.len() == 1 {
        state.despawn(tid);
        return Ok(vec![state]);
    }

    let Some(frame) = thread.call_stack.pop() else {
        return Err(EngineError::EmptyCallStack(tid).into());
    };
    thread.decrement_last_handler_pops();
    thread.pc = frame.return_point;

    if let Some(target) = &frame.target {
        let value = frame
            .declarations
            .get(&ident(RETVAL))
            .cloned()
            .unwrap_or_else(|| default_value(&frame.member.return_ty()));
        match statement::write_lhs(&mut state, target, value)? {
            statement::WriteOutcome::Done => Ok(vec![state]),
            statement::WriteOutcome::Exception => exceptions::unwind(ex, state),
            statement::WriteOutcome::Infeasible => {
                ex.stats.infeasible_prunes += 1;
                Ok(vec![])
            },
        }
    } else {
        Ok(vec![state])
    }
}
