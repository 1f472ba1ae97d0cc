//! Lock acquisition and release, and thread forking.

use std::collections::BTreeMap;

use oox_core::{
    DeclarationMember, Expression, Identifier, Invocation, Lit, cfg::NodeId, ident,
};

use super::{Explore, Explorer, exceptions};
use crate::{
    errors::EngineError,
    eval::{self, concretize},
    state::{ExecutionState, StackFrame, THIS, Thread, ThreadId},
};

// LOCK / UNLOCK
// ================================================================================================

/// Acquires the lock behind `var`. A null target makes the branch
/// infeasible; a symbolic target is concretized and retried; a target held
/// by another thread drops the branch (the scheduler would not have fired
/// this thread).
pub(super) fn exec_lock(
    ex: &mut Explorer<'_>,
    state: ExecutionState,
    pc: NodeId,
    var: &Identifier,
) -> Explore<Vec<ExecutionState>> {
    let value = eval::evaluate(&state, &Expression::Var(var.clone()))?;
    match value {
        Expression::Lit(Lit::Null) => {
            ex.stats.infeasible_prunes += 1;
            Ok(vec![])
        },
        Expression::SymbolicRef { .. } => {
            let probes = [Expression::Var(var.clone())];
            let branches = concretize::branches(ex, &state, &probes)?;
            let mut out = Vec::new();
            for branch in branches {
                out.extend(exec_lock(ex, branch, pc, var)?);
            }
            Ok(out)
        },
        Expression::Ref { r, .. } => {
            let tid = state.current()?.tid;
            let mut state = state;
            if state.locks.acquire(r, tid) {
                Ok(ex.advance_to_successors(state, pc)?)
            } else {
                Ok(vec![])
            }
        },
        other => Err(EngineError::ExpectedReference(other.to_string()).into()),
    }
}

/// Releases the lock behind `var`; releasing an unheld or null target is a
/// no-op, and a non-reference target is a fatal engine error.
pub(super) fn exec_unlock(
    ex: &mut Explorer<'_>,
    state: ExecutionState,
    pc: NodeId,
    var: &Identifier,
) -> Explore<Vec<ExecutionState>> {
    let value = eval::evaluate(&state, &Expression::Var(var.clone()))?;
    match value {
        Expression::Lit(Lit::Null) => Ok(ex.advance_to_successors(state, pc)?),
        Expression::SymbolicRef { .. } => {
            let probes = [Expression::Var(var.clone())];
            let branches = concretize::branches(ex, &state, &probes)?;
            let mut out = Vec::new();
            for branch in branches {
                out.extend(exec_unlock(ex, branch, pc, var)?);
            }
            Ok(out)
        },
        Expression::Ref { r, .. } => {
            let mut state = state;
            state.locks.release(r);
            Ok(ex.advance_to_successors(state, pc)?)
        },
        other => Err(EngineError::ExpectedReference(other.to_string()).into()),
    }
}

// FORK
// ================================================================================================

/// Spawns a child thread executing the invoked method, parented to the
/// current thread. The child's initial frame has no target; its return
/// point is the member exit, where the thread despawns.
pub(super) fn exec_fork(
    ex: &mut Explorer<'_>,
    state: ExecutionState,
    pc: NodeId,
    invocation: &Invocation,
) -> Explore<Vec<ExecutionState>> {
    let mut probes: Vec<Expression> = invocation.arguments.clone();
    if let Some(receiver) = &invocation.callee {
        probes.push(Expression::Var(receiver.clone()));
    }
    let branches = concretize::branches(ex, &state, &probes)?;

    let mut out = Vec::new();
    for branch in branches {
        out.extend(spawn_child(ex, branch, pc, invocation)?);
    }
    Ok(out)
}

fn spawn_child(
    ex: &mut Explorer<'_>,
    mut state: ExecutionState,
    pc: NodeId,
    invocation: &Invocation,
) -> Explore<Vec<ExecutionState>> {
    let member = ex
        .table
        .lookup(&invocation.class, &invocation.member)
        .cloned()
        .ok_or_else(|| EngineError::Unresolved {
            class: invocation.class.to_string(),
            member: invocation.member.to_string(),
        })?;
    let DeclarationMember::Method(method) = &member else {
        return Err(EngineError::ExpectedMethodMember(invocation.to_string()).into());
    };

    let mut declarations = BTreeMap::new();
    for (param, argument) in member.params().iter().zip(&invocation.arguments) {
        declarations.insert(param.name.clone(), eval::evaluate(&state, argument)?);
    }
    if !method.is_static {
        let receiver_var = invocation.callee.as_ref().ok_or_else(|| {
            EngineError::Unresolved {
                class: invocation.class.to_string(),
                member: invocation.member.to_string(),
            }
        })?;
        let receiver = eval::evaluate(&state, &Expression::Var(receiver_var.clone()))?;
        match receiver {
            Expression::Lit(Lit::Null) => return exceptions::unwind(ex, state),
            Expression::Ref { .. } => {
                declarations.insert(ident(THIS), receiver);
            },
            other => return Err(EngineError::ExpectedReference(other.to_string()).into()),
        }
    }

    let entry = ex
        .cfg
        .entry_of(&invocation.class, &invocation.member)
        .ok_or_else(|| EngineError::Unresolved {
            class: invocation.class.to_string(),
            member: invocation.member.to_string(),
        })?;
    let exit = ex
        .cfg
        .exit_of(&invocation.class, &invocation.member)
        .ok_or_else(|| EngineError::Unresolved {
            class: invocation.class.to_string(),
            member: invocation.member.to_string(),
        })?;

    let parent = state.current()?.tid;
    state.number_of_forks += 1;
    let child = ThreadId::new(state.number_of_forks);
    state.threads.insert(
        child,
        Thread {
            tid: child,
            parent,
            pc: entry,
            call_stack: vec![StackFrame {
                return_point: exit,
                target: None,
                declarations,
                member,
            }],
            handler_stack: Vec::new(),
        },
    );

    Ok(ex.advance_to_successors(state, pc)?)
}
