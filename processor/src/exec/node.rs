//! The per-thread interpreter: dispatch on the kind of the current CFG node.
//!
//! Every node kind has a fixed number of CFG successors; a mismatch is a
//! fatal engine error naming the node kind.

use oox_core::cfg::NodeKind;

use super::{Explore, Explorer, advance, exceptions, invoke, statement};
use crate::state::{ExecutionState, HandlerFrame};

impl Explorer<'_> {
    /// Executes one transition of the current thread, producing zero or
    /// more successor states.
    pub(crate) fn exec_t(&mut self, mut state: ExecutionState) -> Explore<Vec<ExecutionState>> {
        let thread = state.current()?;
        let tid = thread.tid;
        let pc = thread.pc;
        state.trace.push((tid, pc));
        self.stats.states_explored += 1;

        let kind = self.cfg.kind(pc).clone();
        match kind {
            NodeKind::Statement(step) => statement::exec_step(self, state, pc, step),
            NodeKind::Call { invocation, target } => {
                invoke::exec_call(self, state, pc, &invocation, target)
            },
            NodeKind::MemberEntry => invoke::exec_member_entry(self, state, pc),
            NodeKind::MemberExit { return_ty } => {
                invoke::exec_member_exit(self, state, pc, &return_ty)
            },
            NodeKind::TryEntry { handler } => {
                let successors = self.neighbours_exactly(pc, 1)?;
                state
                    .current_mut()?
                    .handler_stack
                    .push(HandlerFrame { handler, pops: 0 });
                Ok(vec![advance(state, successors[0])?])
            },
            NodeKind::TryExit | NodeKind::CatchEntry => {
                let successors = self.neighbours_exactly(pc, 1)?;
                state.current_mut()?.handler_stack.pop();
                Ok(vec![advance(state, successors[0])?])
            },
            NodeKind::CatchExit => {
                let successors = self.neighbours_exactly(pc, 1)?;
                Ok(vec![advance(state, successors[0])?])
            },
            NodeKind::Exceptional { .. } => {
                self.neighbours_exactly(pc, 0)?;
                exceptions::unwind(self, state)
            },
            NodeKind::Join => {
                // Enabledness already guaranteed that every child despawned.
                let successors = self.neighbours_exactly(pc, 1)?;
                Ok(vec![advance(state, successors[0])?])
            },
        }
    }
}
