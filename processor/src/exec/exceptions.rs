//! The exception unwinding state machine.
//!
//! Unwinding walks the current thread's call stack towards the innermost
//! active handler, discharging the `exceptional` contract of every frame it
//! pops. With no handler left, the exception propagates out of the root
//! frame and the thread finishes cleanly.

use super::{Explore, Explorer};
use crate::{errors::EngineError, state::ExecutionState};

pub(super) fn unwind(
    ex: &mut Explorer<'_>,
    mut state: ExecutionState,
) -> Explore<Vec<ExecutionState>> {
    loop {
        let thread = state.current()?;
        let tid = thread.tid;
        let pc = thread.pc;
        let frame = thread.top_frame().ok_or(EngineError::EmptyCallStack(tid))?;
        let exceptional =
            frame.member.specification().and_then(|spec| spec.exceptional.clone());
        let handler = thread.handler_stack.last().copied();

        match handler {
            // The handler lives in the current frame: jump to it. The catch
            // entry node pops the handler when it executes.
            Some(h) if h.pops == 0 => {
                state.current_mut()?.pc = h.handler;
                return Ok(vec![state]);
            },
            // The handler sits below this frame: discharge the frame's
            // exceptional contract and keep unwinding.
            Some(_) => {
                if ex.config.verify_exceptional
                    && let Some(exceptional) = &exceptional
                {
                    ex.assert_formula(&state, exceptional, pc)?;
                }
                let thread = state.current_mut()?;
                thread.call_stack.pop();
                thread.decrement_last_handler_pops();
            },
            // No handler at all: discharge, then pop or finish the thread.
            None => {
                if ex.config.verify_exceptional
                    && let Some(exceptional) = &exceptional
                {
                    ex.assert_formula(&state, exceptional, pc)?;
                }
                let thread = state.current_mut()?;
                if thread.call_stack.len() == 1 {
                    // The exception propagates out of the root frame; the
                    // thread terminates cleanly.
                    state.despawn(tid);
                    return Ok(vec![state]);
                }
                thread.call_stack.pop();
            },
        }
    }
}
