//! The symbolic program state and its sub-structures.
//!
//! A state is the unit of exploration: every semantic step produces new
//! states by cloning, and sibling branches never share mutable structure.
//! All collections iterate in a deterministic order so that, with random
//! interleaving disabled, two runs of the same input explore identically.

use std::collections::BTreeMap;

use oox_core::{Expression, Identifier, cfg::NodeId};

use crate::errors::EngineError;

mod alias_map;
mod constraints;
mod heap;
mod interleaving;
mod locks;
mod thread;

pub use alias_map::{Alias, AliasMap};
pub use constraints::PathConstraints;
pub use heap::Heap;
pub use interleaving::InterleavingConstraint;
pub use locks::LockSet;
pub use thread::{HandlerFrame, RETVAL, StackFrame, THIS, Thread, ThreadId};

// EXECUTION STATE
// ================================================================================================

/// A program state at a single exploration node.
///
/// Invariants, checked by [`Self::debug_assert_invariants`] in debug builds:
/// every live thread has a non-empty call stack; `current_thread`, when
/// set, names a live thread; every held lock names a live thread; the path
/// constraints of a live state are satisfiable (enforced where they grow);
/// the program trace only ever grows.
#[derive(Clone, Debug)]
pub struct ExecutionState {
    pub threads: BTreeMap<ThreadId, Thread>,
    pub current_thread: Option<ThreadId>,
    pub heap: Heap,
    pub alias_map: AliasMap,
    pub constraints: PathConstraints,
    pub locks: LockSet,
    pub interleaving_constraints: Vec<InterleavingConstraint>,
    pub remaining_k: u64,
    pub number_of_forks: u32,
    pub trace: Vec<(ThreadId, NodeId)>,
}

impl ExecutionState {
    pub fn new(remaining_k: u64) -> Self {
        ExecutionState {
            threads: BTreeMap::new(),
            current_thread: None,
            heap: Heap::default(),
            alias_map: AliasMap::default(),
            constraints: PathConstraints::default(),
            locks: LockSet::default(),
            interleaving_constraints: Vec::new(),
            remaining_k,
            number_of_forks: 0,
            trace: Vec::new(),
        }
    }

    // THREAD ACCESS
    // --------------------------------------------------------------------------------------------

    pub fn current(&self) -> Result<&Thread, EngineError> {
        let tid = self.current_thread.ok_or(EngineError::CannotGetCurrentThread)?;
        self.threads.get(&tid).ok_or(EngineError::CannotGetCurrentThread)
    }

    pub fn current_mut(&mut self) -> Result<&mut Thread, EngineError> {
        let tid = self.current_thread.ok_or(EngineError::CannotGetCurrentThread)?;
        self.threads.get_mut(&tid).ok_or(EngineError::CannotGetCurrentThread)
    }

    /// The number of live children of `tid`; a `join` is enabled only when
    /// this reaches zero.
    pub fn children_of(&self, tid: ThreadId) -> usize {
        self.threads.values().filter(|t| t.parent == tid && t.tid != tid).count()
    }

    /// Removes a finished thread and releases everything it held.
    pub fn despawn(&mut self, tid: ThreadId) {
        self.threads.remove(&tid);
        self.locks.release_all(tid);
        if self.current_thread == Some(tid) {
            self.current_thread = None;
        }
    }

    // LOCAL ENVIRONMENT
    // --------------------------------------------------------------------------------------------

    /// Reads a local from the current thread's top stack frame.
    pub fn read_var(&self, name: &Identifier) -> Result<Expression, EngineError> {
        let thread = self.current()?;
        let frame = thread.top_frame().ok_or(EngineError::EmptyCallStack(thread.tid))?;
        frame
            .declarations
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UndeclaredVariable(name.to_string()))
    }

    /// Writes a local into the current thread's top stack frame.
    pub fn write_var(&mut self, name: Identifier, value: Expression) -> Result<(), EngineError> {
        let thread = self.current_mut()?;
        let tid = thread.tid;
        let frame = thread.top_frame_mut().ok_or(EngineError::EmptyCallStack(tid))?;
        frame.declarations.insert(name, value);
        Ok(())
    }

    // TRACE
    // --------------------------------------------------------------------------------------------

    /// Whether any thread has already executed the given CFG node.
    pub fn trace_contains(&self, node: NodeId) -> bool {
        self.trace.iter().any(|(_, executed)| *executed == node)
    }

    // INVARIANTS
    // --------------------------------------------------------------------------------------------

    pub fn debug_assert_invariants(&self) {
        #[cfg(debug_assertions)]
        {
            for thread in self.threads.values() {
                debug_assert!(
                    !thread.call_stack.is_empty(),
                    "live thread {} has an empty call stack",
                    thread.tid
                );
            }
            if let Some(tid) = self.current_thread {
                debug_assert!(
                    self.threads.contains_key(&tid),
                    "current thread {tid} is not live"
                );
            }
            for (r, holder) in self.locks.iter() {
                debug_assert!(
                    self.threads.contains_key(&holder),
                    "lock on {r} is held by dead thread {holder}"
                );
            }
        }
    }
}
