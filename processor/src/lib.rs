//! Symbolic execution engine for the OOX verification language.
//!
//! Given a lowered [`oox_core::cfg::ControlFlowGraph`], a
//! [`oox_core::SymbolTable`], and a [`Configuration`], the engine enumerates
//! feasible execution paths of a named entry point up to a bounded depth,
//! discharging verification conditions to a decision procedure, and reports
//! whether the entry point is [`VerificationResult::Valid`],
//! [`VerificationResult::Invalid`] (a counterexample exists), or
//! [`VerificationResult::Deadlock`].
//!
//! Target-program threads are simulated by the engine's process scheduler;
//! nothing here spawns host threads. Exploration is a depth-first search over
//! immutable-by-convention [`state::ExecutionState`] values: every semantic
//! step clones the state it branches from, and sibling branches never share
//! mutable structure.

mod config;
mod errors;
mod eval;
mod exec;
mod por;
mod solver;
mod state;
mod value;
mod verify;

#[cfg(test)]
mod tests;

// RE-EXPORTS
// ================================================================================================

pub use config::Configuration;
pub use errors::EngineError;
pub use solver::{SatResult, SmallModelSolver, SmtSolver};
pub use state::{
    Alias, AliasMap, ExecutionState, HandlerFrame, Heap, InterleavingConstraint, LockSet,
    PathConstraints, StackFrame, Thread, ThreadId,
};
pub use value::{DependentRef, HeapValue};
pub use verify::{Statistics, VerificationOutcome, VerificationResult, verify, verify_with_solver};
