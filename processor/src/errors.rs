//! Engine errors.
//!
//! These cover the "bug or malformed input" category only: each variant is
//! fatal and aborts the whole run with a diagnostic. Verification verdicts
//! (`Invalid`, `Deadlock`) are the normal output space and never appear
//! here, and an infeasible branch is silently pruned rather than reported.

use miette::Diagnostic;

use crate::state::ThreadId;

// ENGINE ERROR
// ================================================================================================

#[derive(Clone, Debug, thiserror::Error, Diagnostic)]
pub enum EngineError {
    #[error("unknown entry point `{0}`")]
    #[diagnostic(help("entry points are written as `Class.method` and must name a method"))]
    UnknownEntryPoint(String),

    #[error("could not resolve invocation `{class}.{member}`")]
    Unresolved { class: String, member: String },

    #[error("expected a reference value, got `{0}`")]
    ExpectedReference(String),

    #[error("expected a concrete reference, got `{0}`")]
    #[diagnostic(help("symbolic references must be concretized before this operation"))]
    ExpectedConcreteReference(String),

    #[error("expected a method member for `{0}`")]
    ExpectedMethodMember(String),

    #[error("no current thread is set")]
    CannotGetCurrentThread,

    #[error("{kind} node has {got} CFG successors, expected {expected}")]
    #[diagnostic(help("the control-flow graph handed to the engine is malformed"))]
    ExpectedNumberOfNeighbours { kind: &'static str, expected: usize, got: usize },

    #[error("no aliases recorded for symbolic reference `{0}`")]
    NoAliases(String),

    #[error("undeclared variable `{0}`")]
    UndeclaredVariable(String),

    #[error("call stack of thread {0} is empty")]
    EmptyCallStack(ThreadId),
}

impl AsRef<dyn Diagnostic> for EngineError {
    fn as_ref(&self) -> &(dyn Diagnostic + 'static) {
        self
    }
}
