//! Core data model for the OOX symbolic verifier.
//!
//! This crate defines everything the execution engine consumes but does not
//! produce: the typed syntax tree of an OOX program ([`CompilationUnit`] and
//! friends), the control-flow graph the engine walks
//! ([`cfg::ControlFlowGraph`]), and the symbol table resolving qualified
//! names to members ([`SymbolTable`]).
//!
//! There is deliberately no surface parser here. Front ends (or tests)
//! assemble a [`CompilationUnit`] programmatically and lower it with
//! [`cfg::ControlFlowGraph::lower`].

use std::sync::Arc;

pub mod cfg;
pub mod syntax;
pub mod types;

mod symbol_table;

// RE-EXPORTS
// ================================================================================================

pub use symbol_table::SymbolTable;
pub use syntax::{
    Class, CompilationUnit, Constructor, DeclarationMember, Field, Invocation, Lhs, Method,
    Parameter, Rhs, Specification, Statement,
};
pub use syntax::expression::{BinOp, Expression, Lit, Quantifier, UnOp};
pub use types::{Reference, RuntimeType};

// IDENTIFIERS
// ================================================================================================

/// An interned program identifier (variable, field, class, or method name).
///
/// `Arc<str>` keeps clones cheap; identifiers are copied into every stack
/// frame environment and every symbolic expression that mentions them.
pub type Identifier = Arc<str>;

/// Builds an [`Identifier`] from a string slice.
pub fn ident(name: &str) -> Identifier {
    Arc::from(name)
}
