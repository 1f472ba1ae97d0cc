use std::fmt::{self, Display};

use crate::{Identifier, syntax::expression::Expression, types::RuntimeType};

// ASSIGNMENT TARGETS AND SOURCES
// ================================================================================================

/// The left-hand side of an assignment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Lhs {
    /// A local variable.
    Var { var: Identifier },
    /// A field of the object held by a local variable (`var.field`).
    Field { var: Identifier, field: Identifier },
    /// An element of the array held by a local variable (`var[index]`).
    Elem { var: Identifier, index: Expression },
}

impl Lhs {
    pub fn var(name: &str) -> Self {
        Lhs::Var { var: crate::ident(name) }
    }

    pub fn field(var: &str, field: &str) -> Self {
        Lhs::Field { var: crate::ident(var), field: crate::ident(field) }
    }

    pub fn elem(var: &str, index: Expression) -> Self {
        Lhs::Elem { var: crate::ident(var), index }
    }
}

impl Display for Lhs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lhs::Var { var } => write!(f, "{var}"),
            Lhs::Field { var, field } => write!(f, "{var}.{field}"),
            Lhs::Elem { var, index } => write!(f, "{var}[{index}]"),
        }
    }
}

/// The right-hand side of an assignment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Rhs {
    Expression(Expression),
    /// A field read (`var.field`).
    Field { var: Identifier, field: Identifier },
    /// An element read (`var[index]`).
    Elem { var: Identifier, index: Expression },
    /// A fresh array allocation (`new elem_ty[size]`).
    NewArray { elem_ty: RuntimeType, size: Expression },
    /// Marker for `lhs := call(...)`. The invocation itself lives on the
    /// call node; the assignment is deferred to the frame pop, so executing
    /// this right-hand side is a no-op.
    Call,
}

impl Rhs {
    pub fn expr(e: Expression) -> Self {
        Rhs::Expression(e)
    }

    pub fn field(var: &str, field: &str) -> Self {
        Rhs::Field { var: crate::ident(var), field: crate::ident(field) }
    }

    pub fn elem(var: &str, index: Expression) -> Self {
        Rhs::Elem { var: crate::ident(var), index }
    }
}

// INVOCATIONS
// ================================================================================================

/// A method or constructor invocation site.
///
/// Constructors are invoked under their class name (`Class.Class`).
/// Instance calls name the receiver local in `callee`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Invocation {
    pub class: Identifier,
    pub member: Identifier,
    pub callee: Option<Identifier>,
    pub arguments: Vec<Expression>,
}

impl Invocation {
    pub fn static_call(class: &str, member: &str, arguments: Vec<Expression>) -> Self {
        Invocation {
            class: crate::ident(class),
            member: crate::ident(member),
            callee: None,
            arguments,
        }
    }

    pub fn instance_call(receiver: &str, class: &str, member: &str, arguments: Vec<Expression>) -> Self {
        Invocation {
            class: crate::ident(class),
            member: crate::ident(member),
            callee: Some(crate::ident(receiver)),
            arguments,
        }
    }

    pub fn constructor(class: &str, arguments: Vec<Expression>) -> Self {
        Invocation {
            class: crate::ident(class),
            member: crate::ident(class),
            callee: None,
            arguments,
        }
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.member)
    }
}

// STATEMENTS
// ================================================================================================

/// A structured statement as it appears in member bodies.
///
/// Control-flow statements (`Ite`, `While`, `Try`) are flattened away by CFG
/// lowering; only the simple forms appear on statement nodes of the graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    Declare { ty: RuntimeType, var: Identifier },
    Assign { lhs: Lhs, rhs: Rhs },
    Assert { assertion: Expression },
    Assume { assumption: Expression },
    Return { expression: Option<Expression> },
    Lock { var: Identifier },
    Unlock { var: Identifier },
    Fork { invocation: Invocation },
    Join,
    Call { invocation: Invocation, target: Option<Lhs> },
    Throw { message: String },
    Skip,
    Ite { guard: Expression, if_true: Vec<Statement>, if_false: Vec<Statement> },
    While { guard: Expression, body: Vec<Statement> },
    Try { body: Vec<Statement>, catch: Vec<Statement> },
}

impl Statement {
    pub fn declare(ty: RuntimeType, var: &str) -> Self {
        Statement::Declare { ty, var: crate::ident(var) }
    }

    pub fn assign(lhs: Lhs, rhs: Rhs) -> Self {
        Statement::Assign { lhs, rhs }
    }

    pub fn assert(assertion: Expression) -> Self {
        Statement::Assert { assertion }
    }

    pub fn assume(assumption: Expression) -> Self {
        Statement::Assume { assumption }
    }

    pub fn ret(expression: Expression) -> Self {
        Statement::Return { expression: Some(expression) }
    }

    pub fn ret_void() -> Self {
        Statement::Return { expression: None }
    }

    pub fn lock(var: &str) -> Self {
        Statement::Lock { var: crate::ident(var) }
    }

    pub fn unlock(var: &str) -> Self {
        Statement::Unlock { var: crate::ident(var) }
    }

    pub fn fork(invocation: Invocation) -> Self {
        Statement::Fork { invocation }
    }

    pub fn call(invocation: Invocation, target: Option<Lhs>) -> Self {
        Statement::Call { invocation, target }
    }

    pub fn throw(message: &str) -> Self {
        Statement::Throw { message: message.to_string() }
    }
}
