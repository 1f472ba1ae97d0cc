use std::fmt::{self, Display};

use crate::{Identifier, types::{Reference, RuntimeType}};

// LITERALS
// ================================================================================================

/// A literal value appearing in expressions and evaluated normal forms.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lit {
    Int(i64),
    Bool(bool),
    Null,
}

impl Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lit::Int(n) => write!(f, "{n}"),
            Lit::Bool(b) => write!(f, "{b}"),
            Lit::Null => write!(f, "null"),
        }
    }
}

// OPERATORS
// ================================================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnOp {
    /// Arithmetic negation.
    Neg,
    /// Boolean negation.
    Not,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BinOp {
    Implies,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Plus,
    Minus,
    Mult,
    Div,
    Mod,
}

impl Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self {
            BinOp::Implies => "==>",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::Lte => "<=",
            BinOp::Gt => ">",
            BinOp::Gte => ">=",
            BinOp::Plus => "+",
            BinOp::Minus => "-",
            BinOp::Mult => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        };
        write!(f, "{sym}")
    }
}

/// Quantifier kind for array-bounded quantified formulas.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quantifier {
    Forall,
    Exists,
}

// EXPRESSIONS
// ================================================================================================

/// An immutable expression tree.
///
/// The same type serves as program syntax and as the evaluated normal form
/// carried in stack frames, heap cells, and path constraints: evaluation
/// replaces [`Expression::Var`] reads by the variable's current value and
/// folds literal subtrees, leaving symbolic leaves
/// ([`Expression::SymbolicVar`], [`Expression::SymbolicRef`]) in place.
///
/// Structural `Hash`/`Eq`/`Ord` let formulas key the solver cache directly.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expression {
    Lit(Lit),
    /// A program variable, resolved against the top stack frame.
    Var(Identifier),
    /// A free symbolic value of scalar type.
    SymbolicVar { name: Identifier, ty: RuntimeType },
    /// A concrete reference value. Only produced by evaluation.
    Ref { r: Reference, ty: RuntimeType },
    /// A symbolic reference, resolved through the alias map.
    SymbolicRef { name: Identifier, ty: RuntimeType },
    Unary {
        op: UnOp,
        inner: Box<Expression>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Conditional {
        guard: Box<Expression>,
        if_true: Box<Expression>,
        if_false: Box<Expression>,
    },
    /// The length of the array held by a local variable (`#a`).
    SizeOf { array: Identifier },
    /// A bounded quantifier over the elements of the array held by `domain`:
    /// `forall element, index : domain : body`.
    Quantified {
        quantifier: Quantifier,
        element: Identifier,
        index: Identifier,
        domain: Identifier,
        body: Box<Expression>,
    },
}

impl Expression {
    // CONSTRUCTORS
    // --------------------------------------------------------------------------------------------

    pub fn int(value: i64) -> Self {
        Expression::Lit(Lit::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Expression::Lit(Lit::Bool(value))
    }

    pub fn null() -> Self {
        Expression::Lit(Lit::Null)
    }

    pub fn var(name: &str) -> Self {
        Expression::Var(crate::ident(name))
    }

    pub fn binary(op: BinOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn unary(op: UnOp, inner: Expression) -> Self {
        Expression::Unary { op, inner: Box::new(inner) }
    }

    pub fn implies(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Implies, lhs, rhs)
    }

    pub fn and(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::And, lhs, rhs)
    }

    pub fn or(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Or, lhs, rhs)
    }

    pub fn eq(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Eq, lhs, rhs)
    }

    pub fn neq(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::NotEq, lhs, rhs)
    }

    pub fn lt(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Lt, lhs, rhs)
    }

    pub fn lte(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Lte, lhs, rhs)
    }

    pub fn gt(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Gt, lhs, rhs)
    }

    pub fn gte(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Gte, lhs, rhs)
    }

    pub fn plus(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Plus, lhs, rhs)
    }

    pub fn minus(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Minus, lhs, rhs)
    }

    pub fn mult(lhs: Expression, rhs: Expression) -> Self {
        Self::binary(BinOp::Mult, lhs, rhs)
    }

    pub fn not(inner: Expression) -> Self {
        Self::unary(UnOp::Not, inner)
    }

    pub fn neg(inner: Expression) -> Self {
        Self::unary(UnOp::Neg, inner)
    }

    pub fn ite(guard: Expression, if_true: Expression, if_false: Expression) -> Self {
        Expression::Conditional {
            guard: Box::new(guard),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }

    pub fn size_of(array: &str) -> Self {
        Expression::SizeOf { array: crate::ident(array) }
    }

    pub fn forall(element: &str, index: &str, domain: &str, body: Expression) -> Self {
        Expression::Quantified {
            quantifier: Quantifier::Forall,
            element: crate::ident(element),
            index: crate::ident(index),
            domain: crate::ident(domain),
            body: Box::new(body),
        }
    }

    pub fn exists(element: &str, index: &str, domain: &str, body: Expression) -> Self {
        Expression::Quantified {
            quantifier: Quantifier::Exists,
            element: crate::ident(element),
            index: crate::ident(index),
            domain: crate::ident(domain),
            body: Box::new(body),
        }
    }

    // ACCESSORS
    // --------------------------------------------------------------------------------------------

    /// Returns the boolean literal carried by this expression, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Expression::Lit(Lit::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer literal carried by this expression, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Expression::Lit(Lit::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Expression::Lit(Lit::Null))
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Lit(lit) => write!(f, "{lit}"),
            Expression::Var(name) => write!(f, "{name}"),
            Expression::SymbolicVar { name, .. } => write!(f, "${name}"),
            Expression::Ref { r, .. } => write!(f, "{r}"),
            Expression::SymbolicRef { name, .. } => write!(f, "&{name}"),
            Expression::Unary { op: UnOp::Neg, inner } => write!(f, "-({inner})"),
            Expression::Unary { op: UnOp::Not, inner } => write!(f, "!({inner})"),
            Expression::Binary { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Expression::Conditional { guard, if_true, if_false } => {
                write!(f, "({guard} ? {if_true} : {if_false})")
            },
            Expression::SizeOf { array } => write!(f, "#{array}"),
            Expression::Quantified { quantifier, element, index, domain, body } => {
                let kw = match quantifier {
                    Quantifier::Forall => "forall",
                    Quantifier::Exists => "exists",
                };
                write!(f, "{kw} {element}, {index} : {domain} : {body}")
            },
        }
    }
}
