//! Expression evaluation.
//!
//! Evaluation reduces an expression to normal form under the current
//! declarations, alias map, and heap: variable reads are replaced by their
//! values, symbolic references with a pinned alias collapse to that alias,
//! literal subtrees fold, and quantifiers over concrete arrays expand.
//! Anything that cannot be reduced stays symbolic.

use std::collections::BTreeMap;

use oox_core::{
    BinOp, Expression, Identifier, Lit, Quantifier, UnOp,
};

use crate::{
    errors::EngineError,
    state::{Alias, ExecutionState},
    value::HeapValue,
};

pub(crate) mod concretize;

type Bindings = BTreeMap<Identifier, Expression>;

// THREE-VALUED BOOLEAN RESULTS
// ================================================================================================

/// The result of evaluating an expression expected to be boolean.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Truth {
    Known(bool),
    Symbolic(Expression),
}

// EVALUATION
// ================================================================================================

/// Reduces `e` under the current thread's declarations and the heap.
pub(crate) fn evaluate(
    state: &ExecutionState,
    e: &Expression,
) -> Result<Expression, EngineError> {
    evaluate_with(state, e, &Bindings::new())
}

/// Like [`evaluate`], with `bindings` overlaying the local environment
/// (used for quantifier element/index variables).
pub(crate) fn evaluate_with(
    state: &ExecutionState,
    e: &Expression,
    bindings: &Bindings,
) -> Result<Expression, EngineError> {
    match e {
        Expression::Lit(_) | Expression::SymbolicVar { .. } | Expression::Ref { .. } => {
            Ok(e.clone())
        },
        Expression::SymbolicRef { .. } => Ok(resolve_ref(state, e.clone())),
        Expression::Var(name) => {
            let value = match bindings.get(name) {
                Some(value) => value.clone(),
                None => state.read_var(name)?,
            };
            Ok(resolve_ref(state, value))
        },
        Expression::Unary { op, inner } => {
            let inner = evaluate_with(state, inner, bindings)?;
            Ok(fold_unary(*op, inner))
        },
        Expression::Binary { op, lhs, rhs } => {
            let lhs = evaluate_with(state, lhs, bindings)?;
            let rhs = evaluate_with(state, rhs, bindings)?;
            Ok(fold_binary(*op, lhs, rhs))
        },
        Expression::Conditional { guard, if_true, if_false } => {
            let guard = evaluate_with(state, guard, bindings)?;
            match guard.as_bool() {
                Some(true) => evaluate_with(state, if_true, bindings),
                Some(false) => evaluate_with(state, if_false, bindings),
                None => Ok(Expression::ite(
                    guard,
                    evaluate_with(state, if_true, bindings)?,
                    evaluate_with(state, if_false, bindings)?,
                )),
            }
        },
        Expression::SizeOf { array } => {
            match lookup_array(state, bindings, array) {
                Some((_, elements)) => Ok(Expression::int(elements.len() as i64)),
                None => Ok(e.clone()),
            }
        },
        Expression::Quantified { quantifier, element, index, domain, body } => {
            let Some((_, elements)) = lookup_array(state, bindings, domain) else {
                return Ok(e.clone());
            };
            let (mut acc, op) = match quantifier {
                Quantifier::Forall => (Expression::bool(true), BinOp::And),
                Quantifier::Exists => (Expression::bool(false), BinOp::Or),
            };
            for (i, elem) in elements.iter().enumerate() {
                let mut inner = bindings.clone();
                inner.insert(element.clone(), elem.clone());
                inner.insert(index.clone(), Expression::int(i as i64));
                let instance = evaluate_with(state, body, &inner)?;
                acc = fold_binary(op, acc, instance);
            }
            Ok(acc)
        },
    }
}

/// Evaluates `e` and short-circuits to a known boolean when possible.
pub(crate) fn evaluate_as_bool(
    state: &ExecutionState,
    e: &Expression,
) -> Result<Truth, EngineError> {
    let value = evaluate(state, e)?;
    Ok(match value.as_bool() {
        Some(b) => Truth::Known(b),
        None => Truth::Symbolic(value),
    })
}

/// Boolean negation with literal and double-negation folding.
pub(crate) fn negate(e: Expression) -> Expression {
    fold_unary(UnOp::Not, e)
}

// RESOLUTION HELPERS
// ================================================================================================

/// Collapses a symbolic reference with a pinned alias to its identity.
fn resolve_ref(state: &ExecutionState, value: Expression) -> Expression {
    if let Expression::SymbolicRef { name, ty } = &value {
        match state.alias_map.resolved(name) {
            Some(Alias::Ref(r)) => return Expression::Ref { r, ty: ty.clone() },
            Some(Alias::Null) => return Expression::null(),
            None => {},
        }
    }
    value
}

/// The concrete array held by local `name`, if it is resolved to one.
fn lookup_array<'a>(
    state: &'a ExecutionState,
    bindings: &Bindings,
    name: &Identifier,
) -> Option<(oox_core::Reference, &'a [Expression])> {
    let value = match bindings.get(name) {
        Some(value) => value.clone(),
        None => state.read_var(name).ok()?,
    };
    let value = resolve_ref(state, value);
    let Expression::Ref { r, .. } = value else {
        return None;
    };
    match state.heap.get(r) {
        Some(HeapValue::Array { elements, .. }) => Some((r, elements.as_slice())),
        _ => None,
    }
}

// FOLDING
// ================================================================================================

fn fold_unary(op: UnOp, inner: Expression) -> Expression {
    match (op, &inner) {
        (UnOp::Neg, Expression::Lit(Lit::Int(n))) => Expression::int(-n),
        (UnOp::Not, Expression::Lit(Lit::Bool(b))) => Expression::bool(!b),
        (UnOp::Not, Expression::Unary { op: UnOp::Not, inner }) => (**inner).clone(),
        _ => Expression::unary(op, inner),
    }
}

fn fold_binary(op: BinOp, lhs: Expression, rhs: Expression) -> Expression {
    use BinOp::*;

    // Literal arithmetic and comparison.
    if let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) {
        return match op {
            Plus => Expression::int(a.wrapping_add(b)),
            Minus => Expression::int(a.wrapping_sub(b)),
            Mult => Expression::int(a.wrapping_mul(b)),
            Div if b != 0 => Expression::int(a.wrapping_div(b)),
            Mod if b != 0 => Expression::int(a.wrapping_rem(b)),
            Lt => Expression::bool(a < b),
            Lte => Expression::bool(a <= b),
            Gt => Expression::bool(a > b),
            Gte => Expression::bool(a >= b),
            Eq => Expression::bool(a == b),
            NotEq => Expression::bool(a != b),
            _ => Expression::binary(op, lhs, rhs),
        };
    }

    match op {
        And => match (lhs.as_bool(), rhs.as_bool()) {
            (Some(false), _) | (_, Some(false)) => Expression::bool(false),
            (Some(true), _) => rhs,
            (_, Some(true)) => lhs,
            _ => Expression::binary(op, lhs, rhs),
        },
        Or => match (lhs.as_bool(), rhs.as_bool()) {
            (Some(true), _) | (_, Some(true)) => Expression::bool(true),
            (Some(false), _) => rhs,
            (_, Some(false)) => lhs,
            _ => Expression::binary(op, lhs, rhs),
        },
        Implies => match (lhs.as_bool(), rhs.as_bool()) {
            (Some(false), _) | (_, Some(true)) => Expression::bool(true),
            (Some(true), _) => rhs,
            (_, Some(false)) => fold_unary(UnOp::Not, lhs),
            _ => Expression::binary(op, lhs, rhs),
        },
        Eq | NotEq => fold_equality(op, lhs, rhs),
        _ => Expression::binary(op, lhs, rhs),
    }
}

fn fold_equality(op: BinOp, lhs: Expression, rhs: Expression) -> Expression {
    debug_assert!(matches!(op, BinOp::Eq | BinOp::NotEq));
    let equal = match (&lhs, &rhs) {
        (Expression::Lit(a), Expression::Lit(b)) => Some(a == b),
        (Expression::Ref { r: a, .. }, Expression::Ref { r: b, .. }) => Some(a == b),
        (Expression::Ref { .. }, Expression::Lit(Lit::Null))
        | (Expression::Lit(Lit::Null), Expression::Ref { .. }) => Some(false),
        // Structurally identical operands denote the same value.
        _ if lhs == rhs => Some(true),
        _ => None,
    };
    match equal {
        Some(eq) => Expression::bool(if matches!(op, BinOp::Eq) { eq } else { !eq }),
        None => Expression::binary(op, lhs, rhs),
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn literal_arithmetic_folds() {
        let e = Expression::plus(Expression::int(2), Expression::mult(Expression::int(3), Expression::int(4)));
        assert_eq!(fold_tree(&e), Expression::int(14));
    }

    #[test]
    fn division_by_literal_zero_stays_symbolic() {
        let e = Expression::binary(BinOp::Div, Expression::int(1), Expression::int(0));
        assert_eq!(fold_tree(&e), e);
    }

    #[test]
    fn boolean_short_circuits_ignore_symbolic_operands() {
        let sym = Expression::SymbolicVar {
            name: oox_core::ident("b"),
            ty: oox_core::RuntimeType::Bool,
        };
        assert_eq!(
            fold_tree(&Expression::and(sym.clone(), Expression::bool(false))),
            Expression::bool(false)
        );
        assert_eq!(
            fold_tree(&Expression::or(Expression::bool(true), sym.clone())),
            Expression::bool(true)
        );
        assert_eq!(
            fold_tree(&Expression::implies(Expression::bool(false), sym.clone())),
            Expression::bool(true)
        );
        assert_eq!(fold_tree(&Expression::and(Expression::bool(true), sym.clone())), sym);
    }

    #[test]
    fn identical_operands_compare_equal() {
        let sym = Expression::SymbolicVar {
            name: oox_core::ident("x"),
            ty: oox_core::RuntimeType::Int,
        };
        assert_eq!(fold_tree(&Expression::eq(sym.clone(), sym.clone())), Expression::bool(true));
        assert_eq!(fold_tree(&Expression::neq(sym.clone(), sym)), Expression::bool(false));
    }

    #[test]
    fn double_negation_folds() {
        let sym = Expression::SymbolicVar {
            name: oox_core::ident("b"),
            ty: oox_core::RuntimeType::Bool,
        };
        assert_eq!(negate(negate(sym.clone())), sym);
        assert_eq!(negate(Expression::bool(true)), Expression::bool(false));
    }

    /// Folds a closed expression without touching any state.
    fn fold_tree(e: &Expression) -> Expression {
        match e {
            Expression::Unary { op, inner } => fold_unary(*op, fold_tree(inner)),
            Expression::Binary { op, lhs, rhs } => {
                fold_binary(*op, fold_tree(lhs), fold_tree(rhs))
            },
            _ => e.clone(),
        }
    }
}
