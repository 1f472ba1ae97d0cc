//! The built-in bounded-model backend.
//!
//! Satisfiability is decided by enumerating candidate models over the free
//! symbolic variables of the formula. Integer candidates are drawn from the
//! formula's own literals and their immediate neighbourhood, which covers
//! the boundary models of the linear comparisons produced by evaluation.
//! Finding a model is sound; an exhausted enumeration answers `Unsat`, so
//! the backend is complete only within its candidate space. Formulas
//! containing nodes the backend cannot interpret answer `Unknown`.

use std::collections::{BTreeMap, BTreeSet};

use oox_core::{BinOp, Expression, Lit, RuntimeType, UnOp};

use super::{SatResult, SmtSolver};

// SMALL MODEL SOLVER
// ================================================================================================

pub struct SmallModelSolver {
    /// Enumeration budget; exceeding it answers `Unknown`.
    max_models: u64,
}

impl Default for SmallModelSolver {
    fn default() -> Self {
        SmallModelSolver { max_models: 1 << 16 }
    }
}

impl SmtSolver for SmallModelSolver {
    fn check(&mut self, formula: &Expression) -> SatResult {
        let mut vars = BTreeMap::new();
        if !collect_vars(formula, &mut vars) {
            // Uninterpreted nodes: conservatively unknown.
            return SatResult::Unknown;
        }

        let ints = int_candidates(formula);
        let domains: Vec<(&str, Vec<Lit>)> = vars
            .iter()
            .map(|(name, ty)| {
                let values = match ty {
                    RuntimeType::Bool => vec![Lit::Bool(false), Lit::Bool(true)],
                    _ => ints.iter().map(|n| Lit::Int(*n)).collect(),
                };
                (name.as_ref(), values)
            })
            .collect();

        let total: u64 = domains.iter().map(|(_, d)| d.len() as u64).product();
        if total > self.max_models {
            return SatResult::Unknown;
        }

        let mut assignment = BTreeMap::new();
        let mut all_definite = true;
        let mut found = false;
        enumerate(&domains, 0, &mut assignment, &mut |env| {
            match eval_closed(formula, env) {
                Some(Lit::Bool(true)) => {
                    found = true;
                    false
                },
                Some(_) => true,
                None => {
                    all_definite = false;
                    true
                },
            }
        });

        if found {
            SatResult::Sat
        } else if all_definite {
            SatResult::Unsat
        } else {
            SatResult::Unknown
        }
    }
}

/// Calls `visit` for every assignment; `visit` returns false to stop early.
fn enumerate<'a>(
    domains: &'a [(&'a str, Vec<Lit>)],
    depth: usize,
    assignment: &mut BTreeMap<&'a str, Lit>,
    visit: &mut impl FnMut(&BTreeMap<&'a str, Lit>) -> bool,
) -> bool {
    let Some((name, values)) = domains.get(depth) else {
        return visit(assignment);
    };
    for value in values {
        assignment.insert(*name, *value);
        if !enumerate(domains, depth + 1, assignment, visit) {
            return false;
        }
    }
    true
}

/// Collects free symbolic variables; returns false when the formula contains
/// nodes the backend cannot interpret (unresolved references, unreduced
/// variable reads, array lengths, quantifiers).
fn collect_vars(e: &Expression, vars: &mut BTreeMap<oox_core::Identifier, RuntimeType>) -> bool {
    match e {
        Expression::Lit(_) | Expression::Ref { .. } => true,
        Expression::SymbolicVar { name, ty } => {
            vars.insert(name.clone(), ty.clone());
            true
        },
        Expression::Var(_)
        | Expression::SymbolicRef { .. }
        | Expression::SizeOf { .. }
        | Expression::Quantified { .. } => false,
        Expression::Unary { inner, .. } => collect_vars(inner, vars),
        Expression::Binary { lhs, rhs, .. } => collect_vars(lhs, vars) && collect_vars(rhs, vars),
        Expression::Conditional { guard, if_true, if_false } => {
            collect_vars(guard, vars) && collect_vars(if_true, vars) && collect_vars(if_false, vars)
        },
    }
}

/// Integer candidate values: every literal in the formula plus its
/// immediate neighbours, and a small base set.
fn int_candidates(e: &Expression) -> Vec<i64> {
    let mut out = BTreeSet::from([-1, 0, 1]);
    collect_ints(e, &mut out);
    out.into_iter().collect()
}

fn collect_ints(e: &Expression, out: &mut BTreeSet<i64>) {
    match e {
        Expression::Lit(Lit::Int(n)) => {
            out.insert(n.saturating_sub(1));
            out.insert(*n);
            out.insert(n.saturating_add(1));
        },
        Expression::Unary { inner, .. } => collect_ints(inner, out),
        Expression::Binary { lhs, rhs, .. } => {
            collect_ints(lhs, out);
            collect_ints(rhs, out);
        },
        Expression::Conditional { guard, if_true, if_false } => {
            collect_ints(guard, out);
            collect_ints(if_true, out);
            collect_ints(if_false, out);
        },
        _ => {},
    }
}

/// Evaluates a closed formula under an assignment; `None` when the result
/// is undefined (division by zero, type confusion, uninterpreted nodes).
fn eval_closed(e: &Expression, env: &BTreeMap<&str, Lit>) -> Option<Lit> {
    match e {
        Expression::Lit(lit) => Some(*lit),
        Expression::SymbolicVar { name, .. } => env.get(name.as_ref()).copied(),
        Expression::Ref { r, .. } => Some(Lit::Int(r.raw() as i64)),
        Expression::Unary { op, inner } => {
            let inner = eval_closed(inner, env)?;
            match (op, inner) {
                (UnOp::Neg, Lit::Int(n)) => Some(Lit::Int(-n)),
                (UnOp::Not, Lit::Bool(b)) => Some(Lit::Bool(!b)),
                _ => None,
            }
        },
        Expression::Binary { op, lhs, rhs } => {
            let lhs = eval_closed(lhs, env)?;
            let rhs = eval_closed(rhs, env)?;
            eval_binop(*op, lhs, rhs)
        },
        Expression::Conditional { guard, if_true, if_false } => {
            match eval_closed(guard, env)? {
                Lit::Bool(true) => eval_closed(if_true, env),
                Lit::Bool(false) => eval_closed(if_false, env),
                _ => None,
            }
        },
        Expression::Var(_)
        | Expression::SymbolicRef { .. }
        | Expression::SizeOf { .. }
        | Expression::Quantified { .. } => None,
    }
}

fn eval_binop(op: BinOp, lhs: Lit, rhs: Lit) -> Option<Lit> {
    use BinOp::*;
    match (lhs, rhs) {
        (Lit::Int(a), Lit::Int(b)) => match op {
            Plus => Some(Lit::Int(a.wrapping_add(b))),
            Minus => Some(Lit::Int(a.wrapping_sub(b))),
            Mult => Some(Lit::Int(a.wrapping_mul(b))),
            Div => (b != 0).then(|| Lit::Int(a.wrapping_div(b))),
            Mod => (b != 0).then(|| Lit::Int(a.wrapping_rem(b))),
            Lt => Some(Lit::Bool(a < b)),
            Lte => Some(Lit::Bool(a <= b)),
            Gt => Some(Lit::Bool(a > b)),
            Gte => Some(Lit::Bool(a >= b)),
            Eq => Some(Lit::Bool(a == b)),
            NotEq => Some(Lit::Bool(a != b)),
            Implies | And | Or => None,
        },
        (Lit::Bool(a), Lit::Bool(b)) => match op {
            And => Some(Lit::Bool(a && b)),
            Or => Some(Lit::Bool(a || b)),
            Implies => Some(Lit::Bool(!a || b)),
            Eq => Some(Lit::Bool(a == b)),
            NotEq => Some(Lit::Bool(a != b)),
            _ => None,
        },
        (a, b) if matches!(op, Eq) => Some(Lit::Bool(a == b)),
        (a, b) if matches!(op, NotEq) => Some(Lit::Bool(a != b)),
        _ => None,
    }
}

// TESTS
// ================================================================================================
