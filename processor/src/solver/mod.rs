//! The decision-procedure seam.
//!
//! The engine talks to a [`SmtSolver`] oracle through a caching
//! [`SolverContext`]; `UNKNOWN` answers are treated as satisfiable so the
//! engine stays sound for invalidity. The built-in backend is
//! [`SmallModelSolver`]; embedders wire a real SMT solver by implementing
//! the trait.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use oox_core::Expression;

mod search;

pub use search::SmallModelSolver;

// SAT RESULTS
// ================================================================================================

/// The oracle's answer to a `check-sat` query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

// ORACLE TRAIT
// ================================================================================================

/// A decision procedure for quantifier-free formulas over the symbolic
/// variables left in evaluated expressions.
pub trait SmtSolver {
    fn check(&mut self, formula: &Expression) -> SatResult;
}

// SOLVER CONTEXT
// ================================================================================================

/// Serialises access to the backend and memoises answers on the structural
/// hash of the (normalised) formula. Formulas are pure, so cached entries
/// are never invalidated.
pub(crate) struct SolverContext {
    backend: Box<dyn SmtSolver>,
    cache: HashMap<u64, SatResult>,
    cache_enabled: bool,
    pub calls: u64,
    pub cache_hits: u64,
}

impl SolverContext {
    pub fn new(backend: Box<dyn SmtSolver>, cache_enabled: bool) -> Self {
        SolverContext {
            backend,
            cache: HashMap::new(),
            cache_enabled,
            calls: 0,
            cache_hits: 0,
        }
    }

    pub fn check(&mut self, formula: &Expression) -> SatResult {
        let key = structural_hash(formula);
        if self.cache_enabled
            && let Some(answer) = self.cache.get(&key)
        {
            self.cache_hits += 1;
            return *answer;
        }
        self.calls += 1;
        let answer = self.backend.check(formula);
        if self.cache_enabled {
            self.cache.insert(key, answer);
        }
        answer
    }

    /// `UNKNOWN` counts as satisfiable.
    pub fn is_satisfiable(&mut self, formula: &Expression) -> bool {
        !matches!(self.check(formula), SatResult::Unsat)
    }
}

fn structural_hash(formula: &Expression) -> u64 {
    let mut hasher = DefaultHasher::new();
    formula.hash(&mut hasher);
    hasher.finish()
}

// TESTS
// ================================================================================================
