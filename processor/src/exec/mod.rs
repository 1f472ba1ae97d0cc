//! The exploration driver: a depth-first search over execution states.
//!
//! Non-determinism (thread choice, control-flow branching, concretization)
//! is realised as explicit recursion: each choice point
//! produces a finite list of successor states and the search visits them in
//! order. Verdicts short-circuit through the error position of [`Explore`];
//! engine errors ride the same channel and are told apart at the driver.

use oox_core::{Expression, Identifier, SymbolTable, cfg::{ControlFlowGraph, NodeId}};
use rand::seq::SliceRandom;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::{
    config::Configuration,
    errors::EngineError,
    eval::{self, Truth},
    por,
    solver::{SmtSolver, SolverContext},
    state::{ExecutionState, ThreadId},
    verify::Statistics,
};

mod exceptions;
mod invoke;
mod node;
mod statement;
mod sync;

// SHORT-CIRCUIT SIGNALS
// ================================================================================================

/// Where and why an assertion failed.
#[derive(Clone, Debug)]
pub(crate) struct Invalidity {
    pub location: Option<NodeId>,
    pub formula: Option<Expression>,
}

/// Aborts the search: a verdict that ends exploration, or a fatal engine
/// error. Infeasibility is *not* a signal; it collapses a single branch by
/// producing no successor states.
#[derive(Clone, Debug)]
pub(crate) enum Stop {
    Invalid(Invalidity),
    Deadlock,
    Engine(EngineError),
}

impl From<EngineError> for Stop {
    fn from(err: EngineError) -> Self {
        Stop::Engine(err)
    }
}

pub(crate) type Explore<T = ()> = Result<T, Stop>;

// EXPLORER
// ================================================================================================

/// The context threaded through every semantic operation: the graph and
/// table being executed, the configuration, the solver seam, statistics,
/// and a counter for fresh symbolic names.
pub(crate) struct Explorer<'a> {
    pub cfg: &'a ControlFlowGraph,
    pub table: &'a SymbolTable,
    pub config: &'a Configuration,
    pub solver: SolverContext,
    pub stats: Statistics,
    fresh: u64,
}

impl<'a> Explorer<'a> {
    pub fn new(
        cfg: &'a ControlFlowGraph,
        table: &'a SymbolTable,
        config: &'a Configuration,
        backend: Box<dyn SmtSolver>,
    ) -> Self {
        Explorer {
            cfg,
            table,
            config,
            solver: SolverContext::new(backend, config.cache_formulas),
            stats: Statistics::default(),
            fresh: 0,
        }
    }

    pub fn run(&mut self, root: ExecutionState) -> Explore {
        self.exec_p(root)
    }

    // PROCESS SCHEDULER
    // --------------------------------------------------------------------------------------------

    /// One round of the main loop: pick the enabled threads, reduce, branch
    /// over the survivors, and recurse with a decremented depth budget.
    fn exec_p(&mut self, mut state: ExecutionState) -> Explore {
        state.current_thread = None;
        state.debug_assert_invariants();

        if state.threads.is_empty() {
            self.stats.paths_finished += 1;
            return Ok(());
        }
        if state.remaining_k == 0 {
            self.stats.depth_exhausted += 1;
            return Ok(());
        }

        let enabled: Vec<ThreadId> = state
            .threads
            .values()
            .filter(|thread| por::is_enabled(self.cfg, &state, thread))
            .map(|thread| thread.tid)
            .collect();
        if enabled.is_empty() {
            // Live threads with nothing to run: the program is stuck.
            return Err(Stop::Deadlock);
        }

        let (state, mut selected) = if self.config.apply_por {
            por::reduce(self, state, enabled)?
        } else {
            (state, enabled)
        };
        trace!(threads = state.threads.len(), selected = selected.len(), "scheduling");

        if self.config.apply_random_interleaving {
            selected.shuffle(&mut rand::rng());
        }

        for tid in selected {
            let mut chosen = state.clone();
            chosen.current_thread = Some(tid);
            for mut successor in self.exec_t(chosen)? {
                successor.remaining_k -= 1;
                self.exec_p(successor)?;
            }
        }
        Ok(())
    }

    // VERIFICATION CONDITIONS
    // --------------------------------------------------------------------------------------------

    /// Discharges `assertion` at `location`: builds `¬(PC ⇒ e)` and asks the
    /// oracle. A satisfiable negation is a counterexample.
    pub(crate) fn assert_formula(
        &mut self,
        state: &ExecutionState,
        assertion: &Expression,
        location: NodeId,
    ) -> Explore {
        match eval::evaluate_as_bool(state, assertion)? {
            Truth::Known(true) => Ok(()),
            Truth::Known(false) => {
                debug!(%location, "assertion is literally false");
                Err(Stop::Invalid(Invalidity { location: Some(location), formula: None }))
            },
            Truth::Symbolic(phi) => {
                let conjunction = eval::evaluate(state, &state.constraints.conjunction())?;
                let negated = Expression::and(conjunction, eval::negate(phi));
                let formula = if self.config.apply_local_solver {
                    eval::evaluate(state, &negated)?
                } else {
                    negated
                };
                match formula.as_bool() {
                    Some(false) => Ok(()),
                    Some(true) => {
                        Err(Stop::Invalid(Invalidity { location: Some(location), formula: None }))
                    },
                    None => {
                        if self.solver.is_satisfiable(&formula) {
                            debug!(%location, "counterexample found");
                            Err(Stop::Invalid(Invalidity {
                                location: Some(location),
                                formula: Some(formula),
                            }))
                        } else {
                            Ok(())
                        }
                    },
                }
            },
        }
    }

    /// Accumulates `assumption` into the path condition. Returns false when
    /// the branch became infeasible and must produce no successors.
    pub(crate) fn assume_formula(
        &mut self,
        state: &mut ExecutionState,
        assumption: &Expression,
    ) -> Explore<bool> {
        match eval::evaluate_as_bool(state, assumption)? {
            Truth::Known(true) => Ok(true),
            Truth::Known(false) => {
                self.stats.infeasible_prunes += 1;
                Ok(false)
            },
            Truth::Symbolic(phi) => {
                state.constraints.push(phi);
                if self.state_feasible(state)? {
                    Ok(true)
                } else {
                    self.stats.infeasible_prunes += 1;
                    Ok(false)
                }
            },
        }
    }

    /// Whether the state's path condition is still satisfiable under its
    /// current alias map.
    pub(crate) fn state_feasible(
        &mut self,
        state: &ExecutionState,
    ) -> Result<bool, EngineError> {
        let conjunction = eval::evaluate(state, &state.constraints.conjunction())?;
        Ok(match conjunction.as_bool() {
            Some(feasible) => feasible,
            None => self.solver.is_satisfiable(&conjunction),
        })
    }

    // SUPPORT
    // --------------------------------------------------------------------------------------------

    pub(crate) fn fresh_name(&mut self, base: &str) -> Identifier {
        let n = self.fresh;
        self.fresh += 1;
        oox_core::ident(&format!("{base}${n}"))
    }

    /// The successors of `id`, which must number exactly `expected`.
    pub(crate) fn neighbours_exactly(
        &self,
        id: NodeId,
        expected: usize,
    ) -> Result<SmallVec<[NodeId; 2]>, EngineError> {
        let successors = self.cfg.successors(id);
        if successors.len() != expected {
            return Err(EngineError::ExpectedNumberOfNeighbours {
                kind: self.cfg.kind(id).label(),
                expected,
                got: successors.len(),
            });
        }
        Ok(SmallVec::from_slice(successors))
    }

    /// The successors of `id`, which must number at least one.
    pub(crate) fn neighbours_at_least_one(
        &self,
        id: NodeId,
    ) -> Result<SmallVec<[NodeId; 2]>, EngineError> {
        let successors = self.cfg.successors(id);
        if successors.is_empty() {
            return Err(EngineError::ExpectedNumberOfNeighbours {
                kind: self.cfg.kind(id).label(),
                expected: 1,
                got: 0,
            });
        }
        Ok(SmallVec::from_slice(successors))
    }

    /// One successor state per CFG successor of `from`.
    pub(crate) fn advance_to_successors(
        &self,
        state: ExecutionState,
        from: NodeId,
    ) -> Result<Vec<ExecutionState>, EngineError> {
        let successors = self.neighbours_at_least_one(from)?;
        successors.iter().map(|succ| advance(state.clone(), *succ)).collect()
    }
}

/// Moves the current thread's program counter.
pub(crate) fn advance(
    mut state: ExecutionState,
    to: NodeId,
) -> Result<ExecutionState, EngineError> {
    state.current_mut()?.pc = to;
    Ok(state)
}
