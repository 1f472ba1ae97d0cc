//! The verification driver: entry-point resolution, root-state
//! construction, the outer verdict aggregation, and statistics.

use std::collections::BTreeMap;

use oox_core::{
    CompilationUnit, DeclarationMember, Expression, RuntimeType, SymbolTable,
    cfg::{ControlFlowGraph, NodeId},
    ident,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::{
    config::Configuration,
    errors::EngineError,
    exec::{Explorer, Stop},
    solver::{SmallModelSolver, SmtSolver},
    state::{ExecutionState, StackFrame, THIS, Thread, ThreadId},
};

// RESULTS
// ================================================================================================

/// The verdict for an entry point.
#[derive(Clone, Debug, PartialEq)]
pub enum VerificationResult {
    /// No reachable violation within the depth bound.
    Valid,
    /// A counterexample exists; `location` names the violated node and
    /// `formula` the satisfiable negation, when available.
    Invalid { location: Option<NodeId>, formula: Option<Expression> },
    /// Live threads with no enabled thread among them.
    Deadlock,
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationResult::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, VerificationResult::Invalid { .. })
    }

    pub fn is_deadlock(&self) -> bool {
        matches!(self, VerificationResult::Deadlock)
    }

    /// Process exit code: 0 for valid, non-zero otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            VerificationResult::Valid => 0,
            VerificationResult::Invalid { .. } => 1,
            VerificationResult::Deadlock => 2,
        }
    }
}

/// Counters accumulated over one verification run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Transitions executed across all explored branches.
    pub states_explored: u64,
    /// Branches that terminated with every thread despawned.
    pub paths_finished: u64,
    /// Branches pruned because their path condition became unsatisfiable.
    pub infeasible_prunes: u64,
    /// Branches cut off by the depth budget.
    pub depth_exhausted: u64,
    /// Queries that reached the solver backend.
    pub solver_calls: u64,
    /// Queries answered from the formula cache.
    pub solver_cache_hits: u64,
}

/// A verdict together with the run's statistics.
#[derive(Clone, Debug)]
pub struct VerificationOutcome {
    pub result: VerificationResult,
    pub statistics: Statistics,
}

// DRIVER
// ================================================================================================

/// Verifies `config.entry_point` with the built-in bounded-model solver.
pub fn verify(
    unit: &CompilationUnit,
    cfg: &ControlFlowGraph,
    table: &SymbolTable,
    config: &Configuration,
) -> Result<VerificationOutcome, EngineError> {
    verify_with_solver(unit, cfg, table, config, Box::new(SmallModelSolver::default()))
}

/// Verifies `config.entry_point`, discharging formulas to `backend`.
#[instrument(skip_all, fields(entry = %config.entry_point))]
pub fn verify_with_solver(
    unit: &CompilationUnit,
    cfg: &ControlFlowGraph,
    table: &SymbolTable,
    config: &Configuration,
    backend: Box<dyn SmtSolver>,
) -> Result<VerificationOutcome, EngineError> {
    let entry_point = &config.entry_point;
    let Some((class_name, method_name)) = entry_point.split_once('.') else {
        return Err(EngineError::UnknownEntryPoint(entry_point.clone()));
    };
    let class_id = ident(class_name);
    let method_id = ident(method_name);

    let member = table
        .lookup(&class_id, &method_id)
        .cloned()
        .ok_or_else(|| EngineError::UnknownEntryPoint(entry_point.clone()))?;
    let DeclarationMember::Method(method) = &member else {
        return Err(EngineError::ExpectedMethodMember(entry_point.clone()));
    };

    let entry_node = cfg
        .entry_of(&class_id, &method_id)
        .ok_or_else(|| EngineError::UnknownEntryPoint(entry_point.clone()))?;
    let exit_node = cfg
        .exit_of(&class_id, &method_id)
        .ok_or_else(|| EngineError::UnknownEntryPoint(entry_point.clone()))?;
    debug!(
        classes = unit.classes.len(),
        nodes = cfg.num_nodes(),
        depth = config.maximum_depth,
        "starting exploration"
    );

    // The root state: thread 0 about to enter the entry method, with every
    // parameter bound to a fresh symbolic value of its type.
    let mut declarations = BTreeMap::new();
    for param in &method.params {
        declarations.insert(param.name.clone(), symbolic_parameter(&param.name, &param.ty));
    }
    if !method.is_static {
        declarations.insert(
            ident(THIS),
            Expression::SymbolicRef {
                name: ident(THIS),
                ty: RuntimeType::Reference(class_id.clone()),
            },
        );
    }
    let root_thread = Thread {
        tid: ThreadId::ROOT,
        parent: ThreadId::ROOT,
        pc: entry_node,
        call_stack: vec![StackFrame {
            return_point: exit_node,
            target: None,
            declarations,
            member: member.clone(),
        }],
        handler_stack: Vec::new(),
    };
    let mut root = ExecutionState::new(config.maximum_depth);
    root.threads.insert(ThreadId::ROOT, root_thread);

    let mut explorer = Explorer::new(cfg, table, config, backend);
    let result = match explorer.run(root) {
        Ok(()) => VerificationResult::Valid,
        Err(Stop::Invalid(invalidity)) => VerificationResult::Invalid {
            location: invalidity.location,
            formula: invalidity.formula,
        },
        Err(Stop::Deadlock) => VerificationResult::Deadlock,
        Err(Stop::Engine(err)) => return Err(err),
    };

    let mut statistics = explorer.stats.clone();
    statistics.solver_calls = explorer.solver.calls;
    statistics.solver_cache_hits = explorer.solver.cache_hits;
    if config.run_benchmark
        && let Ok(json) = serde_json::to_string(&statistics)
    {
        info!(target: "oox::benchmark", %json, "run statistics");
    }

    Ok(VerificationOutcome { result, statistics })
}

fn symbolic_parameter(name: &oox_core::Identifier, ty: &RuntimeType) -> Expression {
    match ty {
        RuntimeType::Int | RuntimeType::Bool => {
            Expression::SymbolicVar { name: name.clone(), ty: ty.clone() }
        },
        RuntimeType::Reference(_) | RuntimeType::Array(_) => {
            Expression::SymbolicRef { name: name.clone(), ty: ty.clone() }
        },
        RuntimeType::Void => Expression::null(),
    }
}
