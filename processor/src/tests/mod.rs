//! End-to-end scenarios and cross-cutting properties, driven through
//! programmatically assembled compilation units.

mod programs;
mod properties;

use oox_core::{CompilationUnit, SymbolTable, cfg::ControlFlowGraph};

use crate::{Configuration, VerificationOutcome, verify};

/// A lowered program ready for verification.
pub(crate) struct Built {
    pub unit: CompilationUnit,
    pub cfg: ControlFlowGraph,
    pub table: SymbolTable,
}

pub(crate) fn run(built: &Built, entry: &str, depth: u64) -> VerificationOutcome {
    run_with(built, entry, depth, |_| {})
}

pub(crate) fn run_with(
    built: &Built,
    entry: &str,
    depth: u64,
    tweak: impl FnOnce(&mut Configuration),
) -> VerificationOutcome {
    let mut config = Configuration {
        entry_point: entry.to_string(),
        maximum_depth: depth,
        ..Configuration::default()
    };
    tweak(&mut config);
    verify(&built.unit, &built.cfg, &built.table, &config).expect("engine error")
}
