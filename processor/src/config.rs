use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

// CONFIGURATION
// ================================================================================================

/// Engine configuration. All fields are required by the verifier; `Default`
/// provides the documented defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// The OOX source the compilation unit was produced from. The engine
    /// itself only uses this for diagnostics; parsing happens upstream.
    pub file_name: PathBuf,
    /// The method to verify, written as `Class.method`.
    pub entry_point: String,
    /// Step budget per exploration branch.
    pub maximum_depth: u64,
    /// Discharge `ensures` clauses at member exits.
    pub verify_ensures: bool,
    /// Discharge `requires` clauses at non-root member entries.
    pub verify_requires: bool,
    /// Discharge `exceptional` clauses while unwinding.
    pub verify_exceptional: bool,
    /// Allow null in the alias sets of symbolic references.
    pub symbolic_nulls: bool,
    /// Let symbolic references alias other symbolic objects of their type.
    pub symbolic_aliases: bool,
    /// Upper bound on the length of a concretized symbolic array.
    pub symbolic_array_size: u64,
    /// Memoise solver queries on the structural hash of the formula.
    pub cache_formulas: bool,
    /// Enable partial-order reduction.
    pub apply_por: bool,
    /// Enable the literal fast path before calling the solver.
    pub apply_local_solver: bool,
    /// Shuffle the selected thread list before branching over it.
    pub apply_random_interleaving: bool,
    /// 0 is silent; higher values request more verbose logging.
    pub log_level: u8,
    /// Emit statistics when the run completes.
    pub run_benchmark: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            file_name: PathBuf::from("main.oox"),
            entry_point: "Main.main".to_string(),
            maximum_depth: 100,
            verify_ensures: true,
            verify_requires: true,
            verify_exceptional: true,
            symbolic_nulls: true,
            symbolic_aliases: true,
            symbolic_array_size: 2,
            cache_formulas: true,
            apply_por: true,
            apply_local_solver: true,
            apply_random_interleaving: false,
            log_level: 0,
            run_benchmark: false,
        }
    }
}

impl Configuration {
    /// The tracing filter implied by `log_level`; embedders install it on
    /// their subscriber.
    pub fn tracing_filter(&self) -> LevelFilter {
        match self.log_level {
            0 => LevelFilter::OFF,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}
