//! Solver orchestration: backend selection, fallback, option handling and
//! status interpretation.
//!
//! The orchestrator validates the requested backend name up front, walks a
//! fixed fallback chain when a backend is unavailable, applies time-limit and
//! gap options best-effort, and reports a structured [`SolveOutcome`] rather
//! than raising. Infeasibility and unavailability are terminal: the caller
//! decides whether to retry with the feasibility-repair variant.
use crate::optimisation::{BuiltModel, Solution};
use highs::HighsModelStatus;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

/// The enumerated set of solver backends
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverBackend {
    /// Commercial MILP solver (external; no embedded driver in this build)
    Gurobi,
    /// COIN-OR branch-and-cut (external; no embedded driver in this build)
    Cbc,
    /// HiGHS, embedded via the `highs` crate
    Highs,
    /// SCIP (external; no embedded driver in this build)
    Scip,
}

impl SolverBackend {
    /// Fixed fallback order consulted when this backend is unavailable
    pub fn fallback_chain(self) -> &'static [SolverBackend] {
        match self {
            Self::Gurobi => &[Self::Cbc, Self::Highs, Self::Scip],
            Self::Cbc => &[Self::Highs, Self::Scip],
            Self::Highs => &[Self::Scip],
            Self::Scip => &[],
        }
    }

    /// Whether a driver for this backend is linked into the current build.
    ///
    /// Only HiGHS ships embedded. The other backends are recognised names so
    /// that configuration validates, but they report unavailable until a
    /// driver is wired up.
    pub fn is_available(self) -> bool {
        matches!(self, Self::Highs)
    }
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gurobi => "gurobi",
            Self::Cbc => "cbc",
            Self::Highs => "highs",
            Self::Scip => "scip",
        };
        f.write_str(name)
    }
}

/// Error for unrecognised backend names.
///
/// This is a hard input-validation failure, not a fallback trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBackend(String);

impl fmt::Display for UnknownBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown solver backend: '{}'. Expected one of: gurobi, cbc, highs, scip",
            self.0
        )
    }
}

impl Error for UnknownBackend {}

impl FromStr for SolverBackend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gurobi" => Ok(Self::Gurobi),
            "cbc" => Ok(Self::Cbc),
            "highs" => Ok(Self::Highs),
            "scip" => Ok(Self::Scip),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

/// Budget and logging options for one solve
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Requested backend
    pub backend: SolverBackend,
    /// Wall-clock budget in whole seconds (a minimum of one is enforced)
    pub time_limit_seconds: u64,
    /// Relative optimality gap target (0.01 = 1%)
    pub mip_gap: f64,
    /// Capture the solver log to this path, when set
    pub log_path: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackend::Highs,
            time_limit_seconds: 60,
            mip_gap: 0.01,
            log_path: None,
        }
    }
}

/// The solver's final verdict on a solve attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCondition {
    /// Proven optimal within the gap target
    Optimal,
    /// A feasible incumbent exists but optimality was not proven (e.g. the
    /// time limit was reached)
    Feasible,
    /// The formulation has no feasible point
    Infeasible,
    /// No configured backend is installed after exhausting the fallback chain
    NotAvailable,
    /// The backend crashed or returned an unexpected status
    Error,
}

impl fmt::Display for TerminationCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Optimal => "optimal",
            Self::Feasible => "feasible",
            Self::Infeasible => "infeasible",
            Self::NotAvailable => "not_available",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Structured result of a solve attempt
#[derive(Clone, Debug)]
pub struct SolveOutcome {
    /// Whether a usable plan was produced
    pub ok: bool,
    /// Human-readable summary for the caller
    pub message: String,
    /// The solver's final verdict
    pub termination: TerminationCondition,
    /// The backend that actually ran, if any
    pub backend_used: Option<SolverBackend>,
    /// Wall-clock runtime of the solve call
    pub runtime_seconds: f64,
    /// Path to the captured solver log, when logging was enabled
    pub log_path: Option<PathBuf>,
}

impl SolveOutcome {
    fn failure(message: impl Into<String>, termination: TerminationCondition) -> Self {
        Self {
            ok: false,
            message: message.into(),
            termination,
            backend_used: None,
            runtime_seconds: 0.0,
            log_path: None,
        }
    }
}

/// Solve a built model with the requested backend, falling back through the
/// backend's chain on unavailability.
///
/// # Returns
///
/// The structured outcome, plus the solution when one exists (`Optimal` or
/// `Feasible` terminations).
pub fn solve(model: BuiltModel, config: &SolverConfig) -> (SolveOutcome, Option<Solution>) {
    let Some(backend) = select_backend(config.backend) else {
        return (
            SolveOutcome::failure(
                "No solver is available on this machine after exhausting the fallback \
                 chain. Install HiGHS support or configure another backend.",
                TerminationCondition::NotAvailable,
            ),
            None,
        );
    };

    // Only the embedded HiGHS driver can run in this build
    debug_assert_eq!(backend, SolverBackend::Highs);
    solve_with_highs(model, config)
}

/// Resolve the backend to run: the requested one if available, otherwise the
/// first available entry of its fallback chain
fn select_backend(requested: SolverBackend) -> Option<SolverBackend> {
    if requested.is_available() {
        return Some(requested);
    }

    let mut current = requested;
    for &alternative in requested.fallback_chain() {
        warn!("Solver '{current}' not available; falling back to {alternative}.");
        current = alternative;
        if alternative.is_available() {
            return Some(alternative);
        }
    }

    None
}

/// Run the embedded HiGHS driver
fn solve_with_highs(model: BuiltModel, config: &SolverConfig) -> (SolveOutcome, Option<Solution>) {
    let (mut highs_model, variables) = model.into_highs_model();

    // Options are applied best-effort with HiGHS's own option names; HiGHS
    // ignores values it cannot use rather than failing the solve.
    highs_model.set_option("time_limit", config.time_limit_seconds.max(1) as f64);
    highs_model.set_option("mip_rel_gap", config.mip_gap);
    match &config.log_path {
        Some(path) => {
            highs_model.set_option("log_file", path.to_string_lossy().as_ref());
            highs_model.set_option("output_flag", true);
        }
        None => highs_model.set_option("output_flag", false),
    }

    info!(
        "Solving with {} (time limit {}s, gap target {})",
        SolverBackend::Highs,
        config.time_limit_seconds.max(1),
        config.mip_gap
    );

    let start = Instant::now();
    let solved = match highs_model.try_solve() {
        Ok(solved) => solved,
        Err(status) => {
            let outcome = SolveOutcome {
                ok: false,
                message: format!("Solver failed to run: {status:?}"),
                termination: TerminationCondition::Error,
                backend_used: Some(SolverBackend::Highs),
                runtime_seconds: start.elapsed().as_secs_f64(),
                log_path: config.log_path.clone(),
            };
            return (outcome, None);
        }
    };
    let runtime_seconds = start.elapsed().as_secs_f64();

    let status = solved.status();
    let termination = interpret_status(status);
    let solution = match termination {
        TerminationCondition::Optimal | TerminationCondition::Feasible => {
            let objective_value = solved.objective_value();
            let columns = solved.get_solution().columns().to_vec();
            Some(Solution::new(variables, columns, objective_value))
        }
        _ => None,
    };

    let message = match termination {
        TerminationCondition::Optimal => "Optimisation solved successfully.".to_string(),
        TerminationCondition::Feasible => format!(
            "Solver stopped with a feasible but unproven solution (status {status:?})."
        ),
        TerminationCondition::Infeasible => {
            "Model is infeasible (no plan satisfies all constraints). Check inputs and \
             constraints, or re-run with the feasibility-repair variant."
                .to_string()
        }
        _ => format!("Solver finished with status {status:?}."),
    };

    let outcome = SolveOutcome {
        ok: solution.is_some(),
        message,
        termination,
        backend_used: Some(SolverBackend::Highs),
        runtime_seconds,
        log_path: config.log_path.clone(),
    };
    (outcome, solution)
}

/// Map a HiGHS model status onto the termination taxonomy
fn interpret_status(status: HighsModelStatus) -> TerminationCondition {
    match status {
        HighsModelStatus::Optimal => TerminationCondition::Optimal,
        // A time or iteration budget ending with an incumbent is a usable,
        // unproven plan
        HighsModelStatus::ReachedTimeLimit | HighsModelStatus::ReachedIterationLimit => {
            TerminationCondition::Feasible
        }
        HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
            TerminationCondition::Infeasible
        }
        _ => TerminationCondition::Error,
    }
}
