//! End-to-end execution of one planning run.
//!
//! A run is sequential and self-contained: assemble the dataset from a
//! master-data snapshot, expand scenarios for uncertainty runs, build the
//! model, solve it, and parse the solution into a persistable [`SolvedRun`].
//! The model object never outlives the run and is not shared.
use crate::analytics::AnalyticsReport;
use crate::dataset::{MasterData, assemble, assemble_without_prechecks};
use crate::demand::DemandClass;
use crate::id::{PeriodID, ScenarioID};
use crate::optimisation::{PlanModel, RepairOptions};
use crate::results::{
    CostBreakdown, InventoryRow, PlanTables, ProductionRow, ShortfallRow, TransportRow,
    parse_results,
};
use crate::scenario::{ScenarioDemand, ScenarioSpec};
use crate::solver::{SolverConfig, TerminationCondition, solve};
use anyhow::Result;
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which formulation a run uses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimisationType {
    /// Single demand realisation
    #[default]
    Deterministic,
    /// Scenario-indexed recourse, expected-cost objective
    Stochastic,
    /// Scenario-indexed recourse, worst-case objective
    Robust,
}

impl fmt::Display for OptimisationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deterministic => "deterministic",
            Self::Stochastic => "stochastic",
            Self::Robust => "robust",
        };
        f.write_str(name)
    }
}

impl FromStr for OptimisationType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "deterministic" => Ok(Self::Deterministic),
            "stochastic" => Ok(Self::Stochastic),
            "robust" => Ok(Self::Robust),
            other => Err(anyhow::anyhow!(
                "Unknown optimisation type: '{other}'. Expected one of: deterministic, \
                 stochastic, robust"
            )),
        }
    }
}

/// Everything needed to execute one planning run
#[derive(Clone, Debug)]
pub struct PlanRequest {
    /// Selected periods, in chronological order
    pub periods: Vec<PeriodID>,
    /// Demand class to plan against
    pub demand_class: DemandClass,
    /// Formulation to use
    pub optimisation_type: OptimisationType,
    /// Scenario definitions, used by uncertainty runs
    pub scenarios: Vec<ScenarioSpec>,
    /// Feasibility-repair parameters, when the caller opts in
    pub repair: Option<RepairOptions>,
    /// Solver backend and budgets
    pub solver: SolverConfig,
}

/// Whether a run produced a usable plan
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// A plan was produced
    Success,
    /// The solve failed; see the message and termination condition
    Failed,
}

/// The persisted record of one planning run.
///
/// Created once per solve and immutable thereafter, except for the
/// `analytics` field attached later by the analytics engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolvedRun {
    /// Periods the run covered
    pub periods: Vec<PeriodID>,
    /// Solver backend that actually ran (or was requested, for failed runs)
    pub solver: String,
    /// Demand class the baseline was drawn from
    pub demand_class: DemandClass,
    /// Formulation used
    #[serde(rename = "optimization_type")]
    pub optimisation_type: OptimisationType,
    /// Scenario definitions (empty for deterministic runs)
    pub scenarios: Vec<ScenarioSpec>,
    /// Probability per scenario (empty for deterministic runs)
    pub scenario_probabilities: IndexMap<ScenarioID, f64>,
    /// Outcome of the run
    pub status: RunStatus,
    /// Human-readable outcome summary
    pub message: String,
    /// The solver's final verdict
    pub termination: TerminationCondition,
    /// Objective value reported by the solver
    pub objective_value: f64,
    /// Cost components recomputed from the solution
    pub cost_breakdown: CostBreakdown,
    /// Non-zero production assignments
    pub production_rows: Vec<ProductionRow>,
    /// Non-zero transport assignments
    pub transport_rows: Vec<TransportRow>,
    /// Closing inventory levels
    pub inventory_rows: Vec<InventoryRow>,
    /// Positive demand shortfalls (repair runs)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shortfall_rows: Vec<ShortfallRow>,
    /// Scenario attaining the maximum realised cost (robust runs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worst_case_scenario: Option<ScenarioID>,
    /// Wall-clock solve time
    pub runtime_seconds: f64,
    /// Analytics attached post-hoc, if computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics: Option<AnalyticsReport>,
}

impl SolvedRun {
    /// Whether the run produced a usable plan
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Execute one planning run against a master-data snapshot.
///
/// Dataset and scenario validation failures propagate as errors; solver
/// failures (unavailability, infeasibility, crashes) are reported through the
/// returned run's status, message and termination condition instead.
pub fn run(master: &MasterData, request: &PlanRequest) -> Result<SolvedRun> {
    // Repair runs skip the aggregate pre-checks: they exist to return a plan
    // for exactly the datasets the pre-checks would reject
    let dataset = if request.repair.is_some() {
        assemble_without_prechecks(&request.periods, request.demand_class.clone(), master)?
    } else {
        assemble(&request.periods, request.demand_class.clone(), master)?
    };
    info!(
        "Assembled dataset: {} plants ({} producing), {} routes, {} periods",
        dataset.plants.len(),
        dataset.producers.len(),
        dataset.routes.len(),
        dataset.periods.len()
    );

    let scenarios = match request.optimisation_type {
        OptimisationType::Deterministic => None,
        OptimisationType::Stochastic | OptimisationType::Robust => {
            let scenarios = ScenarioDemand::generate(&dataset, &request.scenarios)?;
            info!("Expanded {} demand scenarios", scenarios.len());
            Some(scenarios)
        }
    };

    let mut model = PlanModel::new(&dataset);
    if let Some(scenarios) = &scenarios {
        model = model.with_scenarios(scenarios);
    }
    if request.optimisation_type == OptimisationType::Robust {
        model = model.with_worst_case();
    }
    if let Some(repair) = request.repair {
        model = model.with_repair(repair);
    }

    let built = model.build();
    let aggregation = built.aggregation;
    let repair = built.repair;
    let (outcome, solution) = solve(built, &request.solver);

    let solver_name = outcome
        .backend_used
        .map(|backend| backend.to_string())
        .unwrap_or_else(|| request.solver.backend.to_string());

    let (scenario_specs, scenario_probabilities) = match &scenarios {
        Some(scenarios) => (request.scenarios.clone(), scenarios.probabilities.clone()),
        None => (Vec::new(), IndexMap::new()),
    };

    let tables = solution.map(|solution| {
        parse_results(
            &solution,
            &dataset,
            scenarios.as_ref(),
            aggregation,
            repair.as_ref(),
        )
    });

    match &tables {
        Some(tables) => {
            info!(
                "Solve finished: {} (objective {:.2}, {:.2}s)",
                outcome.termination, tables.objective_value, outcome.runtime_seconds
            );
            if !tables.shortfall_rows.is_empty() {
                warn!(
                    "Plan leaves demand unmet at {} plant-period(s); check shortfall rows \
                     before executing it",
                    tables.shortfall_rows.len()
                );
            }
        }
        None => warn!("Solve failed: {}", outcome.message),
    }

    let tables = tables.unwrap_or_else(|| PlanTables {
        production_rows: Vec::new(),
        transport_rows: Vec::new(),
        inventory_rows: Vec::new(),
        shortfall_rows: Vec::new(),
        cost_breakdown: CostBreakdown::default(),
        objective_value: 0.0,
        worst_case_scenario: None,
    });

    Ok(SolvedRun {
        periods: request.periods.clone(),
        solver: solver_name,
        demand_class: request.demand_class.clone(),
        optimisation_type: request.optimisation_type,
        scenarios: scenario_specs,
        scenario_probabilities,
        status: if outcome.ok {
            RunStatus::Success
        } else {
            RunStatus::Failed
        },
        message: outcome.message,
        termination: outcome.termination,
        objective_value: tables.objective_value,
        cost_breakdown: tables.cost_breakdown,
        production_rows: tables.production_rows,
        transport_rows: tables.transport_rows,
        inventory_rows: tables.inventory_rows,
        shortfall_rows: tables.shortfall_rows,
        worst_case_scenario: tables.worst_case_scenario,
        runtime_seconds: outcome.runtime_seconds,
        analytics: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MasterData;
    use crate::fixture::{assert_error, two_plant_master, two_plant_periods};
    use crate::scenario::default_scenarios;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn request(periods: &[PeriodID]) -> PlanRequest {
        PlanRequest {
            periods: periods.to_vec(),
            demand_class: DemandClass::Fixed,
            optimisation_type: OptimisationType::Deterministic,
            scenarios: Vec::new(),
            repair: None,
            solver: SolverConfig::default(),
        }
    }

    #[test]
    fn optimisation_type_parsing() {
        assert_eq!(
            "robust".parse::<OptimisationType>().unwrap(),
            OptimisationType::Robust
        );
        assert!("minimax".parse::<OptimisationType>().is_err());
    }

    #[rstest]
    fn deterministic_run_succeeds(
        two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        let run = run(&two_plant_master, &request(&two_plant_periods)).unwrap();
        assert!(run.is_success());
        assert_eq!(run.solver, "highs");
        assert_eq!(run.termination, TerminationCondition::Optimal);
        assert_approx_eq!(f64, run.objective_value, 840.0, epsilon = 1e-6);
        assert!(run.scenarios.is_empty());
        assert!(run.analytics.is_none());
    }

    #[rstest]
    fn stochastic_run_records_probabilities(
        two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        let mut req = request(&two_plant_periods);
        req.optimisation_type = OptimisationType::Stochastic;
        req.scenarios = default_scenarios();
        let run = run(&two_plant_master, &req).unwrap();

        assert!(run.is_success());
        assert_eq!(run.scenario_probabilities.len(), 3);
        assert_approx_eq!(f64, run.scenario_probabilities[&ScenarioID::from("Normal")], 0.6);
        assert!(run.inventory_rows.iter().all(|row| row.scenario.is_some()));
    }

    #[rstest]
    fn invalid_scenarios_fail_before_solving(
        two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        let mut req = request(&two_plant_periods);
        req.optimisation_type = OptimisationType::Stochastic;
        req.scenarios = vec![ScenarioSpec {
            name: "Low".into(),
            probability: 0.5,
            demand_multiplier: 1.0,
        }];
        assert_error!(
            run(&two_plant_master, &req),
            "Scenario probabilities must sum to 1 (got 0.5)"
        );
    }

    #[rstest]
    fn infeasible_run_is_reported_not_raised(
        mut two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        // The buffer at GU1 cannot be touched, so total demand (230) exceeds
        // what production (200) can cover: infeasible, but the aggregate
        // pre-checks pass because initial inventory counts towards them.
        two_plant_master.plants[&crate::id::PlantID::from("GU1")].safety_stock = 900.0;
        two_plant_master.plants[&crate::id::PlantID::from("GU1")].initial_inventory = 900.0;
        two_plant_master
            .demands
            .push(crate::fixture::fixed_demand("GU1", "2025-02", 150.0));

        let run = run(&two_plant_master, &request(&two_plant_periods)).unwrap();
        assert!(!run.is_success());
        assert_eq!(run.termination, TerminationCondition::Infeasible);
        assert!(run.production_rows.is_empty());
    }
}
