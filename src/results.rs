//! Parsing of solved variable assignments into canonical result tables.
//!
//! Only values above a small epsilon become production/transport rows, to
//! keep the output compact. The cost breakdown is recomputed directly from
//! solved variable values rather than trusted from the objective, so the
//! production/transport/holding/penalty components are independently
//! auditable.
use crate::dataset::PlanningDataset;
use crate::id::{ModeID, PeriodID, PlantID, ScenarioID};
use crate::optimisation::{CostAggregation, RepairOptions, Solution};
use crate::scenario::ScenarioDemand;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Solved values smaller than this are treated as zero
pub const VALUE_EPSILON: f64 = 1e-6;

/// Production at one plant in one period
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionRow {
    /// Plant identifier
    pub plant_id: PlantID,
    /// Plant display name
    pub plant: String,
    /// Period the production falls in
    pub period: PeriodID,
    /// Quantity produced
    pub production: f64,
}

/// Shipments and trips on one route in one period
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransportRow {
    /// Origin plant identifier
    pub origin_id: PlantID,
    /// Origin display name
    pub origin: String,
    /// Destination plant identifier
    pub destination_id: PlantID,
    /// Destination display name
    pub destination: String,
    /// Transport mode
    pub mode: ModeID,
    /// Period the shipment falls in
    pub period: PeriodID,
    /// Quantity shipped
    pub shipment: f64,
    /// Number of trips dispatched
    pub trips: u64,
}

/// Closing inventory at one plant in one period.
///
/// Uncertainty runs carry the scenario the level belongs to; deterministic
/// rows omit it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryRow {
    /// Scenario, for uncertainty runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ScenarioID>,
    /// Plant identifier
    pub plant_id: PlantID,
    /// Plant display name
    pub plant: String,
    /// Period the level is measured at
    pub period: PeriodID,
    /// Closing inventory level
    pub inventory: f64,
}

/// Unmet demand surfaced by a feasibility-repair run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShortfallRow {
    /// Scenario, for uncertainty runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ScenarioID>,
    /// Plant identifier
    pub plant_id: PlantID,
    /// Plant display name
    pub plant: String,
    /// Period the shortfall falls in
    pub period: PeriodID,
    /// Quantity of demand left unmet
    pub quantity: f64,
}

/// Cost components recomputed from solved variable values
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Production cost
    pub production: f64,
    /// Transport cost (trips times cost per trip)
    pub transport: f64,
    /// Inventory holding cost (probability-weighted for stochastic runs,
    /// worst-case scenario for robust runs)
    pub holding: f64,
    /// Shortfall penalty, present for repair runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty: Option<f64>,
}

impl CostBreakdown {
    /// Sum of all components; reproduces the objective value within solver
    /// tolerance
    pub fn total(&self) -> f64 {
        self.production + self.transport + self.holding + self.penalty.unwrap_or(0.0)
    }
}

/// Canonical result tables extracted from one solved model
#[derive(Clone, Debug, PartialEq)]
pub struct PlanTables {
    /// Non-zero production assignments
    pub production_rows: Vec<ProductionRow>,
    /// Non-zero transport assignments
    pub transport_rows: Vec<TransportRow>,
    /// Closing inventory levels (dense; zero is a meaningful level)
    pub inventory_rows: Vec<InventoryRow>,
    /// Positive demand shortfalls (repair runs only)
    pub shortfall_rows: Vec<ShortfallRow>,
    /// Recomputed cost components
    pub cost_breakdown: CostBreakdown,
    /// Objective value reported by the solver
    pub objective_value: f64,
    /// The scenario attaining the maximum realised cost (robust runs only)
    pub worst_case_scenario: Option<ScenarioID>,
}

/// Extract result tables from a solved model.
///
/// # Arguments
///
/// * `solution` - The solved model
/// * `dataset` - The dataset the model was built from (plant names and costs)
/// * `scenarios` - The scenario expansion for uncertainty runs, `None` for
///   deterministic runs
/// * `aggregation` - How the model folded scenario costs
/// * `repair` - Repair options the model was built with, if any
pub fn parse_results(
    solution: &Solution,
    dataset: &PlanningDataset,
    scenarios: Option<&ScenarioDemand>,
    aggregation: CostAggregation,
    repair: Option<&RepairOptions>,
) -> PlanTables {
    let production_rows = solution
        .iter_production()
        .filter(|(_, quantity)| quantity.abs() > VALUE_EPSILON)
        .map(|((plant_id, period), quantity)| ProductionRow {
            plant_id: plant_id.clone(),
            plant: dataset.plant_name(plant_id).to_string(),
            period: period.clone(),
            production: quantity,
        })
        .collect();

    let transport_rows = solution
        .iter_route_activity()
        .filter(|(_, shipped, trips)| shipped.abs() > VALUE_EPSILON || trips.abs() > VALUE_EPSILON)
        .map(|((key, period), shipped, trips)| TransportRow {
            origin_id: key.origin.clone(),
            origin: dataset.plant_name(&key.origin).to_string(),
            destination_id: key.destination.clone(),
            destination: dataset.plant_name(&key.destination).to_string(),
            mode: key.mode.clone(),
            period: period.clone(),
            shipment: shipped,
            trips: trips.round() as u64,
        })
        .collect();

    // Deterministic runs drop the internal base-scenario key from recourse rows
    let scenario_tag = |scenario: &ScenarioID| scenarios.map(|_| scenario.clone());

    let inventory_rows = solution
        .iter_inventory()
        .map(|((scenario, plant_id, period), level)| InventoryRow {
            scenario: scenario_tag(scenario),
            plant_id: plant_id.clone(),
            plant: dataset.plant_name(plant_id).to_string(),
            period: period.clone(),
            inventory: level,
        })
        .collect();

    let shortfall_rows = solution
        .iter_shortfall()
        .filter(|(_, quantity)| *quantity > VALUE_EPSILON)
        .map(|((scenario, plant_id, period), quantity)| ShortfallRow {
            scenario: scenario_tag(scenario),
            plant_id: plant_id.clone(),
            plant: dataset.plant_name(plant_id).to_string(),
            period: period.clone(),
            quantity,
        })
        .collect();

    let (cost_breakdown, worst_case_scenario) =
        recompute_costs(solution, dataset, scenarios, aggregation, repair);

    PlanTables {
        production_rows,
        transport_rows,
        inventory_rows,
        shortfall_rows,
        cost_breakdown,
        objective_value: solution.objective_value,
        worst_case_scenario,
    }
}

/// Recompute the cost breakdown from solved variable values
fn recompute_costs(
    solution: &Solution,
    dataset: &PlanningDataset,
    scenarios: Option<&ScenarioDemand>,
    aggregation: CostAggregation,
    repair: Option<&RepairOptions>,
) -> (CostBreakdown, Option<ScenarioID>) {
    let production: f64 = solution
        .iter_production()
        .map(|((plant_id, _), quantity)| {
            dataset
                .production
                .get(plant_id)
                .map_or(0.0, |terms| quantity * terms.unit_cost)
        })
        .sum();

    let transport: f64 = solution
        .iter_route_activity()
        .map(|((key, _), _, trips)| trips * dataset.routes[key].cost_per_trip)
        .sum();

    // Per-scenario holding cost and shortfall penalty
    let mut holding_by_scenario: IndexMap<ScenarioID, f64> = IndexMap::new();
    for ((scenario, plant_id, _), level) in solution.iter_inventory() {
        *holding_by_scenario.entry(scenario.clone()).or_default() +=
            level * dataset.bounds[plant_id].holding_cost;
    }
    let mut penalty_by_scenario: IndexMap<ScenarioID, f64> = IndexMap::new();
    if let Some(repair) = repair {
        for ((scenario, _, _), quantity) in solution.iter_shortfall() {
            *penalty_by_scenario.entry(scenario.clone()).or_default() +=
                quantity * repair.shortfall_penalty;
        }
    }

    match aggregation {
        CostAggregation::Expected => {
            let probability = |scenario: &ScenarioID| match scenarios {
                Some(scenarios) => scenarios.probabilities[scenario],
                None => 1.0,
            };
            let holding = holding_by_scenario
                .iter()
                .map(|(scenario, cost)| probability(scenario) * cost)
                .sum();
            let penalty = repair.map(|_| {
                penalty_by_scenario
                    .iter()
                    .map(|(scenario, cost)| probability(scenario) * cost)
                    .sum()
            });
            (
                CostBreakdown {
                    production,
                    transport,
                    holding,
                    penalty,
                },
                None,
            )
        }
        CostAggregation::WorstCase => {
            // The designated worst-case scenario maximises the realised
            // scenario cost; transport is scenario-independent so it drops
            // out of the comparison.
            let worst = holding_by_scenario
                .iter()
                .map(|(scenario, &holding)| {
                    let penalty = penalty_by_scenario.get(scenario).copied().unwrap_or(0.0);
                    (scenario.clone(), holding, penalty)
                })
                .max_by(|a, b| (a.1 + a.2).total_cmp(&(b.1 + b.2)));

            match worst {
                Some((scenario, holding, penalty)) => (
                    CostBreakdown {
                        production,
                        transport,
                        holding,
                        penalty: repair.map(|_| penalty),
                    },
                    Some(scenario),
                ),
                None => (
                    CostBreakdown {
                        production,
                        transport,
                        holding: 0.0,
                        penalty: repair.map(|_| 0.0),
                    },
                    None,
                ),
            }
        }
    }
}
