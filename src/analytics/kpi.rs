//! Management KPIs computed from a stored run.
//!
//! All values are transparent recombinations of the stored result tables and
//! the demand signal; nothing here depends on re-solving.
use crate::id::{PlantID, ScenarioID};
use crate::planning::SolvedRun;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Key performance indicators for one run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    /// Objective value of the run
    pub total_cost: f64,
    /// Production component of the cost breakdown
    pub cost_production: f64,
    /// Transport component of the cost breakdown
    pub cost_transport: f64,
    /// Holding component of the cost breakdown
    pub cost_holding: f64,
    /// Total cost per unit of demand served
    pub cost_per_ton: f64,
    /// 100 when the run succeeded: demand satisfaction is a hard constraint
    /// in the literal model, so a successful solve implies full fulfilment
    pub service_level_percent: f64,
    /// Total demand over the run's periods
    pub total_demand: f64,
    /// Average closing inventory (probability-weighted over scenarios when
    /// probabilities are available)
    pub avg_inventory: f64,
    /// Total demand divided by average inventory
    pub inventory_turnover: f64,
    /// Average amount by which inventory exceeds safety stock
    pub avg_inventory_buffer: f64,
}

/// Compute KPIs for a run.
///
/// # Arguments
///
/// * `run` - The stored run
/// * `demand_total` - Total (expected) demand over the run's periods
/// * `safety_stock_by_plant` - Safety stock per plant, for buffer metrics
/// * `scenario_probabilities` - Present for uncertainty runs; weights the
///   average inventory across scenarios
pub fn compute_kpis(
    run: &SolvedRun,
    demand_total: f64,
    safety_stock_by_plant: &IndexMap<PlantID, f64>,
    scenario_probabilities: Option<&IndexMap<ScenarioID, f64>>,
) -> Kpis {
    let total_cost = run.objective_value;

    let cost_per_ton = if demand_total > 0.0 {
        total_cost / demand_total
    } else {
        0.0
    };

    let service_level_percent = if run.is_success() { 100.0 } else { 0.0 };

    let avg_inventory = average_inventory(run, scenario_probabilities);

    let inventory_turnover = if avg_inventory > 0.0 {
        demand_total / avg_inventory
    } else {
        0.0
    };

    let avg_inventory_buffer = if run.inventory_rows.is_empty() {
        0.0
    } else {
        let total_buffer: f64 = run
            .inventory_rows
            .iter()
            .map(|row| {
                let safety = safety_stock_by_plant
                    .get(&row.plant_id)
                    .copied()
                    .unwrap_or(0.0);
                row.inventory - safety
            })
            .sum();
        total_buffer / run.inventory_rows.len() as f64
    };

    Kpis {
        total_cost,
        cost_production: run.cost_breakdown.production,
        cost_transport: run.cost_breakdown.transport,
        cost_holding: run.cost_breakdown.holding,
        cost_per_ton,
        service_level_percent,
        total_demand: demand_total,
        avg_inventory,
        inventory_turnover,
        avg_inventory_buffer,
    }
}

/// Average inventory over all rows.
///
/// With scenario-tagged rows and probabilities, the expected average
/// `E[Inv] = sum_s prob_s * Inv_s` is used; the probability weights cancel
/// out of the denominator per (plant, period), which reduces to dividing by
/// the total probability mass over rows.
fn average_inventory(
    run: &SolvedRun,
    scenario_probabilities: Option<&IndexMap<ScenarioID, f64>>,
) -> f64 {
    if run.inventory_rows.is_empty() {
        return 0.0;
    }

    if let Some(probabilities) = scenario_probabilities {
        let mut weighted = 0.0;
        let mut mass = 0.0;
        for row in &run.inventory_rows {
            let probability = row
                .scenario
                .as_ref()
                .and_then(|scenario| probabilities.get(scenario))
                .copied()
                .unwrap_or(0.0);
            weighted += probability * row.inventory;
            mass += probability;
        }
        if mass > 0.0 {
            return weighted / mass;
        }
    }

    let total: f64 = run.inventory_rows.iter().map(|row| row.inventory).sum();
    total / run.inventory_rows.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::DemandClass;
    use crate::planning::{OptimisationType, RunStatus};
    use crate::results::{CostBreakdown, InventoryRow};
    use crate::solver::TerminationCondition;
    use float_cmp::assert_approx_eq;

    fn inventory_row(scenario: Option<&str>, plant_id: &str, level: f64) -> InventoryRow {
        InventoryRow {
            scenario: scenario.map(|s| s.into()),
            plant_id: plant_id.into(),
            plant: plant_id.to_string(),
            period: "2025-01".into(),
            inventory: level,
        }
    }

    fn run_with_inventory(rows: Vec<InventoryRow>) -> SolvedRun {
        SolvedRun {
            periods: vec!["2025-01".into()],
            solver: "highs".into(),
            demand_class: DemandClass::Fixed,
            optimisation_type: OptimisationType::Deterministic,
            scenarios: Vec::new(),
            scenario_probabilities: Default::default(),
            status: RunStatus::Success,
            message: String::new(),
            termination: TerminationCondition::Optimal,
            objective_value: 840.0,
            cost_breakdown: CostBreakdown {
                production: 800.0,
                transport: 40.0,
                holding: 0.0,
                penalty: None,
            },
            production_rows: Vec::new(),
            transport_rows: Vec::new(),
            inventory_rows: rows,
            shortfall_rows: Vec::new(),
            worst_case_scenario: None,
            runtime_seconds: 0.1,
            analytics: None,
        }
    }

    #[test]
    fn basic_kpis() {
        let run = run_with_inventory(vec![
            inventory_row(None, "CP1", 30.0),
            inventory_row(None, "GU1", 10.0),
        ]);
        let safety = IndexMap::from([(PlantID::from("CP1"), 5.0), (PlantID::from("GU1"), 5.0)]);
        let kpis = compute_kpis(&run, 80.0, &safety, None);

        assert_approx_eq!(f64, kpis.cost_per_ton, 840.0 / 80.0);
        assert_approx_eq!(f64, kpis.service_level_percent, 100.0);
        assert_approx_eq!(f64, kpis.avg_inventory, 20.0);
        assert_approx_eq!(f64, kpis.inventory_turnover, 4.0);
        assert_approx_eq!(f64, kpis.avg_inventory_buffer, 15.0);
    }

    #[test]
    fn scenario_weighted_average_inventory() {
        let run = run_with_inventory(vec![
            inventory_row(Some("Low"), "GU1", 40.0),
            inventory_row(Some("High"), "GU1", 10.0),
        ]);
        let probabilities =
            IndexMap::from([(ScenarioID::from("Low"), 0.25), (ScenarioID::from("High"), 0.75)]);
        let kpis = compute_kpis(&run, 0.0, &IndexMap::new(), Some(&probabilities));

        // (0.25*40 + 0.75*10) / (0.25 + 0.75)
        assert_approx_eq!(f64, kpis.avg_inventory, 17.5);
        assert_approx_eq!(f64, kpis.cost_per_ton, 0.0);
    }

    #[test]
    fn empty_inventory_yields_zero_metrics() {
        let run = run_with_inventory(Vec::new());
        let kpis = compute_kpis(&run, 100.0, &IndexMap::new(), None);
        assert_approx_eq!(f64, kpis.avg_inventory, 0.0);
        assert_approx_eq!(f64, kpis.inventory_turnover, 0.0);
        assert_approx_eq!(f64, kpis.avg_inventory_buffer, 0.0);
    }
}
