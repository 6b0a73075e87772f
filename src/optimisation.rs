//! Construction of the planning MILP.
//!
//! The builder turns a [`PlanningDataset`] (plus a scenario expansion for
//! uncertainty runs) into a `highs` problem. Production, shipment, trip and
//! mode-selection decisions are shared across scenarios ("here-and-now");
//! inventory and demand shortfall are scenario-indexed recourse. Deterministic
//! runs use a degenerate single-scenario view so that both run kinds share one
//! constraint skeleton.
use crate::dataset::PlanningDataset;
use crate::id::{PeriodID, PlantID, ScenarioID};
use crate::route::RouteKey;
use crate::scenario::ScenarioDemand;
use highs::{RowProblem as Problem, Sense};
use indexmap::IndexMap;
use itertools::iproduct;
use std::ops::Range;

pub mod constraints;
use constraints::add_model_constraints;

/// Default big-M bounding trip counts in the mode-linkage constraint
pub const DEFAULT_TRIPS_BIG_M: f64 = 10_000.0;

/// Default per-unit penalty on demand shortfall in repair mode
pub const DEFAULT_SHORTFALL_PENALTY: f64 = 10_000.0;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just
/// refers to a particular column of the problem.
type Variable = highs::Col;

/// Variables indexed by plant and period
type PlantPeriodVariableMap = IndexMap<(PlantID, PeriodID), Variable>;

/// Variables indexed by route and period
type RoutePeriodVariableMap = IndexMap<(RouteKey, PeriodID), Variable>;

/// Variables indexed by scenario, plant and period
type RecourseVariableMap = IndexMap<(ScenarioID, PlantID, PeriodID), Variable>;

/// How scenario costs are folded into the objective
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CostAggregation {
    /// Probability-weighted expected cost (also used for deterministic runs,
    /// where the single scenario has probability one)
    Expected,
    /// Minimise the maximum scenario cost via an epigraph variable
    WorstCase,
}

/// Feasibility-repair parameters.
///
/// When present, a demand-shortfall variable enters every inventory balance
/// with a large penalty, and the hard inventory/batching/overlay bounds are
/// relaxed so the model always has a feasible point. Callers must inspect the
/// shortfall values to know whether the returned plan is literally
/// implementable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RepairOptions {
    /// Objective penalty per unit of unmet demand
    pub shortfall_penalty: f64,
    /// Fractional relaxation of inventory bands, closing stock and lane
    /// limits (0.2 = ±20%)
    pub bound_relaxation: f64,
    /// Fraction of the SBQ still enforced per trip (0.5 = half batches allowed)
    pub sbq_relaxation: f64,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            shortfall_penalty: DEFAULT_SHORTFALL_PENALTY,
            bound_relaxation: 0.2,
            sbq_relaxation: 0.5,
        }
    }
}

/// A map for easy lookup of variables in the problem.
///
/// The entries are ordered (see [`IndexMap`]) and each family records the
/// column range it occupies, so solution values can be read back by zipping
/// keys with the column slice.
pub struct VariableMap {
    production_vars: PlantPeriodVariableMap,
    production_idx: Range<usize>,
    shipment_vars: RoutePeriodVariableMap,
    shipment_idx: Range<usize>,
    trips_vars: RoutePeriodVariableMap,
    trips_idx: Range<usize>,
    mode_vars: RoutePeriodVariableMap,
    mode_idx: Range<usize>,
    inventory_vars: RecourseVariableMap,
    inventory_idx: Range<usize>,
    shortfall_vars: RecourseVariableMap,
    shortfall_idx: Range<usize>,
    worst_case_var: Option<Variable>,
}

impl VariableMap {
    /// Create a new [`VariableMap`], adding all columns to the problem.
    ///
    /// Objective coefficients are attached to the columns here: production
    /// unit costs on production, cost per trip on trips and
    /// probability-weighted holding costs on inventory. Under
    /// [`CostAggregation::WorstCase`] the scenario-cost coefficients move to
    /// the epigraph variable instead (see
    /// [`constraints::add_worst_case_epigraph_constraints`]).
    fn new_with_variables(
        problem: &mut Problem,
        dataset: &PlanningDataset,
        scenarios: &ScenarioDemand,
        aggregation: CostAggregation,
        repair: Option<&RepairOptions>,
    ) -> Self {
        let scenario_costed = aggregation == CostAggregation::Expected;

        // Production, fixed to zero for non-producing plants
        let start = problem.num_cols();
        let mut production_vars = PlantPeriodVariableMap::new();
        for (plant_id, period) in iproduct!(dataset.plants.keys(), dataset.periods.iter()) {
            let var = match dataset.production.get(plant_id) {
                Some(terms) => problem.add_column(terms.unit_cost, 0.0..),
                None => problem.add_column(0.0, 0.0..=0.0),
            };
            production_vars.insert((plant_id.clone(), period.clone()), var);
        }
        let production_idx = start..problem.num_cols();

        // Shipments carry no direct cost; transport cost is per trip
        let start = problem.num_cols();
        let mut shipment_vars = RoutePeriodVariableMap::new();
        for (key, period) in iproduct!(dataset.routes.keys(), dataset.periods.iter()) {
            let var = problem.add_column(0.0, 0.0..);
            shipment_vars.insert((key.clone(), period.clone()), var);
        }
        let shipment_idx = start..problem.num_cols();

        let start = problem.num_cols();
        let mut trips_vars = RoutePeriodVariableMap::new();
        for ((key, route), period) in iproduct!(dataset.routes.iter(), dataset.periods.iter()) {
            let coeff = if scenario_costed { route.cost_per_trip } else { 0.0 };
            let var = problem.add_integer_column(coeff, 0.0..);
            trips_vars.insert((key.clone(), period.clone()), var);
        }
        let trips_idx = start..problem.num_cols();

        let start = problem.num_cols();
        let mut mode_vars = RoutePeriodVariableMap::new();
        for (key, period) in iproduct!(dataset.routes.keys(), dataset.periods.iter()) {
            let var = problem.add_integer_column(0.0, 0.0..=1.0);
            mode_vars.insert((key.clone(), period.clone()), var);
        }
        let mode_idx = start..problem.num_cols();

        // Scenario-indexed recourse: inventory, plus shortfall in repair mode
        let start = problem.num_cols();
        let mut inventory_vars = RecourseVariableMap::new();
        for ((scenario, &probability), (plant_id, period)) in iproduct!(
            scenarios.probabilities.iter(),
            iproduct!(dataset.plants.keys(), dataset.periods.iter())
        ) {
            let holding = dataset.bounds[plant_id].holding_cost;
            let coeff = if scenario_costed { probability * holding } else { 0.0 };
            let var = problem.add_column(coeff, 0.0..);
            inventory_vars.insert((scenario.clone(), plant_id.clone(), period.clone()), var);
        }
        let inventory_idx = start..problem.num_cols();

        let start = problem.num_cols();
        let mut shortfall_vars = RecourseVariableMap::new();
        if let Some(repair) = repair {
            for ((scenario, &probability), (plant_id, period)) in iproduct!(
                scenarios.probabilities.iter(),
                iproduct!(dataset.plants.keys(), dataset.periods.iter())
            ) {
                let coeff = if scenario_costed {
                    probability * repair.shortfall_penalty
                } else {
                    0.0
                };
                let var = problem.add_column(coeff, 0.0..);
                shortfall_vars.insert((scenario.clone(), plant_id.clone(), period.clone()), var);
            }
        }
        let shortfall_idx = start..problem.num_cols();

        let worst_case_var = (aggregation == CostAggregation::WorstCase)
            .then(|| problem.add_column(1.0, 0.0..));

        Self {
            production_vars,
            production_idx,
            shipment_vars,
            shipment_idx,
            trips_vars,
            trips_idx,
            mode_vars,
            mode_idx,
            inventory_vars,
            inventory_idx,
            shortfall_vars,
            shortfall_idx,
            worst_case_var,
        }
    }

    /// Get the production [`Variable`] for the given parameters
    pub fn production_var(&self, plant_id: &PlantID, period: &PeriodID) -> Variable {
        *self
            .production_vars
            .get(&(plant_id.clone(), period.clone()))
            .expect("No production variable found for given params")
    }

    /// Get the shipment [`Variable`] for the given parameters
    pub fn shipment_var(&self, key: &RouteKey, period: &PeriodID) -> Variable {
        *self
            .shipment_vars
            .get(&(key.clone(), period.clone()))
            .expect("No shipment variable found for given params")
    }

    /// Get the trips [`Variable`] for the given parameters
    pub fn trips_var(&self, key: &RouteKey, period: &PeriodID) -> Variable {
        *self
            .trips_vars
            .get(&(key.clone(), period.clone()))
            .expect("No trips variable found for given params")
    }

    /// Get the mode-selection [`Variable`] for the given parameters
    pub fn mode_var(&self, key: &RouteKey, period: &PeriodID) -> Variable {
        *self
            .mode_vars
            .get(&(key.clone(), period.clone()))
            .expect("No mode variable found for given params")
    }

    /// Get the inventory [`Variable`] for the given parameters
    pub fn inventory_var(
        &self,
        scenario: &ScenarioID,
        plant_id: &PlantID,
        period: &PeriodID,
    ) -> Variable {
        *self
            .inventory_vars
            .get(&(scenario.clone(), plant_id.clone(), period.clone()))
            .expect("No inventory variable found for given params")
    }

    /// Get the shortfall [`Variable`] for the given parameters, if repair mode
    /// is active
    pub fn shortfall_var(
        &self,
        scenario: &ScenarioID,
        plant_id: &PlantID,
        period: &PeriodID,
    ) -> Option<Variable> {
        self.shortfall_vars
            .get(&(scenario.clone(), plant_id.clone(), period.clone()))
            .copied()
    }

    /// The worst-case epigraph [`Variable`], present only for robust runs
    pub fn worst_case_var(&self) -> Option<Variable> {
        self.worst_case_var
    }
}

/// A built but unsolved model, ready for the solver orchestrator
pub struct BuiltModel {
    /// The optimisation problem
    pub problem: Problem,
    /// Lookup from solution columns back to model entities
    pub variables: VariableMap,
    /// How the objective folds scenario costs
    pub aggregation: CostAggregation,
    /// Repair options the model was built with, if any
    pub repair: Option<RepairOptions>,
}

impl BuiltModel {
    /// Convert to a `highs` model, minimising total cost
    pub(crate) fn into_highs_model(self) -> (highs::Model, VariableMap) {
        (self.problem.optimise(Sense::Minimise), self.variables)
    }
}

/// Provides the interface for building the planning MILP.
///
/// Constructed for one run, consumed by [`PlanModel::build`]; the resulting
/// [`BuiltModel`] is solved and discarded within the same run.
pub struct PlanModel<'a> {
    dataset: &'a PlanningDataset,
    scenarios: Option<&'a ScenarioDemand>,
    aggregation: CostAggregation,
    repair: Option<RepairOptions>,
    trips_big_m: f64,
}

impl<'a> PlanModel<'a> {
    /// Create a deterministic [`PlanModel`] for the given dataset
    pub fn new(dataset: &'a PlanningDataset) -> Self {
        Self {
            dataset,
            scenarios: None,
            aggregation: CostAggregation::Expected,
            repair: None,
            trips_big_m: DEFAULT_TRIPS_BIG_M,
        }
    }

    /// Use scenario-indexed recourse with the given scenario demand
    pub fn with_scenarios(self, scenarios: &'a ScenarioDemand) -> Self {
        Self {
            scenarios: Some(scenarios),
            ..self
        }
    }

    /// Minimise the worst scenario cost instead of the expected cost
    pub fn with_worst_case(self) -> Self {
        Self {
            aggregation: CostAggregation::WorstCase,
            ..self
        }
    }

    /// Enable the feasibility-repair variant
    pub fn with_repair(self, repair: RepairOptions) -> Self {
        Self {
            repair: Some(repair),
            ..self
        }
    }

    /// Override the big-M used in the mode-linkage constraint
    pub fn with_trips_big_m(self, trips_big_m: f64) -> Self {
        Self {
            trips_big_m,
            ..self
        }
    }

    /// Build the problem: columns, then constraint rows.
    pub fn build(&self) -> BuiltModel {
        let single;
        let scenarios = match self.scenarios {
            Some(scenarios) => scenarios,
            None => {
                single = ScenarioDemand::single(self.dataset);
                &single
            }
        };

        let mut problem = Problem::default();
        let variables = VariableMap::new_with_variables(
            &mut problem,
            self.dataset,
            scenarios,
            self.aggregation,
            self.repair.as_ref(),
        );

        add_model_constraints(
            &mut problem,
            &variables,
            self.dataset,
            scenarios,
            self.aggregation,
            self.repair.as_ref(),
            // Overlays are defined against the base demand signal, so they
            // only apply to deterministic runs
            self.scenarios.is_none(),
            self.trips_big_m,
        );

        BuiltModel {
            problem,
            variables,
            aggregation: self.aggregation,
            repair: self.repair,
        }
    }
}

/// The solution to a solved planning problem
pub struct Solution {
    columns: Vec<f64>,
    variables: VariableMap,
    /// The objective value for the solution
    pub objective_value: f64,
}

impl Solution {
    /// Create a solution from solved column values
    pub(crate) fn new(variables: VariableMap, columns: Vec<f64>, objective_value: f64) -> Self {
        Self {
            columns,
            variables,
            objective_value,
        }
    }

    /// Production level for every (plant, period)
    pub fn iter_production(&self) -> impl Iterator<Item = (&(PlantID, PeriodID), f64)> {
        self.variables
            .production_vars
            .keys()
            .zip(self.columns[self.variables.production_idx.clone()].iter())
            .map(|(key, &value)| (key, value))
    }

    /// Shipped quantity and trip count for every (route, period)
    pub fn iter_route_activity(&self) -> impl Iterator<Item = (&(RouteKey, PeriodID), f64, f64)> {
        let trips = &self.columns[self.variables.trips_idx.clone()];
        self.variables
            .shipment_vars
            .keys()
            .zip(self.columns[self.variables.shipment_idx.clone()].iter())
            .zip(trips.iter())
            .map(|((key, &shipped), &trips)| (key, shipped, trips))
    }

    /// Mode-selection value for every (route, period)
    pub fn iter_mode_selected(&self) -> impl Iterator<Item = (&(RouteKey, PeriodID), f64)> {
        self.variables
            .mode_vars
            .keys()
            .zip(self.columns[self.variables.mode_idx.clone()].iter())
            .map(|(key, &value)| (key, value))
    }

    /// Inventory level for every (scenario, plant, period)
    pub fn iter_inventory(
        &self,
    ) -> impl Iterator<Item = (&(ScenarioID, PlantID, PeriodID), f64)> {
        self.variables
            .inventory_vars
            .keys()
            .zip(self.columns[self.variables.inventory_idx.clone()].iter())
            .map(|(key, &value)| (key, value))
    }

    /// Demand shortfall for every (scenario, plant, period); empty unless the
    /// model was built in repair mode
    pub fn iter_shortfall(
        &self,
    ) -> impl Iterator<Item = (&(ScenarioID, PlantID, PeriodID), f64)> {
        self.variables
            .shortfall_vars
            .keys()
            .zip(self.columns[self.variables.shortfall_idx.clone()].iter())
            .map(|(key, &value)| (key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::PlanningDataset;
    use crate::fixture::two_plant_dataset;
    use crate::scenario::{ScenarioDemand, default_scenarios};
    use rstest::rstest;

    #[rstest]
    fn deterministic_build_has_expected_shape(two_plant_dataset: PlanningDataset) {
        let built = PlanModel::new(&two_plant_dataset).build();

        // 2 plants x 2 periods production, 1 route x 2 periods each of
        // shipment/trips/mode, 1 scenario x 2 plants x 2 periods inventory
        assert_eq!(built.variables.production_vars.len(), 4);
        assert_eq!(built.variables.shipment_vars.len(), 2);
        assert_eq!(built.variables.trips_vars.len(), 2);
        assert_eq!(built.variables.mode_vars.len(), 2);
        assert_eq!(built.variables.inventory_vars.len(), 4);
        assert!(built.variables.shortfall_vars.is_empty());
        assert!(built.variables.worst_case_var().is_none());
    }

    #[rstest]
    fn scenario_build_indexes_recourse_per_scenario(two_plant_dataset: PlanningDataset) {
        let scenarios =
            ScenarioDemand::generate(&two_plant_dataset, &default_scenarios()).unwrap();
        let built = PlanModel::new(&two_plant_dataset)
            .with_scenarios(&scenarios)
            .with_repair(RepairOptions::default())
            .build();

        // Here-and-now families are not scenario-indexed
        assert_eq!(built.variables.production_vars.len(), 4);
        assert_eq!(built.variables.trips_vars.len(), 2);
        // Recourse families are
        assert_eq!(built.variables.inventory_vars.len(), 12);
        assert_eq!(built.variables.shortfall_vars.len(), 12);
    }

    #[rstest]
    fn worst_case_build_adds_epigraph_variable(two_plant_dataset: PlanningDataset) {
        let scenarios =
            ScenarioDemand::generate(&two_plant_dataset, &default_scenarios()).unwrap();
        let built = PlanModel::new(&two_plant_dataset)
            .with_scenarios(&scenarios)
            .with_worst_case()
            .build();
        assert!(built.variables.worst_case_var().is_some());
    }
}
