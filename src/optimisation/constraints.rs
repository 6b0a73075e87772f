//! Code for adding constraints to the planning problem.
//!
//! Each constraint family is a discrete function that inspects the dataset
//! and either registers its rows or no-ops, so optional business rules are
//! decided by data presence rather than runtime probing of the model.
use super::{CostAggregation, RepairOptions, VariableMap};
use crate::dataset::PlanningDataset;
use crate::scenario::ScenarioDemand;
use highs::RowProblem as Problem;
use itertools::iproduct;

/// Add all constraint families for the planning model.
///
/// # Arguments
///
/// * `problem` - The optimisation problem
/// * `variables` - The variables in the problem
/// * `dataset` - The planning dataset
/// * `scenarios` - Scenario demand (a single base scenario for deterministic runs)
/// * `aggregation` - How scenario costs enter the objective
/// * `repair` - Feasibility-repair parameters, if active
/// * `include_overlays` - Whether overlay families apply (deterministic runs only)
/// * `trips_big_m` - Big-M bounding trips in the mode-linkage constraint
#[allow(clippy::too_many_arguments)]
pub fn add_model_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
    scenarios: &ScenarioDemand,
    aggregation: CostAggregation,
    repair: Option<&RepairOptions>,
    include_overlays: bool,
    trips_big_m: f64,
) {
    add_production_capacity_constraints(problem, variables, dataset);
    add_inventory_balance_constraints(problem, variables, dataset, scenarios, repair);
    add_inventory_band_constraints(problem, variables, dataset, scenarios, repair);
    add_trip_capacity_constraints(problem, variables, dataset);
    add_minimum_batch_constraints(problem, variables, dataset, repair);
    add_route_enablement_constraints(problem, variables, dataset);
    add_mode_linkage_constraints(problem, variables, dataset, trips_big_m);
    add_mode_exclusivity_constraints(problem, variables, dataset);

    if include_overlays {
        add_min_fulfilment_constraints(problem, variables, dataset, scenarios, repair);
        add_closing_stock_constraints(problem, variables, dataset, scenarios, repair);
        add_lane_limit_constraints(problem, variables, dataset, repair);
        add_route_bound_constraints(problem, variables, dataset, repair);
    }

    if aggregation == CostAggregation::WorstCase {
        add_worst_case_epigraph_constraints(problem, variables, dataset, scenarios, repair);
    }
}

/// Production cannot exceed capacity at producing plants.
///
/// Non-producing plants need no row: their production columns are fixed to
/// zero, which prevents phantom output at storage-only sites.
fn add_production_capacity_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
) {
    for ((plant_id, terms), period) in iproduct!(dataset.production.iter(), dataset.periods.iter())
    {
        let var = variables.production_var(plant_id, period);
        problem.add_row(..=terms.capacity, [(var, 1.0)]);
    }
}

/// Multi-period inventory balance, chained through the previous-period map.
///
/// `Inv[s,p,t] = Inv[s,p,t-1 or initial] + Prod[p,t] + inbound - outbound
/// - Demand[s,p,t] (+ Shortfall[s,p,t] in repair mode)`. The first period
/// anchors to the plant's initial inventory.
fn add_inventory_balance_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
    scenarios: &ScenarioDemand,
    repair: Option<&RepairOptions>,
) {
    let mut terms = Vec::new();
    for (scenario, (plant_id, period)) in iproduct!(
        scenarios.iter_ids(),
        iproduct!(dataset.plants.keys(), dataset.periods.iter())
    ) {
        terms.push((variables.inventory_var(scenario, plant_id, period), 1.0));
        terms.push((variables.production_var(plant_id, period), -1.0));
        for key in dataset.routes.keys() {
            if key.destination == *plant_id {
                terms.push((variables.shipment_var(key, period), -1.0));
            }
            if key.origin == *plant_id {
                terms.push((variables.shipment_var(key, period), 1.0));
            }
        }
        if repair.is_some() {
            let shortfall = variables
                .shortfall_var(scenario, plant_id, period)
                .expect("Shortfall variables missing in repair mode");
            terms.push((shortfall, -1.0));
        }

        let demand = scenarios.demand_for(scenario, plant_id, period);
        let rhs = match &dataset.previous_period[period] {
            Some(prev) => {
                terms.push((variables.inventory_var(scenario, plant_id, prev), -1.0));
                -demand
            }
            None => dataset.plants[plant_id].initial_inventory - demand,
        };
        problem.add_row(rhs..=rhs, terms.drain(..));
    }
}

/// Inventory must stay within the safety-stock/max-inventory band.
///
/// This encodes the buffer policy and the physical storage limit in a single
/// ranged row per (scenario, plant, period). Repair mode widens the band.
fn add_inventory_band_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
    scenarios: &ScenarioDemand,
    repair: Option<&RepairOptions>,
) {
    let (lo_factor, hi_factor) = relaxation_factors(repair);
    for (scenario, (plant_id, period)) in iproduct!(
        scenarios.iter_ids(),
        iproduct!(dataset.plants.keys(), dataset.periods.iter())
    ) {
        let bounds = &dataset.bounds[plant_id];
        let var = variables.inventory_var(scenario, plant_id, period);
        problem.add_row(
            bounds.safety_stock * lo_factor..=bounds.max_inventory * hi_factor,
            [(var, 1.0)],
        );
    }
}

/// A shipment cannot exceed what the dispatched trip count can carry
fn add_trip_capacity_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
) {
    for ((key, route), period) in iproduct!(dataset.routes.iter(), dataset.periods.iter()) {
        let shipment = variables.shipment_var(key, period);
        let trips = variables.trips_var(key, period);
        problem.add_row(..=0.0, [(shipment, 1.0), (trips, -route.capacity_per_trip)]);
    }
}

/// If any trip is dispatched it must carry at least the minimum batch.
///
/// This is why trips are integer and linked to a mode selector: the batch
/// floor cannot be inferred from the shipment quantity alone.
fn add_minimum_batch_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
    repair: Option<&RepairOptions>,
) {
    let sbq_factor = repair.map_or(1.0, |repair| repair.sbq_relaxation);
    for ((key, route), period) in iproduct!(dataset.routes.iter(), dataset.periods.iter()) {
        if route.sbq == 0.0 {
            continue;
        }
        let shipment = variables.shipment_var(key, period);
        let trips = variables.trips_var(key, period);
        problem.add_row(0.0.., [(shipment, 1.0), (trips, -route.sbq * sbq_factor)]);
    }
}

/// Disabled routes carry no shipments, trips or mode selection
fn add_route_enablement_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
) {
    for ((key, route), period) in iproduct!(dataset.routes.iter(), dataset.periods.iter()) {
        if route.enabled {
            continue;
        }
        problem.add_row(0.0..=0.0, [(variables.shipment_var(key, period), 1.0)]);
        problem.add_row(0.0..=0.0, [(variables.trips_var(key, period), 1.0)]);
        problem.add_row(0.0..=0.0, [(variables.mode_var(key, period), 1.0)]);
    }
}

/// A route carries no trips unless its mode is selected
fn add_mode_linkage_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
    trips_big_m: f64,
) {
    for (key, period) in iproduct!(dataset.routes.keys(), dataset.periods.iter()) {
        let trips = variables.trips_var(key, period);
        let mode = variables.mode_var(key, period);
        problem.add_row(..=0.0, [(trips, 1.0), (mode, -trips_big_m)]);
    }
}

/// At most one transport mode may be used on a lane per period, modelling
/// exclusive carrier contracts
fn add_mode_exclusivity_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
) {
    for (((origin, destination), modes), period) in
        iproduct!(dataset.lanes.iter(), dataset.periods.iter())
    {
        let terms = modes.iter().map(|mode| {
            let key = crate::route::RouteKey {
                origin: origin.clone(),
                destination: destination.clone(),
                mode: mode.clone(),
            };
            (variables.mode_var(&key, period), 1.0)
        });
        problem.add_row(..=1.0, terms);
    }
}

/// Fresh supply (production plus inbound shipments) must cover at least the
/// configured fraction of demand
fn add_min_fulfilment_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
    scenarios: &ScenarioDemand,
    repair: Option<&RepairOptions>,
) {
    let (lo_factor, _) = relaxation_factors(repair);
    let base = scenarios
        .iter_ids()
        .next()
        .expect("Scenario set cannot be empty");

    let mut terms = Vec::new();
    for ((plant_id, period), fraction) in &dataset.overlays.min_fulfilment {
        terms.push((variables.production_var(plant_id, period), 1.0));
        for key in dataset.routes.keys() {
            if key.destination == *plant_id {
                terms.push((variables.shipment_var(key, period), 1.0));
            }
        }
        if repair.is_some() {
            let shortfall = variables
                .shortfall_var(base, plant_id, period)
                .expect("Shortfall variables missing in repair mode");
            terms.push((shortfall, 1.0));
        }
        let required = fraction * lo_factor * dataset.demand_for(plant_id, period);
        problem.add_row(required.., terms.drain(..));
    }
}

/// Absolute closing-stock bounds for specific plant-periods
fn add_closing_stock_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
    scenarios: &ScenarioDemand,
    repair: Option<&RepairOptions>,
) {
    let (lo_factor, hi_factor) = relaxation_factors(repair);
    let base = scenarios
        .iter_ids()
        .next()
        .expect("Scenario set cannot be empty");

    for ((plant_id, period), band) in &dataset.overlays.closing_stock {
        let var = variables.inventory_var(base, plant_id, period);
        if let Some(min) = band.min {
            problem.add_row(min * lo_factor.., [(var, 1.0)]);
        }
        if let Some(max) = band.max {
            problem.add_row(..=max * hi_factor, [(var, 1.0)]);
        }
    }
}

/// Aggregate shipment limits per (origin, mode, period), summed over every
/// destination served from that origin by that mode
fn add_lane_limit_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
    repair: Option<&RepairOptions>,
) {
    let (lo_factor, hi_factor) = relaxation_factors(repair);
    for ((origin, mode, period), limit) in &dataset.overlays.lane_limits {
        let terms: Vec<_> = dataset
            .routes
            .keys()
            .filter(|key| key.origin == *origin && key.mode == *mode)
            .map(|key| (variables.shipment_var(key, period), 1.0))
            .collect();
        if terms.is_empty() {
            continue;
        }
        if let Some(lower) = limit.lower {
            problem.add_row(lower * lo_factor.., terms.clone());
        }
        if let Some(upper) = limit.upper {
            problem.add_row(..=upper * hi_factor, terms);
        }
    }
}

/// Route-level shipment bounds for specific route-periods.
///
/// An exact bound becomes a relaxed band in repair mode rather than an
/// equality, since an unreachable equality would defeat the repair guarantee.
fn add_route_bound_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
    repair: Option<&RepairOptions>,
) {
    let (lo_factor, hi_factor) = relaxation_factors(repair);
    for ((key, period), bound) in &dataset.overlays.route_bounds {
        let var = variables.shipment_var(key, period);
        if let Some(equal) = bound.equal {
            problem.add_row(equal * lo_factor..=equal * hi_factor, [(var, 1.0)]);
            continue;
        }
        if let Some(lower) = bound.lower {
            problem.add_row(lower * lo_factor.., [(var, 1.0)]);
        }
        if let Some(upper) = bound.upper {
            problem.add_row(..=upper * hi_factor, [(var, 1.0)]);
        }
    }
}

/// Bound the worst-case epigraph variable below by every scenario's realised
/// cost (transport plus scenario holding and shortfall penalty).
///
/// Minimising the epigraph variable then minimises the maximum scenario cost.
pub fn add_worst_case_epigraph_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    dataset: &PlanningDataset,
    scenarios: &ScenarioDemand,
    repair: Option<&RepairOptions>,
) {
    let worst_case = variables
        .worst_case_var()
        .expect("Epigraph variable missing for worst-case objective");

    let mut terms = Vec::new();
    for scenario in scenarios.iter_ids() {
        terms.push((worst_case, 1.0));
        for ((key, route), period) in iproduct!(dataset.routes.iter(), dataset.periods.iter()) {
            terms.push((variables.trips_var(key, period), -route.cost_per_trip));
        }
        for (plant_id, period) in iproduct!(dataset.plants.keys(), dataset.periods.iter()) {
            let holding = dataset.bounds[plant_id].holding_cost;
            if holding != 0.0 {
                terms.push((
                    variables.inventory_var(scenario, plant_id, period),
                    -holding,
                ));
            }
            if let Some(repair) = repair {
                let shortfall = variables
                    .shortfall_var(scenario, plant_id, period)
                    .expect("Shortfall variables missing in repair mode");
                terms.push((shortfall, -repair.shortfall_penalty));
            }
        }
        problem.add_row(0.0.., terms.drain(..));
    }
}

/// Lower/upper relaxation factors: (1, 1) normally, (1 - r, 1 + r) in repair
/// mode
fn relaxation_factors(repair: Option<&RepairOptions>) -> (f64, f64) {
    match repair {
        Some(repair) => (1.0 - repair.bound_relaxation, 1.0 + repair.bound_relaxation),
        None => (1.0, 1.0),
    }
}
