//! Common helpers for integration tests.
use clinkplan::dataset::MasterData;
use clinkplan::demand::{DemandClass, DemandRecord};
use clinkplan::id::{PeriodID, PlantID, ScenarioID};
use clinkplan::planning::{OptimisationType, PlanRequest, SolvedRun};
use clinkplan::plant::{Plant, PlantType};
use clinkplan::route::{Route, RouteKey};
use clinkplan::solver::SolverConfig;
use float_cmp::approx_eq;
use std::collections::HashMap;

/// Tolerance for values that the solver reports exactly (up to feasibility
/// tolerance)
pub const SOLVER_TOLERANCE: f64 = 1e-4;

// The helpers below give spurious warnings about being unused because each
// integration test binary compiles its own copy of this module, so we
// suppress the warnings manually

#[allow(dead_code)]
pub fn clinker_plant(id: &str, capacity: f64, unit_cost: f64) -> Plant {
    Plant {
        id: id.into(),
        name: format!("{id} clinker"),
        kind: PlantType::ClinkerPlant,
        storage_capacity: 1000.0,
        safety_stock: 0.0,
        initial_inventory: 0.0,
        production_capacity: Some(capacity),
        production_cost: Some(unit_cost),
        active: true,
    }
}

#[allow(dead_code)]
pub fn grinding_unit(id: &str) -> Plant {
    Plant {
        id: id.into(),
        name: format!("{id} grinding"),
        kind: PlantType::GrindingUnit,
        storage_capacity: 1000.0,
        safety_stock: 0.0,
        initial_inventory: 0.0,
        production_capacity: None,
        production_cost: None,
        active: true,
    }
}

#[allow(dead_code)]
pub fn route(
    origin: &str,
    destination: &str,
    mode: &str,
    cost_per_trip: f64,
    capacity_per_trip: f64,
    sbq: f64,
) -> (RouteKey, Route) {
    (
        RouteKey {
            origin: origin.into(),
            destination: destination.into(),
            mode: mode.into(),
        },
        Route {
            cost_per_trip,
            capacity_per_trip,
            sbq,
            enabled: true,
        },
    )
}

#[allow(dead_code)]
pub fn demand(plant_id: &str, period: &str, quantity: f64) -> DemandRecord {
    DemandRecord {
        plant_id: plant_id.into(),
        period: period.into(),
        demand_class: DemandClass::Fixed,
        quantity,
    }
}

#[allow(dead_code)]
pub fn master(
    plants: Vec<Plant>,
    routes: Vec<(RouteKey, Route)>,
    demands: Vec<DemandRecord>,
) -> MasterData {
    MasterData {
        plants: plants
            .into_iter()
            .map(|plant| (plant.id.clone(), plant))
            .collect(),
        routes: routes.into_iter().collect(),
        demands,
        policies: Default::default(),
        overlays: Default::default(),
    }
}

#[allow(dead_code)]
pub fn deterministic_request(periods: &[&str]) -> PlanRequest {
    PlanRequest {
        periods: periods.iter().map(|period| (*period).into()).collect(),
        demand_class: DemandClass::Fixed,
        optimisation_type: OptimisationType::Deterministic,
        scenarios: Vec::new(),
        repair: None,
        // Tests assert exact objective values, so no early stop on the gap
        solver: SolverConfig {
            mip_gap: 0.0,
            ..SolverConfig::default()
        },
    }
}

/// Check the inventory balance identity for every (scenario, plant, period)
/// of a solved run:
/// `inv[t] == inv[t-1] + production + inbound - outbound - demand + shortfall`.
#[allow(dead_code)]
pub fn check_inventory_balance(run: &SolvedRun, master: &MasterData) {
    let mut base_demand: HashMap<(PlantID, PeriodID), f64> = HashMap::new();
    for record in &master.demands {
        if record.demand_class == run.demand_class && run.periods.contains(&record.period) {
            *base_demand
                .entry((record.plant_id.clone(), record.period.clone()))
                .or_default() += record.quantity;
        }
    }
    let multipliers: HashMap<ScenarioID, f64> = run
        .scenarios
        .iter()
        .map(|spec| (spec.name.clone(), spec.demand_multiplier))
        .collect();

    let mut production: HashMap<(PlantID, PeriodID), f64> = HashMap::new();
    for row in &run.production_rows {
        *production
            .entry((row.plant_id.clone(), row.period.clone()))
            .or_default() += row.production;
    }

    let mut inbound: HashMap<(PlantID, PeriodID), f64> = HashMap::new();
    let mut outbound: HashMap<(PlantID, PeriodID), f64> = HashMap::new();
    for row in &run.transport_rows {
        *inbound
            .entry((row.destination_id.clone(), row.period.clone()))
            .or_default() += row.shipment;
        *outbound
            .entry((row.origin_id.clone(), row.period.clone()))
            .or_default() += row.shipment;
    }

    let mut shortfall: HashMap<(Option<ScenarioID>, PlantID, PeriodID), f64> = HashMap::new();
    for row in &run.shortfall_rows {
        *shortfall
            .entry((row.scenario.clone(), row.plant_id.clone(), row.period.clone()))
            .or_default() += row.quantity;
    }

    let mut inventory: HashMap<(Option<ScenarioID>, PlantID, PeriodID), f64> = HashMap::new();
    for row in &run.inventory_rows {
        inventory.insert(
            (row.scenario.clone(), row.plant_id.clone(), row.period.clone()),
            row.inventory,
        );
    }

    let previous: HashMap<&PeriodID, Option<&PeriodID>> = run
        .periods
        .iter()
        .enumerate()
        .map(|(idx, period)| {
            (period, (idx > 0).then(|| &run.periods[idx - 1]))
        })
        .collect();

    assert!(!run.inventory_rows.is_empty());
    for row in &run.inventory_rows {
        let key = (row.plant_id.clone(), row.period.clone());
        let prev_level = match previous[&row.period] {
            Some(prev) => {
                inventory[&(row.scenario.clone(), row.plant_id.clone(), prev.clone())]
            }
            None => master.plants[&row.plant_id].initial_inventory,
        };
        let multiplier = row
            .scenario
            .as_ref()
            .map(|scenario| multipliers[scenario])
            .unwrap_or(1.0);
        let demand = base_demand.get(&key).copied().unwrap_or(0.0) * multiplier;
        let slack = shortfall
            .get(&(row.scenario.clone(), row.plant_id.clone(), row.period.clone()))
            .copied()
            .unwrap_or(0.0);

        let expected = prev_level
            + production.get(&key).copied().unwrap_or(0.0)
            + inbound.get(&key).copied().unwrap_or(0.0)
            - outbound.get(&key).copied().unwrap_or(0.0)
            - demand
            + slack;
        assert!(
            approx_eq!(f64, row.inventory, expected, epsilon = SOLVER_TOLERANCE),
            "Inventory balance violated at {:?}/{}/{}: {} != {}",
            row.scenario,
            row.plant_id,
            row.period,
            row.inventory,
            expected
        );
    }
}

/// All parsed quantities must be non-negative
#[allow(dead_code)]
pub fn check_non_negativity(run: &SolvedRun) {
    for row in &run.production_rows {
        assert!(row.production >= -SOLVER_TOLERANCE);
    }
    for row in &run.transport_rows {
        assert!(row.shipment >= -SOLVER_TOLERANCE);
    }
    for row in &run.inventory_rows {
        assert!(row.inventory >= -SOLVER_TOLERANCE);
    }
    for row in &run.shortfall_rows {
        assert!(row.quantity >= -SOLVER_TOLERANCE);
    }
}

/// Wherever trips are dispatched, the shipment must lie within
/// `[trips * sbq * sbq_factor, trips * capacity_per_trip]`
#[allow(dead_code)]
pub fn check_trip_consistency(run: &SolvedRun, master: &MasterData, sbq_factor: f64) {
    for row in &run.transport_rows {
        if row.trips == 0 {
            assert!(row.shipment.abs() <= SOLVER_TOLERANCE);
            continue;
        }
        let key = RouteKey {
            origin: row.origin_id.clone(),
            destination: row.destination_id.clone(),
            mode: row.mode.clone(),
        };
        let route = &master.routes[&key];
        let trips = row.trips as f64;
        assert!(
            row.shipment >= trips * route.sbq * sbq_factor - SOLVER_TOLERANCE,
            "Shipment {} below minimum batch for {} trips on {key}",
            row.shipment,
            row.trips
        );
        assert!(
            row.shipment <= trips * route.capacity_per_trip + SOLVER_TOLERANCE,
            "Shipment {} above trip capacity for {} trips on {key}",
            row.shipment,
            row.trips
        );
    }
}

/// At most one mode may carry trips on a lane in any period
#[allow(dead_code)]
pub fn check_mode_exclusivity(run: &SolvedRun) {
    let mut active_modes: HashMap<(PlantID, PlantID, PeriodID), usize> = HashMap::new();
    for row in &run.transport_rows {
        if row.trips > 0 {
            *active_modes
                .entry((
                    row.origin_id.clone(),
                    row.destination_id.clone(),
                    row.period.clone(),
                ))
                .or_default() += 1;
        }
    }
    for (lane, count) in active_modes {
        assert!(count <= 1, "Multiple modes active on lane {lane:?}");
    }
}

/// The recomputed cost breakdown must reproduce the objective value
#[allow(dead_code)]
pub fn check_cost_reproducibility(run: &SolvedRun) {
    assert!(
        approx_eq!(
            f64,
            run.cost_breakdown.total(),
            run.objective_value,
            epsilon = SOLVER_TOLERANCE
        ),
        "Cost breakdown {} does not reproduce objective {}",
        run.cost_breakdown.total(),
        run.objective_value
    );
}
