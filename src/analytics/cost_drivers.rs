//! Cost-driver ranking: which plants, routes and modes the money goes to.
//!
//! Everything is computed from stored outputs and master-data unit costs, so
//! the ranking can answer "what should we renegotiate next?" without a
//! re-solve.
use crate::id::{ModeID, PlantID};
use crate::planning::SolvedRun;
use crate::route::RouteKey;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Production cost contribution of one plant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlantCost {
    /// Plant display name
    pub plant: String,
    /// Plant identifier
    pub plant_id: PlantID,
    /// Total production cost attributed to the plant
    pub cost: f64,
}

/// Transport cost contribution of one route
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteCost {
    /// Origin display name
    pub origin: String,
    /// Destination display name
    pub destination: String,
    /// Transport mode
    pub mode: ModeID,
    /// Total transport cost attributed to the route
    pub cost: f64,
}

/// Transport cost total for one mode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeCost {
    /// Transport mode
    pub mode: ModeID,
    /// Total transport cost over routes using the mode
    pub cost: f64,
}

/// Ranked cost contributions
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CostDriverReport {
    /// Highest-cost plants, descending
    pub top_plants: Vec<PlantCost>,
    /// Highest-cost routes, descending
    pub top_routes: Vec<RouteCost>,
    /// Cost by transport mode, descending
    pub mode_cost: Vec<ModeCost>,
}

/// Rank cost contributions from stored outputs and master-data unit costs.
///
/// `top_n` bounds the plant and route rankings; the mode table is complete.
pub fn compute_cost_drivers(
    run: &SolvedRun,
    plant_names: &IndexMap<PlantID, String>,
    production_cost_by_plant: &IndexMap<PlantID, f64>,
    route_cost_per_trip: &IndexMap<RouteKey, f64>,
    top_n: usize,
) -> CostDriverReport {
    // Plant production cost contribution
    let mut plant_cost: IndexMap<PlantID, f64> = IndexMap::new();
    for row in &run.production_rows {
        let unit_cost = production_cost_by_plant
            .get(&row.plant_id)
            .copied()
            .unwrap_or(0.0);
        *plant_cost.entry(row.plant_id.clone()).or_default() += row.production * unit_cost;
    }
    let mut top_plants: Vec<PlantCost> = plant_cost
        .into_iter()
        .map(|(plant_id, cost)| PlantCost {
            plant: plant_names
                .get(&plant_id)
                .cloned()
                .unwrap_or_else(|| plant_id.to_string()),
            plant_id,
            cost,
        })
        .collect();
    top_plants.sort_by(|a, b| b.cost.total_cmp(&a.cost));
    top_plants.truncate(top_n);

    // Route and mode transport cost contributions
    let mut route_cost: IndexMap<RouteKey, f64> = IndexMap::new();
    let mut mode_cost: IndexMap<ModeID, f64> = IndexMap::new();
    for row in &run.transport_rows {
        let key = RouteKey {
            origin: row.origin_id.clone(),
            destination: row.destination_id.clone(),
            mode: row.mode.clone(),
        };
        let per_trip = route_cost_per_trip.get(&key).copied().unwrap_or(0.0);
        let cost = row.trips as f64 * per_trip;
        *route_cost.entry(key).or_default() += cost;
        *mode_cost.entry(row.mode.clone()).or_default() += cost;
    }

    let display = |plant_id: &PlantID| {
        plant_names
            .get(plant_id)
            .cloned()
            .unwrap_or_else(|| plant_id.to_string())
    };
    let mut top_routes: Vec<RouteCost> = route_cost
        .into_iter()
        .map(|(key, cost)| RouteCost {
            origin: display(&key.origin),
            destination: display(&key.destination),
            mode: key.mode,
            cost,
        })
        .collect();
    top_routes.sort_by(|a, b| b.cost.total_cmp(&a.cost));
    top_routes.truncate(top_n);

    let mut mode_cost: Vec<ModeCost> = mode_cost
        .into_iter()
        .map(|(mode, cost)| ModeCost { mode, cost })
        .collect();
    mode_cost.sort_by(|a, b| b.cost.total_cmp(&a.cost));

    CostDriverReport {
        top_plants,
        top_routes,
        mode_cost,
    }
}
