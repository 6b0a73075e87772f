//! Utilisation percentages for production, transport and storage assets.
//!
//! High utilisation signals bottleneck risk, low utilisation signals wasted
//! fixed assets; both feed the bottleneck detector and the resilience score.
use crate::id::{ModeID, PeriodID, PlantID};
use crate::planning::SolvedRun;
use crate::route::RouteKey;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Production used versus available per plant, aggregated over the horizon
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionUtilisationRow {
    /// Plant identifier
    pub plant_id: PlantID,
    /// Plant display name
    pub plant: String,
    /// Total quantity produced over the run's periods
    pub production_total: f64,
    /// Capacity over the run's periods (monthly capacity times period count)
    pub capacity_total: f64,
    /// Production as a percentage of capacity
    pub utilization_percent: f64,
}

/// How full the dispatched trips were on one route in one period
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransportUtilisationRow {
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
    /// Period
    pub period: PeriodID,
    /// Quantity shipped
    pub shipment: f64,
    /// Trips dispatched
    pub trips: u64,
    /// Capacity of one trip
    pub capacity_per_trip: f64,
    /// Capacity of all dispatched trips
    pub trip_capacity_used: f64,
    /// Shipment as a percentage of dispatched trip capacity
    pub utilization_percent: f64,
}

/// Average inventory versus storage limit per plant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageUtilisationRow {
    /// Plant identifier
    pub plant_id: PlantID,
    /// Plant display name
    pub plant: String,
    /// Average closing inventory over periods (and scenarios, when present)
    pub avg_inventory: f64,
    /// Maximum inventory level
    pub max_inventory: f64,
    /// Average inventory as a percentage of the maximum
    pub utilization_percent: f64,
}

/// The three utilisation sub-tables
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilisationReport {
    /// Per-plant production utilisation
    pub production: Vec<ProductionUtilisationRow>,
    /// Per-route-period transport utilisation
    pub transport: Vec<TransportUtilisationRow>,
    /// Per-plant storage utilisation
    pub storage: Vec<StorageUtilisationRow>,
}

/// Compute utilisation sub-tables from a stored run and master-data lookups
pub fn compute_utilisation(
    run: &SolvedRun,
    plant_names: &IndexMap<PlantID, String>,
    production_capacity_by_plant: &IndexMap<PlantID, f64>,
    max_inventory_by_plant: &IndexMap<PlantID, f64>,
    route_capacity_per_trip: &IndexMap<RouteKey, f64>,
) -> UtilisationReport {
    let display = |plant_id: &PlantID| {
        plant_names
            .get(plant_id)
            .cloned()
            .unwrap_or_else(|| plant_id.to_string())
    };
    let period_count = run.periods.len().max(1) as f64;

    // Production: total produced over the horizon against total capacity
    let mut produced_by_plant: IndexMap<PlantID, f64> = IndexMap::new();
    for row in &run.production_rows {
        *produced_by_plant.entry(row.plant_id.clone()).or_default() += row.production;
    }
    let production = produced_by_plant
        .into_iter()
        .map(|(plant_id, production_total)| {
            let capacity_total = production_capacity_by_plant
                .get(&plant_id)
                .copied()
                .unwrap_or(0.0)
                * period_count;
            let utilization_percent = if capacity_total > 0.0 {
                production_total / capacity_total * 100.0
            } else {
                0.0
            };
            ProductionUtilisationRow {
                plant: display(&plant_id),
                plant_id,
                production_total,
                capacity_total,
                utilization_percent,
            }
        })
        .collect();

    // Transport: trip fill rate per route and period
    let transport = run
        .transport_rows
        .iter()
        .map(|row| {
            let key = RouteKey {
                origin: row.origin_id.clone(),
                destination: row.destination_id.clone(),
                mode: row.mode.clone(),
            };
            let capacity_per_trip = route_capacity_per_trip.get(&key).copied().unwrap_or(0.0);
            let trip_capacity_used = row.trips as f64 * capacity_per_trip;
            let utilization_percent = if trip_capacity_used > 0.0 {
                row.shipment / trip_capacity_used * 100.0
            } else {
                0.0
            };
            TransportUtilisationRow {
                origin_id: row.origin_id.clone(),
                origin: row.origin.clone(),
                destination_id: row.destination_id.clone(),
                destination: row.destination.clone(),
                mode: row.mode.clone(),
                period: row.period.clone(),
                shipment: row.shipment,
                trips: row.trips,
                capacity_per_trip,
                trip_capacity_used,
                utilization_percent,
            }
        })
        .collect();

    // Storage: average inventory against the storage limit. Scenario rows are
    // averaged alongside period rows, which keeps the measure consistent
    // between run kinds.
    let mut inventory_totals: IndexMap<PlantID, (f64, usize)> = IndexMap::new();
    for row in &run.inventory_rows {
        let entry = inventory_totals.entry(row.plant_id.clone()).or_default();
        entry.0 += row.inventory;
        entry.1 += 1;
    }
    let storage = inventory_totals
        .into_iter()
        .map(|(plant_id, (total, count))| {
            let avg_inventory = total / count.max(1) as f64;
            let max_inventory = max_inventory_by_plant.get(&plant_id).copied().unwrap_or(0.0);
            let utilization_percent = if max_inventory > 0.0 {
                avg_inventory / max_inventory * 100.0
            } else {
                0.0
            };
            StorageUtilisationRow {
                plant: display(&plant_id),
                plant_id,
                avg_inventory,
                max_inventory,
                utilization_percent,
            }
        })
        .collect();

    UtilisationReport {
        production,
        transport,
        storage,
    }
}
