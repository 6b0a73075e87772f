//! Bottleneck detection: assets operating with little or no headroom.
//!
//! Flags are kept simple enough to show on a management dashboard without
//! further interpretation: a plant near capacity, a route with full trips,
//! or inventory sitting on its safety stock.
use super::utilisation::UtilisationReport;
use crate::id::PlantID;
use crate::results::InventoryRow;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Detection thresholds
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Production utilisation at or above this flags a plant
    pub plant_percent: f64,
    /// Trip-fill utilisation at or above this flags a route
    pub route_percent: f64,
    /// Minimum buffer at or below this flags a plant's inventory
    pub inventory_buffer: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            plant_percent: 90.0,
            route_percent: 90.0,
            inventory_buffer: 1e-6,
        }
    }
}

/// A plant operating near its production capacity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlantBottleneck {
    /// Plant display name
    pub plant: String,
    /// Production utilisation percentage
    pub utilization_percent: f64,
    /// Explanation for the dashboard
    pub message: String,
}

/// A route whose dispatched trips are nearly full
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteBottleneck {
    /// Origin display name
    pub origin: String,
    /// Destination display name
    pub destination: String,
    /// Transport mode
    pub mode: String,
    /// Period the flag applies to
    pub period: String,
    /// Trip-fill percentage
    pub utilization_percent: f64,
    /// Explanation for the dashboard
    pub message: String,
}

/// A plant whose inventory touches its safety stock
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryBottleneck {
    /// Plant display name
    pub plant: String,
    /// Smallest observed buffer above safety stock
    pub min_buffer: f64,
    /// Explanation for the dashboard
    pub message: String,
}

/// All bottleneck flags for one run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BottleneckReport {
    /// Plants near max production capacity
    pub plants: Vec<PlantBottleneck>,
    /// Routes with nearly full trips
    pub routes: Vec<RouteBottleneck>,
    /// Plants with little or no inventory buffer
    pub inventory: Vec<InventoryBottleneck>,
}

/// Detect bottlenecks from utilisation tables and inventory rows
pub fn detect_bottlenecks(
    utilisation: &UtilisationReport,
    inventory_rows: &[InventoryRow],
    safety_stock_by_plant: &IndexMap<PlantID, f64>,
    thresholds: &Thresholds,
) -> BottleneckReport {
    let plants = utilisation
        .production
        .iter()
        .filter(|row| row.utilization_percent >= thresholds.plant_percent)
        .map(|row| PlantBottleneck {
            plant: row.plant.clone(),
            utilization_percent: row.utilization_percent,
            message: "Plant operating near max production capacity.".to_string(),
        })
        .collect();

    let routes = utilisation
        .transport
        .iter()
        .filter(|row| row.trips > 0 && row.utilization_percent >= thresholds.route_percent)
        .map(|row| RouteBottleneck {
            origin: row.origin.clone(),
            destination: row.destination.clone(),
            mode: row.mode.to_string(),
            period: row.period.to_string(),
            utilization_percent: row.utilization_percent,
            message: "Route trips are near full capacity.".to_string(),
        })
        .collect();

    // Scenario rows are treated independently: the minimum buffer over all
    // rows for a plant is what matters
    let mut min_buffer: IndexMap<PlantID, (String, f64)> = IndexMap::new();
    for row in inventory_rows {
        let safety = safety_stock_by_plant
            .get(&row.plant_id)
            .copied()
            .unwrap_or(0.0);
        let buffer = row.inventory - safety;
        min_buffer
            .entry(row.plant_id.clone())
            .and_modify(|entry| entry.1 = entry.1.min(buffer))
            .or_insert((row.plant.clone(), buffer));
    }
    let inventory = min_buffer
        .into_iter()
        .filter(|(_, (_, buffer))| *buffer <= thresholds.inventory_buffer)
        .map(|(_, (plant, buffer))| InventoryBottleneck {
            plant,
            min_buffer: buffer,
            message: "Inventory hits safety stock (low buffer).".to_string(),
        })
        .collect();

    BottleneckReport {
        plants,
        routes,
        inventory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::utilisation::{
        ProductionUtilisationRow, TransportUtilisationRow, UtilisationReport,
    };
    use float_cmp::assert_approx_eq;

    fn production_row(plant: &str, percent: f64) -> ProductionUtilisationRow {
        ProductionUtilisationRow {
            plant_id: plant.into(),
            plant: plant.to_string(),
            production_total: 0.0,
            capacity_total: 0.0,
            utilization_percent: percent,
        }
    }

    fn transport_row(trips: u64, percent: f64) -> TransportUtilisationRow {
        TransportUtilisationRow {
            origin_id: "CP1".into(),
            origin: "North clinker".to_string(),
            destination_id: "GU1".into(),
            destination: "South grinding".to_string(),
            mode: "Road".into(),
            period: "2025-01".into(),
            shipment: 0.0,
            trips,
            capacity_per_trip: 0.0,
            trip_capacity_used: 0.0,
            utilization_percent: percent,
        }
    }

    fn inventory_row(plant_id: &str, level: f64) -> InventoryRow {
        InventoryRow {
            scenario: None,
            plant_id: plant_id.into(),
            plant: plant_id.to_string(),
            period: "2025-01".into(),
            inventory: level,
        }
    }

    #[test]
    fn thresholds_gate_flags() {
        let utilisation = UtilisationReport {
            production: vec![production_row("hot", 95.0), production_row("cool", 50.0)],
            transport: vec![transport_row(2, 98.0), transport_row(0, 100.0)],
            storage: Vec::new(),
        };
        let inventory = vec![inventory_row("tight", 10.0), inventory_row("loose", 50.0)];
        let safety = IndexMap::from([
            (PlantID::from("tight"), 10.0),
            (PlantID::from("loose"), 10.0),
        ]);

        let report =
            detect_bottlenecks(&utilisation, &inventory, &safety, &Thresholds::default());

        assert_eq!(report.plants.len(), 1);
        assert_eq!(report.plants[0].plant, "hot");

        // Routes with zero trips are never flagged, however "full" they look
        assert_eq!(report.routes.len(), 1);
        assert_eq!(report.routes[0].utilization_percent, 98.0);

        assert_eq!(report.inventory.len(), 1);
        assert_eq!(report.inventory[0].plant, "tight");
        assert_approx_eq!(f64, report.inventory[0].min_buffer, 0.0);
    }

    #[test]
    fn minimum_buffer_is_taken_over_rows() {
        let utilisation = UtilisationReport::default();
        let inventory = vec![inventory_row("GU1", 50.0), inventory_row("GU1", 5.0)];
        let safety = IndexMap::from([(PlantID::from("GU1"), 5.0)]);

        let report =
            detect_bottlenecks(&utilisation, &inventory, &safety, &Thresholds::default());
        assert_eq!(report.inventory.len(), 1);
        assert_approx_eq!(f64, report.inventory[0].min_buffer, 0.0);
    }
}
