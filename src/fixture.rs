//! Fixtures for tests
use crate::dataset::{MasterData, PlanningDataset, assemble};
use crate::demand::{DemandClass, DemandRecord};
use crate::id::PeriodID;
use crate::plant::{Plant, PlantType};
use crate::route::{Route, RouteKey};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A demand record in the Fixed class
pub fn fixed_demand(plant_id: &str, period: &str, quantity: f64) -> DemandRecord {
    DemandRecord {
        plant_id: plant_id.into(),
        period: period.into(),
        demand_class: DemandClass::Fixed,
        quantity,
    }
}

#[fixture]
pub fn clinker_plant() -> Plant {
    Plant {
        id: "CP1".into(),
        name: "North clinker".into(),
        kind: PlantType::ClinkerPlant,
        storage_capacity: 1000.0,
        safety_stock: 0.0,
        initial_inventory: 0.0,
        production_capacity: Some(100.0),
        production_cost: Some(10.0),
        active: true,
    }
}

#[fixture]
pub fn grinding_unit() -> Plant {
    Plant {
        id: "GU1".into(),
        name: "South grinding".into(),
        kind: PlantType::GrindingUnit,
        storage_capacity: 1000.0,
        safety_stock: 0.0,
        initial_inventory: 0.0,
        production_capacity: None,
        production_cost: None,
        active: true,
    }
}

#[fixture]
pub fn road_route() -> (RouteKey, Route) {
    (
        RouteKey {
            origin: "CP1".into(),
            destination: "GU1".into(),
            mode: "Road".into(),
        },
        Route {
            cost_per_trip: 20.0,
            capacity_per_trip: 50.0,
            sbq: 10.0,
            enabled: true,
        },
    )
}

#[fixture]
pub fn two_plant_periods() -> Vec<PeriodID> {
    vec!["2025-01".into(), "2025-02".into()]
}

/// Master data for a minimal network: one clinker plant shipping to one
/// grinding unit over a single road route, with demand 80 in the first period.
#[fixture]
pub fn two_plant_master(
    clinker_plant: Plant,
    grinding_unit: Plant,
    road_route: (RouteKey, Route),
) -> MasterData {
    let (key, route) = road_route;
    MasterData {
        plants: [
            (clinker_plant.id.clone(), clinker_plant),
            (grinding_unit.id.clone(), grinding_unit),
        ]
        .into_iter()
        .collect(),
        routes: [(key, route)].into_iter().collect(),
        demands: vec![fixed_demand("GU1", "2025-01", 80.0)],
        policies: Default::default(),
        overlays: Default::default(),
    }
}

#[fixture]
pub fn two_plant_dataset(
    two_plant_master: MasterData,
    two_plant_periods: Vec<PeriodID>,
) -> PlanningDataset {
    assemble(&two_plant_periods, DemandClass::Fixed, &two_plant_master).unwrap()
}
