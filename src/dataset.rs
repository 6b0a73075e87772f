//! Assembly of a validated planning dataset from raw master data.
//!
//! The assembler cross-references plants, routes, demand and inventory
//! policies for the selected periods, normalises defaults, and runs aggregate
//! feasibility pre-checks so that users get a clear error before a solver is
//! ever invoked. The resulting [`PlanningDataset`] is a point-in-time
//! snapshot: later edits to master data do not affect an in-flight run.
use crate::demand::{DemandClass, DemandMap, DemandRecord};
use crate::id::{ModeID, PeriodID, PlantID};
use crate::inventory::{InventoryBounds, PolicyMap};
use crate::plant::PlantMap;
use crate::route::{RouteKey, RouteMap};
use anyhow::{Result, bail, ensure};
use indexmap::{IndexMap, IndexSet};

/// A read-only snapshot of all master-data collections
#[derive(Clone, Debug, Default)]
pub struct MasterData {
    /// All plants, including inactive ones
    pub plants: PlantMap,
    /// All routes, including disabled ones
    pub routes: RouteMap,
    /// All demand records across classes and periods
    pub demands: Vec<DemandRecord>,
    /// Optional per-plant inventory policies
    pub policies: PolicyMap,
    /// Optional business-rule overlays
    pub overlays: Overlays,
}

/// Optional business-rule overlays applied on top of the core constraints.
///
/// Presence is a type-level fact: an empty map means the corresponding
/// constraint family is not added to the model at all.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlays {
    /// Minimum fraction of demand that must be covered by fresh supply
    /// (production plus inbound shipments) per (plant, period)
    pub min_fulfilment: IndexMap<(PlantID, PeriodID), f64>,
    /// Absolute closing-stock band per (plant, period)
    pub closing_stock: IndexMap<(PlantID, PeriodID), ClosingStockBand>,
    /// Aggregate shipment limits per (origin, mode, period), summed over all
    /// destinations served from that origin by that mode
    pub lane_limits: IndexMap<(PlantID, ModeID, PeriodID), ShipmentLimit>,
    /// Route-level shipment bounds per (route, period)
    pub route_bounds: IndexMap<(RouteKey, PeriodID), ShipmentBound>,
}

/// Lower/upper closing-stock bounds; either side may be open
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClosingStockBand {
    /// Minimum closing stock
    pub min: Option<f64>,
    /// Maximum closing stock
    pub max: Option<f64>,
}

/// Lower/upper bound on an aggregate shipment quantity
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShipmentLimit {
    /// Minimum total quantity to ship
    pub lower: Option<f64>,
    /// Maximum total quantity to ship
    pub upper: Option<f64>,
}

/// Shipment bound for a single route and period
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShipmentBound {
    /// Minimum shipment
    pub lower: Option<f64>,
    /// Maximum shipment
    pub upper: Option<f64>,
    /// Exact shipment; overrides lower/upper when present
    pub equal: Option<f64>,
}

/// Production terms for a producing plant
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProductionTerms {
    /// Monthly production capacity
    pub capacity: f64,
    /// Production cost per unit
    pub unit_cost: f64,
}

/// All validated data required to build and solve a planning model
#[derive(Clone, Debug)]
pub struct PlanningDataset {
    /// Selected periods, in chronological order
    pub periods: Vec<PeriodID>,
    /// Demand class the baseline demand was drawn from
    pub demand_class: DemandClass,
    /// Active plants included in the plan
    pub plants: PlantMap,
    /// Subset of plants that can produce
    pub producers: IndexSet<PlantID>,
    /// Capacity and unit cost, for producing plants only
    pub production: IndexMap<PlantID, ProductionTerms>,
    /// Effective inventory bounds and holding cost per plant
    pub bounds: IndexMap<PlantID, InventoryBounds>,
    /// Baseline demand, dense over (plant, period)
    pub demand: DemandMap,
    /// Routes between known plants, including disabled ones
    pub routes: RouteMap,
    /// Modes available on each (origin, destination) lane
    pub lanes: IndexMap<(PlantID, PlantID), Vec<ModeID>>,
    /// Previous period for inventory chaining; `None` for the first period
    pub previous_period: IndexMap<PeriodID, Option<PeriodID>>,
    /// Business-rule overlays restricted to known plants/routes/periods
    pub overlays: Overlays,
}

impl PlanningDataset {
    /// Baseline demand for the given plant and period
    pub fn demand_for(&self, plant_id: &PlantID, period: &PeriodID) -> f64 {
        *self
            .demand
            .get(&(plant_id.clone(), period.clone()))
            .expect("No demand entry for given params")
    }

    /// Whether the given plant produces clinker
    pub fn is_producer(&self, plant_id: &PlantID) -> bool {
        self.producers.contains(plant_id)
    }

    /// Display name for a plant, falling back to the ID
    pub fn plant_name<'a>(&'a self, plant_id: &'a PlantID) -> &'a str {
        self.plants
            .get(plant_id)
            .map(|plant| plant.name.as_str())
            .unwrap_or(plant_id.as_str())
    }

    /// Iterate over enabled routes
    pub fn iter_enabled_routes(&self) -> impl Iterator<Item = &RouteKey> {
        self.routes
            .iter()
            .filter(|(_, route)| route.enabled)
            .map(|(key, _)| key)
    }
}

/// Assemble and validate a planning dataset.
///
/// # Arguments
///
/// * `periods` - Selected periods, in chronological order
/// * `demand_class` - Which demand class to plan against
/// * `master` - Snapshot of the master-data collections
///
/// # Returns
///
/// A fully cross-referenced [`PlanningDataset`] or an error naming the exact
/// missing or inconsistent field.
pub fn assemble(
    periods: &[PeriodID],
    demand_class: DemandClass,
    master: &MasterData,
) -> Result<PlanningDataset> {
    let dataset = assemble_without_prechecks(periods, demand_class, master)?;
    run_feasibility_prechecks(&dataset)?;
    Ok(dataset)
}

/// Assemble a dataset without the aggregate feasibility pre-checks.
///
/// The feasibility-repair variant uses this: its whole point is to return a
/// plan for datasets the pre-checks would reject, with the shortage surfaced
/// as slack instead.
pub fn assemble_without_prechecks(
    periods: &[PeriodID],
    demand_class: DemandClass,
    master: &MasterData,
) -> Result<PlanningDataset> {
    ensure!(!periods.is_empty(), "Please select at least one period");
    let period_set: IndexSet<&PeriodID> = periods.iter().collect();
    ensure!(
        period_set.len() == periods.len(),
        "Selected periods contain duplicates"
    );

    let plants: PlantMap = master
        .plants
        .iter()
        .filter(|(_, plant)| plant.active)
        .map(|(id, plant)| (id.clone(), plant.clone()))
        .collect();
    ensure!(!plants.is_empty(), "No plants found. Please create plants first.");

    // Production capacity and cost are mandatory for producing plants and
    // unused for everything else.
    let mut producers = IndexSet::new();
    let mut production = IndexMap::new();
    for (plant_id, plant) in &plants {
        if !plant.is_producer() {
            continue;
        }
        let Some(capacity) = plant.production_capacity else {
            bail!(
                "Missing production capacity for clinker plant: {}. \
                 Please edit the plant and set a monthly production capacity.",
                plant.name
            );
        };
        let Some(unit_cost) = plant.production_cost else {
            bail!(
                "Missing production cost for clinker plant: {}. \
                 Please edit the plant and set a production cost per unit.",
                plant.name
            );
        };
        ensure!(
            capacity >= 0.0 && unit_cost >= 0.0,
            "Production capacity/cost for plant {} cannot be negative",
            plant.name
        );
        producers.insert(plant_id.clone());
        production.insert(plant_id.clone(), ProductionTerms { capacity, unit_cost });
    }

    let bounds: IndexMap<PlantID, InventoryBounds> = plants
        .iter()
        .map(|(plant_id, plant)| {
            let bounds = InventoryBounds::resolve(plant, master.policies.get(plant_id));
            (plant_id.clone(), bounds)
        })
        .collect();

    // Storage sanity: initial inventory and safety stock must fit inside the
    // max inventory level.
    for (plant_id, plant) in &plants {
        let bound = &bounds[plant_id];
        ensure!(
            plant.initial_inventory <= bound.max_inventory,
            "Initial inventory for plant {} ({}) is greater than max inventory capacity ({})",
            plant.name,
            plant.initial_inventory,
            bound.max_inventory
        );
        ensure!(
            bound.safety_stock <= bound.max_inventory,
            "Safety stock for plant {} ({}) is greater than max inventory capacity ({})",
            plant.name,
            bound.safety_stock,
            bound.max_inventory
        );
    }

    // Demand defaults to zero for every (plant, period) pair; duplicate
    // records accumulate additively.
    let mut demand = DemandMap::new();
    for plant_id in plants.keys() {
        for period in periods {
            demand.insert((plant_id.clone(), period.clone()), 0.0);
        }
    }
    for record in &master.demands {
        if record.demand_class != demand_class
            || !period_set.contains(&record.period)
            || !plants.contains_key(&record.plant_id)
        {
            continue;
        }
        ensure!(
            record.quantity >= 0.0,
            "Demand for plant {} in period {} cannot be negative",
            plants[&record.plant_id].name,
            record.period
        );
        demand[&(record.plant_id.clone(), record.period.clone())] += record.quantity;
    }

    // Routes between unknown plants are ignored; disabled routes are kept so
    // the model can pin their flows to zero.
    let mut routes = RouteMap::new();
    for (key, route) in &master.routes {
        if !plants.contains_key(&key.origin) || !plants.contains_key(&key.destination) {
            continue;
        }
        ensure!(
            route.cost_per_trip >= 0.0 && route.capacity_per_trip >= 0.0 && route.sbq >= 0.0,
            "Transport cost/capacity/SBQ cannot be negative for route {key}"
        );
        ensure!(
            route.sbq <= route.capacity_per_trip,
            "SBQ ({}) cannot exceed capacity per trip ({}) for route {key}",
            route.sbq,
            route.capacity_per_trip
        );
        routes.insert(key.clone(), route.clone());
    }
    ensure!(
        !routes.is_empty(),
        "No transport routes found. Please create routes first."
    );

    let mut lanes: IndexMap<(PlantID, PlantID), Vec<ModeID>> = IndexMap::new();
    for key in routes.keys() {
        lanes
            .entry((key.origin.clone(), key.destination.clone()))
            .or_default()
            .push(key.mode.clone());
    }

    let mut previous_period = IndexMap::new();
    let mut prev: Option<PeriodID> = None;
    for period in periods {
        previous_period.insert(period.clone(), prev.clone());
        prev = Some(period.clone());
    }

    let overlays = restrict_overlays(&master.overlays, &plants, &routes, &period_set)?;

    Ok(PlanningDataset {
        periods: periods.to_vec(),
        demand_class,
        plants,
        producers,
        production,
        bounds,
        demand,
        routes,
        lanes,
        previous_period,
        overlays,
    })
}

/// Drop overlay entries that reference unknown plants, routes or periods
fn restrict_overlays(
    overlays: &Overlays,
    plants: &PlantMap,
    routes: &RouteMap,
    period_set: &IndexSet<&PeriodID>,
) -> Result<Overlays> {
    let mut restricted = Overlays::default();

    for ((plant_id, period), fraction) in &overlays.min_fulfilment {
        if !plants.contains_key(plant_id) || !period_set.contains(period) {
            continue;
        }
        ensure!(
            *fraction >= 0.0,
            "Minimum fulfilment for plant {} in period {period} cannot be negative",
            plants[plant_id].name
        );
        restricted
            .min_fulfilment
            .insert((plant_id.clone(), period.clone()), *fraction);
    }

    for ((plant_id, period), band) in &overlays.closing_stock {
        if plants.contains_key(plant_id) && period_set.contains(period) {
            restricted
                .closing_stock
                .insert((plant_id.clone(), period.clone()), *band);
        }
    }

    for ((origin, mode, period), limit) in &overlays.lane_limits {
        if plants.contains_key(origin) && period_set.contains(period) {
            restricted
                .lane_limits
                .insert((origin.clone(), mode.clone(), period.clone()), *limit);
        }
    }

    for ((key, period), bound) in &overlays.route_bounds {
        if routes.contains_key(key) && period_set.contains(period) {
            restricted
                .route_bounds
                .insert((key.clone(), period.clone()), *bound);
        }
    }

    Ok(restricted)
}

/// Aggregate feasibility pre-checks.
///
/// These are early user-facing diagnostics, not solver constraints: a dataset
/// passing them can still be infeasible, but a dataset failing them can never
/// be satisfied.
fn run_feasibility_prechecks(dataset: &PlanningDataset) -> Result<()> {
    // 1) Per period, demand cannot exceed what the network could ever supply.
    let total_initial: f64 = dataset
        .plants
        .values()
        .map(|plant| plant.initial_inventory)
        .sum();
    let total_capacity: f64 = dataset.production.values().map(|terms| terms.capacity).sum();
    for period in &dataset.periods {
        let total_demand: f64 = dataset
            .plants
            .keys()
            .map(|plant_id| dataset.demand_for(plant_id, period))
            .sum();
        ensure!(
            total_demand <= total_initial + total_capacity,
            "Demand seems too high for period {period}. Total demand={total_demand}, \
             total initial inventory={total_initial}, total clinker production \
             capacity={total_capacity}."
        );
    }

    // 2) Storage feasibility is checked during assembly (initial inventory
    //    within max inventory); nothing further to do here.

    // 3) A non-producing plant with demand needs at least one enabled inbound
    //    route, otherwise it can never be supplied.
    let mut has_inflow: IndexSet<&PlantID> = IndexSet::new();
    for key in dataset.iter_enabled_routes() {
        has_inflow.insert(&key.destination);
    }
    for plant_id in dataset.plants.keys() {
        if dataset.is_producer(plant_id) || has_inflow.contains(plant_id) {
            continue;
        }
        for period in &dataset.periods {
            ensure!(
                dataset.demand_for(plant_id, period) <= 0.0,
                "Plant {} has demand in {period} but no enabled inbound transport route \
                 and no clinker production.",
                dataset.plant_name(plant_id)
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{
        assert_error, fixed_demand, two_plant_master, two_plant_periods,
    };
    use crate::plant::PlantType;
    use rstest::rstest;

    #[rstest]
    fn assemble_two_plant_master(two_plant_master: MasterData, two_plant_periods: Vec<PeriodID>) {
        let dataset = assemble(&two_plant_periods, DemandClass::Fixed, &two_plant_master).unwrap();

        assert_eq!(dataset.plants.len(), 2);
        assert_eq!(dataset.producers.len(), 1);
        assert!(dataset.is_producer(&"CP1".into()));
        assert_eq!(dataset.demand_for(&"GU1".into(), &"2025-01".into()), 80.0);
        // Demand defaults to zero where no record exists
        assert_eq!(dataset.demand_for(&"CP1".into(), &"2025-01".into()), 0.0);
        assert_eq!(
            dataset.previous_period[&PeriodID::from("2025-01")],
            None
        );
    }

    #[rstest]
    fn duplicate_demand_accumulates(
        mut two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        two_plant_master
            .demands
            .push(fixed_demand("GU1", "2025-01", 20.0));
        let dataset = assemble(&two_plant_periods, DemandClass::Fixed, &two_plant_master).unwrap();
        assert_eq!(dataset.demand_for(&"GU1".into(), &"2025-01".into()), 100.0);
    }

    #[rstest]
    fn other_demand_classes_filtered(
        mut two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        let mut extra = fixed_demand("GU1", "2025-01", 500.0);
        extra.demand_class = DemandClass::Other("Tentative".into());
        two_plant_master.demands.push(extra);
        let dataset = assemble(&two_plant_periods, DemandClass::Fixed, &two_plant_master).unwrap();
        assert_eq!(dataset.demand_for(&"GU1".into(), &"2025-01".into()), 80.0);
    }

    #[rstest]
    fn no_periods_rejected(two_plant_master: MasterData) {
        assert_error!(
            assemble(&[], DemandClass::Fixed, &two_plant_master),
            "Please select at least one period"
        );
    }

    #[rstest]
    fn producer_missing_capacity_rejected(
        mut two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        two_plant_master.plants[&PlantID::from("CP1")].production_capacity = None;
        assert_error!(
            assemble(&two_plant_periods, DemandClass::Fixed, &two_plant_master),
            "Missing production capacity for clinker plant: North clinker. \
             Please edit the plant and set a monthly production capacity."
        );
    }

    #[rstest]
    fn negative_demand_rejected(
        mut two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        two_plant_master
            .demands
            .push(fixed_demand("GU1", "2025-02", -1.0));
        assert_error!(
            assemble(&two_plant_periods, DemandClass::Fixed, &two_plant_master),
            "Demand for plant South grinding in period 2025-02 cannot be negative"
        );
    }

    #[rstest]
    fn sbq_above_capacity_rejected(
        mut two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        let key = two_plant_master.routes.keys().next().unwrap().clone();
        two_plant_master.routes[&key].sbq = 100.0;
        assert_error!(
            assemble(&two_plant_periods, DemandClass::Fixed, &two_plant_master),
            "SBQ (100) cannot exceed capacity per trip (50) for route CP1 -> GU1 (Road)"
        );
    }

    #[rstest]
    fn initial_inventory_above_max_rejected(
        mut two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        two_plant_master.plants[&PlantID::from("GU1")].initial_inventory = 5000.0;
        assert_error!(
            assemble(&two_plant_periods, DemandClass::Fixed, &two_plant_master),
            "Initial inventory for plant South grinding (5000) is greater than max \
             inventory capacity (1000)"
        );
    }

    #[rstest]
    fn excessive_demand_precheck_fires(
        mut two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        two_plant_master
            .demands
            .push(fixed_demand("GU1", "2025-01", 1000.0));
        let result = assemble(&two_plant_periods, DemandClass::Fixed, &two_plant_master);
        let message = result.unwrap_err().to_string();
        assert!(message.starts_with("Demand seems too high for period 2025-01."));
    }

    #[rstest]
    fn unconnected_demand_precheck_fires(
        mut two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        let key = two_plant_master.routes.keys().next().unwrap().clone();
        two_plant_master.routes[&key].enabled = false;
        assert_error!(
            assemble(&two_plant_periods, DemandClass::Fixed, &two_plant_master),
            "Plant South grinding has demand in 2025-01 but no enabled inbound \
             transport route and no clinker production."
        );
    }

    #[rstest]
    fn inactive_plants_excluded(
        mut two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        // Deactivating the grinding unit also drops its demand and routes
        two_plant_master.plants[&PlantID::from("GU1")].active = false;
        let result = assemble(&two_plant_periods, DemandClass::Fixed, &two_plant_master);
        // The only route referenced the now-inactive plant
        assert_error!(result, "No transport routes found. Please create routes first.");
    }

    #[rstest]
    fn non_producer_kind_never_produces(
        mut two_plant_master: MasterData,
        two_plant_periods: Vec<PeriodID>,
    ) {
        // Capacity on a grinding unit is ignored rather than an error
        two_plant_master.plants[&PlantID::from("GU1")].production_capacity = Some(500.0);
        two_plant_master.plants[&PlantID::from("GU1")].kind = PlantType::GrindingUnit;
        let dataset = assemble(&two_plant_periods, DemandClass::Fixed, &two_plant_master).unwrap();
        assert!(!dataset.production.contains_key(&PlantID::from("GU1")));
    }
}
