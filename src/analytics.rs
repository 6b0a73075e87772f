//! Post-hoc analytics over a persisted run: KPIs, utilisation, bottlenecks,
//! cost drivers and a composite resilience score.
//!
//! Analytics is a pure read-then-compute step over the stored run plus
//! current master data; it never re-solves. Each metric sub-block is guarded
//! independently: a sub-table that cannot be computed comes back empty rather
//! than failing the whole report.
use crate::dataset::MasterData;
use crate::id::{PeriodID, PlantID};
use crate::inventory::InventoryBounds;
use crate::planning::{OptimisationType, SolvedRun};
use crate::route::RouteKey;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub mod bottleneck;
pub mod cost_drivers;
pub mod kpi;
pub mod utilisation;

use bottleneck::{BottleneckReport, Thresholds, detect_bottlenecks};
use cost_drivers::{CostDriverReport, compute_cost_drivers};
use kpi::{Kpis, compute_kpis};
use utilisation::{UtilisationReport, compute_utilisation};

/// How many plants/routes the cost-driver ranking keeps
const TOP_COST_DRIVERS: usize = 3;

/// The full analytics document attached to a run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// Management KPIs
    pub kpis: Kpis,
    /// Utilisation percentages for production, transport and storage
    #[serde(rename = "utilization")]
    pub utilisation: UtilisationReport,
    /// Flags for assets running out of headroom
    pub bottlenecks: BottleneckReport,
    /// Where the cost comes from
    pub cost_drivers: CostDriverReport,
    /// Composite resilience score with alerts and recommendations
    pub resilience: Resilience,
}

/// Composite resilience assessment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resilience {
    /// Unweighted mean of service level and the capacity headrooms, 0-100
    pub score: f64,
    /// Banded interpretation of the score
    pub classification: ResilienceClass,
    /// The individual components entering the score
    pub components: ResilienceComponents,
    /// Threshold breaches worth surfacing to management
    pub alerts: Vec<String>,
    /// Suggested actions keyed to the breaching component
    pub recommendations: Vec<String>,
}

/// Banded interpretation of a resilience score
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResilienceClass {
    /// Score at or above 80
    Resilient,
    /// Score at or above 60
    Balanced,
    /// Score below 60
    #[serde(rename = "At Risk")]
    AtRisk,
}

impl ResilienceClass {
    /// Classify a 0-100 resilience score
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Resilient
        } else if score >= 60.0 {
            Self::Balanced
        } else {
            Self::AtRisk
        }
    }
}

/// Components entering the resilience score; headrooms are absent when the
/// corresponding utilisation table is empty
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResilienceComponents {
    /// Service level percentage
    pub service_level: f64,
    /// 100 minus average production utilisation
    pub production_headroom: Option<f64>,
    /// 100 minus average storage utilisation
    pub storage_headroom: Option<f64>,
    /// 100 minus average transport utilisation
    pub transport_headroom: Option<f64>,
}

impl ResilienceComponents {
    /// Unweighted mean of the components that are present
    pub fn score(&self) -> f64 {
        let values: Vec<f64> = [
            Some(self.service_level),
            self.production_headroom,
            self.storage_headroom,
            self.transport_headroom,
        ]
        .into_iter()
        .flatten()
        .collect();

        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    }
}

/// Compute analytics for a successful run and attach them to it.
///
/// Fails only when the run did not succeed; metric sub-blocks that cannot be
/// computed from the available data are left empty instead.
pub fn attach_analytics(run: &mut SolvedRun, master: &MasterData) -> Result<()> {
    ensure!(
        run.is_success(),
        "Analytics is only computed for successful runs"
    );
    run.analytics = Some(compute_analytics(run, master));
    Ok(())
}

/// Compute the full analytics report for a run
pub fn compute_analytics(run: &SolvedRun, master: &MasterData) -> AnalyticsReport {
    let plant_names: IndexMap<PlantID, String> = master
        .plants
        .iter()
        .map(|(plant_id, plant)| (plant_id.clone(), plant.name.clone()))
        .collect();
    let production_capacity: IndexMap<PlantID, f64> = master
        .plants
        .iter()
        .map(|(plant_id, plant)| (plant_id.clone(), plant.production_capacity.unwrap_or(0.0)))
        .collect();
    let production_cost: IndexMap<PlantID, f64> = master
        .plants
        .iter()
        .map(|(plant_id, plant)| (plant_id.clone(), plant.production_cost.unwrap_or(0.0)))
        .collect();

    let mut safety_stock = IndexMap::new();
    let mut max_inventory = IndexMap::new();
    for (plant_id, plant) in &master.plants {
        let bounds = InventoryBounds::resolve(plant, master.policies.get(plant_id));
        safety_stock.insert(plant_id.clone(), bounds.safety_stock);
        max_inventory.insert(plant_id.clone(), bounds.max_inventory);
    }

    let route_capacity: IndexMap<RouteKey, f64> = master
        .routes
        .iter()
        .map(|(key, route)| (key.clone(), route.capacity_per_trip))
        .collect();
    let route_cost: IndexMap<RouteKey, f64> = master
        .routes
        .iter()
        .map(|(key, route)| (key.clone(), route.cost_per_trip))
        .collect();

    let demand_total = expected_demand_for_run(run, master).values().sum();

    let probabilities =
        (!run.scenario_probabilities.is_empty()).then_some(&run.scenario_probabilities);
    let kpis = compute_kpis(run, demand_total, &safety_stock, probabilities);

    let utilisation = compute_utilisation(
        run,
        &plant_names,
        &production_capacity,
        &max_inventory,
        &route_capacity,
    );

    let bottlenecks = detect_bottlenecks(
        &utilisation,
        &run.inventory_rows,
        &safety_stock,
        &Thresholds::default(),
    );

    let cost_drivers = compute_cost_drivers(
        run,
        &plant_names,
        &production_cost,
        &route_cost,
        TOP_COST_DRIVERS,
    );

    let resilience = compute_resilience(&kpis, &utilisation);

    AnalyticsReport {
        kpis,
        utilisation,
        bottlenecks,
        cost_drivers,
        resilience,
    }
}

/// The demand signal to measure the run against.
///
/// Deterministic runs use the stored demand class directly; uncertainty runs
/// use the expected demand `sum_s prob_s * multiplier_s * base_demand`.
pub fn expected_demand_for_run(
    run: &SolvedRun,
    master: &MasterData,
) -> IndexMap<(PlantID, PeriodID), f64> {
    let mut demand: IndexMap<(PlantID, PeriodID), f64> = IndexMap::new();
    for record in &master.demands {
        if record.demand_class != run.demand_class || !run.periods.contains(&record.period) {
            continue;
        }
        *demand
            .entry((record.plant_id.clone(), record.period.clone()))
            .or_default() += record.quantity;
    }

    let uncertainty = matches!(
        run.optimisation_type,
        OptimisationType::Stochastic | OptimisationType::Robust
    );
    if uncertainty && !run.scenarios.is_empty() {
        let expected_multiplier: f64 = run
            .scenarios
            .iter()
            .map(|spec| {
                let probability = run
                    .scenario_probabilities
                    .get(&spec.name)
                    .copied()
                    .unwrap_or(0.0);
                probability * spec.demand_multiplier
            })
            .sum();
        for quantity in demand.values_mut() {
            *quantity *= expected_multiplier;
        }
    }

    demand
}

/// Compose the resilience assessment from KPIs and utilisation
fn compute_resilience(kpis: &Kpis, utilisation: &UtilisationReport) -> Resilience {
    let average = |percentages: &[f64]| -> Option<f64> {
        (!percentages.is_empty())
            .then(|| percentages.iter().sum::<f64>() / percentages.len() as f64)
    };
    let headroom = |avg_utilisation: Option<f64>| {
        avg_utilisation.map(|avg| (100.0 - avg).max(0.0))
    };

    let production_util: Vec<f64> = utilisation
        .production
        .iter()
        .map(|row| row.utilization_percent)
        .collect();
    let storage_util: Vec<f64> = utilisation
        .storage
        .iter()
        .map(|row| row.utilization_percent)
        .collect();
    let transport_util: Vec<f64> = utilisation
        .transport
        .iter()
        .map(|row| row.utilization_percent)
        .collect();

    let production_avg = average(&production_util);
    let storage_avg = average(&storage_util);
    let transport_avg = average(&transport_util);

    let components = ResilienceComponents {
        service_level: kpis.service_level_percent,
        production_headroom: headroom(production_avg),
        storage_headroom: headroom(storage_avg),
        transport_headroom: headroom(transport_avg),
    };
    let score = components.score();
    let classification = ResilienceClass::from_score(score);

    let mut alerts = Vec::new();
    let mut recommendations = Vec::new();

    if let Some(avg) = production_avg {
        if avg > 90.0 {
            alerts.push(format!("Production network running hot ({avg:.1}% utilized)."));
            if let Some(top) = utilisation
                .production
                .iter()
                .max_by(|a, b| a.utilization_percent.total_cmp(&b.utilization_percent))
            {
                recommendations.push(format!(
                    "Shift volume away from {} (at {:.1}% load).",
                    top.plant, top.utilization_percent
                ));
            }
        }
    }

    if let Some(avg) = storage_avg {
        if avg > 85.0 {
            alerts.push(format!("Storage cushion is thin (avg {avg:.1}% full)."));
            if let Some(top) = utilisation
                .storage
                .iter()
                .max_by(|a, b| a.utilization_percent.total_cmp(&b.utilization_percent))
            {
                recommendations.push(format!(
                    "Pull forward shipments to relieve {} holding {:.1}% fill.",
                    top.plant, top.utilization_percent
                ));
            }
        }
    }

    if let Some(avg) = transport_avg {
        if avg > 80.0 {
            alerts.push(format!(
                "Transport routes near saturation (avg {avg:.1}% capacity used)."
            ));
            if let Some(top) = utilisation
                .transport
                .iter()
                .max_by(|a, b| a.utilization_percent.total_cmp(&b.utilization_percent))
            {
                recommendations.push(format!(
                    "Add contingency capacity on {} -> {} (utilization {:.1}%).",
                    top.origin, top.destination, top.utilization_percent
                ));
            }
        }
    }

    if kpis.service_level_percent < 98.0 {
        alerts.push(format!(
            "Service level below target ({:.1}%).",
            kpis.service_level_percent
        ));
        recommendations.push(
            "Increase safety stock or reroute clinker to protect customer deliveries."
                .to_string(),
        );
    }

    if recommendations.is_empty() {
        recommendations.push("Maintain current plan; monitor weekly for demand spikes.".to_string());
    }

    Resilience {
        score,
        classification,
        components,
        alerts,
        recommendations,
    }
}
