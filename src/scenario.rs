//! Demand scenarios for uncertainty-aware runs.
//!
//! Planners keep a single baseline demand signal; uncertainty is expressed as
//! a small set of named scenarios that scale it (e.g. Low/Normal/High). Each
//! scenario carries a probability and the probabilities must sum to one.
use crate::dataset::PlanningDataset;
use crate::id::{PeriodID, PlantID, ScenarioID};
use anyhow::{Result, bail, ensure};
use indexmap::{IndexMap, IndexSet};
use itertools::iproduct;
use serde::{Deserialize, Serialize};

/// Tolerance when checking that scenario probabilities sum to one
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Scenario ID used internally for deterministic runs
pub const BASE_SCENARIO: &str = "base";

/// A user-supplied scenario definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Scenario name, unique within a set
    pub name: ScenarioID,
    /// Probability of the scenario being realised
    pub probability: f64,
    /// Factor applied to the baseline demand of every plant and period
    pub demand_multiplier: f64,
}

/// The default Low/Normal/High scenario set used when a model defines none
pub fn default_scenarios() -> Vec<ScenarioSpec> {
    [("Low", 0.2, 0.9), ("Normal", 0.6, 1.0), ("High", 0.2, 1.1)]
        .into_iter()
        .map(|(name, probability, demand_multiplier)| ScenarioSpec {
            name: name.into(),
            probability,
            demand_multiplier,
        })
        .collect()
}

/// Scenario-expanded demand derived from a dataset's baseline
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioDemand {
    /// Probability for each scenario, in definition order
    pub probabilities: IndexMap<ScenarioID, f64>,
    /// Demand for every (scenario, plant, period) combination
    pub demand: IndexMap<(ScenarioID, PlantID, PeriodID), f64>,
}

impl ScenarioDemand {
    /// Expand a scenario set over a dataset's baseline demand.
    ///
    /// Fails if the set is empty, names are not unique, any probability or
    /// multiplier is negative, or the probabilities do not sum to one within
    /// [`PROBABILITY_TOLERANCE`].
    pub fn generate(dataset: &PlanningDataset, specs: &[ScenarioSpec]) -> Result<Self> {
        validate_scenario_specs(specs)?;

        let probabilities = specs
            .iter()
            .map(|spec| (spec.name.clone(), spec.probability))
            .collect();

        let mut demand = IndexMap::new();
        for (spec, (plant_id, period)) in
            iproduct!(specs.iter(), iproduct!(dataset.plants.keys(), dataset.periods.iter()))
        {
            let base = dataset.demand_for(plant_id, period);
            demand.insert(
                (spec.name.clone(), plant_id.clone(), period.clone()),
                base * spec.demand_multiplier,
            );
        }

        Ok(Self {
            probabilities,
            demand,
        })
    }

    /// A degenerate single-scenario view of the baseline demand.
    ///
    /// Deterministic runs use this so that the model builder has a single
    /// constraint skeleton for all run kinds.
    pub fn single(dataset: &PlanningDataset) -> Self {
        let base: ScenarioID = BASE_SCENARIO.into();
        let demand = iproduct!(dataset.plants.keys(), dataset.periods.iter())
            .map(|(plant_id, period)| {
                (
                    (base.clone(), plant_id.clone(), period.clone()),
                    dataset.demand_for(plant_id, period),
                )
            })
            .collect();

        Self {
            probabilities: IndexMap::from([(base, 1.0)]),
            demand,
        }
    }

    /// Iterate over scenario IDs in definition order
    pub fn iter_ids(&self) -> impl Iterator<Item = &ScenarioID> {
        self.probabilities.keys()
    }

    /// Number of scenarios
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// Whether the set is empty (never true for a generated set)
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Demand for the given scenario, plant and period
    pub fn demand_for(&self, scenario: &ScenarioID, plant_id: &PlantID, period: &PeriodID) -> f64 {
        *self
            .demand
            .get(&(scenario.clone(), plant_id.clone(), period.clone()))
            .expect("No demand entry for given params")
    }
}

/// Check a scenario set for structural errors before expansion
pub fn validate_scenario_specs(specs: &[ScenarioSpec]) -> Result<()> {
    ensure!(!specs.is_empty(), "At least one scenario is required");

    let mut names = IndexSet::new();
    let mut total_probability = 0.0;
    for spec in specs {
        ensure!(
            !spec.name.as_str().trim().is_empty(),
            "Scenario name cannot be empty"
        );
        if !names.insert(&spec.name) {
            bail!("Duplicate scenario name: {}", spec.name);
        }
        ensure!(
            spec.probability >= 0.0,
            "Probability for scenario {} cannot be negative",
            spec.name
        );
        ensure!(
            spec.demand_multiplier >= 0.0,
            "Demand multiplier for scenario {} cannot be negative",
            spec.name
        );
        total_probability += spec.probability;
    }

    ensure!(
        (total_probability - 1.0).abs() <= PROBABILITY_TOLERANCE,
        "Scenario probabilities must sum to 1 (got {total_probability})"
    );

    Ok(())
}
