//! Read and validate plan parameters from `plan.toml`.
use super::{input_err_msg, read_toml};
use crate::demand::DemandClass;
use crate::id::PeriodID;
use crate::scenario::{ScenarioSpec, validate_scenario_specs};
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use serde::Deserialize;
use std::path::Path;

const PLAN_FILE_NAME: &str = "plan.toml";

/// Per-model parameters from the `plan.toml` file
#[derive(Debug, Deserialize, PartialEq)]
pub struct PlanParameters {
    /// Periods to plan, in chronological order
    pub periods: Vec<PeriodID>,
    /// Demand class to plan against
    #[serde(default)]
    pub demand_class: DemandClass,
    /// Scenario definitions for uncertainty runs. When absent, the default
    /// Low/Normal/High set is used.
    #[serde(default, rename = "scenario")]
    pub scenarios: Vec<ScenarioSpec>,
}

impl PlanParameters {
    /// Read plan parameters from the specified model directory
    pub fn from_path(model_dir: &Path) -> Result<Self> {
        let file_path = model_dir.join(PLAN_FILE_NAME);
        let parameters: PlanParameters = read_toml(&file_path)?;
        parameters
            .validate()
            .with_context(|| input_err_msg(file_path))?;
        Ok(parameters)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        ensure!(!self.periods.is_empty(), "`periods` is empty");
        let unique: IndexSet<&PeriodID> = self.periods.iter().collect();
        ensure!(
            unique.len() == self.periods.len(),
            "`periods` must be composed of unique values"
        );

        if !self.scenarios.is_empty() {
            validate_scenario_specs(&self.scenarios)?;
        }

        Ok(())
    }
}

/// Read plan parameters from the specified model directory
pub fn read_plan_parameters(model_dir: &Path) -> Result<PlanParameters> {
    PlanParameters::from_path(model_dir)
}
