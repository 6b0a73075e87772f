//! Code for reading master data and plan parameters from a model directory.
//!
//! A model directory contains `plan.toml` plus CSV files for each
//! master-data collection. Readers fail loudly with the offending file path
//! attached; optional files simply yield empty collections.
use crate::dataset::MasterData;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub mod demand;
pub mod overlay;
pub mod plan;
pub mod plant;
pub mod policy;
pub mod route;

pub use plan::{PlanParameters, read_plan_parameters};

/// Format an error message for a problem input file
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a TOML file at the specified path
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    toml::from_str(&contents).with_context(|| input_err_msg(file_path))
}

/// Read a CSV file at the specified path into a `Vec` of records
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let reader = csv::Reader::from_path(file_path).with_context(|| input_err_msg(file_path))?;
    reader
        .into_deserialize()
        .collect::<Result<Vec<T>, _>>()
        .with_context(|| input_err_msg(file_path))
}

/// Read a CSV file that may be absent; a missing file yields no records
pub fn read_csv_optional<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    if !file_path.is_file() {
        return Ok(Vec::new());
    }
    read_csv(file_path)
}

/// Read all master-data collections from a model directory
pub fn load_master_data(model_dir: &Path) -> Result<MasterData> {
    let plants = plant::read_plants(model_dir)?;
    let routes = route::read_routes(model_dir)?;
    let demands = demand::read_demands(model_dir)?;
    let policies = policy::read_policies(model_dir)?;
    let overlays = overlay::read_overlays(model_dir)?;

    Ok(MasterData {
        plants,
        routes,
        demands,
        policies,
        overlays,
    })
}
