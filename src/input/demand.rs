//! Code for reading demand records from a CSV file.
use super::read_csv;
use crate::demand::DemandRecord;
use anyhow::Result;
use std::path::Path;

const DEMAND_FILE_NAME: &str = "demand.csv";

/// Read the demand CSV file from the model directory.
///
/// Records are returned as-is; filtering by class and period, accumulation of
/// duplicates and the non-negativity check happen during dataset assembly.
pub fn read_demands(model_dir: &Path) -> Result<Vec<DemandRecord>> {
    read_csv(&model_dir.join(DEMAND_FILE_NAME))
}
