//! Code for reading [`Plant`]s from a CSV file.
use super::{input_err_msg, read_csv};
use crate::plant::{Plant, PlantMap};
use anyhow::{Context, Result, ensure};
use std::path::Path;

const PLANTS_FILE_NAME: &str = "plants.csv";

/// Read the plants CSV file from the model directory
pub fn read_plants(model_dir: &Path) -> Result<PlantMap> {
    let file_path = model_dir.join(PLANTS_FILE_NAME);
    let plants = read_csv::<Plant>(&file_path)?;
    read_plants_from_iter(plants.into_iter()).with_context(|| input_err_msg(&file_path))
}

/// Build the plant map from an iterator, rejecting duplicate IDs
fn read_plants_from_iter<I>(iter: I) -> Result<PlantMap>
where
    I: Iterator<Item = Plant>,
{
    let mut plants = PlantMap::new();
    for plant in iter {
        let id = plant.id.clone();
        ensure!(
            plants.insert(id.clone(), plant).is_none(),
            "Duplicate plant ID: {id}"
        );
    }
    Ok(plants)
}
