//! Code for reading [`InventoryPolicy`]s from a CSV file.
use super::{input_err_msg, read_csv_optional};
use crate::inventory::{InventoryPolicy, PolicyMap};
use anyhow::{Context, Result, ensure};
use std::path::Path;

const POLICIES_FILE_NAME: &str = "inventory_policies.csv";

/// Read the inventory policies CSV file from the model directory.
///
/// The file is optional: plants without a policy fall back to defaults
/// derived from the plant record.
pub fn read_policies(model_dir: &Path) -> Result<PolicyMap> {
    let file_path = model_dir.join(POLICIES_FILE_NAME);
    let policies = read_csv_optional::<InventoryPolicy>(&file_path)?;
    read_policies_from_iter(policies.into_iter()).with_context(|| input_err_msg(&file_path))
}

/// Build the policy map from an iterator, rejecting duplicate plants
fn read_policies_from_iter<I>(iter: I) -> Result<PolicyMap>
where
    I: Iterator<Item = InventoryPolicy>,
{
    let mut map = PolicyMap::new();
    for policy in iter {
        let plant_id = policy.plant_id.clone();
        ensure!(
            map.insert(plant_id.clone(), policy).is_none(),
            "Duplicate inventory policy for plant: {plant_id}"
        );
    }
    Ok(map)
}
