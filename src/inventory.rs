//! Inventory policies and the effective per-plant bounds derived from them.
use crate::id::PlantID;
use crate::plant::Plant;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A map of [`InventoryPolicy`]s, keyed by plant ID
pub type PolicyMap = IndexMap<PlantID, InventoryPolicy>;

/// An optional per-plant inventory policy.
///
/// When no policy exists for a plant, safety stock falls back to the plant
/// record, max inventory to the plant's storage capacity and holding cost to
/// zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryPolicy {
    /// Plant the policy applies to
    pub plant_id: PlantID,
    /// Minimum inventory buffer
    pub safety_stock: f64,
    /// Maximum inventory level
    pub max_inventory: f64,
    /// Holding cost per unit per month
    #[serde(default)]
    pub holding_cost_per_month: f64,
}

/// Effective inventory bounds for one plant, after applying policy defaults
#[derive(Clone, Debug, PartialEq)]
pub struct InventoryBounds {
    /// Minimum inventory buffer
    pub safety_stock: f64,
    /// Maximum inventory level
    pub max_inventory: f64,
    /// Holding cost per unit per month
    pub holding_cost: f64,
}

impl InventoryBounds {
    /// Resolve the effective bounds for a plant from its optional policy
    pub fn resolve(plant: &Plant, policy: Option<&InventoryPolicy>) -> Self {
        match policy {
            Some(policy) => Self {
                safety_stock: policy.safety_stock,
                max_inventory: policy.max_inventory,
                holding_cost: policy.holding_cost_per_month,
            },
            None => Self {
                safety_stock: plant.safety_stock,
                max_inventory: plant.storage_capacity,
                holding_cost: 0.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::grinding_unit;
    use rstest::rstest;

    #[rstest]
    fn bounds_default_from_plant(grinding_unit: Plant) {
        let bounds = InventoryBounds::resolve(&grinding_unit, None);
        assert_eq!(bounds.safety_stock, grinding_unit.safety_stock);
        assert_eq!(bounds.max_inventory, grinding_unit.storage_capacity);
        assert_eq!(bounds.holding_cost, 0.0);
    }

    #[rstest]
    fn bounds_from_policy(grinding_unit: Plant) {
        let policy = InventoryPolicy {
            plant_id: grinding_unit.id.clone(),
            safety_stock: 5.0,
            max_inventory: 80.0,
            holding_cost_per_month: 1.5,
        };
        let bounds = InventoryBounds::resolve(&grinding_unit, Some(&policy));
        assert_eq!(bounds.safety_stock, 5.0);
        assert_eq!(bounds.max_inventory, 80.0);
        assert_eq!(bounds.holding_cost, 1.5);
    }
}
