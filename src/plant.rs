//! Plants are the nodes of the planning network: clinker plants produce and
//! store material, grinding units only store and ship it onwards.
use crate::id::PlantID;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A map of [`Plant`]s, keyed by plant ID
pub type PlantMap = IndexMap<PlantID, Plant>;

/// A production or storage site in the network
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Plant {
    /// Unique identifier for the plant (e.g. "CLK-NORTH")
    pub id: PlantID,
    /// Display name shown in result tables
    pub name: String,
    /// Whether the plant produces clinker or only grinds/stores it
    #[serde(rename = "type")] // NB: we can't name a field type as it's a reserved keyword
    pub kind: PlantType,
    /// Physical storage capacity
    pub storage_capacity: f64,
    /// Minimum inventory buffer to hold at all times
    #[serde(default)]
    pub safety_stock: f64,
    /// Inventory on hand at the start of the first period
    #[serde(default)]
    pub initial_inventory: f64,
    /// Monthly production capacity. Mandatory for clinker plants.
    #[serde(default)]
    pub production_capacity: Option<f64>,
    /// Production cost per unit. Mandatory for clinker plants.
    #[serde(default)]
    pub production_cost: Option<f64>,
    /// Inactive plants are excluded from planning
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Plant {
    /// Whether this plant can produce clinker
    pub fn is_producer(&self) -> bool {
        self.kind == PlantType::ClinkerPlant
    }
}

/// The role a plant plays in the network
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum PlantType {
    /// Produces clinker, can also store and ship
    #[serde(rename = "clinker")]
    ClinkerPlant,
    /// Stores and ships only; production is fixed to zero
    #[serde(rename = "grinding")]
    GrindingUnit,
}
