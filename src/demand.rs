//! Demand records: how much material each plant must deliver in each period.
use crate::id::{PeriodID, PlantID};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense demand, keyed by (plant, period). Pairs with no recorded demand map
/// to zero after assembly.
pub type DemandMap = IndexMap<(PlantID, PeriodID), f64>;

/// Distinguishes the committed baseline from what-if overlays.
///
/// Only records matching the requested class enter a planning dataset;
/// uncertainty runs scale the baseline via scenario multipliers instead of
/// using a separate class.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DemandClass {
    /// The committed baseline demand signal
    Fixed,
    /// Any other named demand class
    Other(String),
}

impl Default for DemandClass {
    fn default() -> Self {
        Self::Fixed
    }
}

impl From<String> for DemandClass {
    fn from(value: String) -> Self {
        if value == "Fixed" {
            Self::Fixed
        } else {
            Self::Other(value)
        }
    }
}

impl From<DemandClass> for String {
    fn from(value: DemandClass) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DemandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => f.write_str("Fixed"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// A single demand record from master data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    /// Plant the demand is delivered from
    pub plant_id: PlantID,
    /// Period in which the demand falls due
    pub period: PeriodID,
    /// Demand class this record belongs to
    #[serde(default)]
    pub demand_class: DemandClass,
    /// Quantity demanded. Must be non-negative.
    pub quantity: f64,
}
