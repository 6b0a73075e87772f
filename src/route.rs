//! Transport routes are the directed edges of the network, one record per
//! (origin, destination, mode) combination.
use crate::id::{ModeID, PlantID};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A map of [`Route`]s, keyed by [`RouteKey`]
pub type RouteMap = IndexMap<RouteKey, Route>;

/// Identifies a route: an ordered plant pair plus a transport mode.
///
/// Several records may share an (origin, destination) lane with different
/// modes; at most one mode may be active on a lane in any period of a solved
/// plan.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    /// Shipping plant
    pub origin: PlantID,
    /// Receiving plant
    pub destination: PlantID,
    /// Transport mode (e.g. "Road", "Rail")
    pub mode: ModeID,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.origin, self.destination, self.mode)
    }
}

/// Commercial terms for a transport route
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Cost of dispatching one trip
    pub cost_per_trip: f64,
    /// Maximum quantity one trip can carry
    pub capacity_per_trip: f64,
    /// Minimum batch quantity a dispatched trip must carry.
    ///
    /// Must not exceed `capacity_per_trip`.
    #[serde(default)]
    pub sbq: f64,
    /// Disabled routes are kept in master data but carry no flow
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
