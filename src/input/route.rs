//! Code for reading [`Route`]s from a CSV file.
use super::{input_err_msg, read_csv};
use crate::id::{ModeID, PlantID};
use crate::route::{Route, RouteKey, RouteMap};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const ROUTES_FILE_NAME: &str = "routes.csv";

#[derive(Deserialize, PartialEq, Debug)]
struct RouteRaw {
    origin: PlantID,
    destination: PlantID,
    mode: ModeID,
    cost_per_trip: f64,
    capacity_per_trip: f64,
    #[serde(default)]
    sbq: f64,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Read the routes CSV file from the model directory
pub fn read_routes(model_dir: &Path) -> Result<RouteMap> {
    let file_path = model_dir.join(ROUTES_FILE_NAME);
    let routes = read_csv::<RouteRaw>(&file_path)?;
    read_routes_from_iter(routes.into_iter()).with_context(|| input_err_msg(&file_path))
}

/// Build the route map from an iterator, rejecting duplicate keys
fn read_routes_from_iter<I>(iter: I) -> Result<RouteMap>
where
    I: Iterator<Item = RouteRaw>,
{
    let mut routes = RouteMap::new();
    for raw in iter {
        let key = RouteKey {
            origin: raw.origin,
            destination: raw.destination,
            mode: raw.mode,
        };
        let route = Route {
            cost_per_trip: raw.cost_per_trip,
            capacity_per_trip: raw.capacity_per_trip,
            sbq: raw.sbq,
            enabled: raw.enabled,
        };
        ensure!(
            routes.insert(key.clone(), route).is_none(),
            "Duplicate route: {key}"
        );
    }
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn raw(mode: &str) -> RouteRaw {
        RouteRaw {
            origin: "CP1".into(),
            destination: "GU1".into(),
            mode: mode.into(),
            cost_per_trip: 20.0,
            capacity_per_trip: 50.0,
            sbq: 10.0,
            enabled: true,
        }
    }

    #[test]
    fn modes_distinguish_routes_on_a_lane() {
        let routes = read_routes_from_iter([raw("Road"), raw("Rail")].into_iter()).unwrap();
        assert_eq!(routes.len(), 2);
    }

    #[test]
    fn duplicate_route_rejected() {
        let result = read_routes_from_iter([raw("Road"), raw("Road")].into_iter());
        assert!(result.is_err());
    }

    #[test]
    fn read_routes_from_csv() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(ROUTES_FILE_NAME);
        {
            let mut file = std::fs::File::create(&file_path).unwrap();
            writeln!(file, "origin,destination,mode,cost_per_trip,capacity_per_trip,sbq,enabled")
                .unwrap();
            writeln!(file, "CP1,GU1,Road,20,50,10,true").unwrap();
            writeln!(file, "CP1,GU1,Rail,35,200,50,false").unwrap();
        }

        let routes = read_routes(dir.path()).unwrap();
        assert_eq!(routes.len(), 2);
        let rail = &routes[&RouteKey {
            origin: "CP1".into(),
            destination: "GU1".into(),
            mode: "Rail".into(),
        }];
        assert!(!rail.enabled);
        assert_eq!(rail.capacity_per_trip, 200.0);
    }
}
