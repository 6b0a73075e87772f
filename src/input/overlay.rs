//! Code for reading optional business-rule overlays from CSV files.
//!
//! Every overlay file may be absent; an absent file simply means that
//! constraint family is not added to the model.
use super::read_csv_optional;
use crate::dataset::{ClosingStockBand, Overlays, ShipmentBound, ShipmentLimit};
use crate::id::{ModeID, PeriodID, PlantID};
use crate::route::RouteKey;
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

const FULFILMENT_FILE_NAME: &str = "min_fulfilment.csv";
const CLOSING_STOCK_FILE_NAME: &str = "closing_stock.csv";
const LANE_LIMITS_FILE_NAME: &str = "lane_limits.csv";
const ROUTE_BOUNDS_FILE_NAME: &str = "route_bounds.csv";

#[derive(Deserialize, Debug)]
struct FulfilmentRaw {
    plant_id: PlantID,
    period: PeriodID,
    min_fulfilment: f64,
}

#[derive(Deserialize, Debug)]
struct ClosingStockRaw {
    plant_id: PlantID,
    period: PeriodID,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct LaneLimitRaw {
    origin: PlantID,
    mode: ModeID,
    period: PeriodID,
    #[serde(default)]
    lower: Option<f64>,
    #[serde(default)]
    upper: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct RouteBoundRaw {
    origin: PlantID,
    destination: PlantID,
    mode: ModeID,
    period: PeriodID,
    #[serde(default)]
    lower: Option<f64>,
    #[serde(default)]
    upper: Option<f64>,
    #[serde(default)]
    equal: Option<f64>,
}

/// Read all overlay CSV files from the model directory
pub fn read_overlays(model_dir: &Path) -> Result<Overlays> {
    let mut overlays = Overlays::default();

    for raw in read_csv_optional::<FulfilmentRaw>(&model_dir.join(FULFILMENT_FILE_NAME))? {
        overlays
            .min_fulfilment
            .insert((raw.plant_id, raw.period), raw.min_fulfilment);
    }

    for raw in read_csv_optional::<ClosingStockRaw>(&model_dir.join(CLOSING_STOCK_FILE_NAME))? {
        overlays.closing_stock.insert(
            (raw.plant_id, raw.period),
            ClosingStockBand {
                min: raw.min,
                max: raw.max,
            },
        );
    }

    for raw in read_csv_optional::<LaneLimitRaw>(&model_dir.join(LANE_LIMITS_FILE_NAME))? {
        overlays.lane_limits.insert(
            (raw.origin, raw.mode, raw.period),
            ShipmentLimit {
                lower: raw.lower,
                upper: raw.upper,
            },
        );
    }

    for raw in read_csv_optional::<RouteBoundRaw>(&model_dir.join(ROUTE_BOUNDS_FILE_NAME))? {
        let key = RouteKey {
            origin: raw.origin,
            destination: raw.destination,
            mode: raw.mode,
        };
        overlays.route_bounds.insert(
            (key, raw.period),
            ShipmentBound {
                lower: raw.lower,
                upper: raw.upper,
                equal: raw.equal,
            },
        );
    }

    Ok(overlays)
}
