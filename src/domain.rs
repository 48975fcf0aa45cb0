//! Legal input ranges for the new-sale form, derived from existing rows.
//!
//! The form is filled one field at a time: county, then a city in that
//! county, then make, model, engine type, and finally the numeric fields whose
//! bounds depend on the earlier choices. Option lists are unique and sorted.

use itertools::Itertools;
use serde::Serialize;

use crate::{
    aggregate::round_to,
    coords,
    dataset::{Dataset, Record},
    error::{DatasetError, Result},
    schema::Column,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinateBox {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl CoordinateBox {
    pub fn contains(&self, coordinate: coords::Coordinate) -> bool {
        (self.lon_min..=self.lon_max).contains(&coordinate.lon)
            && (self.lat_min..=self.lat_max).contains(&coordinate.lat)
    }
}

const BOUNDS_PLACES: u32 = 4;

/// Bounding box of the recorded locations in `city`. Edges are rounded
/// outward to 4 places so every recorded point stays inside.
pub fn coordinate_bounds(dataset: &Dataset, city: &str) -> Result<CoordinateBox> {
    let mut points = coords::extract_all(dataset.iter().filter(|record| record.city == city));
    let first = points.next().ok_or_else(|| DatasetError::NoDataForCity {
        city: city.to_string(),
    })?;
    let bounds = points.fold(
        CoordinateBox {
            lon_min: first.lon,
            lon_max: first.lon,
            lat_min: first.lat,
            lat_max: first.lat,
        },
        |acc, point| CoordinateBox {
            lon_min: acc.lon_min.min(point.lon),
            lon_max: acc.lon_max.max(point.lon),
            lat_min: acc.lat_min.min(point.lat),
            lat_max: acc.lat_max.max(point.lat),
        },
    );
    Ok(CoordinateBox {
        lon_min: round_down(bounds.lon_min, BOUNDS_PLACES),
        lon_max: round_up(bounds.lon_max, BOUNDS_PLACES),
        lat_min: round_down(bounds.lat_min, BOUNDS_PLACES),
        lat_max: round_up(bounds.lat_max, BOUNDS_PLACES),
    })
}

/// Largest value with `places` decimals that is not above `value`.
fn round_down(value: f64, places: u32) -> f64 {
    let nearest = round_to(value, places);
    if nearest <= value {
        nearest
    } else {
        round_to(nearest - 10f64.powi(-(places as i32)), places)
    }
}

/// Smallest value with `places` decimals that is not below `value`.
fn round_up(value: f64, places: u32) -> f64 {
    -round_down(-value, places)
}

/// Largest value of `column` among matching records, sentinel included.
/// 0 means there is no usable range and the input should be disabled.
pub fn max_numeric_value_for<P>(dataset: &Dataset, predicate: P, column: Column) -> u32
where
    P: Fn(&Record) -> bool,
{
    dataset
        .iter()
        .filter(|record| predicate(record))
        .filter_map(|record| record.number(column))
        .max()
        .unwrap_or(0)
}

fn distinct<F>(dataset: &Dataset, keep: F, column: Column) -> Vec<String>
where
    F: Fn(&Record) -> bool,
{
    dataset
        .iter()
        .filter(|record| keep(record))
        .map(|record| record.text(column))
        .filter(|value| !value.is_empty())
        .sorted()
        .dedup()
        .map(str::to_string)
        .collect()
}

pub fn counties(dataset: &Dataset) -> Vec<String> {
    distinct(dataset, |_| true, Column::County)
}

pub fn cities_in_county(dataset: &Dataset, county: &str) -> Vec<String> {
    distinct(dataset, |record| record.county == county, Column::City)
}

pub fn engine_types(dataset: &Dataset) -> Vec<String> {
    distinct(dataset, |_| true, Column::ElectricVehicleType)
}

pub fn models_for_make(dataset: &Dataset, make: &str) -> Vec<String> {
    distinct(dataset, |record| record.make == make, Column::Model)
}

/// State of the first row recorded for `city`.
pub fn state_for_city(dataset: &Dataset, city: &str) -> Option<String> {
    dataset
        .iter()
        .find(|record| record.city == city)
        .map(|record| record.state.clone())
}

pub fn county_for_city(dataset: &Dataset, city: &str) -> Option<String> {
    dataset
        .iter()
        .find(|record| record.city == city)
        .map(|record| record.county.clone())
}

/// Oldest and newest model year present.
pub fn year_bounds(dataset: &Dataset) -> Option<(u16, u16)> {
    dataset
        .iter()
        .map(|record| record.model_year)
        .minmax()
        .into_option()
}
