//! Point-geometry parsing for the Vehicle Location column.
//!
//! Tags look like `POINT (-122.30839 47.610365)`. Parsing is tolerant of the
//! wrapper: the first two signed decimal numbers in the text are taken as
//! longitude then latitude. Range checks belong to [`crate::domain`].

use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::{
    dataset::Record,
    error::{DatasetError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"-?(?:\d+(?:\.\d*)?|\.\d+)").expect("valid coordinate pattern")
    })
}

/// `Ok(None)` for an absent tag, `ParseError` when fewer than two numbers are
/// present.
pub fn extract(tag: &str) -> Result<Option<Coordinate>> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let mut numbers = number_pattern()
        .find_iter(trimmed)
        .filter_map(|found| found.as_str().parse::<f64>().ok());
    match (numbers.next(), numbers.next()) {
        (Some(lon), Some(lat)) => Ok(Some(Coordinate { lon, lat })),
        _ => Err(DatasetError::ParseError {
            input: trimmed.to_string(),
        }),
    }
}

/// Coordinates of every record with a usable tag, in input order. Empty tags
/// are dropped and malformed ones skipped. The iterator can be cloned to walk
/// the records again.
pub fn extract_all<'a, I>(records: I) -> impl Iterator<Item = Coordinate> + Clone + 'a
where
    I: IntoIterator<Item = &'a Record>,
    I::IntoIter: Clone + 'a,
{
    records
        .into_iter()
        .filter_map(|record| match extract(&record.location) {
            Ok(coordinate) => coordinate,
            Err(err) => {
                debug!("Skipping {} {}: {err}", record.make, record.model);
                None
            }
        })
}

pub fn format_point(coordinate: Coordinate) -> String {
    format!("POINT ({} {})", coordinate.lon, coordinate.lat)
}
