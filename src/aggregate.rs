//! Read-only queries over a [`Dataset`].
//!
//! Every function here is a pure function of the dataset and its parameters.
//! Results are plain row structs that the host renders as a table or JSON.
//!
//! Numeric conventions shared by all queries:
//!
//! - the 0 sentinel in Electric Range and Base MSRP is excluded from means,
//!   extremes and shares;
//! - means are rounded to 2 decimal places;
//! - percentages are `count / total * 100`, rounded per query, and a zero
//!   total is reported as [`DatasetError::EmptyDataset`] instead of NaN.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use itertools::Itertools;
use log::debug;
use serde::Serialize;

use crate::{
    bucket::{self, GroupCount},
    coords::{self, Coordinate},
    dataset::{Dataset, Record},
    error::{DatasetError, Result},
    schema::Column,
};

pub const DEFAULT_MIN_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MakerCount {
    pub make: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MakerYearCount {
    pub make: String,
    pub year: u16,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineTypeShare {
    pub make: String,
    pub ev_type: String,
    pub count: usize,
    /// Share of the maker's own records.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeExtremes {
    pub make: String,
    pub max_range: u32,
    pub min_range: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearPrice {
    pub year: u16,
    pub mean_price: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineTypeSummary {
    pub ev_type: String,
    pub count: usize,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub column: Column,
    pub count: usize,
    /// Mean over records carrying a recorded value; `None` when every
    /// matching record holds the sentinel.
    pub mean: Option<f64>,
    pub per_engine_type: Vec<EngineTypeSummary>,
}

pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

pub fn percentage(count: usize, total: usize, places: u32) -> Result<f64> {
    if total == 0 {
        return Err(DatasetError::EmptyDataset {
            context: "percentage share",
        });
    }
    Ok(round_to(count as f64 / total as f64 * 100.0, places))
}

fn mean(sum: u64, count: usize) -> Option<f64> {
    (count > 0).then(|| round_to(sum as f64 / count as f64, 2))
}

fn in_makers<'a>(makers: &'a BTreeSet<String>) -> impl Fn(&&Record) -> bool + 'a {
    move |record| makers.contains(&record.make)
}

pub fn count_by_year(dataset: &Dataset) -> BTreeMap<u16, usize> {
    dataset.iter().counts_by(|record| record.model_year).into_iter().collect()
}

/// Highest count first; equal counts ordered by maker name.
pub fn count_by_maker(dataset: &Dataset) -> Vec<MakerCount> {
    dataset
        .iter()
        .counts_by(|record| record.make.as_str())
        .into_iter()
        .map(|(make, count)| MakerCount {
            make: make.to_string(),
            count,
        })
        .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.make.cmp(&b.make)))
        .collect()
}

pub fn makers(dataset: &Dataset) -> Vec<String> {
    dataset
        .iter()
        .map(|record| record.make.clone())
        .sorted()
        .dedup()
        .collect()
}

pub fn count_by_maker_and_year(
    dataset: &Dataset,
    makers: &BTreeSet<String>,
) -> Vec<MakerYearCount> {
    dataset
        .iter()
        .filter(in_makers(makers))
        .counts_by(|record| (record.make.as_str(), record.model_year))
        .into_iter()
        .map(|((make, year), count)| MakerYearCount {
            make: make.to_string(),
            year,
            count,
        })
        .sorted_by(|a, b| a.make.cmp(&b.make).then_with(|| a.year.cmp(&b.year)))
        .collect()
}

/// Raw (maker, model) counts for the maker set, ordered by maker then model.
pub fn count_by_maker_and_model(dataset: &Dataset, makers: &BTreeSet<String>) -> Vec<GroupCount> {
    dataset
        .iter()
        .filter(in_makers(makers))
        .counts_by(|record| (record.make.as_str(), record.model.as_str()))
        .into_iter()
        .sorted()
        .map(|((make, model), count)| GroupCount::new(make, model, count))
        .collect()
}

/// Model counts per maker with models under `threshold` of that maker's
/// volume folded into `catch_all`.
pub fn bucketed_models_by_maker(
    dataset: &Dataset,
    makers: &BTreeSet<String>,
    threshold: f64,
    catch_all: &str,
) -> Vec<GroupCount> {
    let raw = count_by_maker_and_model(dataset, makers);
    debug!(
        "Bucketing {} (maker, model) pair(s) at threshold {threshold}",
        raw.len()
    );
    bucket::bucket(&raw, threshold, catch_all)
}

pub fn engine_type_share(
    dataset: &Dataset,
    makers: &BTreeSet<String>,
) -> Result<Vec<EngineTypeShare>> {
    let mut maker_totals: HashMap<&str, usize> = HashMap::new();
    let mut pairs: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for record in dataset.iter().filter(in_makers(makers)) {
        *maker_totals.entry(record.make.as_str()).or_insert(0) += 1;
        *pairs
            .entry((record.make.as_str(), record.ev_type.as_str()))
            .or_insert(0) += 1;
    }

    pairs
        .into_iter()
        .map(|((make, ev_type), count)| {
            let total = maker_totals.get(make).copied().unwrap_or_default();
            Ok(EngineTypeShare {
                make: make.to_string(),
                ev_type: ev_type.to_string(),
                count,
                percent: percentage(count, total, 2)?,
            })
        })
        .collect()
}

/// Makers whose share of the whole dataset is strictly above `threshold_pct`.
pub fn unique_makers_above(dataset: &Dataset, threshold_pct: f64) -> Result<Vec<String>> {
    let total = dataset.len();
    if total == 0 {
        return Err(DatasetError::EmptyDataset {
            context: "maker share",
        });
    }
    Ok(dataset
        .iter()
        .counts_by(|record| record.make.as_str())
        .into_iter()
        .filter(|(_, count)| *count as f64 / total as f64 * 100.0 > threshold_pct)
        .map(|(make, _)| make.to_string())
        .sorted()
        .collect())
}

pub fn range_extremes_by_maker(dataset: &Dataset) -> Vec<RangeExtremes> {
    let mut extremes: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for record in dataset.iter() {
        let Some(range) = record.recorded(Column::ElectricRange) else {
            continue;
        };
        extremes
            .entry(record.make.as_str())
            .and_modify(|(max, min)| {
                *max = (*max).max(range);
                *min = (*min).min(range);
            })
            .or_insert((range, range));
    }
    extremes
        .into_iter()
        .map(|(make, (max_range, min_range))| RangeExtremes {
            make: make.to_string(),
            max_range,
            min_range,
        })
        .collect()
}

/// Years with fewer than `min_sample_size` priced records are left out.
pub fn mean_price_by_year(dataset: &Dataset, min_sample_size: usize) -> Vec<YearPrice> {
    let mut by_year: BTreeMap<u16, (u64, usize)> = BTreeMap::new();
    for record in dataset.iter() {
        if let Some(price) = record.recorded(Column::BaseMsrp) {
            let entry = by_year.entry(record.model_year).or_insert((0, 0));
            entry.0 += u64::from(price);
            entry.1 += 1;
        }
    }
    by_year
        .into_iter()
        .filter(|(_, (_, count))| *count >= min_sample_size)
        .filter_map(|(year, (sum, count))| {
            mean(sum, count).map(|mean_price| YearPrice {
                year,
                mean_price,
                count,
            })
        })
        .collect()
}

pub fn summary_stats<P>(dataset: &Dataset, predicate: P, column: Column) -> Result<SummaryStats>
where
    P: Fn(&Record) -> bool,
{
    // (records, sum of recorded values, recorded count)
    let mut overall = (0usize, 0u64, 0usize);
    let mut per_type: BTreeMap<&str, (usize, u64, usize)> = BTreeMap::new();
    for record in dataset.iter().filter(|record| predicate(record)) {
        let value = record.recorded(column);
        let group = per_type.entry(record.ev_type.as_str()).or_insert((0, 0, 0));
        for slot in [&mut overall, group] {
            slot.0 += 1;
            if let Some(value) = value {
                slot.1 += u64::from(value);
                slot.2 += 1;
            }
        }
    }

    if overall.0 == 0 {
        return Err(DatasetError::EmptyDataset {
            context: "summary statistics",
        });
    }

    Ok(SummaryStats {
        column,
        count: overall.0,
        mean: mean(overall.1, overall.2),
        per_engine_type: per_type
            .into_iter()
            .map(|(ev_type, (count, sum, recorded))| EngineTypeSummary {
                ev_type: ev_type.to_string(),
                count,
                mean: mean(sum, recorded),
            })
            .collect(),
    })
}

/// The complete coordinate list; sampling is left to the caller.
pub fn coordinates(dataset: &Dataset) -> Vec<Coordinate> {
    coords::extract_all(dataset.records()).collect()
}
