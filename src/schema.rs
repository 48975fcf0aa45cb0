//! Fixed column layout of the vehicle registration dataset.
//!
//! The dataset file always carries the same ten columns in the same order.
//! [`Column`] names them for field-level errors and row filters, and
//! [`validate_headers`] rejects any file whose header row differs.

use std::{fmt, str::FromStr};

use anyhow::anyhow;
use serde::Serialize;

use crate::error::{DatasetError, Result};

pub const HEADERS: [&str; 10] = [
    "County",
    "City",
    "State",
    "Model Year",
    "Make",
    "Model",
    "Electric Vehicle Type",
    "Electric Range",
    "Base MSRP",
    "Vehicle Location",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Column {
    County,
    City,
    State,
    ModelYear,
    Make,
    Model,
    ElectricVehicleType,
    ElectricRange,
    BaseMsrp,
    VehicleLocation,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::County,
        Column::City,
        Column::State,
        Column::ModelYear,
        Column::Make,
        Column::Model,
        Column::ElectricVehicleType,
        Column::ElectricRange,
        Column::BaseMsrp,
        Column::VehicleLocation,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn header(self) -> &'static str {
        HEADERS[self.index()]
    }

    pub fn from_header(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        Column::ALL
            .into_iter()
            .find(|column| column.header().eq_ignore_ascii_case(trimmed))
    }

    /// Integer-valued columns; zero is the "not recorded" sentinel for the
    /// range and price columns.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Column::ModelYear | Column::ElectricRange | Column::BaseMsrp
        )
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl FromStr for Column {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Column::from_header(value).ok_or_else(|| {
            anyhow!(
                "Unknown column '{value}'. Expected one of: {}",
                HEADERS.join(", ")
            )
        })
    }
}

pub fn validate_headers(found: &[String]) -> Result<()> {
    let matches = found.len() == HEADERS.len()
        && found
            .iter()
            .zip(HEADERS.iter())
            .all(|(left, right)| left.trim() == *right);
    if matches {
        Ok(())
    } else {
        Err(DatasetError::SchemaMismatch {
            expected: HEADERS.iter().map(|h| h.to_string()).collect(),
            found: found.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(headers: &[&str]) -> Vec<String> {
        headers.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn column_index_matches_header_position() {
        for (idx, column) in Column::ALL.iter().enumerate() {
            assert_eq!(column.index(), idx);
            assert_eq!(column.header(), HEADERS[idx]);
        }
    }

    #[test]
    fn from_header_is_case_insensitive() {
        assert_eq!(Column::from_header("model year"), Some(Column::ModelYear));
        assert_eq!(Column::from_header(" Base MSRP "), Some(Column::BaseMsrp));
        assert_eq!(Column::from_header("VIN"), None);
        assert!("VIN".parse::<Column>().is_err());
    }

    #[test]
    fn validate_headers_accepts_exact_layout() {
        assert!(validate_headers(&owned(&HEADERS)).is_ok());
    }

    #[test]
    fn validate_headers_rejects_reordered_columns() {
        let mut headers = owned(&HEADERS);
        headers.swap(0, 1);
        let err = validate_headers(&headers).unwrap_err();
        assert!(matches!(err, DatasetError::SchemaMismatch { .. }));
    }

    #[test]
    fn validate_headers_rejects_missing_columns() {
        let err = validate_headers(&owned(&HEADERS[..9])).unwrap_err();
        match err {
            DatasetError::SchemaMismatch { expected, found } => {
                assert_eq!(expected.len(), 10);
                assert_eq!(found.len(), 9);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
