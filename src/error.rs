//! Error taxonomy shared by every core operation.
//!
//! Library functions return [`DatasetError`] so callers can match on the
//! failure kind (disable an input on [`DatasetError::NoDataForCity`], highlight
//! a field on [`DatasetError::Validation`], ...). The command-line host wraps
//! these in `anyhow` with context, the same way it treats any other failure.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::schema::Column;

pub type Result<T, E = DatasetError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DatasetError {
    /// Backing file missing, unreadable or not writable.
    #[error("Dataset storage {path:?} is unavailable: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Header row does not match the fixed dataset layout.
    #[error("Dataset header mismatch: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Malformed CSV in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Line {line} is not valid {encoding} text")]
    Decode { line: u64, encoding: &'static str },

    #[error("Line {line} column '{column}': cannot read '{value}' as a non-negative integer")]
    InvalidValue {
        line: u64,
        column: Column,
        value: String,
    },

    /// Location tag holds fewer than two numbers.
    #[error("Cannot parse coordinates from '{input}'")]
    ParseError { input: String },

    /// A ratio or summary was requested over zero qualifying rows.
    #[error("No qualifying rows for {context}")]
    EmptyDataset { context: &'static str },

    #[error("No coordinates recorded for city '{city}'")]
    NoDataForCity { city: String },

    #[error("Invalid value for '{column}': {reason}")]
    Validation { column: Column, reason: String },
}

impl DatasetError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DatasetError::StorageUnavailable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(column: Column, reason: impl Into<String>) -> Self {
        DatasetError::Validation {
            column,
            reason: reason.into(),
        }
    }

    /// Field the caller should highlight, when the error is tied to one.
    pub fn column(&self) -> Option<Column> {
        match self {
            DatasetError::InvalidValue { column, .. } | DatasetError::Validation { column, .. } => {
                Some(*column)
            }
            DatasetError::ParseError { .. } | DatasetError::NoDataForCity { .. } => {
                Some(Column::VehicleLocation)
            }
            _ => None,
        }
    }
}
