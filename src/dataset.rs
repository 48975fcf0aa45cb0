//! In-memory dataset, its on-disk store, and the per-session snapshot.
//!
//! [`DatasetStore`] reads the whole backing file into a [`Dataset`] and writes
//! the whole dataset back. There is no locking: two sessions that each append
//! and persist race, and the last writer wins. Writes go through a sibling
//! staging file that is renamed over the target, so an interrupted write
//! leaves the previous file in place rather than a truncated one.
//!
//! [`Snapshot`] is the cache contract callers are expected to follow: load
//! once, query the held copy, and reload only after an append has been
//! persisted.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};
use serde::Serialize;

use crate::{
    append::{self, RecordDraft},
    error::{DatasetError, Result},
    io_utils,
    schema::{self, Column, HEADERS},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub county: String,
    pub city: String,
    pub state: String,
    pub model_year: u16,
    pub make: String,
    pub model: String,
    pub ev_type: String,
    /// Miles; 0 when not recorded.
    pub electric_range: u32,
    /// 0 when not recorded.
    pub base_msrp: u32,
    pub location: String,
}

impl Record {
    /// Builds a record from a decoded row laid out as [`HEADERS`].
    /// `line` is the 1-based file line used in error messages.
    pub fn from_row(row: &[String], line: u64) -> Result<Self> {
        let text = |column: Column| row.get(column.index()).cloned().unwrap_or_default();
        let model_year = parse_integer(row, Column::ModelYear, line)?;
        let model_year = u16::try_from(model_year).map_err(|_| DatasetError::InvalidValue {
            line,
            column: Column::ModelYear,
            value: model_year.to_string(),
        })?;
        Ok(Record {
            county: text(Column::County),
            city: text(Column::City),
            state: text(Column::State),
            model_year,
            make: text(Column::Make),
            model: text(Column::Model),
            ev_type: text(Column::ElectricVehicleType),
            electric_range: parse_integer(row, Column::ElectricRange, line)?,
            base_msrp: parse_integer(row, Column::BaseMsrp, line)?,
            location: text(Column::VehicleLocation),
        })
    }

    pub fn to_row(&self) -> [String; 10] {
        [
            self.county.clone(),
            self.city.clone(),
            self.state.clone(),
            self.model_year.to_string(),
            self.make.clone(),
            self.model.clone(),
            self.ev_type.clone(),
            self.electric_range.to_string(),
            self.base_msrp.to_string(),
            self.location.clone(),
        ]
    }

    pub fn text(&self, column: Column) -> &str {
        match column {
            Column::County => &self.county,
            Column::City => &self.city,
            Column::State => &self.state,
            Column::Make => &self.make,
            Column::Model => &self.model,
            Column::ElectricVehicleType => &self.ev_type,
            Column::VehicleLocation => &self.location,
            Column::ModelYear | Column::ElectricRange | Column::BaseMsrp => "",
        }
    }

    /// Raw value of a numeric column, sentinel included. Text columns yield
    /// `None`.
    pub fn number(&self, column: Column) -> Option<u32> {
        match column {
            Column::ModelYear => Some(u32::from(self.model_year)),
            Column::ElectricRange => Some(self.electric_range),
            Column::BaseMsrp => Some(self.base_msrp),
            _ => None,
        }
    }

    /// Numeric value with the 0 sentinel filtered out, as used by every
    /// statistic.
    pub fn recorded(&self, column: Column) -> Option<u32> {
        self.number(column).filter(|value| *value > 0)
    }
}

fn parse_integer(row: &[String], column: Column, line: u64) -> Result<u32> {
    let raw = row.get(column.index()).map(|s| s.trim()).unwrap_or("");
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<u32>()
        .ok()
        .or_else(|| {
            // Exports sometimes carry integral floats such as "215.0".
            raw.parse::<f64>()
                .ok()
                .filter(|value| {
                    value.fract() == 0.0 && *value >= 0.0 && *value <= f64::from(u32::MAX)
                })
                .map(|value| value as u32)
        })
        .ok_or_else(|| DatasetError::InvalidValue {
            line,
            column,
            value: raw.to_string(),
        })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn push(&mut self, record: Record) -> &Record {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Dataset::new(records)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[derive(Debug, Clone)]
pub struct DatasetStore {
    path: PathBuf,
    delimiter: u8,
    encoding: &'static Encoding,
}

impl DatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let delimiter = io_utils::resolve_delimiter(&path, None);
        Self {
            path,
            delimiter,
            encoding: UTF_8,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Dataset> {
        let mut reader = io_utils::open_csv_reader_from_path(&self.path, self.delimiter)?;
        let headers = io_utils::reader_headers(&mut reader, &self.path, self.encoding)?;
        schema::validate_headers(&headers)?;

        let mut records = Vec::new();
        for record in reader.byte_records() {
            let record = record.map_err(|source| DatasetError::Csv {
                path: self.path.clone(),
                source,
            })?;
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            let decoded = io_utils::decode_record(&record, self.encoding)?;
            records.push(Record::from_row(&decoded, line)?);
        }
        info!("Loaded {} record(s) from {:?}", records.len(), self.path);
        Ok(Dataset::new(records))
    }

    pub fn persist(&self, dataset: &Dataset) -> Result<()> {
        let csv_error = |source| DatasetError::Csv {
            path: self.path.clone(),
            source,
        };
        let mut writer = io_utils::open_buffer_writer(self.delimiter);
        writer.write_record(HEADERS).map_err(csv_error)?;
        for record in dataset {
            writer.write_record(record.to_row()).map_err(csv_error)?;
        }
        let buffer = writer
            .into_inner()
            .map_err(|err| DatasetError::storage(&self.path, err.into_error()))?;
        let bytes = io_utils::encode_bytes(buffer, self.encoding)?;

        let staging = self.staging_path();
        write_synced(&staging, &bytes).map_err(|err| DatasetError::storage(&staging, err))?;
        fs::rename(&staging, &self.path).map_err(|err| DatasetError::storage(&self.path, err))?;
        info!("Wrote {} record(s) to {:?}", dataset.len(), self.path);
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".staging");
        self.path.with_file_name(name)
    }
}

/// One session's view of the dataset.
#[derive(Debug)]
pub struct Snapshot {
    store: DatasetStore,
    current: Option<Dataset>,
}

impl Snapshot {
    pub fn new(store: DatasetStore) -> Self {
        Self {
            store,
            current: None,
        }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    pub fn get(&mut self) -> Result<&Dataset> {
        Ok(&*load_into(&mut self.current, &self.store)?)
    }

    pub fn invalidate(&mut self) {
        self.current = None;
    }

    /// Appends to the held snapshot and persists it. The snapshot is dropped
    /// once the write succeeded so the next [`Snapshot::get`] reads the file;
    /// a failed write takes the new row back out instead. Returns the stored
    /// record.
    pub fn append(&mut self, draft: &RecordDraft) -> Result<Record> {
        let dataset = load_into(&mut self.current, &self.store)?;
        let record = append::append(dataset, draft)?.clone();
        if let Err(err) = self.store.persist(dataset) {
            // Keep the held snapshot identical to the file.
            dataset.records.pop();
            return Err(err);
        }
        self.invalidate();
        Ok(record)
    }
}

/// Writes `bytes` and flushes them to disk before returning, so a rename
/// that follows never exposes a partially written file.
fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn load_into<'a>(slot: &'a mut Option<Dataset>, store: &DatasetStore) -> Result<&'a mut Dataset> {
    let dataset = match slot.take() {
        Some(dataset) => dataset,
        None => {
            debug!("Snapshot empty; loading {:?}", store.path());
            store.load()?
        }
    };
    Ok(slot.insert(dataset))
}
