//! CSV reader/writer construction, delimiter and encoding resolution.
//!
//! Every byte that enters or leaves the dataset file passes through here:
//!
//! - **Delimiter resolution**: `.tsv` selects tab, anything else comma, with a
//!   manual override.
//! - **Encoding**: input decoding and output encoding via `encoding_rs`,
//!   defaulting to UTF-8.
//! - **Readers/writers**: strict (non-flexible) readers so a short row is a
//!   CSV error rather than a silently misaligned record.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::anyhow;
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::error::{DatasetError, Result};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn resolve_encoding(label: Option<&str>) -> anyhow::Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).map_err(|err| DatasetError::storage(path, err))?;
    Ok(open_csv_reader(BufReader::new(file), delimiter))
}

/// In-memory writer; the caller encodes and stores the finished buffer.
pub fn open_buffer_writer(delimiter: u8) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .from_writer(Vec::new())
}

pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> Result<Vec<String>> {
    let line = record.position().map(|pos| pos.line()).unwrap_or_default();
    record
        .iter()
        .map(|field| {
            let (text, _, had_errors) = encoding.decode(field);
            if had_errors {
                Err(DatasetError::Decode {
                    line,
                    encoding: encoding.name(),
                })
            } else {
                Ok(text.into_owned())
            }
        })
        .collect()
}

pub fn reader_headers<R: Read>(
    reader: &mut csv::Reader<R>,
    path: &Path,
    encoding: &'static Encoding,
) -> Result<Vec<String>> {
    let headers = reader
        .byte_headers()
        .map_err(|source| DatasetError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    decode_record(&headers, encoding)
}

/// Re-encodes UTF-8 output bytes into the target encoding.
pub fn encode_bytes(utf8: Vec<u8>, encoding: &'static Encoding) -> Result<Vec<u8>> {
    if encoding == UTF_8 {
        return Ok(utf8);
    }
    let text = String::from_utf8(utf8).map_err(|_| DatasetError::Decode {
        line: 0,
        encoding: UTF_8.name(),
    })?;
    let (encoded, _, had_errors) = encoding.encode(&text);
    if had_errors {
        return Err(DatasetError::Decode {
            line: 0,
            encoding: encoding.name(),
        });
    }
    Ok(encoded.into_owned())
}
