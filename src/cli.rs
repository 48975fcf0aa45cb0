use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    DEFAULT_DATASET_PATH, aggregate::DEFAULT_MIN_SAMPLE_SIZE, bucket, dataset::DatasetStore,
    io_utils, role::Role, schema::Column,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Query and extend an electric vehicle registration dataset",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Dataset CSV file
    #[arg(short = 'i', long = "input", global = true, default_value = DEFAULT_DATASET_PATH)]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, global = true, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the dataset file (defaults to utf-8)
    #[arg(long = "input-encoding", global = true)]
    pub input_encoding: Option<String>,
    /// Role granted by the authentication layer
    #[arg(long, global = true, value_enum, default_value_t = Role::Analyst)]
    pub role: Role,
    /// Emit JSON instead of an aligned table
    #[arg(long, global = true)]
    pub json: bool,
}

impl GlobalArgs {
    pub fn store(&self) -> Result<DatasetStore> {
        let encoding = io_utils::resolve_encoding(self.input_encoding.as_deref())?;
        let delimiter = io_utils::resolve_delimiter(&self.input, self.delimiter);
        Ok(DatasetStore::new(&self.input)
            .with_delimiter(delimiter)
            .with_encoding(encoding))
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Total registrations and registrations per model year
    Overview,
    /// Registrations per maker, or makers above a share of the dataset
    Makers(MakersArgs),
    /// Registrations per model year for selected makers
    Trend(MakerSelection),
    /// Model mix per maker with rare models folded together
    Models(ModelsArgs),
    /// Engine type mix per maker
    Engines(MakerSelection),
    /// Longest and shortest recorded electric range per maker
    Ranges,
    /// Mean base MSRP per model year
    Prices(PricesArgs),
    /// Count and mean of a numeric column for filtered rows
    Summary(ColumnQueryArgs),
    /// Maximum of a numeric column for filtered rows
    Max(ColumnQueryArgs),
    /// Coordinate bounding box of a city
    Bounds(BoundsArgs),
    /// Every parsed vehicle location
    Coords,
    /// Values offered by the new-sale form
    Options(OptionsArgs),
    /// Record a new sale and write the dataset back
    Append(AppendArgs),
    /// Users per role from an export of the user store
    Staff(StaffArgs),
}

#[derive(Debug, Args)]
pub struct MakersArgs {
    /// Only list makers whose share of all registrations exceeds this percentage
    #[arg(long)]
    pub above: Option<f64>,
}

#[derive(Debug, Args)]
pub struct MakerSelection {
    /// Makers to include
    #[arg(short = 'm', long = "make", required = true, action = clap::ArgAction::Append)]
    pub makes: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ModelsArgs {
    #[command(flatten)]
    pub selection: MakerSelection,
    /// Fraction of a maker's volume under which a model is folded
    #[arg(long, default_value_t = bucket::DEFAULT_THRESHOLD)]
    pub threshold: f64,
    /// Label for folded models
    #[arg(long = "other-label", default_value = bucket::OTHER_LABEL)]
    pub other_label: String,
}

#[derive(Debug, Args)]
pub struct PricesArgs {
    /// Minimum priced registrations for a year to be reported
    #[arg(long = "min-samples", default_value_t = DEFAULT_MIN_SAMPLE_SIZE)]
    pub min_samples: usize,
}

#[derive(Debug, Args)]
pub struct ColumnQueryArgs {
    /// Numeric column to summarize
    #[arg(short = 'C', long, value_parser = parse_numeric_column)]
    pub column: Column,
    /// Row filters such as `Model Year >= 2020` (all must hold)
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
}

#[derive(Debug, Args)]
pub struct BoundsArgs {
    #[arg(long)]
    pub city: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum OptionKind {
    Counties,
    Cities,
    Makers,
    Models,
    EngineTypes,
    Years,
}

#[derive(Debug, Args)]
pub struct OptionsArgs {
    #[arg(value_enum)]
    pub kind: OptionKind,
    /// County to list cities for
    #[arg(long)]
    pub county: Option<String>,
    /// Maker to list models for
    #[arg(long)]
    pub make: Option<String>,
}

#[derive(Debug, Args)]
pub struct StaffArgs {
    /// User export with `Email`, `User Type` and `Username` columns
    #[arg(long)]
    pub users: PathBuf,
}

#[derive(Debug, Args)]
pub struct AppendArgs {
    #[arg(long)]
    pub county: String,
    #[arg(long)]
    pub city: String,
    #[arg(long = "model-year")]
    pub model_year: u16,
    #[arg(long)]
    pub make: String,
    #[arg(long)]
    pub model: String,
    /// Electric Vehicle Type, e.g. "Battery Electric Vehicle (BEV)"
    #[arg(long = "ev-type")]
    pub ev_type: String,
    /// Electric range in miles (stored as 0 when omitted)
    #[arg(long = "electric-range")]
    pub electric_range: Option<u32>,
    /// Base MSRP (stored as 0 when omitted)
    #[arg(long = "base-msrp")]
    pub base_msrp: Option<u32>,
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

fn parse_numeric_column(value: &str) -> Result<Column, String> {
    let column = value.parse::<Column>().map_err(|err| err.to_string())?;
    if column.is_numeric() {
        Ok(column)
    } else {
        Err(format!("'{column}' is not a numeric column"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_append_with_negative_longitude() {
        let cli = Cli::try_parse_from([
            "ev-registry",
            "--role",
            "sales",
            "append",
            "--county",
            "King",
            "--city",
            "Seattle",
            "--model-year",
            "2023",
            "--make",
            "KIA",
            "--model",
            "EV6",
            "--ev-type",
            "BEV",
            "--lon",
            "-122.3",
            "--lat",
            "47.6",
        ])
        .unwrap();
        assert_eq!(cli.global.role, Role::Sales);
        match cli.command {
            Commands::Append(args) => {
                assert_eq!(args.lon, -122.3);
                assert_eq!(args.electric_range, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn numeric_column_parser_rejects_text_columns() {
        assert_eq!(parse_numeric_column("Base MSRP").unwrap(), Column::BaseMsrp);
        assert!(parse_numeric_column("Make").is_err());
    }

    #[test]
    fn parse_delimiter_accepts_names() {
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert!(parse_delimiter("ab").is_err());
    }
}
