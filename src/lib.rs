pub mod aggregate;
pub mod append;
pub mod bucket;
pub mod cli;
pub mod coords;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod filter;
pub mod io_utils;
pub mod report;
pub mod role;
pub mod schema;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::cli::{Cli, Commands};

pub use crate::{
    dataset::{Dataset, DatasetStore, Record, Snapshot},
    error::DatasetError,
};

pub const DEFAULT_DATASET_PATH: &str = "DATA/data.csv";

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("ev_registry", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    debug!("Dataset {:?} as role '{}'", cli.global.input, cli.global.role);
    match &cli.command {
        Commands::Append(args) => append::execute(&cli.global, args),
        Commands::Staff(args) => report::staff(&cli.global, args),
        command => report::execute(&cli.global, command),
    }
}
