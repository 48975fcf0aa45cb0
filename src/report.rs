//! Read-only subcommands: load once, run one query, print the result.

use std::collections::BTreeSet;

use anyhow::{Context, Result, anyhow};
use log::info;
use serde::Serialize;

use crate::{
    aggregate,
    cli::{
        BoundsArgs, ColumnQueryArgs, Commands, GlobalArgs, MakerSelection, MakersArgs, ModelsArgs,
        OptionKind, OptionsArgs, PricesArgs, StaffArgs,
    },
    dataset::{Dataset, Snapshot},
    domain, filter,
    role::{self, Page},
    table,
};

pub fn execute(global: &GlobalArgs, command: &Commands) -> Result<()> {
    if !global.role.can_access(Page::Dashboard) {
        return Err(anyhow!("Role '{}' cannot view the dashboard", global.role));
    }
    let mut snapshot = Snapshot::new(global.store()?);
    let dataset = snapshot
        .get()
        .with_context(|| format!("Loading dataset {:?}", global.input))?;
    let out = Output { json: global.json };

    match command {
        Commands::Overview => overview(dataset, &out),
        Commands::Makers(args) => makers(dataset, args, &out),
        Commands::Trend(args) => trend(dataset, args, &out),
        Commands::Models(args) => models(dataset, args, &out),
        Commands::Engines(args) => engines(dataset, args, &out),
        Commands::Ranges => {
            let rows = aggregate::range_extremes_by_maker(dataset);
            out.emit(&rows, &["make", "max_range", "min_range"], |row| {
                vec![
                    row.make.clone(),
                    row.max_range.to_string(),
                    row.min_range.to_string(),
                ]
            })
        }
        Commands::Prices(args) => prices(dataset, args, &out),
        Commands::Summary(args) => summary(dataset, args, &out),
        Commands::Max(args) => max(dataset, args, &out),
        Commands::Bounds(args) => bounds(dataset, args, &out),
        Commands::Coords => {
            let points = aggregate::coordinates(dataset);
            info!("Parsed {} of {} location(s)", points.len(), dataset.len());
            out.emit(&points, &["lon", "lat"], |point| {
                vec![point.lon.to_string(), point.lat.to_string()]
            })
        }
        Commands::Options(args) => options(dataset, args, &out),
        Commands::Append(_) | Commands::Staff(_) => {
            Err(anyhow!("{command:?} does not query the dataset"))
        }
    }
}

struct Output {
    json: bool,
}

impl Output {
    fn emit<T, F>(&self, rows: &[T], headers: &[&str], cells: F) -> Result<()>
    where
        T: Serialize,
        F: Fn(&T) -> Vec<String>,
    {
        if self.json {
            let text = serde_json::to_string_pretty(rows).context("Serializing result as JSON")?;
            println!("{text}");
        } else {
            let rendered = rows.iter().map(cells).collect::<Vec<_>>();
            table::print_table(headers, &rendered);
        }
        Ok(())
    }

    fn emit_value<T: Serialize>(&self, value: &T, rows: &[(&str, String)]) -> Result<()> {
        if self.json {
            let text = serde_json::to_string_pretty(value).context("Serializing result as JSON")?;
            println!("{text}");
        } else {
            let rendered = rows
                .iter()
                .map(|(name, value)| vec![name.to_string(), value.clone()])
                .collect::<Vec<_>>();
            table::print_table(&["metric", "value"], &rendered);
        }
        Ok(())
    }
}

fn selection(args: &MakerSelection) -> BTreeSet<String> {
    args.makes
        .iter()
        .map(|make| make.trim().to_string())
        .filter(|make| !make.is_empty())
        .collect()
}

fn format_mean(mean: Option<f64>) -> String {
    mean.map(|value| format!("{value:.2}")).unwrap_or_default()
}

fn overview(dataset: &Dataset, out: &Output) -> Result<()> {
    #[derive(Serialize)]
    struct YearCount {
        year: u16,
        count: usize,
    }
    let rows = aggregate::count_by_year(dataset)
        .into_iter()
        .map(|(year, count)| YearCount { year, count })
        .collect::<Vec<_>>();
    info!("{} registration(s) across {} model year(s)", dataset.len(), rows.len());
    out.emit(&rows, &["model_year", "count"], |row| {
        vec![row.year.to_string(), row.count.to_string()]
    })
}

fn makers(dataset: &Dataset, args: &MakersArgs, out: &Output) -> Result<()> {
    match args.above {
        Some(threshold) => {
            let names = aggregate::unique_makers_above(dataset, threshold)
                .context("Computing maker shares")?;
            out.emit(&names, &["make"], |name| vec![name.clone()])
        }
        None => {
            let rows = aggregate::count_by_maker(dataset);
            let total = dataset.len();
            out.emit(&rows, &["make", "count", "percent"], |row| {
                let percent = aggregate::percentage(row.count, total, 3)
                    .map(|value| format!("{value:.3}"))
                    .unwrap_or_default();
                vec![row.make.clone(), row.count.to_string(), percent]
            })
        }
    }
}

fn trend(dataset: &Dataset, args: &MakerSelection, out: &Output) -> Result<()> {
    let rows = aggregate::count_by_maker_and_year(dataset, &selection(args));
    out.emit(&rows, &["make", "model_year", "count"], |row| {
        vec![row.make.clone(), row.year.to_string(), row.count.to_string()]
    })
}

fn models(dataset: &Dataset, args: &ModelsArgs, out: &Output) -> Result<()> {
    if !(0.0..=1.0).contains(&args.threshold) {
        return Err(anyhow!(
            "Threshold {} must be a fraction between 0 and 1",
            args.threshold
        ));
    }
    let rows = aggregate::bucketed_models_by_maker(
        dataset,
        &selection(&args.selection),
        args.threshold,
        &args.other_label,
    );
    out.emit(&rows, &["make", "model", "count"], |row| {
        vec![row.group.clone(), row.category.clone(), row.count.to_string()]
    })
}

fn engines(dataset: &Dataset, args: &MakerSelection, out: &Output) -> Result<()> {
    let rows = aggregate::engine_type_share(dataset, &selection(args))
        .context("Computing engine type shares")?;
    out.emit(&rows, &["make", "ev_type", "count", "percent"], |row| {
        vec![
            row.make.clone(),
            row.ev_type.clone(),
            row.count.to_string(),
            format!("{:.2}", row.percent),
        ]
    })
}

fn prices(dataset: &Dataset, args: &PricesArgs, out: &Output) -> Result<()> {
    let rows = aggregate::mean_price_by_year(dataset, args.min_samples);
    out.emit(&rows, &["model_year", "mean_price", "count"], |row| {
        vec![
            row.year.to_string(),
            format!("{:.2}", row.mean_price),
            row.count.to_string(),
        ]
    })
}

fn summary(dataset: &Dataset, args: &ColumnQueryArgs, out: &Output) -> Result<()> {
    let conditions = filter::parse_filters(&args.filters)?;
    let stats = aggregate::summary_stats(
        dataset,
        |record| filter::matches_all(&conditions, record),
        args.column,
    )
    .with_context(|| format!("Summarizing '{}'", args.column))?;

    if out.json {
        return out.emit_value(&stats, &[]);
    }
    let mut rows = vec![vec![
        "(all)".to_string(),
        stats.count.to_string(),
        format_mean(stats.mean),
    ]];
    rows.extend(stats.per_engine_type.iter().map(|group| {
        vec![
            group.ev_type.clone(),
            group.count.to_string(),
            format_mean(group.mean),
        ]
    }));
    let mean_header = format!("mean {}", args.column);
    table::print_table(&["ev_type", "count", mean_header.as_str()], &rows);
    Ok(())
}

fn max(dataset: &Dataset, args: &ColumnQueryArgs, out: &Output) -> Result<()> {
    let conditions = filter::parse_filters(&args.filters)?;
    let value = domain::max_numeric_value_for(
        dataset,
        |record| filter::matches_all(&conditions, record),
        args.column,
    );
    if value == 0 {
        info!("No usable '{}' values for the given filters", args.column);
    }
    out.emit_value(&value, &[(args.column.header(), value.to_string())])
}

fn bounds(dataset: &Dataset, args: &BoundsArgs, out: &Output) -> Result<()> {
    let bounds = domain::coordinate_bounds(dataset, &args.city)
        .with_context(|| format!("Deriving coordinate bounds for {}", args.city))?;
    out.emit_value(
        &bounds,
        &[
            ("lon_min", bounds.lon_min.to_string()),
            ("lon_max", bounds.lon_max.to_string()),
            ("lat_min", bounds.lat_min.to_string()),
            ("lat_max", bounds.lat_max.to_string()),
        ],
    )
}

fn options(dataset: &Dataset, args: &OptionsArgs, out: &Output) -> Result<()> {
    let values = match args.kind {
        OptionKind::Counties => domain::counties(dataset),
        OptionKind::Cities => {
            let county = args
                .county
                .as_deref()
                .ok_or_else(|| anyhow!("--county is required to list cities"))?;
            domain::cities_in_county(dataset, county)
        }
        OptionKind::Makers => aggregate::makers(dataset),
        OptionKind::Models => {
            let make = args
                .make
                .as_deref()
                .ok_or_else(|| anyhow!("--make is required to list models"))?;
            domain::models_for_make(dataset, make)
        }
        OptionKind::EngineTypes => domain::engine_types(dataset),
        OptionKind::Years => domain::year_bounds(dataset)
            .map(|(oldest, newest)| (oldest..=newest).map(|year| year.to_string()).collect())
            .unwrap_or_default(),
    };
    out.emit(&values, &["value"], |value| vec![value.clone()])
}

/// Staff overview: users per role, administrators left out.
pub fn staff(global: &GlobalArgs, args: &StaffArgs) -> Result<()> {
    if !global.role.can_access(Page::Staff) {
        return Err(anyhow!("Role '{}' cannot view the staff overview", global.role));
    }
    let users = role::load_users(&args.users)
        .with_context(|| format!("Loading users from {:?}", args.users))?;
    info!("Loaded {} user(s) from {:?}", users.len(), args.users);

    #[derive(Serialize)]
    struct RoleCount {
        role: role::Role,
        count: usize,
    }
    let rows = role::count_by_role(&users)
        .into_iter()
        .map(|(role, count)| RoleCount { role, count })
        .collect::<Vec<_>>();
    let out = Output { json: global.json };
    out.emit(&rows, &["role", "count"], |row| {
        vec![row.role.to_string(), row.count.to_string()]
    })
}
