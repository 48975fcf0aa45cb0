//! Validated insertion of a new sale.
//!
//! [`append`] is the only operation that mutates a [`Dataset`]. All checks run
//! against the existing rows before anything is pushed, so a rejected draft
//! leaves the dataset exactly as it was. Persisting the result is the caller's
//! job ([`crate::dataset::Snapshot::append`] does both).

use anyhow::{Context, Result as AnyResult, anyhow};
use log::{info, warn};

use crate::{
    cli::{AppendArgs, GlobalArgs},
    coords::{self, Coordinate},
    dataset::{Dataset, Record, Snapshot},
    domain,
    error::{DatasetError, Result},
    role::Page,
    schema::Column,
};

/// Form input for one new registration. State is derived from the city and
/// missing numerics are stored as the 0 sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub county: String,
    pub city: String,
    pub model_year: u16,
    pub make: String,
    pub model: String,
    pub ev_type: String,
    pub electric_range: Option<u32>,
    pub base_msrp: Option<u32>,
    pub location: Coordinate,
}

pub fn append<'a>(dataset: &'a mut Dataset, draft: &RecordDraft) -> Result<&'a Record> {
    let record = match validate(dataset, draft) {
        Ok(record) => record,
        Err(err) => {
            warn!("Rejected new sale: {err}");
            return Err(err);
        }
    };
    info!(
        "Appending {} {} ({}) sold in {}, {}",
        record.make, record.model, record.model_year, record.city, record.state
    );
    Ok(dataset.push(record))
}

/// Checks the draft against the current rows and builds the record to store.
pub fn validate(dataset: &Dataset, draft: &RecordDraft) -> Result<Record> {
    let county = required(&draft.county, Column::County)?;
    let city = required(&draft.city, Column::City)?;
    let make = required(&draft.make, Column::Make)?;
    let model = required(&draft.model, Column::Model)?;
    let ev_type = required(&draft.ev_type, Column::ElectricVehicleType)?;

    let state = domain::state_for_city(dataset, city).ok_or_else(|| {
        DatasetError::invalid(Column::City, format!("'{city}' has no recorded registrations"))
    })?;
    if let Some(known) = domain::county_for_city(dataset, city)
        && known != county
    {
        return Err(DatasetError::invalid(
            Column::County,
            format!("'{city}' belongs to {known} county, not {county}"),
        ));
    }

    if let Some((oldest, newest)) = domain::year_bounds(dataset) {
        let latest_allowed = newest.saturating_add(1);
        if !(oldest..=latest_allowed).contains(&draft.model_year) {
            return Err(DatasetError::invalid(
                Column::ModelYear,
                format!(
                    "{} is outside {oldest}..={latest_allowed}",
                    draft.model_year
                ),
            ));
        }
    }

    let electric_range = draft.electric_range.unwrap_or(0);
    if electric_range > 0 {
        let limit = domain::max_numeric_value_for(
            dataset,
            |record| record.ev_type == ev_type,
            Column::ElectricRange,
        );
        if electric_range > limit {
            return Err(DatasetError::invalid(
                Column::ElectricRange,
                format!("{electric_range} exceeds the {limit} mile maximum for {ev_type}"),
            ));
        }
    }

    let bounds = match domain::coordinate_bounds(dataset, city) {
        Ok(bounds) => bounds,
        Err(DatasetError::NoDataForCity { .. }) => {
            return Err(DatasetError::invalid(
                Column::VehicleLocation,
                format!("no recorded coordinates for '{city}'"),
            ));
        }
        Err(err) => return Err(err),
    };
    if !bounds.contains(draft.location) {
        return Err(DatasetError::invalid(
            Column::VehicleLocation,
            format!(
                "({}, {}) lies outside lon {}..{} lat {}..{}",
                draft.location.lon,
                draft.location.lat,
                bounds.lon_min,
                bounds.lon_max,
                bounds.lat_min,
                bounds.lat_max
            ),
        ));
    }

    Ok(Record {
        county: county.to_string(),
        city: city.to_string(),
        state,
        model_year: draft.model_year,
        make: make.to_string(),
        model: model.to_string(),
        ev_type: ev_type.to_string(),
        electric_range,
        base_msrp: draft.base_msrp.unwrap_or(0),
        location: coords::format_point(draft.location),
    })
}

fn required(value: &str, column: Column) -> Result<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DatasetError::invalid(column, "a value is required"))
    } else {
        Ok(trimmed)
    }
}

pub fn execute(global: &GlobalArgs, args: &AppendArgs) -> AnyResult<()> {
    let role = global.role;
    if !role.can_access(Page::Sale) {
        return Err(anyhow!("Role '{role}' cannot record new sales"));
    }

    let draft = RecordDraft {
        county: args.county.clone(),
        city: args.city.clone(),
        model_year: args.model_year,
        make: args.make.clone(),
        model: args.model.clone(),
        ev_type: args.ev_type.clone(),
        electric_range: args.electric_range,
        base_msrp: args.base_msrp,
        location: Coordinate::new(args.lon, args.lat),
    };

    let mut snapshot = Snapshot::new(global.store()?);
    let record = snapshot
        .append(&draft)
        .with_context(|| format!("Recording sale into {:?}", snapshot.store().path()))?;
    info!(
        "✓ Stored {} {} with location {}",
        record.make, record.model, record.location
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(city: &str, ev_type: &str, year: u16, range: u32, location: &str) -> Record {
        Record {
            county: if city == "Spokane" { "Spokane" } else { "King" }.into(),
            city: city.into(),
            state: "WA".into(),
            model_year: year,
            make: "NISSAN".into(),
            model: "LEAF".into(),
            ev_type: ev_type.into(),
            electric_range: range,
            base_msrp: 0,
            location: location.into(),
        }
    }

    fn sample() -> Dataset {
        Dataset::new(vec![
            registration("Seattle", "BEV", 2018, 150, "POINT (-122.35 47.6)"),
            registration("Seattle", "BEV", 2022, 0, "POINT (-122.25 47.7)"),
            registration("Seattle", "PHEV", 2020, 25, ""),
            registration("Spokane", "BEV", 2021, 220, ""),
        ])
    }

    fn draft() -> RecordDraft {
        RecordDraft {
            county: "King".into(),
            city: "Seattle".into(),
            model_year: 2023,
            make: "KIA".into(),
            model: "EV6".into(),
            ev_type: "BEV".into(),
            electric_range: None,
            base_msrp: None,
            location: Coordinate::new(-122.3, 47.65),
        }
    }

    fn rejected_column(draft: &RecordDraft) -> Column {
        let mut dataset = sample();
        let before = dataset.clone();
        let err = append(&mut dataset, draft).unwrap_err();
        assert_eq!(dataset, before, "dataset must be untouched on rejection");
        match err {
            DatasetError::Validation { column, .. } => column,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn append_fills_state_and_sentinels() {
        let mut dataset = sample();
        let record = append(&mut dataset, &draft()).unwrap().clone();
        assert_eq!(dataset.len(), 5);
        assert_eq!(record.state, "WA");
        assert_eq!(record.electric_range, 0);
        assert_eq!(record.base_msrp, 0);
        assert_eq!(record.location, "POINT (-122.3 47.65)");
        assert_eq!(dataset.records().last(), Some(&record));
    }

    #[test]
    fn append_keeps_supplied_numerics() {
        let mut dataset = sample();
        let mut draft = draft();
        draft.electric_range = Some(150);
        draft.base_msrp = Some(41_000);
        let record = append(&mut dataset, &draft).unwrap();
        assert_eq!(record.electric_range, 150);
        assert_eq!(record.base_msrp, 41_000);
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let mut draft = draft();
        draft.model = "   ".into();
        assert_eq!(rejected_column(&draft), Column::Model);
    }

    #[test]
    fn unknown_city_is_rejected() {
        let mut draft = draft();
        draft.city = "Tacoma".into();
        assert_eq!(rejected_column(&draft), Column::City);
    }

    #[test]
    fn city_from_another_county_is_rejected() {
        let mut draft = draft();
        draft.county = "Spokane".into();
        assert_eq!(rejected_column(&draft), Column::County);
    }

    #[test]
    fn model_year_must_be_near_existing_years() {
        let mut draft = draft();
        draft.model_year = 2017;
        assert_eq!(rejected_column(&draft), Column::ModelYear);
        draft.model_year = 2024;
        assert_eq!(rejected_column(&draft), Column::ModelYear);
    }

    #[test]
    fn range_above_engine_type_maximum_is_rejected() {
        let mut draft = draft();
        draft.ev_type = "PHEV".into();
        draft.electric_range = Some(26);
        assert_eq!(rejected_column(&draft), Column::ElectricRange);
    }

    #[test]
    fn sale_at_a_recorded_extreme_point_is_accepted() {
        let mut dataset = Dataset::new(vec![
            registration("Seattle", "BEV", 2020, 150, "POINT (-122.30839 47.610372)"),
            registration("Seattle", "BEV", 2021, 84, "POINT (-122.34301 47.659185)"),
        ]);
        for location in [
            Coordinate::new(-122.34301, 47.659185),
            Coordinate::new(-122.30839, 47.610372),
        ] {
            let draft = RecordDraft {
                location,
                model_year: 2021,
                ..draft()
            };
            let record = append(&mut dataset, &draft).unwrap();
            assert_eq!(record.location, coords::format_point(location));
        }
        assert_eq!(dataset.len(), 4);
    }

    #[test]
    fn location_outside_city_box_is_rejected() {
        let mut draft = draft();
        draft.location = Coordinate::new(-117.4, 47.65);
        assert_eq!(rejected_column(&draft), Column::VehicleLocation);
    }

    #[test]
    fn city_without_coordinates_rejects_location() {
        let mut draft = draft();
        draft.county = "Spokane".into();
        draft.city = "Spokane".into();
        assert_eq!(rejected_column(&draft), Column::VehicleLocation);
    }
}
