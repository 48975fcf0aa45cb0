mod common;

use std::fs;

use common::{FIXTURE, FIXTURE_ROWS, TestWorkspace, fixture_path};
use ev_registry::{
    DatasetError, DatasetStore, Snapshot, aggregate, append::RecordDraft, coords::Coordinate,
    domain, schema::Column,
};

fn seattle_draft() -> RecordDraft {
    RecordDraft {
        county: "King".into(),
        city: "Seattle".into(),
        model_year: 2024,
        make: "KIA".into(),
        model: "EV9".into(),
        ev_type: "Battery Electric Vehicle (BEV)".into(),
        electric_range: Some(250),
        base_msrp: None,
        location: Coordinate::new(-122.32, 47.62),
    }
}

#[test]
fn load_reads_every_fixture_row() {
    let dataset = DatasetStore::new(fixture_path(FIXTURE))
        .load()
        .expect("load fixture");
    assert_eq!(dataset.len(), FIXTURE_ROWS);

    let years = aggregate::count_by_year(&dataset);
    assert_eq!(years.get(&2013), Some(&3));
    assert_eq!(years.values().sum::<usize>(), FIXTURE_ROWS);

    let makers = aggregate::count_by_maker(&dataset);
    assert_eq!(makers[0].make, "TESLA");
    assert_eq!(makers[0].count, 8);
}

#[test]
fn fixture_bounds_cover_every_seattle_point() {
    let dataset = DatasetStore::new(fixture_path(FIXTURE)).load().unwrap();
    let bounds = domain::coordinate_bounds(&dataset, "Seattle").unwrap();
    assert_eq!(bounds.lon_min, -122.36);
    assert_eq!(bounds.lon_max, -122.29);
    assert_eq!(bounds.lat_min, 47.6);
    assert_eq!(bounds.lat_max, 47.68);
    assert_eq!(
        domain::max_numeric_value_for(
            &dataset,
            |record| record.ev_type == "Battery Electric Vehicle (BEV)",
            Column::ElectricRange,
        ),
        266
    );
}

#[test]
fn append_persists_and_next_read_sees_the_row() {
    let workspace = TestWorkspace::new();
    let path = workspace.copy_fixture(FIXTURE);

    let mut snapshot = Snapshot::new(DatasetStore::new(&path));
    assert_eq!(snapshot.get().unwrap().len(), FIXTURE_ROWS);

    let stored = snapshot.append(&seattle_draft()).expect("append");
    assert_eq!(stored.state, "WA");
    assert_eq!(stored.base_msrp, 0);
    assert_eq!(stored.location, "POINT (-122.32 47.62)");
    assert!(!snapshot.is_loaded());

    let reloaded = snapshot.get().unwrap();
    assert_eq!(reloaded.len(), FIXTURE_ROWS + 1);
    let last = reloaded.records().last().unwrap();
    assert_eq!(last.model, "EV9");
    assert_eq!(last.electric_range, 250);
    assert!(!path.with_file_name("vehicles.csv.staging").exists());
}

#[test]
fn rejected_append_leaves_the_file_untouched() {
    let workspace = TestWorkspace::new();
    let path = workspace.copy_fixture(FIXTURE);
    let before = fs::read(&path).unwrap();

    let mut draft = seattle_draft();
    draft.location = Coordinate::new(-117.42, 47.66);
    let mut snapshot = Snapshot::new(DatasetStore::new(&path));
    let err = snapshot.append(&draft).unwrap_err();
    assert_eq!(err.column(), Some(Column::VehicleLocation));

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn header_mismatch_is_reported() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "renamed.csv",
        "County,City,State,Year,Make,Model,Electric Vehicle Type,Electric Range,Base MSRP,Vehicle Location\n",
    );
    let err = DatasetStore::new(path).load().unwrap_err();
    assert!(matches!(err, DatasetError::SchemaMismatch { .. }));
}

#[test]
fn missing_file_is_storage_unavailable() {
    let workspace = TestWorkspace::new();
    let err = DatasetStore::new(workspace.path().join("absent.csv"))
        .load()
        .unwrap_err();
    assert!(matches!(err, DatasetError::StorageUnavailable { .. }));
}

#[test]
fn non_numeric_year_names_line_and_column() {
    let workspace = TestWorkspace::new();
    let header = fs::read_to_string(fixture_path(FIXTURE))
        .unwrap()
        .lines()
        .next()
        .unwrap()
        .to_string();
    let path = workspace.write(
        "bad.csv",
        &format!("{header}\nKing,Seattle,WA,twenty,KIA,EV6,BEV,0,0,\n"),
    );
    match DatasetStore::new(path).load().unwrap_err() {
        DatasetError::InvalidValue { line, column, value } => {
            assert_eq!(line, 2);
            assert_eq!(column, Column::ModelYear);
            assert_eq!(value, "twenty");
        }
        other => panic!("unexpected error {other:?}"),
    }
}
