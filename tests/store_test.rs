use chrono::NaiveDate;
use rusty_dashboard::data::cache::DatasetCache;
use rusty_dashboard::data::loader::{generate_and_persist, DatasetKind};
use rusty_dashboard::data::model::{ColumnDef, ColumnType, Dataset, Schema, Value};
use rusty_dashboard::error::StoreError;
use rusty_dashboard::form::StudentEntry;
use rusty_dashboard::store::TabularStore;

fn store_file() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("students.db");
    (dir, path)
}

#[test]
fn replacing_twice_reads_back_the_same_rows() {
    let (_dir, path) = store_file();
    let dataset = DatasetKind::Sales.generate(42).unwrap();
    let mut store = TabularStore::open(&path).unwrap();
    store.replace_table("sales", &dataset).unwrap();
    store.replace_table("sales", &dataset).unwrap();
    let back = store.read_table("sales", &DatasetKind::Sales.schema()).unwrap();
    assert_eq!(back, dataset);
    assert_eq!(store.revision("sales").unwrap(), 2);
}

#[test]
fn data_survives_reopening_the_file() {
    let (_dir, path) = store_file();
    let written = {
        let mut store = TabularStore::open(&path).unwrap();
        generate_and_persist(&mut store, DatasetKind::Students, 5).unwrap()
    };
    let store = TabularStore::open(&path).unwrap();
    let kind = DatasetKind::Students;
    let read = store.read_table(kind.table_name(), &kind.schema()).unwrap();
    assert_eq!(read, written);
    for v in read.column("submission_date").unwrap() {
        assert!(matches!(v, Value::Timestamp(_)));
    }
}

#[test]
fn sub_second_timestamps_round_trip() {
    let (_dir, path) = store_file();
    let schema = Schema::new(vec![
        ColumnDef::new("label", ColumnType::Text),
        ColumnDef::new("at", ColumnType::Timestamp),
    ]);
    let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let rows = vec![
        vec![Value::from("ms"), Value::Timestamp(day.and_hms_milli_opt(10, 0, 0, 250).unwrap())],
        vec![Value::from("us"), Value::Timestamp(day.and_hms_micro_opt(10, 0, 1, 123_456).unwrap())],
        vec![Value::from("whole"), Value::Timestamp(day.and_hms_opt(10, 0, 2).unwrap())],
    ];
    let dataset = Dataset::new(schema.clone(), rows).unwrap();

    let mut store = TabularStore::open(&path).unwrap();
    store.replace_table("events", &dataset).unwrap();
    assert_eq!(store.read_table("events", &schema).unwrap(), dataset);
}

#[test]
fn recreated_store_file_is_not_served_from_cache() {
    let (_dir, path) = store_file();
    let kind = DatasetKind::Sales;
    let mut cache = DatasetCache::new();

    let first = {
        let mut store = TabularStore::open(&path).unwrap();
        let ds = generate_and_persist(&mut store, kind, 1).unwrap();
        assert_eq!(cache.stored(&store, kind).unwrap(), ds);
        ds
    };
    std::fs::remove_file(&path).unwrap();

    let mut store = TabularStore::open(&path).unwrap();
    let second = generate_and_persist(&mut store, kind, 2).unwrap();
    assert_eq!(store.revision(kind.table_name()).unwrap(), 1);
    assert_ne!(first, second);
    assert_eq!(cache.stored(&store, kind).unwrap(), second);
    assert_eq!(cache.stats(), (0, 2));
    assert_eq!(cache.len(), 1);
}

#[test]
fn reopening_a_store_keeps_its_identity() {
    let (_dir, path) = store_file();
    let id = TabularStore::open(&path).unwrap().id().to_string();
    assert_eq!(TabularStore::open(&path).unwrap().id(), id);
}

#[test]
fn insert_then_read_grows_by_one_with_a_fresh_id() {
    let (_dir, path) = store_file();
    let kind = DatasetKind::Students;
    let mut store = TabularStore::open(&path).unwrap();
    let before = generate_and_persist(&mut store, kind, 1).unwrap();
    let max_id = before
        .column("id")
        .unwrap()
        .filter_map(|v| v.as_f64())
        .fold(f64::MIN, f64::max) as i64;

    let entry = StudentEntry {
        name: "Grace Hopper".into(),
        age: 29,
        grade: 3.9,
        department: "Science".into(),
        attendance: 98.5,
        interests: vec!["Programming".into()],
    };
    let at = NaiveDate::from_ymd_opt(2025, 2, 14)
        .unwrap()
        .and_hms_opt(8, 15, 0)
        .unwrap();
    let id = store.insert_student_at(&entry, at).unwrap();
    assert!(id > max_id);

    let after = store.read_table(kind.table_name(), &kind.schema()).unwrap();
    assert_eq!(after.len(), before.len() + 1);
    let last = after.rows().last().unwrap();
    assert_eq!(last[0], Value::Integer(id));
    assert_eq!(last[7], Value::Timestamp(at));
}

#[test]
fn cache_follows_form_inserts() {
    let (_dir, path) = store_file();
    let mut store = TabularStore::open(&path).unwrap();
    let mut cache = DatasetCache::new();
    assert!(matches!(
        store.read_table("students", &DatasetKind::Students.schema()),
        Err(StoreError::NotFound(_))
    ));

    let entry = StudentEntry {
        name: "Ana".into(),
        ..StudentEntry::default()
    };
    store.insert_student(&entry).unwrap();
    assert_eq!(cache.stored(&store, DatasetKind::Students).unwrap().len(), 1);

    store.insert_student(&entry).unwrap();
    assert_eq!(cache.stored(&store, DatasetKind::Students).unwrap().len(), 2);
    assert_eq!(cache.stats(), (0, 2));
}
