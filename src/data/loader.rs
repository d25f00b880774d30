use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::model::{ColumnDef, ColumnType, Dataset, Row, Schema, Value};
use super::rng::{round_to, SimpleRng};
use crate::error::DataError;
use crate::store::TabularStore;

/// Department options offered by the data-entry form.
pub const DEPARTMENTS: [&str; 5] = ["Computer Science", "Engineering", "Business", "Arts", "Science"];

/// Interest options offered by the data-entry form.
pub const INTERESTS: [&str; 10] = [
    "Programming",
    "Data Science",
    "AI/ML",
    "Web Development",
    "Mobile Apps",
    "Networking",
    "Cybersecurity",
    "Design",
    "Business Analytics",
    "Cloud Computing",
];

// ---------------------------------------------------------------------------
// DatasetKind – the three datasets the dashboard knows about
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatasetKind {
    Sales,
    Practice,
    Students,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [DatasetKind::Sales, DatasetKind::Practice, DatasetKind::Students];

    pub fn table_name(self) -> &'static str {
        match self {
            DatasetKind::Sales => "sales",
            DatasetKind::Practice => "practice",
            DatasetKind::Students => "students",
        }
    }

    /// Store file name, relative to the configured data directory.
    pub fn file_name(self) -> &'static str {
        match self {
            DatasetKind::Sales => "sales_data.db",
            DatasetKind::Practice => "practice_data.db",
            DatasetKind::Students => "students.db",
        }
    }

    pub fn schema(self) -> Schema {
        use ColumnType::*;
        match self {
            DatasetKind::Sales => Schema::new(vec![
                ColumnDef::new("Product", Text),
                ColumnDef::new("Category", Text),
                ColumnDef::new("Sales", Integer),
                ColumnDef::new("Rating", Float),
            ]),
            DatasetKind::Practice => Schema::new(vec![
                ColumnDef::new("Fruit", Text),
                ColumnDef::new("Category", Text),
                ColumnDef::new("Quantity", Integer),
                ColumnDef::new("Price", Float),
            ]),
            DatasetKind::Students => Schema::new(vec![
                ColumnDef::new("id", Integer).primary_key(),
                ColumnDef::new("name", Text).required(),
                ColumnDef::new("age", Integer),
                ColumnDef::new("grade", Float),
                ColumnDef::new("department", Text),
                ColumnDef::new("attendance", Float),
                ColumnDef::new("interests", Text),
                ColumnDef::new("submission_date", Timestamp),
            ]),
        }
    }

    /// Deterministic synthetic rows; equal seeds give equal datasets.
    pub fn generate(self, seed: u64) -> Result<Dataset, DataError> {
        let rows = match self {
            DatasetKind::Sales => sales_rows(seed),
            DatasetKind::Practice => practice_rows(),
            DatasetKind::Students => student_rows(seed),
        };
        Dataset::new(self.schema(), rows)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

impl FromStr for DatasetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sales" => Ok(DatasetKind::Sales),
            "practice" => Ok(DatasetKind::Practice),
            "students" => Ok(DatasetKind::Students),
            other => bail!("Unknown dataset: {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Synthetic generators
// ---------------------------------------------------------------------------

const SALES_ROWS: usize = 100;
const STUDENT_ROWS: usize = 60;

fn sales_rows(seed: u64) -> Vec<Row> {
    const PRODUCTS: [&str; 5] = ["Product A", "Product B", "Product C", "Product D", "Product E"];
    const CATEGORIES: [&str; 5] = ["Electronics", "Clothing", "Food", "Books", "Sports"];

    let mut rng = SimpleRng::new(seed);
    let sales: Vec<i64> = (0..SALES_ROWS).map(|_| rng.range_i64(100, 1000)).collect();
    let ratings: Vec<f64> = (0..SALES_ROWS)
        .map(|_| round_to(rng.uniform(1.0, 5.0), 1))
        .collect();

    (0..SALES_ROWS)
        .map(|i| {
            vec![
                Value::from(PRODUCTS[i % PRODUCTS.len()]),
                Value::from(CATEGORIES[i % CATEGORIES.len()]),
                Value::Integer(sales[i]),
                Value::Float(ratings[i]),
            ]
        })
        .collect()
}

fn practice_rows() -> Vec<Row> {
    const BASE: [(&str, &str, i64, f64); 5] = [
        ("Apple", "A", 10, 1.2),
        ("Banana", "B", 15, 0.5),
        ("Orange", "C", 7, 0.8),
        ("Grapes", "D", 20, 2.0),
        ("Mango", "E", 5, 1.5),
    ];
    (0..20)
        .flat_map(|_| BASE)
        .map(|(fruit, cat, qty, price)| {
            vec![
                Value::from(fruit),
                Value::from(cat),
                Value::Integer(qty),
                Value::Float(price),
            ]
        })
        .collect()
}

fn student_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 6)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap_or_default()
}

fn student_rows(seed: u64) -> Vec<Row> {
    const FIRST: [&str; 8] = ["Ana", "Ben", "Chloe", "Dev", "Elif", "Femi", "Gia", "Hugo"];
    const LAST: [&str; 6] = ["Ng", "Okafor", "Silva", "Khan", "Weber", "Lopez"];

    let mut rng = SimpleRng::new(seed);
    let epoch = student_epoch();

    (0..STUDENT_ROWS)
        .map(|i| {
            let name = format!("{} {}", rng.choose(&FIRST), rng.choose(&LAST));
            let age = rng.range_i64(18, 31);
            let grade = round_to(rng.uniform(0.0, 4.0), 1);
            let department = *rng.choose(&DEPARTMENTS);
            let attendance = round_to(rng.uniform(0.0, 100.0), 1);

            let n_interests = rng.range_i64(0, 4) as usize;
            let mut interests: Vec<&str> = Vec::new();
            while interests.len() < n_interests {
                let pick = *rng.choose(&INTERESTS);
                if !interests.contains(&pick) {
                    interests.push(pick);
                }
            }

            let minutes_back = rng.range_i64(0, 60 * 24 * 60);
            let submitted = epoch - Duration::minutes(minutes_back);

            vec![
                Value::Integer(i as i64 + 1),
                Value::Text(name),
                Value::Integer(age),
                Value::Float(grade),
                Value::from(department),
                Value::Float(attendance),
                Value::Text(interests.join(",")),
                Value::Timestamp(submitted),
            ]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Materialization
// ---------------------------------------------------------------------------

/// Where a dataset comes from.
pub enum Source<'a> {
    Synthetic { kind: DatasetKind, seed: u64 },
    Stored { store: &'a TabularStore, kind: DatasetKind },
}

/// Produce an in-memory dataset with the kind's declared schema.
pub fn materialize(source: Source<'_>) -> Result<Dataset> {
    match source {
        Source::Synthetic { kind, seed } => kind
            .generate(seed)
            .with_context(|| format!("generating {kind} dataset (seed {seed})")),
        Source::Stored { store, kind } => store
            .read_table(kind.table_name(), &kind.schema())
            .with_context(|| format!("reading table '{}'", kind.table_name())),
    }
}

/// Generate, replace the stored table, then read it back.
pub fn generate_and_persist(store: &mut TabularStore, kind: DatasetKind, seed: u64) -> Result<Dataset> {
    let generated = materialize(Source::Synthetic { kind, seed })?;
    store
        .replace_table(kind.table_name(), &generated)
        .with_context(|| format!("writing table '{}'", kind.table_name()))?;
    materialize(Source::Stored { store, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::{column_mean, value_counts};

    #[test]
    fn same_seed_same_dataset() {
        for kind in DatasetKind::ALL {
            assert_eq!(kind.generate(42).unwrap(), kind.generate(42).unwrap());
        }
        assert_ne!(
            DatasetKind::Sales.generate(1).unwrap(),
            DatasetKind::Sales.generate(2).unwrap()
        );
    }

    #[test]
    fn sales_values_follow_declared_ranges() {
        let ds = DatasetKind::Sales.generate(42).unwrap();
        assert_eq!(ds.len(), 100);
        for v in ds.numeric_column("Sales").unwrap().into_iter().flatten() {
            assert!((100.0..1000.0).contains(&v));
        }
        for v in ds.numeric_column("Rating").unwrap().into_iter().flatten() {
            assert!((1.0..=5.0).contains(&v));
        }
        assert_eq!(ds.unique_values("Category").unwrap().len(), 5);
    }

    #[test]
    fn practice_rows_repeat_twenty_times() {
        let ds = DatasetKind::Practice.generate(0).unwrap();
        assert_eq!(ds.len(), 100);
        let counts = value_counts(&ds, "Fruit").unwrap();
        assert!(counts.iter().all(|(_, n)| *n == 20));
        assert_eq!(ds.rows()[3][0], Value::from("Grapes"));
        let mean_price = column_mean(&ds, "Price").unwrap().value().unwrap();
        assert!((mean_price - 1.2).abs() < 1e-9);
    }

    #[test]
    fn students_use_form_options() {
        let ds = DatasetKind::Students.generate(42).unwrap();
        for dept in ds.unique_values("department").unwrap() {
            assert!(DEPARTMENTS.contains(&dept.as_str().unwrap()));
        }
        for v in ds.column("interests").unwrap() {
            let joined = v.as_str().unwrap();
            if !joined.is_empty() {
                assert!(joined.split(',').all(|i| INTERESTS.contains(&i)));
            }
        }
        for v in ds.numeric_column("attendance").unwrap().into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn parses_dataset_names() {
        assert_eq!("Sales".parse::<DatasetKind>().unwrap(), DatasetKind::Sales);
        assert!("inventory".parse::<DatasetKind>().is_err());
    }

    #[test]
    fn persist_then_read_round_trips() {
        let mut store = TabularStore::open_in_memory().unwrap();
        let ds = generate_and_persist(&mut store, DatasetKind::Students, 7).unwrap();
        assert_eq!(ds, DatasetKind::Students.generate(7).unwrap());
    }
}
