use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDateTime;

use crate::error::DataError;

/// Text layout used for timestamps in tables and exports.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Format written to the store. Sub-second digits appear only when present.
pub const STORAGE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Used as a `BTreeMap` / `BTreeSet` key downstream so `Value` must be `Ord`.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Float(_) => 2,
                Text(_) => 3,
                Timestamp(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Timestamp(t) => t.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
            Value::Null => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl Value {
    /// Interpret the value as an `f64` (numeric columns only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value may be stored in a column of type `kind`.
    pub fn conforms_to(&self, kind: ColumnType) -> bool {
        matches!(
            (self, kind),
            (Value::Null, _)
                | (Value::Text(_), ColumnType::Text)
                | (Value::Integer(_), ColumnType::Integer)
                | (Value::Float(_), ColumnType::Float)
                | (Value::Timestamp(_), ColumnType::Timestamp)
        )
    }

    /// Parse a textual cell into the declared column type.
    ///
    /// Empty text becomes `Null` for every type except `Text`.
    pub fn parse_as(kind: ColumnType, raw: &str) -> Result<Value, String> {
        let trimmed = raw.trim();
        if kind != ColumnType::Text && trimmed.is_empty() {
            return Ok(Value::Null);
        }
        match kind {
            ColumnType::Text => Ok(Value::Text(raw.to_string())),
            ColumnType::Integer => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| format!("'{raw}' is not an integer: {e}")),
            ColumnType::Float => trimmed
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("'{raw}' is not a number: {e}")),
            ColumnType::Timestamp => parse_timestamp(trimmed)
                .map(Value::Timestamp)
                .ok_or_else(|| format!("'{raw}' is not a timestamp")),
        }
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, the ISO `T` separator and fractional seconds.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Timestamp,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// SQLite column affinity used when creating tables.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Text | ColumnType::Timestamp => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "REAL",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Timestamp => "timestamp",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnType,
    pub nullable: bool,
    /// Auto-incrementing integer primary key.
    pub primary_key: bool,
}

impl ColumnDef {
    pub fn new(name: &str, kind: ColumnType) -> Self {
        ColumnDef {
            name: name.to_string(),
            kind,
            nullable: true,
            primary_key: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

/// Ordered list of `(column name, semantic type)` declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Schema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Result<usize, DataError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| DataError::UnknownColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&ColumnDef, DataError> {
        self.index_of(name).map(|i| &self.columns[i])
    }

    /// Names of the integer / float columns in declaration order, primary key excluded.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.kind.is_numeric() && !c.primary_key)
            .map(|c| c.name.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Dataset – the materialized table
// ---------------------------------------------------------------------------

/// One row, aligned with the dataset's schema.
pub type Row = Vec<Value>;

/// An ordered, typed, in-memory table with a pre-computed distinct-value index.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Row>,
    /// For each column the sorted set of distinct observed values.
    unique_values: BTreeMap<String, BTreeSet<Value>>,
}

impl Dataset {
    /// Validate rows against the schema and build the column indices.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self, DataError> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(DataError::RowShape {
                    row: i,
                    detail: format!("expected {} values, found {}", schema.len(), row.len()),
                });
            }
            for (col, val) in schema.columns.iter().zip(row) {
                if val.is_null() && !col.nullable {
                    return Err(DataError::RowShape {
                        row: i,
                        detail: format!("column '{}' must not be null", col.name),
                    });
                }
                if !val.conforms_to(col.kind) {
                    return Err(DataError::RowShape {
                        row: i,
                        detail: format!("column '{}' expects {}, found {val:?}", col.name, col.kind),
                    });
                }
            }
        }
        Ok(Self::from_validated(schema, rows))
    }

    /// An empty dataset with the given schema.
    pub fn empty(schema: Schema) -> Self {
        Self::from_validated(schema, Vec::new())
    }

    fn from_validated(schema: Schema, rows: Vec<Row>) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<Value>> = schema
            .names()
            .map(|n| (n.to_string(), BTreeSet::new()))
            .collect();

        for row in &rows {
            for (col, val) in schema.columns.iter().zip(row) {
                if let Some(set) = unique_values.get_mut(&col.name) {
                    set.insert(val.clone());
                }
            }
        }
        Dataset {
            schema,
            rows,
            unique_values,
        }
    }

    /// A new dataset holding the rows at `indices`, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        let rows = indices
            .iter()
            .filter_map(|&i| self.rows.get(i).cloned())
            .collect();
        Self::from_validated(self.schema.clone(), rows)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Sorted distinct values observed in `column`.
    pub fn unique_values(&self, column: &str) -> Option<&BTreeSet<Value>> {
        self.unique_values.get(column)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema.names().map(str::to_string).collect()
    }

    /// Iterate over one column's cells.
    pub fn column<'a>(&'a self, name: &str) -> Result<impl Iterator<Item = &'a Value> + 'a, DataError> {
        let idx = self.schema.index_of(name)?;
        Ok(self.rows.iter().map(move |r| &r[idx]))
    }

    /// A numeric column as `Option<f64>` per row (`None` for nulls).
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>, DataError> {
        let def = self.schema.column(name)?;
        if !def.kind.is_numeric() {
            return Err(DataError::TypeMismatch {
                column: name.to_string(),
                expected: "a numeric column",
                actual: def.kind,
            });
        }
        Ok(self.column(name)?.map(Value::as_f64).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("name", ColumnType::Text).required(),
            ColumnDef::new("grade", ColumnType::Float),
        ])
    }

    #[test]
    fn rejects_rows_with_wrong_width() {
        let err = Dataset::new(schema(), vec![vec![Value::from("a")]]).unwrap_err();
        assert!(matches!(err, DataError::RowShape { row: 0, .. }));
    }

    #[test]
    fn rejects_values_of_the_wrong_type() {
        let err = Dataset::new(schema(), vec![vec![Value::from("a"), Value::from("x")]]).unwrap_err();
        assert!(matches!(err, DataError::RowShape { .. }));
    }

    #[test]
    fn rejects_null_in_required_column() {
        let err = Dataset::new(schema(), vec![vec![Value::Null, Value::Float(1.0)]]).unwrap_err();
        assert!(matches!(err, DataError::RowShape { .. }));
    }

    #[test]
    fn builds_unique_value_index() {
        let ds = Dataset::new(
            schema(),
            vec![
                vec![Value::from("b"), Value::Float(2.0)],
                vec![Value::from("a"), Value::Float(2.0)],
                vec![Value::from("b"), Value::Null],
            ],
        )
        .unwrap();
        let names: Vec<_> = ds.unique_values["name"].iter().cloned().collect();
        assert_eq!(names, vec![Value::from("a"), Value::from("b")]);
        assert_eq!(ds.unique_values["grade"].len(), 2);
    }

    #[test]
    fn parses_typed_cells() {
        assert_eq!(Value::parse_as(ColumnType::Integer, "20").unwrap(), Value::Integer(20));
        assert_eq!(Value::parse_as(ColumnType::Float, " 3.5").unwrap(), Value::Float(3.5));
        assert_eq!(Value::parse_as(ColumnType::Float, "").unwrap(), Value::Null);
        assert_eq!(Value::parse_as(ColumnType::Text, "").unwrap(), Value::from(""));
        let ts = Value::parse_as(ColumnType::Timestamp, "2024-03-01 10:15:00").unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 10:15:00");
        assert!(Value::parse_as(ColumnType::Integer, "abc").is_err());
    }

    #[test]
    fn numeric_column_rejects_text() {
        let ds = Dataset::empty(schema());
        assert!(matches!(
            ds.numeric_column("name"),
            Err(DataError::TypeMismatch { .. })
        ));
    }
}
