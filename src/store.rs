//! SQLite-backed tabular store: one file per application, one table per dataset.
//!
//! Writes replace a whole table (drop, create, bulk insert) inside a single
//! transaction; the data-entry path inserts one row at a time. Every write
//! bumps a per-table revision counter kept in [`REVISIONS_TABLE`], which the
//! dataset cache uses to detect rewrites. Each store file also carries a
//! creation-time identity in [`META_TABLE`], so a file that is deleted and
//! recreated is never mistaken for the one it replaced.
//!
//! Known limitation: there is no coordination between processes. Two
//! processes writing the same file concurrently may interleave replace
//! operations or leave the revision counter out of step with the table.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};

use crate::data::model::{ColumnDef, ColumnType, Dataset, Row, Schema, Value, STORAGE_TIMESTAMP_FORMAT};
use crate::error::{StoreError, StoreResult};

/// Bookkeeping table holding one revision counter per data table.
pub const REVISIONS_TABLE: &str = "_table_revisions";
/// Key/value bookkeeping for the store itself (currently only `store_id`).
pub const META_TABLE: &str = "_store_meta";

static STORES_CREATED: AtomicU64 = AtomicU64::new(0);

/// Identity for a freshly created store: creation time, process and a
/// per-process sequence number.
fn new_store_id() -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = STORES_CREATED.fetch_add(1, Ordering::Relaxed);
    format!("{nanos:x}-{:x}-{seq}", std::process::id())
}

// ---------------------------------------------------------------------------
// Value <-> SQLite
// ---------------------------------------------------------------------------

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Timestamp(t) => {
                ToSqlOutput::Owned(SqlValue::Text(t.format(STORAGE_TIMESTAMP_FORMAT).to_string()))
            }
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
        })
    }
}

/// Coerce a raw SQLite cell into the declared column type.
fn coerce(raw: ValueRef<'_>, col: &ColumnDef) -> Result<Value, String> {
    let value = match (raw, col.kind) {
        (ValueRef::Null, _) => Value::Null,
        (ValueRef::Integer(i), ColumnType::Integer) => Value::Integer(i),
        (ValueRef::Integer(i), ColumnType::Float) => Value::Float(i as f64),
        (ValueRef::Integer(i), ColumnType::Text) => Value::Text(i.to_string()),
        (ValueRef::Real(f), ColumnType::Float) => Value::Float(f),
        (ValueRef::Real(f), ColumnType::Integer) if f.fract() == 0.0 => Value::Integer(f as i64),
        (ValueRef::Real(f), ColumnType::Text) => Value::Text(f.to_string()),
        (ValueRef::Text(bytes), kind) => {
            let s = std::str::from_utf8(bytes).map_err(|e| format!("invalid UTF-8: {e}"))?;
            Value::parse_as(kind, s)?
        }
        (other, kind) => {
            return Err(format!("cannot read {:?} as {kind}", other.data_type()));
        }
    };
    if value.is_null() && !col.nullable {
        return Err("null in a non-null column".to_string());
    }
    Ok(value)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_sql(col: &ColumnDef) -> String {
    let mut sql = format!("{} {}", quote_ident(&col.name), col.kind.sql_type());
    if col.primary_key {
        sql.push_str(" PRIMARY KEY AUTOINCREMENT");
    } else if !col.nullable {
        sql.push_str(" NOT NULL");
    }
    sql
}

fn create_table_sql(table: &str, schema: &Schema, if_not_exists: bool) -> String {
    let columns: Vec<String> = schema.columns.iter().map(column_sql).collect();
    format!(
        "CREATE TABLE {}{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        quote_ident(table),
        columns.join(", ")
    )
}

fn insert_sql(table: &str, columns: &[&ColumnDef]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders.join(", ")
    )
}

fn bump_revision(conn: &Connection, table: &str) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {REVISIONS_TABLE} (table_name, revision) VALUES (?1, 1)
             ON CONFLICT(table_name) DO UPDATE SET revision = revision + 1"
        ),
        params![table],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// TabularStore
// ---------------------------------------------------------------------------

/// An open store file. The connection closes when the store is dropped, so
/// scoping a `TabularStore` to one pipeline run releases it on every exit path.
pub struct TabularStore {
    conn: Connection,
    path: Option<PathBuf>,
    id: String,
}

impl TabularStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        log::debug!("opening store {}", path.display());
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {REVISIONS_TABLE} (
                table_name TEXT PRIMARY KEY,
                revision INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {META_TABLE} (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );"
        ))?;
        conn.execute(
            &format!("INSERT OR IGNORE INTO {META_TABLE} (key, value) VALUES ('store_id', ?1)"),
            params![new_store_id()],
        )?;
        let id: String = conn.query_row(
            &format!("SELECT value FROM {META_TABLE} WHERE key = 'store_id'"),
            [],
            |row| row.get(0),
        )?;
        log::debug!("store id {id}");
        Ok(TabularStore { conn, path, id })
    }

    /// File backing this store; `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Identity assigned when the store was first created. Stable across
    /// reopening the same file; distinct for every in-memory store.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn table_exists(&self, table: &str) -> StoreResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_schema WHERE type = 'table' AND name = ?1",
                params![table],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Monotonic write counter for `table`; 0 if it was never written through this store.
    pub fn revision(&self, table: &str) -> StoreResult<u64> {
        let rev: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT revision FROM {REVISIONS_TABLE} WHERE table_name = ?1"),
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rev.unwrap_or(0).max(0) as u64)
    }

    /// Replace the entire contents of `table` with `dataset` (truncate-then-insert).
    pub fn replace_table(&mut self, table: &str, dataset: &Dataset) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))?;
        tx.execute_batch(&create_table_sql(table, dataset.schema(), false))?;
        {
            let columns: Vec<&ColumnDef> = dataset.schema().columns.iter().collect();
            let mut stmt = tx.prepare(&insert_sql(table, &columns))?;
            for row in dataset.rows() {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        bump_revision(&tx, table)?;
        tx.commit()?;
        log::info!("replaced table '{table}' with {} rows", dataset.len());
        Ok(())
    }

    /// Create `table` from `schema` unless it already exists.
    pub fn ensure_table(&self, table: &str, schema: &Schema) -> StoreResult<()> {
        self.conn.execute_batch(&create_table_sql(table, schema, true))?;
        Ok(())
    }

    /// Insert one row. Columns not listed (e.g. the auto-increment key) take
    /// their SQL default. Returns the new row id.
    pub fn insert_row(&mut self, table: &str, schema: &Schema, values: &[(&str, Value)]) -> StoreResult<i64> {
        let columns = values
            .iter()
            .map(|(name, _)| schema.column(name))
            .collect::<Result<Vec<_>, _>>()?;
        for (col, (_, value)) in columns.iter().zip(values) {
            if !value.conforms_to(col.kind) || (value.is_null() && !col.nullable) {
                return Err(StoreError::SchemaMismatch {
                    table: table.to_string(),
                    column: col.name.clone(),
                    detail: format!("{value:?} does not fit {}", col.kind),
                });
            }
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            &insert_sql(table, &columns),
            params_from_iter(values.iter().map(|(_, v)| v)),
        )?;
        let id = tx.last_insert_rowid();
        bump_revision(&tx, table)?;
        tx.commit()?;
        log::info!("inserted row {id} into '{table}'");
        Ok(id)
    }

    /// Read every row of `table` in natural order, coerced to `schema`.
    pub fn read_table(&self, table: &str, schema: &Schema) -> StoreResult<Dataset> {
        if !self.table_exists(table)? {
            return Err(StoreError::NotFound(table.to_string()));
        }
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
        let stored_names: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();

        let positions = schema
            .columns
            .iter()
            .map(|col| {
                stored_names
                    .iter()
                    .position(|n| n == &col.name)
                    .ok_or_else(|| StoreError::SchemaMismatch {
                        table: table.to_string(),
                        column: col.name.clone(),
                        detail: "column missing from stored table".to_string(),
                    })
            })
            .collect::<StoreResult<Vec<usize>>>()?;

        let mut out: Vec<Row> = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(schema.len());
            for (col, &pos) in schema.columns.iter().zip(&positions) {
                let value = coerce(row.get_ref(pos)?, col).map_err(|detail| StoreError::SchemaMismatch {
                    table: table.to_string(),
                    column: col.name.clone(),
                    detail: format!("row {}: {detail}", out.len()),
                })?;
                values.push(value);
            }
            out.push(values);
        }
        log::debug!("read {} rows from '{table}'", out.len());
        Ok(Dataset::new(schema.clone(), out)?)
    }

    /// Close the connection, surfacing any error instead of ignoring it on drop.
    pub fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("id", ColumnType::Integer).primary_key(),
            ColumnDef::new("name", ColumnType::Text).required(),
            ColumnDef::new("score", ColumnType::Float),
        ])
    }

    #[test]
    fn create_sql_declares_keys_and_constraints() {
        let sql = create_table_sql("t", &schema(), true);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"t\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"name\" TEXT NOT NULL, \"score\" REAL)"
        );
    }

    #[test]
    fn reading_a_missing_table_is_not_found() {
        let store = TabularStore::open_in_memory().unwrap();
        let err = store.read_table("nope", &schema()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(t) if t == "nope"));
    }

    #[test]
    fn text_cells_are_coerced_to_declared_types() {
        let store = TabularStore::open_in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TABLE raw (id TEXT, name TEXT, score TEXT);
                 INSERT INTO raw VALUES ('1', 'a', '2.5');
                 INSERT INTO raw VALUES ('2', 'b', '');",
            )
            .unwrap();
        let ds = store.read_table("raw", &schema()).unwrap();
        assert_eq!(ds.rows()[0], vec![Value::Integer(1), Value::from("a"), Value::Float(2.5)]);
        assert_eq!(ds.rows()[1][2], Value::Null);
    }

    #[test]
    fn unparseable_cells_are_schema_mismatches() {
        let store = TabularStore::open_in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TABLE raw (id INTEGER, name TEXT, score TEXT);
                 INSERT INTO raw VALUES (1, 'a', 'high');",
            )
            .unwrap();
        let err = store.read_table("raw", &schema()).unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { column, .. } if column == "score"));
    }

    #[test]
    fn missing_columns_are_schema_mismatches() {
        let store = TabularStore::open_in_memory().unwrap();
        store.conn.execute_batch("CREATE TABLE raw (id INTEGER);").unwrap();
        assert!(matches!(
            store.read_table("raw", &schema()),
            Err(StoreError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn every_write_bumps_the_revision() {
        let mut store = TabularStore::open_in_memory().unwrap();
        assert_eq!(store.revision("t").unwrap(), 0);
        let ds = Dataset::new(
            schema(),
            vec![vec![Value::Integer(1), Value::from("a"), Value::Float(1.0)]],
        )
        .unwrap();
        store.replace_table("t", &ds).unwrap();
        assert_eq!(store.revision("t").unwrap(), 1);
        store
            .insert_row("t", &schema(), &[("name", Value::from("b"))])
            .unwrap();
        assert_eq!(store.revision("t").unwrap(), 2);
    }

    #[test]
    fn store_id_is_per_store() {
        let a = TabularStore::open_in_memory().unwrap();
        let b = TabularStore::open_in_memory().unwrap();
        assert_ne!(a.id(), b.id());
        assert!(a.table_exists(META_TABLE).unwrap());
    }

    #[test]
    fn insert_rejects_null_in_required_column() {
        let mut store = TabularStore::open_in_memory().unwrap();
        store.ensure_table("t", &schema()).unwrap();
        let err = store
            .insert_row("t", &schema(), &[("name", Value::Null)])
            .unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { .. }));
        assert!(store.read_table("t", &schema()).unwrap().is_empty());
    }
}
