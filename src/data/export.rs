use std::path::Path;

use anyhow::{Context, Result};

use super::model::{Dataset, Value};

/// File name offered by the dashboard's download button.
pub const FILTERED_EXPORT_NAME: &str = "filtered_student_data.csv";

/// One CSV field. Whole floats keep a decimal place so float columns stay
/// recognisable (`3.0`, not `3`).
fn csv_field(value: &Value) -> String {
    match value {
        Value::Float(x) if x.is_finite() && x.fract() == 0.0 => format!("{x:.1}"),
        other => other.to_string(),
    }
}

/// Render `dataset` as UTF-8 CSV: header row first, no index column.
/// Nulls become empty fields; timestamps use `YYYY-MM-DD HH:MM:SS`.
pub fn to_csv_bytes(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(dataset.schema().names())
        .context("writing CSV header")?;
    for (i, row) in dataset.rows().iter().enumerate() {
        writer
            .write_record(row.iter().map(csv_field))
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV buffer: {}", e.error()))
}

pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let bytes = to_csv_bytes(dataset)?;
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!("exported {} rows to {}", dataset.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ColumnDef, ColumnType, Schema, Value};

    #[test]
    fn csv_has_header_and_no_index() {
        let schema = Schema::new(vec![
            ColumnDef::new("name", ColumnType::Text),
            ColumnDef::new("grade", ColumnType::Float),
            ColumnDef::new("interests", ColumnType::Text),
        ]);
        let ds = Dataset::new(
            schema,
            vec![
                vec![Value::from("Ana"), Value::Float(3.5), Value::from("AI/ML,Design")],
                vec![Value::from("Ben"), Value::Null, Value::from("")],
                vec![Value::from("Cy"), Value::Float(3.0), Value::from("Music")],
            ],
        )
        .unwrap();
        let text = String::from_utf8(to_csv_bytes(&ds).unwrap()).unwrap();
        assert_eq!(
            text,
            "name,grade,interests\nAna,3.5,\"AI/ML,Design\"\nBen,,\nCy,3.0,Music\n"
        );
    }

    #[test]
    fn empty_dataset_still_has_header() {
        let schema = Schema::new(vec![ColumnDef::new("a", ColumnType::Integer)]);
        let text = String::from_utf8(to_csv_bytes(&Dataset::empty(schema)).unwrap()).unwrap();
        assert_eq!(text, "a\n");
    }
}
