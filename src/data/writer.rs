use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use super::model::{Column, Dataset, Value};
use super::table::Table;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    Ok(())
}

/// Write a dataset as CSV with a header row. Missing cells are empty fields
/// and timestamps use [`super::model::TIMESTAMP_FORMAT`].
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    ensure_parent(path)?;
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer
        .write_record(dataset.column_names())
        .context("writing CSV header")?;
    for row in 0..dataset.len() {
        writer
            .write_record(dataset.row(row).iter().map(|v| v.to_field()))
            .with_context(|| format!("writing CSV row {row}"))?;
    }
    writer.flush().context("flushing CSV")?;
    log::info!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

/// Write a report table: label column first, then one column per statistic.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    ensure_parent(path)?;
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    let header = std::iter::once(table.index_name.as_str())
        .chain(table.columns.iter().map(String::as_str));
    writer.write_record(header).context("writing CSV header")?;
    for row in &table.rows {
        let fields = std::iter::once(row.label.clone()).chain(
            row.values
                .iter()
                .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
        );
        writer
            .write_record(fields)
            .with_context(|| format!("writing row '{}'", row.label))?;
    }
    writer.flush().context("flushing CSV")?;
    log::info!("Wrote report {}", path.display());
    Ok(())
}

/// Write a dataset as a single-batch Parquet file.
///
/// Each column gets the narrowest Arrow type holding all of its present
/// values: timestamp, boolean, int64, float64, falling back to text (also
/// used for columns with no values at all).
pub fn write_parquet(path: &Path, dataset: &Dataset) -> Result<()> {
    ensure_parent(path)?;
    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = dataset.columns().iter().map(arrow_column).unzip();
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    log::info!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

fn arrow_column(column: &Column) -> (Field, ArrayRef) {
    let present = || column.values.iter().filter(|v| !v.is_missing());
    let any = present().next().is_some();
    let (data_type, array): (DataType, ArrayRef) = if any && present().all(|v| matches!(v, Value::Timestamp(_))) {
        let micros: Vec<Option<i64>> = column
            .values
            .iter()
            .map(|v| v.as_timestamp().map(|t| t.and_utc().timestamp_micros()))
            .collect();
        (
            DataType::Timestamp(TimeUnit::Microsecond, None),
            Arc::new(TimestampMicrosecondArray::from(micros)),
        )
    } else if any && present().all(|v| matches!(v, Value::Bool(_))) {
        let bools: Vec<Option<bool>> = column
            .values
            .iter()
            .map(|v| match v {
                Value::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        (DataType::Boolean, Arc::new(BooleanArray::from(bools)))
    } else if any && present().all(|v| matches!(v, Value::Integer(_))) {
        let ints: Vec<Option<i64>> = column
            .values
            .iter()
            .map(|v| match v {
                Value::Integer(i) => Some(*i),
                _ => None,
            })
            .collect();
        (DataType::Int64, Arc::new(Int64Array::from(ints)))
    } else if any && present().all(|v| v.as_f64().is_some()) {
        (DataType::Float64, Arc::new(Float64Array::from(column.numeric())))
    } else {
        let text: Vec<Option<String>> = column
            .values
            .iter()
            .map(|v| (!v.is_missing()).then(|| v.to_field()))
            .collect();
        (DataType::Utf8, Arc::new(StringArray::from(text)))
    };
    (Field::new(&column.name, data_type, true), array)
}

/// Pretty-printed JSON (run manifests, test results).
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let text = serde_json::to_string_pretty(value).context("serializing JSON")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{load_file, TIMESTAMP_COLUMN};
    use crate::data::model::{Column, Value};

    #[test]
    fn dataset_survives_a_write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("benin_clean.csv");
        let ds = Dataset::new(vec![
            Column::new(
                "Timestamp",
                vec![Value::parse_timestamp("2021-08-09 00:01:00"), Value::Null],
            ),
            Column::from_f64("GHI", [Some(1.5), None]),
            Column::new("Comments", vec![Value::String("a, b".into()), Value::Null]),
        ])
        .unwrap();

        write_dataset(&path, &ds).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Timestamp,GHI,Comments\n2021-08-09 00:01:00,1.5,\"a, b\"\n"));

        let back = load_file(&path, Some(TIMESTAMP_COLUMN)).unwrap().dataset;
        assert_eq!(back, ds);
    }

    #[test]
    fn parquet_keeps_column_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("togo_raw.parquet");
        let ds = Dataset::new(vec![
            Column::new(
                "Timestamp",
                vec![
                    Value::parse_timestamp("2021-10-25 00:01:00"),
                    Value::parse_timestamp("2021-10-25 00:02:00"),
                ],
            ),
            Column::from_f64("GHI", [Some(-1.3), None]),
            Column::new("Cleaning", vec![Value::Integer(0), Value::Integer(1)]),
            Column::new("Comments", vec![Value::Null, Value::String("W/m²".into())]),
        ])
        .unwrap();

        write_parquet(&path, &ds).unwrap();
        let back = load_file(&path, Some(TIMESTAMP_COLUMN)).unwrap().dataset;
        assert_eq!(back, ds);
    }

    #[test]
    fn table_writes_label_column_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let mut table = Table::new("column", vec!["Missing Count".into(), "Percent Missing".into()]);
        table.push_row("GHI", vec![Some(2.0), Some(50.0)]);
        table.push_row("DNI", vec![Some(0.0), None]);
        write_table(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "column,Missing Count,Percent Missing\nGHI,2,50\nDNI,0,\n"
        );
    }
}
