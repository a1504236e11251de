use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit, TimestampMicrosecondType,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::model::{Column, Dataset, Value};
use crate::error::SolarError;

/// Column parsed as a timestamp and used for chronological ordering.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Text encoding a file was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// A dataset together with how it was read.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub dataset: Dataset,
    pub encoding: TextEncoding,
}

// ---------------------------------------------------------------------------
// Labelled loader
// ---------------------------------------------------------------------------

/// Loads one country's measurement file: parses the timestamp column and
/// sorts rows chronologically. The country is configuration, not a type.
#[derive(Debug, Clone)]
pub struct LabeledLoader {
    country: String,
    path: PathBuf,
    timestamp_column: String,
}

impl LabeledLoader {
    pub fn new(country: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        LabeledLoader {
            country: country.into(),
            path: path.into(),
            timestamp_column: TIMESTAMP_COLUMN.to_string(),
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<LoadedTable> {
        let mut loaded = load_file(&self.path, Some(&self.timestamp_column))?;
        if loaded.dataset.column(&self.timestamp_column).is_some() {
            loaded.dataset.sort_by_timestamp(&self.timestamp_column)?;
        } else {
            log::warn!(
                "{}: no '{}' column in {}; keeping file order",
                self.country,
                self.timestamp_column,
                self.path.display()
            );
        }
        log::info!(
            "{} data loaded from {}: {} rows x {} columns ({:?})",
            self.country,
            self.path.display(),
            loaded.dataset.len(),
            loaded.dataset.columns().len(),
            loaded.encoding
        );
        log::debug!("columns: {:?}", loaded.dataset.column_names());
        Ok(loaded)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` (and anything unrecognised) – header row, one record per line
/// * `.parquet` – flat columns of numbers, strings, booleans or timestamps
/// * `.json`    – `[{ "Timestamp": "...", "GHI": 1.0, ... }, ...]`
///
/// A path that does not exist fails with [`SolarError::MissingInput`].
pub fn load_file(path: &Path, timestamp_column: Option<&str>) -> Result<LoadedTable> {
    if !path.exists() {
        return Err(SolarError::MissingInput {
            path: path.to_path_buf(),
        }
        .into());
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, timestamp_column),
        "json" => load_json(path, timestamp_column),
        _ => load_csv(path, timestamp_column),
    }
}

/// Decode bytes as UTF-8, falling back to Latin-1 (every byte is one char).
pub fn decode_text(bytes: Vec<u8>) -> (String, TextEncoding) {
    match String::from_utf8(bytes) {
        Ok(text) => (text, TextEncoding::Utf8),
        Err(err) => {
            let text = err.into_bytes().into_iter().map(char::from).collect();
            (text, TextEncoding::Latin1)
        }
    }
}

/// Read a file fully and decode it. The handle is closed before decoding.
fn read_text(path: &Path) -> Result<(String, TextEncoding)> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (text, encoding) = decode_text(bytes);
    if encoding == TextEncoding::Latin1 {
        log::warn!(
            "Encoding issue in {}. Retried with latin1",
            path.display()
        );
    }
    Ok((text, encoding))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path, timestamp_column: Option<&str>) -> Result<LoadedTable> {
    let (text, encoding) = read_text(path)?;
    let dataset = parse_csv(&text, timestamp_column)
        .with_context(|| format!("parsing CSV {}", path.display()))?;
    Ok(LoadedTable { dataset, encoding })
}

/// Parse CSV text with a header row. The timestamp column is parsed as a
/// timestamp; every other field has its type guessed.
pub fn parse_csv(text: &str, timestamp_column: Option<&str>) -> Result<Dataset> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let ts_idx = timestamp_column.and_then(|name| headers.iter().position(|h| h == name));
    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    let mut bad_timestamps = 0usize;

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, field) in record.iter().enumerate() {
            let value = if Some(col_idx) == ts_idx {
                let ts = Value::parse_timestamp(field);
                if ts.is_missing() && !field.trim().is_empty() {
                    bad_timestamps += 1;
                }
                ts
            } else {
                Value::parse_field(field)
            };
            columns[col_idx].push(value);
        }
    }

    if bad_timestamps > 0 {
        log::warn!("{bad_timestamps} unparseable timestamps treated as missing");
    }

    let columns = headers
        .into_iter()
        .zip(columns)
        .map(|(name, values)| Column::new(name, values))
        .collect();
    Ok(Dataset::new(columns)?)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Timestamp": "2021-08-09 00:01", "GHI": -1.2, "DNI": 0.0, ... },
///   ...
/// ]
/// ```
///
/// Columns appear in order of first occurrence across records; keys a record
/// lacks are missing.
fn load_json(path: &Path, timestamp_column: Option<&str>) -> Result<LoadedTable> {
    let (text, encoding) = read_text(path)?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut names: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let columns = names
        .into_iter()
        .map(|name| {
            let is_ts = timestamp_column == Some(name.as_str());
            let values = records
                .iter()
                .map(|rec| {
                    rec.get(&name)
                        .map(|v| json_to_value(v, is_ts))
                        .unwrap_or(Value::Null)
                })
                .collect();
            Column::new(name, values)
        })
        .collect();

    Ok(LoadedTable {
        dataset: Dataset::new(columns)?,
        encoding,
    })
}

fn json_to_value(val: &JsonValue, timestamp: bool) -> Value {
    match val {
        JsonValue::String(s) if timestamp => Value::parse_timestamp(s),
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per field.
///
/// Numeric, boolean, string and timestamp/date columns are supported; other
/// types are kept as their debug string. Works with files written by both
/// **Pandas** (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path, timestamp_column: Option<&str>) -> Result<LoadedTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, name) in names.iter().enumerate() {
            let is_ts = timestamp_column == Some(name.as_str());
            extend_from_array(&mut columns[col_idx], batch.column(col_idx), is_ts)
                .with_context(|| format!("reading column '{name}'"))?;
        }
    }

    let columns = names
        .into_iter()
        .zip(columns)
        .map(|(name, values)| Column::new(name, values))
        .collect();
    Ok(LoadedTable {
        dataset: Dataset::new(columns)?,
        encoding: TextEncoding::Utf8,
    })
}

// -- Parquet / Arrow helpers --

/// Append every row of an Arrow column as [`Value`]s.
fn extend_from_array(out: &mut Vec<Value>, col: &ArrayRef, timestamp: bool) -> Result<()> {
    match col.data_type() {
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => {
            let micros = cast(col, &DataType::Timestamp(TimeUnit::Microsecond, None))
                .context("casting to timestamp")?;
            let arr = micros.as_primitive::<TimestampMicrosecondType>();
            for row in 0..arr.len() {
                let value = if arr.is_null(row) {
                    Value::Null
                } else {
                    arr.value_as_datetime(row)
                        .map(Value::Timestamp)
                        .unwrap_or(Value::Null)
                };
                out.push(value);
            }
        }
        _ => {
            for row in 0..col.len() {
                out.push(extract_value(col, row, timestamp));
            }
        }
    }
    Ok(())
}

/// Extract a single value from a non-temporal Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize, timestamp: bool) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    let text = match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().value(row),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row),
        DataType::Int32 => return Value::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => return Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => {
            return Value::Float(col.as_primitive::<Float32Type>().value(row) as f64)
        }
        DataType::Float64 => {
            let v = col.as_primitive::<Float64Type>().value(row);
            return if v.is_nan() { Value::Null } else { Value::Float(v) };
        }
        DataType::Boolean => return Value::Bool(col.as_boolean().value(row)),
        other => return Value::String(format!("{other:?}")),
    };
    if timestamp {
        Value::parse_timestamp(text)
    } else {
        Value::String(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const RAW: &str = "Timestamp,GHI,DNI,Cleaning\n\
                       2021-08-09 00:03,3.1,0.0,0\n\
                       2021-08-09 00:01,-1.2,12 W/m²,0\n\
                       2021-08-09 00:02,,0.5,1\n";

    fn write_temp(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn csv_loads_sorted_with_typed_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "benin.csv", RAW.as_bytes());
        let loaded = LabeledLoader::new("Benin", &path).load().unwrap();
        let ds = &loaded.dataset;

        assert_eq!(loaded.encoding, TextEncoding::Utf8);
        assert_eq!(ds.len(), 3);
        assert_eq!(
            ds.column("GHI").unwrap().values,
            vec![Value::Float(-1.2), Value::Null, Value::Float(3.1)]
        );
        assert_eq!(ds.value(0, "DNI"), Some(&Value::String("12 W/m²".into())));
        assert_eq!(ds.value(1, "Cleaning"), Some(&Value::Integer(1)));
        assert!(matches!(ds.value(0, "Timestamp"), Some(Value::Timestamp(_))));
    }

    #[test]
    fn latin1_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        // 0xB0 is '°' in Latin-1 and invalid as a lone UTF-8 byte.
        let mut bytes = b"Timestamp,Tamb,Comments\n2021-08-09 00:01,25.5,".to_vec();
        bytes.extend_from_slice(&[b'3', b'0', 0xB0, b'C', b'\n']);
        let path = write_temp(&dir, "togo.csv", &bytes);

        let loaded = load_file(&path, Some(TIMESTAMP_COLUMN)).unwrap();
        assert_eq!(loaded.encoding, TextEncoding::Latin1);
        assert_eq!(
            loaded.dataset.value(0, "Comments"),
            Some(&Value::String("30°C".into()))
        );
    }

    #[test]
    fn missing_file_is_reported_as_missing_input() {
        let err = load_file(Path::new("/definitely/not/here.csv"), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SolarError>(),
            Some(SolarError::MissingInput { .. })
        ));
    }

    #[test]
    fn ragged_csv_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "bad.csv", b"a,b\n1,2\n3\n");
        assert!(load_file(&path, None).is_err());
    }

    #[test]
    fn json_records_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "sl.json",
            br#"[{"Timestamp": "2021-08-09 00:01", "GHI": 5}, {"GHI": 2.5, "WS": 1.0}]"#,
        );
        let ds = load_file(&path, Some(TIMESTAMP_COLUMN)).unwrap().dataset;
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(0, "GHI"), Some(&Value::Integer(5)));
        assert_eq!(ds.value(0, "WS"), Some(&Value::Null));
        assert_eq!(ds.value(1, "Timestamp"), Some(&Value::Null));
    }
}
