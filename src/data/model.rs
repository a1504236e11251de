use std::fmt;

use chrono::NaiveDateTime;

use crate::error::{SolarError, SolarResult};

/// Format used when timestamps are written back out.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Input formats accepted for the timestamp column, tried in order.
const TIMESTAMP_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
];

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the dtypes a CSV column can take.
/// Grouping code keys `BTreeMap`s by `Value`, so it must be `Ord`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    String(String),
}

// -- Manual Eq/Ord so values can be grouped and sorted --

// Equality follows `cmp`: `Integer(1) == Float(1.0)`, and floats compare
// by `total_cmp`.
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
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Timestamp(_) => 4,
                String(_) => 5,
            }
        }
        // Integers and floats compare numerically so that a `Cleaning` column
        // holding 0/1 and 0.0/1.0 groups the same way.
        match (self, other) {
            (Integer(a), Float(b)) => return (*a as f64).total_cmp(b),
            (Float(a), Integer(b)) => return a.total_cmp(&(*b as f64)),
            _ => {}
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "<null>"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:.4}"),
            Value::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
            Value::String(s) => write!(f, "{s}"),
        }
    }
}

impl Value {
    /// Guess the type of a raw text field. Empty fields are missing.
    pub fn parse_field(s: &str) -> Value {
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return if f.is_nan() { Value::Null } else { Value::Float(f) };
        }
        match s {
            "true" | "True" | "TRUE" => Value::Bool(true),
            "false" | "False" | "FALSE" => Value::Bool(false),
            _ => Value::String(s.to_string()),
        }
    }

    /// Parse a timestamp field; anything unrecognised is missing.
    pub fn parse_timestamp(s: &str) -> Value {
        let s = s.trim();
        TIMESTAMP_INPUT_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(Value::Timestamp)
            .unwrap_or(Value::Null)
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Numeric view of an already-numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) if !v.is_nan() => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Lenient numeric conversion: numbers pass through, text is trimmed and
    /// parsed. Non-finite results count as unparseable.
    pub fn coerce_f64(&self) -> Option<f64> {
        match self {
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Value::Float(v) if !v.is_finite() => None,
            other => other.as_f64(),
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Text written to a delimited output field. Missing values are empty.
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Float(v) if v.is_nan() => String::new(),
            Value::Float(v) => v.to_string(),
            Value::Timestamp(t) => t.format(TIMESTAMP_FORMAT).to_string(),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column – one named series of cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    /// Build a float column; `None` becomes a missing cell.
    pub fn from_f64(name: impl Into<String>, values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.map(Value::Float).unwrap_or(Value::Null))
            .collect();
        Column::new(name, values)
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }

    /// Per-row numeric view; non-numeric cells are `None`.
    pub fn numeric(&self) -> Vec<Option<f64>> {
        self.values.iter().map(Value::as_f64).collect()
    }

    /// Non-missing numeric values in row order.
    pub fn present_f64(&self) -> Vec<f64> {
        self.values.iter().filter_map(Value::as_f64).collect()
    }

    /// A column is numeric when every present value is an integer or float.
    /// An all-missing column counts as numeric, as a float column of NaNs would.
    pub fn is_numeric(&self) -> bool {
        self.values
            .iter()
            .filter(|v| !v.is_missing())
            .all(|v| matches!(v, Value::Integer(_) | Value::Float(_)))
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// An ordered table stored column-wise. Column order follows the input
/// header; every column holds exactly `len()` values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: usize,
}

impl Dataset {
    /// Build a dataset, checking that all columns have the same length.
    pub fn new(columns: Vec<Column>) -> SolarResult<Self> {
        let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.values.len() != rows) {
            return Err(SolarError::RaggedColumn {
                column: bad.name.clone(),
                expected: rows,
                actual: bad.values.len(),
            });
        }
        Ok(Dataset { columns, rows })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn require_column(&self, name: &str) -> SolarResult<&Column> {
        self.column(name).ok_or_else(|| SolarError::MissingColumn {
            column: name.to_string(),
        })
    }

    /// Cell at (`row`, `column`), if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column).and_then(|c| c.values.get(row))
    }

    /// Cells of one row in column order.
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    /// Add a column, replacing any existing column of the same name in place.
    pub fn push_column(&mut self, column: Column) -> SolarResult<()> {
        if !self.columns.is_empty() && column.values.len() != self.rows {
            return Err(SolarError::RaggedColumn {
                column: column.name,
                expected: self.rows,
                actual: column.values.len(),
            });
        }
        if self.columns.is_empty() {
            self.rows = column.values.len();
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Remove the named columns; unknown names are ignored.
    pub fn drop_columns(&mut self, names: &[String]) {
        self.columns.retain(|c| !names.contains(&c.name));
    }

    /// Keep rows whose mask entry is `true`, preserving order.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.rows);
        for col in &mut self.columns {
            let mut mask = keep.iter();
            col.values.retain(|_| *mask.next().unwrap_or(&false));
        }
        self.rows = keep.iter().filter(|k| **k).count();
    }

    /// New dataset holding only the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), indices.iter().map(|&i| c.values[i].clone()).collect()))
            .collect();
        Dataset {
            columns,
            rows: indices.len(),
        }
    }

    /// Stable chronological sort on a timestamp column; missing timestamps
    /// go last.
    pub fn sort_by_timestamp(&mut self, column: &str) -> SolarResult<()> {
        let keys: Vec<Option<NaiveDateTime>> = self
            .require_column(column)?
            .values
            .iter()
            .map(Value::as_timestamp)
            .collect();
        let mut order: Vec<usize> = (0..self.rows).collect();
        order.sort_by(|&a, &b| match (keys[a], keys[b]) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        *self = self.select_rows(&order);
        Ok(())
    }

    /// Stack datasets vertically. Columns are matched by name, in order of
    /// first appearance; cells a dataset lacks are missing.
    pub fn concat(parts: &[Dataset]) -> Dataset {
        let mut names: Vec<String> = Vec::new();
        for part in parts {
            for col in &part.columns {
                if !names.contains(&col.name) {
                    names.push(col.name.clone());
                }
            }
        }
        let rows: usize = parts.iter().map(Dataset::len).sum();
        let columns = names
            .into_iter()
            .map(|name| {
                let mut values = Vec::with_capacity(rows);
                for part in parts {
                    match part.column(&name) {
                        Some(c) => values.extend(c.values.iter().cloned()),
                        None => values.extend(std::iter::repeat(Value::Null).take(part.len())),
                    }
                }
                Column::new(name, values)
            })
            .collect();
        Dataset { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Column::new(
                "Timestamp",
                vec![
                    Value::parse_timestamp("2021-08-09 00:03"),
                    Value::Null,
                    Value::parse_timestamp("2021-08-09 00:01"),
                ],
            ),
            Column::from_f64("GHI", [Some(3.0), Some(1.0), None]),
        ])
        .unwrap()
    }

    #[test]
    fn parse_field_guesses_types() {
        assert_eq!(Value::parse_field(""), Value::Null);
        assert_eq!(Value::parse_field("7"), Value::Integer(7));
        assert_eq!(Value::parse_field("-1.5"), Value::Float(-1.5));
        assert_eq!(Value::parse_field("True"), Value::Bool(true));
        assert_eq!(Value::parse_field("12 W/m²"), Value::String("12 W/m²".into()));
    }

    #[test]
    fn coerce_recovers_padded_numbers_only() {
        assert_eq!(Value::String(" 4.5 ".into()).coerce_f64(), Some(4.5));
        assert_eq!(Value::String("4.5 W/m²".into()).coerce_f64(), None);
        assert_eq!(Value::String("inf".into()).coerce_f64(), None);
        assert_eq!(Value::Integer(3).coerce_f64(), Some(3.0));
        assert_eq!(Value::Bool(true).coerce_f64(), None);
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let err = Dataset::new(vec![
            Column::from_f64("a", [Some(1.0)]),
            Column::from_f64("b", [Some(1.0), Some(2.0)]),
        ])
        .unwrap_err();
        assert!(matches!(err, SolarError::RaggedColumn { .. }));
    }

    #[test]
    fn sort_puts_missing_timestamps_last() {
        let mut ds = sample();
        ds.sort_by_timestamp("Timestamp").unwrap();
        let ghi = ds.column("GHI").unwrap().numeric();
        assert_eq!(ghi, vec![None, Some(3.0), Some(1.0)]);
        assert!(ds.value(2, "Timestamp").unwrap().is_missing());
    }

    #[test]
    fn retain_rows_keeps_order() {
        let mut ds = sample();
        ds.retain_rows(&[true, false, true]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.column("GHI").unwrap().numeric(), vec![Some(3.0), None]);
    }

    #[test]
    fn concat_fills_absent_columns() {
        let a = sample();
        let b = Dataset::new(vec![Column::from_f64("DNI", [Some(9.0)])]).unwrap();
        let all = Dataset::concat(&[a, b]);
        assert_eq!(all.len(), 4);
        assert_eq!(all.column_names(), vec!["Timestamp", "GHI", "DNI"]);
        assert_eq!(all.column("DNI").unwrap().missing_count(), 3);
        assert_eq!(all.column("GHI").unwrap().missing_count(), 2);
    }

    #[test]
    fn integers_and_floats_group_together() {
        assert_eq!(Value::Integer(1).cmp(&Value::Float(1.0)), std::cmp::Ordering::Equal);
        assert!(Value::Null < Value::Integer(0));
    }

    #[test]
    fn equality_agrees_with_ordering() {
        let pairs = [
            (Value::Integer(1), Value::Float(1.0)),
            (Value::Float(f64::NAN), Value::Float(f64::NAN)),
            (Value::Integer(0), Value::Float(-0.0)),
            (Value::Null, Value::String(String::new())),
            (Value::Bool(true), Value::Integer(1)),
        ];
        for (a, b) in pairs {
            assert_eq!(a == b, a.cmp(&b) == std::cmp::Ordering::Equal, "{a:?} vs {b:?}");
        }
        assert_eq!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::Bool(true), Value::Integer(1));
    }
}
