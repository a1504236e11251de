use std::fmt;

/// A derived report table: one labelled row per column or group, with named
/// float columns. Missing statistics are `None` and written as empty fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Header of the label column (e.g. "column" or "country").
    pub index_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

impl Table {
    pub fn new(index_name: impl Into<String>, columns: Vec<String>) -> Self {
        Table {
            index_name: index_name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, label: impl Into<String>, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push(TableRow {
            label: label.into(),
            values,
        });
    }

    /// Look up a single cell by row label and column name.
    pub fn get(&self, label: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|r| r.label == label)
            .and_then(|r| r.values[col])
    }
}

/// Fixed-width rendering for log output; values are rounded to two decimals.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self
            .rows
            .iter()
            .map(|r| r.label.len())
            .chain(std::iter::once(self.index_name.len()))
            .max()
            .unwrap_or(0);
        write!(f, "{:<label_width$}", self.index_name)?;
        for col in &self.columns {
            write!(f, " {:>14}", col)?;
        }
        for row in &self.rows {
            writeln!(f)?;
            write!(f, "{:<label_width$}", row.label)?;
            for value in &row.values {
                match value {
                    Some(v) => write!(f, " {:>14.2}", v)?,
                    None => write!(f, " {:>14}", "NaN")?,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_rounds_for_humans() {
        let mut t = Table::new("column", vec!["Missing %".into()]);
        t.push_row("GHI", vec![Some(100.0 / 3.0)]);
        t.push_row("DNI", vec![None]);
        let text = t.to_string();
        assert!(text.contains("33.33"));
        assert!(text.contains("NaN"));
        assert_eq!(t.get("GHI", "Missing %"), Some(100.0 / 3.0));
    }
}
