//! Summary statistics and missing-value audit for one dataset.
//!
//! Both reports are pure functions of the dataset and behave the same
//! whether they run on raw or cleaned data.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::config::title_case;
use crate::data::model::Dataset;
use crate::data::table::Table;
use crate::data::writer::write_table;
use crate::stats::{describe, Describe};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub stats: Describe,
}

/// `describe()`-style statistics, one entry per numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub columns: Vec<ColumnSummary>,
}

impl SummaryTable {
    pub fn get(&self, column: &str) -> Option<&Describe> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| &c.stats)
    }

    pub fn to_table(&self) -> Table {
        let headers = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
        let mut table = Table::new("column", headers.iter().map(|h| h.to_string()).collect());
        for c in &self.columns {
            let s = &c.stats;
            table.push_row(
                c.column.clone(),
                vec![
                    Some(s.count as f64),
                    s.mean,
                    s.std,
                    s.min,
                    s.q25,
                    s.median,
                    s.q75,
                    s.max,
                ],
            );
        }
        table
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingEntry {
    pub column: String,
    pub missing: usize,
    /// `missing / rows * 100`, unrounded.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingReport {
    pub rows: usize,
    pub columns: Vec<MissingEntry>,
}

impl MissingReport {
    pub fn get(&self, column: &str) -> Option<&MissingEntry> {
        self.columns.iter().find(|c| c.column == column)
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new(
            "column",
            vec!["Missing Count".to_string(), "Percent Missing".to_string()],
        );
        for e in &self.columns {
            table.push_row(e.column.clone(), vec![Some(e.missing as f64), Some(e.percent)]);
        }
        table
    }
}

/// Per numeric column: count, mean, sample std, min, quartiles, max.
pub fn summary_stats(dataset: &Dataset) -> SummaryTable {
    let columns = dataset
        .columns()
        .iter()
        .filter(|c| c.is_numeric())
        .map(|c| ColumnSummary {
            column: c.name.clone(),
            stats: describe(&c.present_f64()),
        })
        .collect();
    SummaryTable { columns }
}

/// Per column: missing count and percentage of all rows. An empty dataset
/// reports 0% for every column.
pub fn missing_report(dataset: &Dataset) -> MissingReport {
    let rows = dataset.len();
    let columns = dataset
        .columns()
        .iter()
        .map(|c| {
            let missing = c.missing_count();
            let percent = if rows == 0 {
                0.0
            } else {
                missing as f64 / rows as f64 * 100.0
            };
            MissingEntry {
                column: c.name.clone(),
                missing,
                percent,
            }
        })
        .collect();
    MissingReport { rows, columns }
}

/// Report pair for one country's dataset.
pub struct ReportGenerator<'a> {
    dataset: &'a Dataset,
    country: String,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(dataset: &'a Dataset, country: &str) -> Self {
        let country = title_case(country);
        log::debug!("Initialized report generator for {country}");
        Self { dataset, country }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// Compute both reports and log them.
    pub fn generate(&self) -> (SummaryTable, MissingReport) {
        let summary = summary_stats(self.dataset);
        let missing = missing_report(self.dataset);
        log::info!("Summary Statistics for {}\n{}", self.country, summary.to_table());
        log::info!("Missing Values Report for {}\n{}", self.country, missing.to_table());
        (summary, missing)
    }

    /// Compute both reports and write `<Country>_summary_stats.csv` and
    /// `<Country>_missing_report.csv` under `dir`. Returns the paths written.
    pub fn save(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        let (summary, missing) = self.generate();
        let summary_path = dir.join(format!("{}_summary_stats.csv", self.country));
        let missing_path = dir.join(format!("{}_missing_report.csv", self.country));
        write_table(&summary_path, &summary.to_table())?;
        write_table(&missing_path, &missing.to_table())?;
        Ok((summary_path, missing_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::OutlierCleaner;
    use crate::config::CleaningConfig;
    use crate::data::model::{Column, Value};
    use approx::assert_relative_eq;

    fn raw() -> Dataset {
        Dataset::new(vec![
            Column::new(
                "Timestamp",
                vec![
                    Value::parse_timestamp("2021-08-09 00:01"),
                    Value::parse_timestamp("2021-08-09 00:02"),
                    Value::parse_timestamp("2021-08-09 00:03"),
                ],
            ),
            Column::new(
                "GHI",
                vec![Value::Float(1.0), Value::Null, Value::String("3 W/m²".into())],
            ),
            Column::new("Tamb", vec![Value::Integer(20), Value::Float(22.0), Value::Null]),
            Column::new("Comments", vec![Value::Null, Value::Null, Value::Null]),
        ])
        .unwrap()
    }

    #[test]
    fn summary_covers_numeric_columns_only() {
        let s = summary_stats(&raw());
        let names: Vec<&str> = s.columns.iter().map(|c| c.column.as_str()).collect();
        // GHI still holds text, Timestamp is not numeric
        assert_eq!(names, vec!["Tamb", "Comments"]);
        let tamb = s.get("Tamb").unwrap();
        assert_eq!(tamb.count, 2);
        assert_relative_eq!(tamb.mean.unwrap(), 21.0);
        assert_eq!(s.get("Comments").unwrap().mean, None);
    }

    #[test]
    fn percent_equals_count_over_rows() {
        let ds = raw();
        let m = missing_report(&ds);
        for entry in &m.columns {
            let count = ds.column(&entry.column).unwrap().missing_count();
            assert_eq!(entry.missing, count);
            assert_eq!(entry.percent, count as f64 / ds.len() as f64 * 100.0);
        }
        assert_eq!(m.get("GHI").unwrap().missing, 1);
        assert_eq!(m.get("Comments").unwrap().percent, 100.0);
    }

    #[test]
    fn reports_do_not_depend_on_cleaning_having_run() {
        let ds = raw();
        let before = (summary_stats(&ds), missing_report(&ds));
        let _ = OutlierCleaner::new(CleaningConfig {
            outlier_columns: vec!["GHI".into()],
            z_threshold: 3.0,
        })
        .run(ds.clone())
        .unwrap();
        assert_eq!((summary_stats(&ds), missing_report(&ds)), before);
    }

    #[test]
    fn empty_dataset_reports_zero_percent() {
        let ds = Dataset::new(vec![Column::new("GHI", Vec::new())]).unwrap();
        assert_eq!(missing_report(&ds).columns[0].percent, 0.0);
        assert_eq!(summary_stats(&ds).columns[0].stats.count, 0);
    }

    #[test]
    fn save_writes_title_cased_files() {
        let dir = tempfile::tempdir().unwrap();
        let ds = raw();
        let (summary, missing) = ReportGenerator::new(&ds, "sierra leone").save(dir.path()).unwrap();
        assert!(summary.ends_with("Sierra Leone_summary_stats.csv"));
        assert!(missing.exists());
        let text = std::fs::read_to_string(missing).unwrap();
        assert!(text.starts_with("column,Missing Count,Percent Missing\nTimestamp,0,0\n"));
    }
}
