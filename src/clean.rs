//! Outlier removal and median imputation for measurement columns.
//!
//! ```text
//!  raw Dataset
//!      │ coerce_numeric   text → f64, unparseable → missing
//!      │ medians          once per column, over present values
//!      │ score            <col>_z on median-filled values
//!      │ flag             outlier_flag = any |z| > threshold
//!      │ impute           missing → median
//!      ▼ filter           drop flagged rows and diagnostic columns
//!  cleaned Dataset
//! ```

use serde::Serialize;

use crate::config::CleaningConfig;
use crate::data::model::{Column, Dataset, Value};
use crate::error::{SolarError, SolarResult};
use crate::stats::{median, zscores};

/// Transient per-row flag column.
pub const OUTLIER_FLAG_COLUMN: &str = "outlier_flag";

/// Name of the transient z-score column for a measurement column.
pub fn zscore_column(column: &str) -> String {
    format!("{column}_z")
}

/// What happened to one measurement column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnCleaning {
    pub column: String,
    /// Non-empty cells that did not parse as numbers.
    pub coerced_to_missing: usize,
    /// Missing cells (blank or coerced) filled with the median.
    pub imputed: usize,
    pub median: Option<f64>,
    /// Zero variance after filling: every z-score is 0.
    pub degenerate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_flagged: usize,
    pub rows_out: usize,
    pub columns: Vec<ColumnCleaning>,
}

impl CleaningReport {
    pub fn degenerate_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.degenerate)
            .map(|c| c.column.as_str())
            .collect()
    }
}

/// A cleaned dataset and the record of how it was produced.
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub dataset: Dataset,
    pub report: CleaningReport,
}

pub struct OutlierCleaner {
    config: CleaningConfig,
}

impl Default for OutlierCleaner {
    fn default() -> Self {
        Self::new(CleaningConfig::default())
    }
}

impl OutlierCleaner {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Convert every measurement column to floats in place. Returns, per
    /// column, how many non-empty cells could not be parsed.
    pub fn coerce_numeric(&self, dataset: &mut Dataset) -> SolarResult<Vec<usize>> {
        let mut failures = Vec::with_capacity(self.config.outlier_columns.len());
        for name in &self.config.outlier_columns {
            let column = dataset
                .column_mut(name)
                .ok_or_else(|| SolarError::MissingColumn { column: name.clone() })?;
            let mut failed = 0;
            for value in &mut column.values {
                let coerced = value.coerce_f64();
                if coerced.is_none() && !value.is_missing() {
                    failed += 1;
                }
                *value = coerced.map(Value::Float).unwrap_or(Value::Null);
            }
            if failed > 0 {
                log::debug!("{name}: {failed} unparseable values treated as missing");
            }
            failures.push(failed);
        }
        Ok(failures)
    }

    /// Median of each measurement column over its present values.
    ///
    /// Fails with [`SolarError::NoMedian`] when a column has no numeric value
    /// at all in a non-empty dataset.
    pub fn medians(&self, dataset: &Dataset) -> SolarResult<Vec<f64>> {
        self.config
            .outlier_columns
            .iter()
            .map(|name| {
                let present = dataset.require_column(name)?.present_f64();
                median(&present).ok_or_else(|| SolarError::NoMedian {
                    column: name.clone(),
                })
            })
            .collect()
    }

    /// Add a `<col>_z` column per measurement column, scored on values with
    /// gaps filled by that column's median. Returns the degenerate
    /// (zero-variance) columns.
    pub fn score(&self, dataset: &mut Dataset, medians: &[f64]) -> SolarResult<Vec<String>> {
        let mut degenerate = Vec::new();
        for (name, &med) in self.config.outlier_columns.iter().zip(medians) {
            let filled: Vec<f64> = dataset
                .require_column(name)?
                .numeric()
                .into_iter()
                .map(|v| v.unwrap_or(med))
                .collect();
            let z = zscores(&filled);
            if !filled.is_empty() && z.iter().all(|s| *s == 0.0) {
                log::warn!("{name} has zero variance; its z-scores are all 0");
                degenerate.push(name.clone());
            }
            dataset.push_column(Column::from_f64(zscore_column(name), z.into_iter().map(Some)))?;
        }
        Ok(degenerate)
    }

    /// Add [`OUTLIER_FLAG_COLUMN`]: true when any |z| exceeds the threshold.
    /// Returns the number of flagged rows.
    pub fn flag(&self, dataset: &mut Dataset) -> SolarResult<usize> {
        let mut flags = vec![false; dataset.len()];
        for name in &self.config.outlier_columns {
            let z = dataset.require_column(&zscore_column(name))?.numeric();
            for (flag, score) in flags.iter_mut().zip(z) {
                if score.is_some_and(|s| s.abs() > self.config.z_threshold) {
                    *flag = true;
                }
            }
        }
        let flagged = flags.iter().filter(|f| **f).count();
        dataset.push_column(Column::new(
            OUTLIER_FLAG_COLUMN,
            flags.into_iter().map(Value::Bool).collect(),
        ))?;
        log::info!("Flagged {flagged} outlier rows");
        Ok(flagged)
    }

    /// Fill missing measurement values with the precomputed medians.
    /// Returns the number of cells filled per column.
    pub fn impute(&self, dataset: &mut Dataset, medians: &[f64]) -> SolarResult<Vec<usize>> {
        let mut filled = Vec::with_capacity(medians.len());
        for (name, &med) in self.config.outlier_columns.iter().zip(medians) {
            let column = dataset
                .column_mut(name)
                .ok_or_else(|| SolarError::MissingColumn { column: name.clone() })?;
            let mut count = 0;
            for value in column.values.iter_mut().filter(|v| v.is_missing()) {
                *value = Value::Float(med);
                count += 1;
            }
            filled.push(count);
        }
        Ok(filled)
    }

    /// Drop flagged rows, then the z-score and flag columns.
    pub fn filter(&self, mut dataset: Dataset) -> SolarResult<Dataset> {
        let keep: Vec<bool> = dataset
            .require_column(OUTLIER_FLAG_COLUMN)?
            .values
            .iter()
            .map(|v| v != &Value::Bool(true))
            .collect();
        dataset.retain_rows(&keep);
        let mut diagnostics: Vec<String> = self
            .config
            .outlier_columns
            .iter()
            .map(|c| zscore_column(c))
            .collect();
        diagnostics.push(OUTLIER_FLAG_COLUMN.to_string());
        dataset.drop_columns(&diagnostics);
        Ok(dataset)
    }

    /// Run every step in order.
    ///
    /// Scores are computed once on the pre-removal distribution and are not
    /// recomputed after flagged rows are dropped. An empty dataset comes back
    /// unchanged.
    pub fn run(&self, mut dataset: Dataset) -> SolarResult<Cleaned> {
        let rows_in = dataset.len();
        log::info!("Cleaner initialized with {rows_in} rows");

        if dataset.is_empty() {
            let report = CleaningReport {
                rows_in: 0,
                rows_flagged: 0,
                rows_out: 0,
                columns: Vec::new(),
            };
            return Ok(Cleaned { dataset, report });
        }

        let coerced = self.coerce_numeric(&mut dataset)?;
        let medians = self.medians(&dataset)?;
        let degenerate = self.score(&mut dataset, &medians)?;
        let rows_flagged = self.flag(&mut dataset)?;
        let imputed = self.impute(&mut dataset, &medians)?;
        let dataset = self.filter(dataset)?;

        let columns = self
            .config
            .outlier_columns
            .iter()
            .enumerate()
            .map(|(i, name)| ColumnCleaning {
                column: name.clone(),
                coerced_to_missing: coerced[i],
                imputed: imputed[i],
                median: Some(medians[i]),
                degenerate: degenerate.contains(name),
            })
            .collect();
        let report = CleaningReport {
            rows_in,
            rows_flagged,
            rows_out: dataset.len(),
            columns,
        };
        log::info!(
            "Final cleaned shape: {} rows x {} columns",
            dataset.len(),
            dataset.columns().len()
        );
        Ok(Cleaned { dataset, report })
    }
}
