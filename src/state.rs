use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::charts::{ChartData, ChartKind, ComparisonData};
use crate::color::CountryColors;
use crate::compare::ComparisonPipeline;
use crate::config::ComparisonConfig;
use crate::data::filter::{filtered_indices, DateRange};
use crate::data::loader::{LabeledLoader, TIMESTAMP_COLUMN};
use crate::data::model::Dataset;

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct ViewerState {
    /// Loaded single-country dataset (None until the user opens a file).
    pub dataset: Option<Dataset>,

    /// File the dataset came from.
    pub source: Option<PathBuf>,

    /// Combined cleaned datasets and GHI ranking for the comparison charts.
    pub comparison: Option<ComparisonData>,

    /// Colours assigned to countries in the comparison charts.
    pub country_colors: Option<CountryColors>,

    pub chart: ChartKind,

    /// Selected date window on the timestamp column.
    pub range: DateRange,

    /// Full date span of the loaded dataset; bounds for the pickers.
    pub bounds: DateRange,

    /// Indices of rows inside `range` (cached).
    pub visible_indices: Vec<usize>,

    /// Series for the current chart and rows (cached).
    pub chart_data: Option<ChartData>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            dataset: None,
            source: None,
            comparison: None,
            country_colors: None,
            chart: ChartKind::TimeSeries,
            range: DateRange::default(),
            bounds: DateRange::default(),
            visible_indices: Vec::new(),
            chart_data: None,
            status_message: None,
        }
    }
}

impl ViewerState {
    /// Ingest a newly loaded dataset and reset the date window to its span.
    pub fn set_dataset(&mut self, dataset: Dataset, source: PathBuf) {
        self.bounds = DateRange::covering(&dataset, TIMESTAMP_COLUMN);
        self.range = self.bounds;
        self.visible_indices = (0..dataset.len()).collect();
        self.dataset = Some(dataset);
        self.source = Some(source);
        self.status_message = None;
        self.rebuild_chart();
    }

    pub fn set_comparison(&mut self, comparison: ComparisonData) {
        let labels: Vec<String> = comparison.ranking.iter().map(|(c, _)| c.clone()).collect();
        self.country_colors = Some(CountryColors::new(&labels));
        self.comparison = Some(comparison);
        self.rebuild_chart();
    }

    /// Load a data file, keeping any previous dataset on failure.
    pub fn open_file(&mut self, path: &Path) -> Result<()> {
        let label = path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
        let loaded = LabeledLoader::new(label, path).load()?;
        self.set_dataset(loaded.dataset, path.to_path_buf());
        Ok(())
    }

    /// Load every country's cleaned file from `dir` for the comparison charts.
    pub fn open_comparison(&mut self, dir: &Path) -> Result<()> {
        let pipeline = ComparisonPipeline::load(dir, ComparisonConfig::default())?;
        self.set_comparison(ComparisonData::from_pipeline(&pipeline)?);
        Ok(())
    }

    pub fn set_chart(&mut self, chart: ChartKind) {
        if self.chart != chart {
            self.chart = chart;
            self.rebuild_chart();
        }
    }

    pub fn set_range(&mut self, range: DateRange) {
        if self.range != range {
            self.range = range;
            self.refilter();
        }
    }

    /// Recompute `visible_indices` after the date window changed.
    pub fn refilter(&mut self) {
        if let Some(ds) = &self.dataset {
            self.visible_indices = filtered_indices(ds, TIMESTAMP_COLUMN, &self.range);
        }
        self.rebuild_chart();
    }

    /// Rebuild the cached series for the current chart.
    pub fn rebuild_chart(&mut self) {
        let view = match &self.dataset {
            Some(ds) if self.visible_indices.len() == ds.len() => ds.clone(),
            Some(ds) => ds.select_rows(&self.visible_indices),
            None => Dataset::default(),
        };
        self.chart_data = ChartData::build(self.chart, &view, self.comparison.as_ref());
    }

    /// Report a failure in the status line and the log.
    pub fn report_error(&mut self, context: &str, error: &anyhow::Error) {
        log::error!("{context}: {error:#}");
        self.status_message = Some(format!("Error: {error:#}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, Value};
    use chrono::NaiveDate;

    fn dataset() -> Dataset {
        Dataset::new(vec![
            Column::new(
                TIMESTAMP_COLUMN,
                vec![
                    Value::parse_timestamp("2021-08-09 10:00"),
                    Value::parse_timestamp("2021-08-10 10:00"),
                    Value::parse_timestamp("2021-08-11 10:00"),
                ],
            ),
            Column::from_f64("GHI", [Some(1.0), Some(2.0), Some(3.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn new_dataset_spans_its_dates() {
        let mut state = ViewerState::default();
        state.set_dataset(dataset(), PathBuf::from("benin.csv"));
        assert_eq!(state.bounds.start, NaiveDate::from_ymd_opt(2021, 8, 9));
        assert_eq!(state.bounds.end, NaiveDate::from_ymd_opt(2021, 8, 11));
        assert_eq!(state.visible_indices, vec![0, 1, 2]);
        assert!(matches!(state.chart_data, Some(ChartData::TimeSeries(_))));
    }

    #[test]
    fn narrowing_the_range_rebuilds_the_chart() {
        let mut state = ViewerState::default();
        state.set_dataset(dataset(), PathBuf::from("benin.csv"));
        state.set_range(DateRange {
            start: NaiveDate::from_ymd_opt(2021, 8, 10),
            end: None,
        });
        assert_eq!(state.visible_indices, vec![1, 2]);
        let Some(ChartData::TimeSeries(series)) = &state.chart_data else {
            panic!("expected time series");
        };
        assert_eq!(series[0].1.len(), 2);
    }

    #[test]
    fn comparison_chart_waits_for_comparison_data() {
        let mut state = ViewerState::default();
        state.set_chart(ChartKind::GhiRanking);
        assert!(state.chart_data.is_none());
        state.set_comparison(ComparisonData {
            combined: Dataset::default(),
            ranking: vec![("Benin".into(), 240.0)],
        });
        assert_eq!(
            state.chart_data,
            Some(ChartData::Ranking(vec![("Benin".into(), 240.0)]))
        );
    }

    #[test]
    fn failed_open_keeps_previous_dataset() {
        let mut state = ViewerState::default();
        state.set_dataset(dataset(), PathBuf::from("benin.csv"));
        assert!(state.open_file(Path::new("/nonexistent/togo.csv")).is_err());
        assert_eq!(state.dataset.as_ref().map(Dataset::len), Some(3));
    }
}
