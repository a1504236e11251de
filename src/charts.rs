//! Chart series built from cleaned data.
//!
//! Everything here is a pure function of a [`Dataset`]; the viewer in
//! [`crate::ui`] only turns these into egui_plot items.

use std::collections::BTreeMap;

use crate::compare::ComparisonPipeline;
use crate::config::{COMPARISON_METRICS, GROUP_COLUMN};
use crate::data::loader::TIMESTAMP_COLUMN;
use crate::data::model::{Dataset, Value};
use crate::error::SolarResult;
use crate::stats::descriptive::{mean, pearson, quantile_sorted, sorted};

pub const TIME_SERIES_COLUMNS: [&str; 4] = ["GHI", "DNI", "DHI", "Tamb"];
pub const CLEANING_IMPACT_COLUMNS: [&str; 2] = ["ModA", "ModB"];
pub const CORRELATION_COLUMNS: [&str; 5] = ["GHI", "DNI", "DHI", "TModA", "TModB"];
pub const DISTRIBUTION_COLUMNS: [&str; 2] = ["GHI", "WS"];
pub const WIND_COLUMNS: [&str; 3] = ["WS", "WSgust", "WD"];
pub const HISTOGRAM_BINS: usize = 30;

/// `(x, y)` points where both coordinates are present.
pub fn scatter(dataset: &Dataset, x: &str, y: &str) -> Vec<[f64; 2]> {
    let (Some(xs), Some(ys)) = (dataset.column(x), dataset.column(y)) else {
        return Vec::new();
    };
    xs.values
        .iter()
        .zip(&ys.values)
        .filter_map(|(a, b)| Some([a.as_f64()?, b.as_f64()?]))
        .collect()
}

/// `(seconds since epoch, value)` points against the timestamp column.
pub fn time_series(dataset: &Dataset, timestamp: &str, column: &str) -> Vec<[f64; 2]> {
    let (Some(ts), Some(ys)) = (dataset.column(timestamp), dataset.column(column)) else {
        return Vec::new();
    };
    ts.values
        .iter()
        .zip(&ys.values)
        .filter_map(|(t, y)| {
            let t = t.as_timestamp()?;
            Some([t.and_utc().timestamp() as f64, y.as_f64()?])
        })
        .collect()
}

/// Mean of each value column per distinct value of `group` (e.g. the
/// `Cleaning` flag). Missing group labels are skipped.
pub fn grouped_means(dataset: &Dataset, group: &str, columns: &[&str]) -> Vec<(Value, Vec<Option<f64>>)> {
    let Some(labels) = dataset.column(group) else {
        return Vec::new();
    };
    let mut rows: BTreeMap<Value, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.values.iter().enumerate() {
        if !label.is_missing() {
            rows.entry(label.clone()).or_default().push(i);
        }
    }
    rows.into_iter()
        .map(|(label, idx)| {
            let means = columns
                .iter()
                .map(|c| {
                    let col = dataset.column(c)?;
                    let values: Vec<f64> = idx.iter().filter_map(|&i| col.values[i].as_f64()).collect();
                    mean(&values)
                })
                .collect();
            (label, means)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// `values[i][j]`: Pearson r between `labels[i]` and `labels[j]`.
    pub values: Vec<Vec<Option<f64>>>,
}

/// Pairwise-complete Pearson correlations; absent columns are skipped.
pub fn correlation_matrix(dataset: &Dataset, columns: &[&str]) -> CorrelationMatrix {
    let present: Vec<(&str, Vec<Option<f64>>)> = columns
        .iter()
        .filter_map(|c| Some((*c, dataset.column(c)?.numeric())))
        .collect();
    let values = present
        .iter()
        .map(|(_, a)| present.iter().map(|(_, b)| pearson(a, b)).collect())
        .collect();
    CorrelationMatrix {
        labels: present.iter().map(|(c, _)| c.to_string()).collect(),
        values,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Left edge of the first bin.
    pub start: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Centre of each bin.
    pub fn centers(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.counts.len()).map(|i| self.start + (i as f64 + 0.5) * self.bin_width)
    }
}

/// Equal-width bins over the value range; the last bin is closed. A constant
/// series becomes a single unit-width bin.
pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    let lo = values.iter().copied().reduce(f64::min)?;
    let hi = values.iter().copied().reduce(f64::max)?;
    if bins == 0 {
        return None;
    }
    if hi == lo {
        return Some(Histogram {
            start: lo - 0.5,
            bin_width: 1.0,
            counts: vec![values.len()],
        });
    }
    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0; bins];
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Some(Histogram {
        start: lo,
        bin_width: width,
        counts,
    })
}

/// Quartiles and 1.5×IQR whiskers clamped to the data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
}

pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    let s = sorted(values);
    let q1 = quantile_sorted(&s, 0.25)?;
    let median = quantile_sorted(&s, 0.5)?;
    let q3 = quantile_sorted(&s, 0.75)?;
    let iqr = q3 - q1;
    let lower_whisker = s.iter().copied().find(|v| *v >= q1 - 1.5 * iqr).unwrap_or(q1);
    let upper_whisker = s.iter().rev().copied().find(|v| *v <= q3 + 1.5 * iqr).unwrap_or(q3);
    Some(BoxStats {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
    })
}

/// Box statistics of `metric` for each value of `group`, in label order.
pub fn grouped_box_stats(dataset: &Dataset, group: &str, metric: &str) -> Vec<(String, BoxStats)> {
    let (Some(labels), Some(values)) = (dataset.column(group), dataset.column(metric)) else {
        return Vec::new();
    };
    let mut by_group: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (label, v) in labels.values.iter().zip(&values.values) {
        if let (false, Some(x)) = (label.is_missing(), v.as_f64()) {
            by_group.entry(label.to_string()).or_default().push(x);
        }
    }
    by_group
        .into_iter()
        .filter_map(|(label, xs)| Some((label, box_stats(&xs)?)))
        .collect()
}

/// One point of the GHI/Tamb bubble chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bubble {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub hue: f64,
}

pub fn bubbles(dataset: &Dataset, x: &str, y: &str, size: &str, hue: &str) -> Vec<Bubble> {
    let cols = [x, y, size, hue].map(|c| dataset.column(c));
    let [Some(xs), Some(ys), Some(ss), Some(hs)] = cols else {
        return Vec::new();
    };
    (0..dataset.len())
        .filter_map(|i| {
            Some(Bubble {
                x: xs.values[i].as_f64()?,
                y: ys.values[i].as_f64()?,
                size: ss.values[i].as_f64()?,
                hue: hs.values[i].as_f64()?,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Chart selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    TimeSeries,
    CleaningImpact,
    Correlation,
    Distributions,
    WindVsGhi,
    HumidityVsTemperature,
    Bubbles,
    CountryBoxPlots,
    GhiRanking,
}

impl ChartKind {
    pub const ALL: [ChartKind; 9] = [
        ChartKind::TimeSeries,
        ChartKind::CleaningImpact,
        ChartKind::Correlation,
        ChartKind::Distributions,
        ChartKind::WindVsGhi,
        ChartKind::HumidityVsTemperature,
        ChartKind::Bubbles,
        ChartKind::CountryBoxPlots,
        ChartKind::GhiRanking,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::TimeSeries => "Time series",
            ChartKind::CleaningImpact => "Cleaning impact",
            ChartKind::Correlation => "Correlation",
            ChartKind::Distributions => "Distributions",
            ChartKind::WindVsGhi => "Wind vs GHI",
            ChartKind::HumidityVsTemperature => "RH vs Tamb",
            ChartKind::Bubbles => "GHI vs Tamb bubbles",
            ChartKind::CountryBoxPlots => "Country box plots",
            ChartKind::GhiRanking => "Mean GHI by country",
        }
    }

    /// Charts drawn from the combined comparison data rather than one file.
    pub fn needs_comparison(self) -> bool {
        matches!(self, ChartKind::CountryBoxPlots | ChartKind::GhiRanking)
    }
}

/// Cross-country data behind the comparison charts.
#[derive(Debug, Clone)]
pub struct ComparisonData {
    pub combined: Dataset,
    /// Mean GHI per country, highest first.
    pub ranking: Vec<(String, f64)>,
}

impl ComparisonData {
    pub fn from_pipeline(pipeline: &ComparisonPipeline) -> SolarResult<Self> {
        Ok(ComparisonData {
            combined: pipeline.combined()?,
            ranking: pipeline.mean_ranking()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterSeries {
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<[f64; 2]>,
}

/// Series for one chart, ready to hand to the plotting layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    TimeSeries(Vec<(String, Vec<[f64; 2]>)>),
    CleaningImpact {
        columns: Vec<String>,
        groups: Vec<(Value, Vec<Option<f64>>)>,
    },
    Correlation(CorrelationMatrix),
    Histograms(Vec<(String, Histogram)>),
    Scatter(Vec<ScatterSeries>),
    Bubbles(Vec<Bubble>),
    BoxPlots(Vec<(String, Vec<(String, BoxStats)>)>),
    Ranking(Vec<(String, f64)>),
}

impl ChartData {
    /// Build `kind` from the visible rows of a single-country dataset, or from
    /// the comparison data. Returns `None` for a comparison chart when no
    /// comparison data is loaded.
    pub fn build(kind: ChartKind, view: &Dataset, comparison: Option<&ComparisonData>) -> Option<Self> {
        let data = match kind {
            ChartKind::TimeSeries => ChartData::TimeSeries(
                TIME_SERIES_COLUMNS
                    .iter()
                    .map(|c| (c.to_string(), time_series(view, TIMESTAMP_COLUMN, c)))
                    .collect(),
            ),
            ChartKind::CleaningImpact => ChartData::CleaningImpact {
                columns: CLEANING_IMPACT_COLUMNS.iter().map(|c| c.to_string()).collect(),
                groups: grouped_means(view, "Cleaning", &CLEANING_IMPACT_COLUMNS),
            },
            ChartKind::Correlation => ChartData::Correlation(correlation_matrix(view, &CORRELATION_COLUMNS)),
            ChartKind::Distributions => ChartData::Histograms(
                DISTRIBUTION_COLUMNS
                    .iter()
                    .filter_map(|c| {
                        let values = view.column(c)?.present_f64();
                        Some((c.to_string(), histogram(&values, HISTOGRAM_BINS)?))
                    })
                    .collect(),
            ),
            ChartKind::WindVsGhi => ChartData::Scatter(
                WIND_COLUMNS
                    .iter()
                    .map(|c| ScatterSeries {
                        x_label: c.to_string(),
                        y_label: "GHI".to_string(),
                        points: scatter(view, c, "GHI"),
                    })
                    .collect(),
            ),
            ChartKind::HumidityVsTemperature => ChartData::Scatter(vec![ScatterSeries {
                x_label: "RH".to_string(),
                y_label: "Tamb".to_string(),
                points: scatter(view, "RH", "Tamb"),
            }]),
            ChartKind::Bubbles => ChartData::Bubbles(bubbles(view, "GHI", "Tamb", "RH", "BP")),
            ChartKind::CountryBoxPlots => {
                let combined = &comparison?.combined;
                ChartData::BoxPlots(
                    COMPARISON_METRICS
                        .iter()
                        .map(|m| (m.to_string(), grouped_box_stats(combined, GROUP_COLUMN, m)))
                        .collect(),
                )
            }
            ChartKind::GhiRanking => ChartData::Ranking(comparison?.ranking.clone()),
        };
        Some(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;
    use approx::assert_relative_eq;

    fn ds() -> Dataset {
        Dataset::new(vec![
            Column::new(
                "Timestamp",
                vec![
                    Value::parse_timestamp("1970-01-01 00:01"),
                    Value::parse_timestamp("1970-01-01 00:02"),
                    Value::Null,
                    Value::parse_timestamp("1970-01-01 00:04"),
                ],
            ),
            Column::from_f64("GHI", [Some(1.0), Some(2.0), Some(3.0), None]),
            Column::from_f64("DNI", [Some(2.0), Some(4.0), Some(6.0), Some(8.0)]),
            Column::new(
                "Cleaning",
                vec![Value::Integer(0), Value::Integer(1), Value::Integer(0), Value::Integer(1)],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn time_series_skips_missing() {
        assert_eq!(time_series(&ds(), "Timestamp", "GHI"), vec![[60.0, 1.0], [120.0, 2.0]]);
        assert!(time_series(&ds(), "Timestamp", "nope").is_empty());
    }

    #[test]
    fn means_grouped_by_cleaning_flag() {
        let g = grouped_means(&ds(), "Cleaning", &["GHI", "DNI", "ModA"]);
        assert_eq!(g.len(), 2);
        assert_eq!(g[0].0, Value::Integer(0));
        assert_eq!(g[0].1, vec![Some(2.0), Some(4.0), None]);
        assert_eq!(g[1].1, vec![Some(2.0), Some(6.0), None]);
    }

    #[test]
    fn integer_and_float_flags_share_a_group() {
        let ds = Dataset::new(vec![
            Column::new(
                "Cleaning",
                vec![Value::Integer(0), Value::Float(0.0), Value::Float(1.0), Value::Integer(1)],
            ),
            Column::from_f64("GHI", [Some(1.0), Some(3.0), Some(10.0), Some(20.0)]),
        ])
        .unwrap();
        let g = grouped_means(&ds, "Cleaning", &["GHI"]);
        assert_eq!(g.len(), 2);
        assert_eq!(g[0], (Value::Float(0.0), vec![Some(2.0)]));
        assert_eq!(g[1], (Value::Integer(1), vec![Some(15.0)]));
    }

    #[test]
    fn correlation_is_symmetric_with_unit_diagonal() {
        let m = correlation_matrix(&ds(), &["GHI", "DNI", "TModA"]);
        assert_eq!(m.labels, vec!["GHI", "DNI"]);
        assert_relative_eq!(m.values[0][0].unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.values[0][1].unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(m.values[0][1], m.values[1][0]);
    }

    #[test]
    fn histogram_counts_every_value() {
        let h = histogram(&[0.0, 1.0, 2.0, 3.0, 10.0], 5).unwrap();
        assert_eq!(h.counts, vec![2, 2, 0, 0, 1]);
        assert_eq!(h.counts.iter().sum::<usize>(), 5);
        assert_eq!(histogram(&[4.0, 4.0], 30).unwrap().counts, vec![2]);
        assert!(histogram(&[], 30).is_none());
    }

    #[test]
    fn box_whiskers_stop_at_data() {
        let b = box_stats(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!((b.q1, b.median, b.q3), (2.0, 3.0, 4.0));
        assert_eq!(b.lower_whisker, 1.0);
        assert_eq!(b.upper_whisker, 4.0);
    }

    #[test]
    fn comparison_charts_need_comparison_data() {
        assert_eq!(ChartData::build(ChartKind::GhiRanking, &ds(), None), None);
        let comparison = ComparisonData {
            combined: Dataset::new(vec![
                Column::new(
                    GROUP_COLUMN,
                    vec![Value::String("Benin".into()), Value::String("Togo".into())],
                ),
                Column::from_f64("GHI", [Some(5.0), Some(3.0)]),
            ])
            .unwrap(),
            ranking: vec![("Benin".into(), 5.0), ("Togo".into(), 3.0)],
        };
        let Some(ChartData::BoxPlots(boxes)) = ChartData::build(ChartKind::CountryBoxPlots, &ds(), Some(&comparison))
        else {
            panic!("expected box plots");
        };
        assert_eq!(boxes[0].0, "GHI");
        assert_eq!(boxes[0].1.len(), 2);
        assert!(boxes[1].1.is_empty());
    }

    #[test]
    fn every_single_file_chart_builds() {
        for kind in ChartKind::ALL.iter().filter(|k| !k.needs_comparison()) {
            assert!(ChartData::build(*kind, &ds(), None).is_some(), "{}", kind.label());
        }
    }
}
