//! Cross-country comparison of cleaned irradiance datasets.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::{ComparisonConfig, GROUP_COLUMN};
use crate::data::loader::LabeledLoader;
use crate::data::model::{Column, Dataset, Value};
use crate::data::table::Table;
use crate::error::{SolarError, SolarResult};
use crate::stats::descriptive::{mean, std_dev};
use crate::stats::{kruskal_wallis, median, shapiro_wilk};

/// One country's cleaned dataset.
#[derive(Debug, Clone)]
pub struct CountryGroup {
    pub label: String,
    pub dataset: Dataset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Normality {
    LikelyNormal,
    NonNormal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityResult {
    pub country: String,
    pub sample_size: usize,
    pub w: f64,
    pub p_value: f64,
    pub verdict: Normality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupDifference {
    Significant,
    NotSignificant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDifferenceResult {
    pub metric: String,
    pub h: f64,
    pub p_value: f64,
    pub degrees_of_freedom: usize,
    pub verdict: GroupDifference,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub count: usize,
}

/// Mean/median/std/count per group and metric. Groups are sorted by label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub metrics: Vec<String>,
    pub groups: BTreeMap<String, Vec<MetricSummary>>,
}

impl GroupSummary {
    pub fn get(&self, group: &str, metric: &str) -> Option<&MetricSummary> {
        let idx = self.metrics.iter().position(|m| m == metric)?;
        self.groups.get(group).map(|row| &row[idx])
    }

    /// Flattened `<metric>_<stat>` columns, rounded to two decimals.
    pub fn to_table(&self) -> Table {
        let columns = self
            .metrics
            .iter()
            .flat_map(|m| ["mean", "median", "std", "count"].map(|s| format!("{m}_{s}")))
            .collect();
        let round = |v: Option<f64>| v.map(|x| (x * 100.0).round() / 100.0);
        let mut table = Table::new(GROUP_COLUMN, columns);
        for (group, row) in &self.groups {
            let values = row
                .iter()
                .flat_map(|s| [round(s.mean), round(s.median), round(s.std), Some(s.count as f64)])
                .collect();
            table.push_row(group.clone(), values);
        }
        table
    }
}

/// Missing-value counts per group and metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedMissing {
    pub metrics: Vec<String>,
    pub groups: BTreeMap<String, Vec<usize>>,
}

impl GroupedMissing {
    pub fn get(&self, group: &str, metric: &str) -> Option<usize> {
        let idx = self.metrics.iter().position(|m| m == metric)?;
        self.groups.get(group).map(|row| row[idx])
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new(GROUP_COLUMN, self.metrics.clone());
        for (group, row) in &self.groups {
            table.push_row(group.clone(), row.iter().map(|&c| Some(c as f64)).collect());
        }
        table
    }
}

/// Everything a full comparison run produces.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub normality: Vec<NormalityResult>,
    pub group_difference: GroupDifferenceResult,
    /// Mean of the test metric per country, highest first.
    pub mean_ranking: Vec<(String, f64)>,
    pub summary: GroupSummary,
    pub missing: GroupedMissing,
}

/// Row indices of the combined dataset belonging to each group label.
fn group_rows(combined: &Dataset, group_column: &str) -> SolarResult<BTreeMap<String, Vec<usize>>> {
    let labels = combined.require_column(group_column)?;
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (row, label) in labels.values.iter().enumerate() {
        if label.is_missing() {
            continue;
        }
        groups.entry(label.to_string()).or_default().push(row);
    }
    Ok(groups)
}

/// Group the combined dataset by label and compute mean, median, sample std
/// and count of present values for each metric.
pub fn summarize(combined: &Dataset, group_column: &str, metrics: &[String]) -> SolarResult<GroupSummary> {
    let numeric: Vec<Vec<Option<f64>>> = metrics
        .iter()
        .map(|m| combined.require_column(m).map(Column::numeric))
        .collect::<SolarResult<_>>()?;
    let groups = group_rows(combined, group_column)?
        .into_iter()
        .map(|(label, rows)| {
            let stats = numeric
                .iter()
                .map(|col| {
                    let values: Vec<f64> = rows.iter().filter_map(|&r| col[r]).collect();
                    MetricSummary {
                        mean: mean(&values),
                        median: median(&values),
                        std: std_dev(&values, 1),
                        count: values.len(),
                    }
                })
                .collect();
            (label, stats)
        })
        .collect();
    Ok(GroupSummary {
        metrics: metrics.to_vec(),
        groups,
    })
}

/// Group by label and count missing values per metric.
pub fn grouped_missing_report(
    combined: &Dataset,
    group_column: &str,
    metrics: &[String],
) -> SolarResult<GroupedMissing> {
    let columns: Vec<&Column> = metrics
        .iter()
        .map(|m| combined.require_column(m))
        .collect::<SolarResult<_>>()?;
    let groups = group_rows(combined, group_column)?
        .into_iter()
        .map(|(label, rows)| {
            let counts = columns
                .iter()
                .map(|c| rows.iter().filter(|&&r| c.values[r].is_missing()).count())
                .collect();
            (label, counts)
        })
        .collect();
    Ok(GroupedMissing {
        metrics: metrics.to_vec(),
        groups,
    })
}

pub struct ComparisonPipeline {
    config: ComparisonConfig,
    groups: Vec<CountryGroup>,
}

impl ComparisonPipeline {
    /// Load every configured country's cleaned file from `data_dir`.
    ///
    /// If any file is absent nothing is loaded and the error is
    /// [`SolarError::PrerequisiteMissing`] naming all absent files.
    pub fn load(data_dir: &Path, config: ComparisonConfig) -> Result<Self> {
        let missing: Vec<String> = config
            .sources
            .iter()
            .map(|s| data_dir.join(&s.file_name))
            .filter(|p| !p.exists())
            .map(|p| p.display().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SolarError::PrerequisiteMissing { missing }.into());
        }

        let mut groups = Vec::with_capacity(config.sources.len());
        for source in &config.sources {
            let loaded = LabeledLoader::new(&source.label, data_dir.join(&source.file_name)).load()?;
            groups.push(CountryGroup {
                label: source.label.clone(),
                dataset: loaded.dataset,
            });
        }
        let pipeline = Self::from_groups(groups, config)?;
        log::info!(
            "Loaded comparison data: {} rows across {} countries",
            pipeline.groups.iter().map(|g| g.dataset.len()).sum::<usize>(),
            pipeline.groups.len()
        );
        Ok(pipeline)
    }

    /// Build from in-memory datasets. Each must contain the test metric.
    pub fn from_groups(groups: Vec<CountryGroup>, config: ComparisonConfig) -> SolarResult<Self> {
        if groups.len() < 2 {
            return Err(SolarError::InsufficientData {
                what: format!("a comparison (need at least 2 countries, got {})", groups.len()),
            });
        }
        for g in &groups {
            g.dataset.require_column(&config.test_metric)?;
        }
        Ok(Self { config, groups })
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    pub fn groups(&self) -> &[CountryGroup] {
        &self.groups
    }

    /// All groups stacked, with a [`GROUP_COLUMN`] label column appended.
    pub fn combined(&self) -> SolarResult<Dataset> {
        let labelled: Vec<Dataset> = self
            .groups
            .iter()
            .map(|g| -> SolarResult<Dataset> {
                let mut ds = g.dataset.clone();
                let labels = vec![Value::String(g.label.clone()); ds.len()];
                ds.push_column(Column::new(GROUP_COLUMN, labels))?;
                Ok(ds)
            })
            .collect::<SolarResult<_>>()?;
        Ok(Dataset::concat(&labelled))
    }

    fn metric_values(&self, group: &CountryGroup) -> SolarResult<Vec<f64>> {
        Ok(group.dataset.require_column(&self.config.test_metric)?.present_f64())
    }

    /// Seeded sample without replacement of at most `sample_size` present
    /// metric values. Same seed and data always give the same sample.
    pub fn sample(&self, group: &CountryGroup) -> SolarResult<Vec<f64>> {
        let values = self.metric_values(group)?;
        let n = self.config.sample_size.min(values.len());
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        Ok(values.choose_multiple(&mut rng, n).copied().collect())
    }

    /// Shapiro–Wilk on a seeded sample of one group's metric values.
    pub fn normality_test(&self, group: &CountryGroup) -> SolarResult<NormalityResult> {
        let sample = self.sample(group)?;
        let sw = shapiro_wilk(&sample)?;
        let verdict = if sw.p_value > self.config.alpha {
            Normality::LikelyNormal
        } else {
            Normality::NonNormal
        };
        log::info!(
            "Shapiro-Wilk {:<15} p = {:.5} -> {:?}",
            group.label,
            sw.p_value,
            verdict
        );
        Ok(NormalityResult {
            country: group.label.clone(),
            sample_size: sample.len(),
            w: sw.w,
            p_value: sw.p_value,
            verdict,
        })
    }

    pub fn normality_tests(&self) -> SolarResult<Vec<NormalityResult>> {
        self.groups.iter().map(|g| self.normality_test(g)).collect()
    }

    /// Kruskal–Wallis across all groups' present metric values.
    pub fn group_difference_test(&self) -> SolarResult<GroupDifferenceResult> {
        let values: Vec<Vec<f64>> = self
            .groups
            .iter()
            .map(|g| self.metric_values(g))
            .collect::<SolarResult<_>>()?;
        let slices: Vec<&[f64]> = values.iter().map(Vec::as_slice).collect();
        let kw = kruskal_wallis(&slices)?;
        let verdict = if kw.p_value < self.config.alpha {
            GroupDifference::Significant
        } else {
            GroupDifference::NotSignificant
        };
        log::info!(
            "Kruskal-Wallis ({}): H = {:.3} | p = {:.5} -> {:?}",
            self.config.test_metric,
            kw.h,
            kw.p_value,
            verdict
        );
        Ok(GroupDifferenceResult {
            metric: self.config.test_metric.clone(),
            h: kw.h,
            p_value: kw.p_value,
            degrees_of_freedom: kw.degrees_of_freedom,
            verdict,
        })
    }

    /// Mean of the test metric per country, highest first. Countries with
    /// no values are left out.
    pub fn mean_ranking(&self) -> SolarResult<Vec<(String, f64)>> {
        let mut ranking = Vec::with_capacity(self.groups.len());
        for g in &self.groups {
            if let Some(m) = mean(&self.metric_values(g)?) {
                ranking.push((g.label.clone(), m));
            }
        }
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(ranking)
    }

    pub fn summarize(&self) -> SolarResult<GroupSummary> {
        summarize(&self.combined()?, GROUP_COLUMN, &self.config.summary_metrics)
    }

    pub fn missing_report(&self) -> SolarResult<GroupedMissing> {
        grouped_missing_report(&self.combined()?, GROUP_COLUMN, &self.config.summary_metrics)
    }

    /// Normality, group difference, ranking, summary and missing tables.
    pub fn run_all(&self) -> SolarResult<ComparisonReport> {
        let combined = self.combined()?;
        let metrics = &self.config.summary_metrics;
        let report = ComparisonReport {
            normality: self.normality_tests()?,
            group_difference: self.group_difference_test()?,
            mean_ranking: self.mean_ranking()?,
            summary: summarize(&combined, GROUP_COLUMN, metrics)?,
            missing: grouped_missing_report(&combined, GROUP_COLUMN, metrics)?,
        };
        log::info!("Summary Statistics:\n{}", report.summary.to_table());
        log::info!("Missing Value Report:\n{}", report.missing.to_table());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CountrySource;
    use crate::data::writer::write_dataset;
    use approx::assert_relative_eq;

    fn group(label: &str, ghi: impl IntoIterator<Item = Option<f64>>) -> CountryGroup {
        let ghi: Vec<Option<f64>> = ghi.into_iter().collect();
        let dni = ghi.iter().map(|v| v.map(|x| x / 2.0));
        let dhi = ghi.iter().map(|_| None);
        CountryGroup {
            label: label.to_string(),
            dataset: Dataset::new(vec![
                Column::from_f64("GHI", ghi.clone()),
                Column::from_f64("DNI", dni),
                Column::from_f64("DHI", dhi),
            ])
            .unwrap(),
        }
    }

    fn disjoint() -> ComparisonPipeline {
        ComparisonPipeline::from_groups(
            vec![
                group("Benin", (0..50).map(|i| Some(500.0 + i as f64))),
                group("Togo", (0..50).map(|i| Some(200.0 + i as f64))),
                group("Sierra Leone", (0..50).map(|i| Some(i as f64)).chain([None])),
            ],
            ComparisonConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn disjoint_distributions_differ_significantly() {
        let r = disjoint().group_difference_test().unwrap();
        assert!(r.p_value < 0.05);
        assert_eq!(r.verdict, GroupDifference::Significant);
        assert_eq!(r.degrees_of_freedom, 2);
    }

    #[test]
    fn sampling_is_reproducible() {
        let mut config = ComparisonConfig::default();
        config.sample_size = 20;
        let p = ComparisonPipeline::from_groups(disjoint().groups.clone(), config).unwrap();
        let g = &p.groups()[0];
        let first = p.sample(g).unwrap();
        assert_eq!(first.len(), 20);
        assert_eq!(first, p.sample(g).unwrap());
        assert_eq!(p.normality_test(g).unwrap(), p.normality_test(g).unwrap());
    }

    #[test]
    fn sample_never_exceeds_present_values() {
        let p = disjoint();
        let sl = &p.groups()[2];
        assert_eq!(p.sample(sl).unwrap().len(), 50);
        assert_eq!(p.normality_test(sl).unwrap().sample_size, 50);
    }

    #[test]
    fn verdict_follows_p_value() {
        let r = disjoint().normality_tests().unwrap();
        assert_eq!(r.len(), 3);
        for n in &r {
            assert!(n.w > 0.0 && n.w <= 1.0);
            assert_eq!(n.verdict == Normality::LikelyNormal, n.p_value > 0.05);
        }
    }

    #[test]
    fn summary_and_missing_are_grouped_by_country() {
        let p = disjoint();
        let s = p.summarize().unwrap();
        assert_eq!(
            s.groups.keys().collect::<Vec<_>>(),
            vec!["Benin", "Sierra Leone", "Togo"]
        );
        let benin = s.get("Benin", "GHI").unwrap();
        assert_eq!(benin.count, 50);
        assert_relative_eq!(benin.mean.unwrap(), 524.5);
        assert_relative_eq!(benin.median.unwrap(), 524.5);
        assert_eq!(s.get("Togo", "DHI").unwrap().count, 0);

        let m = p.missing_report().unwrap();
        assert_eq!(m.get("Sierra Leone", "GHI"), Some(1));
        assert_eq!(m.get("Benin", "GHI"), Some(0));
        assert_eq!(m.get("Togo", "DHI"), Some(50));

        let table = s.to_table();
        assert_eq!(table.get("Benin", "GHI_mean"), Some(524.5));
    }

    #[test]
    fn ranking_is_descending() {
        let ranking = disjoint().mean_ranking().unwrap();
        let labels: Vec<&str> = ranking.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["Benin", "Togo", "Sierra Leone"]);
    }

    #[test]
    fn absent_files_are_a_prerequisite_error() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(&dir.path().join("benin_clean.csv"), &group("Benin", [Some(1.0)]).dataset).unwrap();

        let err = ComparisonPipeline::load(dir.path(), ComparisonConfig::default())
            .err()
            .unwrap();
        match err.downcast_ref::<SolarError>() {
            Some(SolarError::PrerequisiteMissing { missing }) => {
                assert_eq!(missing.len(), 2);
                assert!(missing[0].ends_with("togo_clean.csv"));
                assert!(missing[1].ends_with("sierra_leone_clean.csv"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("missing prerequisite data"));
    }

    #[test]
    fn load_reads_every_country() {
        let dir = tempfile::tempdir().unwrap();
        let config = ComparisonConfig {
            sources: vec![
                CountrySource::for_country("Benin"),
                CountrySource::for_country("Togo"),
            ],
            ..ComparisonConfig::default()
        };
        for (i, s) in config.sources.iter().enumerate() {
            let g = group(&s.label, (0..10).map(|v| Some((v * (i + 1)) as f64)));
            write_dataset(&dir.path().join(&s.file_name), &g.dataset).unwrap();
        }
        let p = ComparisonPipeline::load(dir.path(), config).unwrap();
        let combined = p.combined().unwrap();
        assert_eq!(combined.len(), 20);
        assert_eq!(combined.value(15, GROUP_COLUMN), Some(&Value::String("Togo".into())));
        let report = p.run_all().unwrap();
        assert_eq!(report.normality.len(), 2);
        assert_eq!(report.summary.groups.len(), 2);
    }

    #[test]
    fn a_group_without_the_metric_is_rejected() {
        let bad = CountryGroup {
            label: "Togo".into(),
            dataset: Dataset::new(vec![Column::from_f64("DNI", [Some(1.0)])]).unwrap(),
        };
        let err = ComparisonPipeline::from_groups(
            vec![group("Benin", [Some(1.0)]), bad],
            ComparisonConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SolarError::MissingColumn { .. }));
    }
}
