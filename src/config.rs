use serde::{Deserialize, Serialize};

/// Measurement columns checked for outliers and imputed when none are given.
pub const DEFAULT_OUTLIER_COLUMNS: [&str; 7] = ["GHI", "DNI", "DHI", "ModA", "ModB", "WS", "WSgust"];

/// Irradiance metrics compared across countries.
pub const COMPARISON_METRICS: [&str; 3] = ["GHI", "DNI", "DHI"];

/// Label column added when per-country datasets are combined.
pub const GROUP_COLUMN: &str = "country";

pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;
pub const DEFAULT_SAMPLE_SIZE: usize = 5000;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_ALPHA: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    pub outlier_columns: Vec<String>,
    /// Rows with |z| strictly above this in any outlier column are dropped.
    pub z_threshold: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            outlier_columns: DEFAULT_OUTLIER_COLUMNS.iter().map(|c| c.to_string()).collect(),
            z_threshold: DEFAULT_Z_THRESHOLD,
        }
    }
}

/// One country's cleaned file inside the comparison data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySource {
    pub label: String,
    pub file_name: String,
}

impl CountrySource {
    /// `"Sierra Leone"` → file `sierra_leone_clean.csv`.
    pub fn for_country(label: &str) -> Self {
        Self {
            label: title_case(label),
            file_name: format!("{}_clean.csv", slug(label)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    pub sources: Vec<CountrySource>,
    /// Metric tested for normality and group differences.
    pub test_metric: String,
    pub summary_metrics: Vec<String>,
    /// Upper bound on values drawn per country for the normality test.
    pub sample_size: usize,
    pub seed: u64,
    pub alpha: f64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            sources: ["Benin", "Togo", "Sierra Leone"]
                .iter()
                .map(|c| CountrySource::for_country(c))
                .collect(),
            test_metric: "GHI".to_string(),
            summary_metrics: COMPARISON_METRICS.iter().map(|c| c.to_string()).collect(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            seed: DEFAULT_SEED,
            alpha: DEFAULT_ALPHA,
        }
    }
}

/// `"sierra leone"` → `"Sierra Leone"`.
pub fn title_case(label: &str) -> String {
    label
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// `"Sierra Leone"` → `"sierra_leone"`.
pub fn slug(label: &str) -> String {
    label
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
