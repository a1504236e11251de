use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use eframe::egui;
use env_logger::Env;
use serde::Serialize;

use rusty_solar::app::SolarViewerApp;
use rusty_solar::clean::{CleaningReport, OutlierCleaner};
use rusty_solar::compare::ComparisonPipeline;
use rusty_solar::config::{
    slug, title_case, CleaningConfig, ComparisonConfig, DEFAULT_OUTLIER_COLUMNS, DEFAULT_SAMPLE_SIZE,
    DEFAULT_SEED, DEFAULT_Z_THRESHOLD,
};
use rusty_solar::data::loader::{LabeledLoader, TextEncoding};
use rusty_solar::data::writer::{write_dataset, write_json, write_table};
use rusty_solar::report::ReportGenerator;

#[derive(Parser)]
#[command(author, version, about = "Clean, report on and compare solar irradiance datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clean one country's raw measurement file
    Clean {
        /// Country label, e.g. "Sierra Leone"
        #[arg(long)]
        country: String,
        /// Raw .csv, .parquet or .json file
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "data")]
        output_dir: PathBuf,
        #[arg(long, default_value = "reports")]
        reports_dir: PathBuf,
        /// Columns checked for outliers and imputed
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,
        #[arg(long, default_value_t = DEFAULT_Z_THRESHOLD)]
        z_threshold: f64,
    },
    /// Compare the cleaned datasets of every country
    Compare {
        /// Directory holding `<country>_clean.csv` files
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        #[arg(long, default_value = "reports")]
        reports_dir: PathBuf,
        /// Values drawn per country for the normality test
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
        sample_size: usize,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },
    /// Open the chart viewer
    View {
        /// Cleaned (or raw) data file to open at startup
        #[arg(long)]
        file: Option<PathBuf>,
        /// Directory of cleaned country files for the comparison charts
        #[arg(long)]
        compare_dir: Option<PathBuf>,
    },
}

/// Written next to the reports so a cleaned file can be traced back.
#[derive(Serialize)]
struct RunManifest<'a> {
    country: &'a str,
    input: &'a Path,
    output: &'a Path,
    encoding: TextEncoding,
    config: &'a CleaningConfig,
    report: &'a CleaningReport,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Clean {
            country,
            input,
            output_dir,
            reports_dir,
            columns,
            z_threshold,
        } => {
            let config = CleaningConfig {
                outlier_columns: columns
                    .unwrap_or_else(|| DEFAULT_OUTLIER_COLUMNS.iter().map(|c| c.to_string()).collect()),
                z_threshold,
            };
            clean(&country, &input, &output_dir, &reports_dir, config)
        }
        Command::Compare {
            data_dir,
            reports_dir,
            sample_size,
            seed,
        } => {
            let config = ComparisonConfig {
                sample_size,
                seed,
                ..ComparisonConfig::default()
            };
            compare(&data_dir, &reports_dir, config)
        }
        Command::View { file, compare_dir } => view(file, compare_dir),
    }
}

fn clean(country: &str, input: &Path, output_dir: &Path, reports_dir: &Path, config: CleaningConfig) -> Result<()> {
    let country = title_case(country);
    let loaded = LabeledLoader::new(country.as_str(), input).load()?;

    ReportGenerator::new(&loaded.dataset, &country)
        .save(reports_dir)
        .with_context(|| format!("Failed to write reports for {country}"))?;

    let cleaned = OutlierCleaner::new(config.clone())
        .run(loaded.dataset)
        .with_context(|| format!("Failed to clean {country} data from {}", input.display()))?;

    let output = output_dir.join(format!("{}_clean.csv", slug(&country)));
    write_dataset(&output, &cleaned.dataset)?;
    log::info!(
        "{country}: {} of {} rows kept, written to {}",
        cleaned.report.rows_out,
        cleaned.report.rows_in,
        output.display()
    );

    let manifest = RunManifest {
        country: &country,
        input,
        output: &output,
        encoding: loaded.encoding,
        config: &config,
        report: &cleaned.report,
    };
    write_json(&reports_dir.join(format!("{country}_run.json")), &manifest)
}

fn compare(data_dir: &Path, reports_dir: &Path, config: ComparisonConfig) -> Result<()> {
    let pipeline = ComparisonPipeline::load(data_dir, config)?;
    let report = pipeline.run_all().context("Comparison failed")?;

    for n in &report.normality {
        log::info!(
            "{}: Shapiro-Wilk W={:.4}, p={:.4} ({:?}, n={})",
            n.country,
            n.w,
            n.p_value,
            n.verdict,
            n.sample_size
        );
    }
    let kw = &report.group_difference;
    log::info!(
        "Kruskal-Wallis on {}: H={:.4}, p={:.4} ({:?})",
        kw.metric,
        kw.h,
        kw.p_value,
        kw.verdict
    );

    write_table(&reports_dir.join("comparison_summary.csv"), &report.summary.to_table())?;
    write_table(&reports_dir.join("comparison_missing.csv"), &report.missing.to_table())?;
    write_json(&reports_dir.join("comparison_tests.json"), &report)
}

fn view(file: Option<PathBuf>, compare_dir: Option<PathBuf>) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Solar – Irradiance Viewer",
        options,
        Box::new(move |_cc| Ok(Box::new(SolarViewerApp::new(file, compare_dir)))),
    )
    .map_err(|e| anyhow!("viewer failed: {e}"))
}
