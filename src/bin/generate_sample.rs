use std::path::PathBuf;

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use rusty_solar::config::slug;
use rusty_solar::data::model::{Column, Dataset, Value};
use rusty_solar::data::writer::{write_dataset, write_parquet};

/// Write synthetic raw measurement files for Benin, Togo and Sierra Leone.
#[derive(Parser)]
#[command(about, long_about = None)]
struct Opt {
    #[arg(long, default_value = "data/raw")]
    out_dir: PathBuf,
    /// Days of 10-minute readings per country
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..))]
    days: u32,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Also write a Parquet copy of each file
    #[arg(long)]
    parquet: bool,
}

/// (label, peak GHI in W/m², mean ambient temperature in °C)
const COUNTRIES: [(&str, f64, f64); 3] = [("Benin", 950.0, 28.0), ("Togo", 900.0, 27.0), ("Sierra Leone", 800.0, 26.0)];

const STEP_MINUTES: i64 = 10;
const SPIKE_RATE: f64 = 0.002;
const BLANK_RATE: f64 = 0.01;
const UNIT_TEXT_RATE: f64 = 0.005;

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut ChaCha8Rng, mean: f64, std_dev: f64) -> f64 {
    let u1 = rng.gen::<f64>().max(1e-15);
    let u2 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// One reading per step: clear-sky irradiance shaped by a sine between 06:00
/// and 18:00, with temperature, humidity and wind loosely following it.
struct Reading {
    ghi: f64,
    dni: f64,
    dhi: f64,
    mod_a: f64,
    mod_b: f64,
    ws: f64,
    ws_gust: f64,
    wd: f64,
    tamb: f64,
    tmod_a: f64,
    tmod_b: f64,
    rh: f64,
    bp: f64,
}

fn reading(rng: &mut ChaCha8Rng, at: NaiveDateTime, peak: f64, tamb_mean: f64) -> Reading {
    let hour = at.hour() as f64 + at.minute() as f64 / 60.0;
    let sun = ((hour - 6.0) / 12.0 * std::f64::consts::PI).sin().max(0.0);
    let cloud = rng.gen_range(0.7..1.0);
    let ghi = (peak * sun * cloud + gauss(rng, 0.0, 5.0)).max(-2.0);
    let tamb = tamb_mean + 5.0 * (sun - 0.5) + gauss(rng, 0.0, 0.8);
    let ws = gauss(rng, 2.5, 1.0).abs();
    Reading {
        ghi,
        dni: (ghi * 0.75 + gauss(rng, 0.0, 10.0)).max(0.0),
        dhi: (ghi * 0.3 + gauss(rng, 0.0, 5.0)).max(0.0),
        mod_a: ghi * 0.95,
        mod_b: ghi * 0.93,
        ws,
        ws_gust: ws * rng.gen_range(1.2..1.8),
        wd: rng.gen_range(0.0..360.0),
        tamb,
        tmod_a: tamb + ghi / 40.0,
        tmod_b: tamb + ghi / 45.0,
        rh: (80.0 - (tamb - tamb_mean) * 4.0 + gauss(rng, 0.0, 3.0)).clamp(5.0, 100.0),
        bp: gauss(rng, 1000.0, 1.5).round(),
    }
}

fn country_dataset(rng: &mut ChaCha8Rng, days: u32, peak: f64, tamb_mean: f64) -> Result<Dataset> {
    let names = [
        "GHI", "DNI", "DHI", "ModA", "ModB", "WS", "WSgust", "WD", "Tamb", "TModA", "TModB", "RH", "BP",
    ];
    let start = NaiveDate::from_ymd_opt(2021, 8, 9)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("invalid start date"))?;
    let steps = i64::from(days) * 24 * 60 / STEP_MINUTES;

    let mut timestamps = Vec::new();
    let mut measurements: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
    let mut cleaning = Vec::new();
    for step in 0..steps {
        let at = start + Duration::minutes(step * STEP_MINUTES);
        let r = reading(rng, at, peak, tamb_mean);
        let row = [
            r.ghi, r.dni, r.dhi, r.mod_a, r.mod_b, r.ws, r.ws_gust, r.wd, r.tamb, r.tmod_a, r.tmod_b, r.rh, r.bp,
        ];
        for (col, v) in measurements.iter_mut().zip(row) {
            col.push(Value::Float((v * 10.0).round() / 10.0));
        }

        // Injected defects the cleaner has to deal with.
        if rng.gen_bool(SPIKE_RATE) {
            measurements[0][step as usize] = Value::Float(rng.gen_range(3000.0..6000.0));
        }
        if rng.gen_bool(BLANK_RATE) {
            let col = rng.gen_range(0..names.len());
            measurements[col][step as usize] = Value::Null;
        }
        if rng.gen_bool(UNIT_TEXT_RATE) {
            measurements[0][step as usize] = Value::String(format!("{:.1} W/m²", r.ghi));
        }

        timestamps.push(Value::Timestamp(at));
        // Panels are washed once a day, just after midnight.
        cleaning.push(Value::Integer((at.hour() == 0 && at.minute() == 0) as i64));
    }

    let mut columns = vec![Column::new("Timestamp", timestamps)];
    columns.extend(names.iter().zip(measurements).map(|(n, v)| Column::new(*n, v)));
    columns.push(Column::new("Cleaning", cleaning));
    columns.push(Column::new("Comments", vec![Value::Null; steps as usize]));
    Ok(Dataset::new(columns)?)
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::parse();
    let mut rng = ChaCha8Rng::seed_from_u64(opt.seed);

    for (label, peak, tamb_mean) in COUNTRIES {
        let dataset = country_dataset(&mut rng, opt.days, peak, tamb_mean)?;
        let stem = format!("{}_raw", slug(label));
        write_dataset(&opt.out_dir.join(format!("{stem}.csv")), &dataset)?;
        if opt.parquet {
            write_parquet(&opt.out_dir.join(format!("{stem}.parquet")), &dataset)?;
        }
        println!("Wrote {} rows for {label} to {}", dataset.len(), opt.out_dir.display());
    }
    Ok(())
}
