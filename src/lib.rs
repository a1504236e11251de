//! Solar irradiance pipeline: load per-country measurement files, remove
//! outliers and impute gaps, report on the result, compare countries, and
//! chart everything in an egui viewer.

pub mod app;
pub mod charts;
pub mod clean;
pub mod color;
pub mod compare;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod state;
pub mod stats;
pub mod ui;
