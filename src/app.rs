use std::path::PathBuf;

use eframe::egui;

use crate::state::ViewerState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct SolarViewerApp {
    pub state: ViewerState,
}

impl SolarViewerApp {
    /// Start with an optional data file and comparison folder already open.
    /// Load failures land in the status line rather than aborting startup.
    pub fn new(file: Option<PathBuf>, compare_dir: Option<PathBuf>) -> Self {
        let mut state = ViewerState::default();
        if let Some(path) = file {
            if let Err(e) = state.open_file(&path) {
                state.report_error("Failed to load file", &e);
            }
        }
        if let Some(dir) = compare_dir {
            if let Err(e) = state.open_comparison(&dir) {
                state.report_error("Failed to load comparison data", &e);
            }
        }
        Self { state }
    }
}

impl eframe::App for SolarViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: chart selector and date filter ----
        egui::SidePanel::left("chart_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: chart ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::chart_view(ui, &self.state);
        });
    }
}
