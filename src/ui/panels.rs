use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::charts::ChartKind;
use crate::data::filter::DateRange;
use crate::state::ViewerState;

// ---------------------------------------------------------------------------
// Left side panel – chart selector and date filter
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut ViewerState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Chart");
            ui.separator();
            for kind in ChartKind::ALL {
                let mut text = RichText::new(kind.label());
                if kind.needs_comparison() && state.comparison.is_none() {
                    text = text.weak();
                }
                if ui.selectable_label(state.chart == kind, text).clicked() {
                    state.set_chart(kind);
                }
            }

            ui.add_space(8.0);
            ui.heading("Date range");
            ui.separator();
            date_filter(ui, state);

            if let Some(cmp) = &state.comparison {
                ui.add_space(8.0);
                ui.heading("Countries");
                ui.separator();
                for (country, mean) in &cmp.ranking {
                    let color = state
                        .country_colors
                        .as_ref()
                        .map_or(Color32::GRAY, |cc| cc.color_for(country));
                    ui.label(RichText::new(format!("{country}  (mean GHI {mean:.1})")).color(color));
                }
            }
        });
}

fn date_filter(ui: &mut Ui, state: &mut ViewerState) {
    let (Some(first), Some(last)) = (state.bounds.start, state.bounds.end) else {
        ui.label("No timestamps loaded.");
        return;
    };

    let mut start = state.range.start.unwrap_or(first);
    let mut end = state.range.end.unwrap_or(last);
    egui::Grid::new("date_range").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("From");
        ui.add(DatePickerButton::new(&mut start).id_salt("range_start"));
        ui.end_row();
        ui.label("To");
        ui.add(DatePickerButton::new(&mut end).id_salt("range_end"));
        ui.end_row();
    });
    if end < start {
        std::mem::swap(&mut start, &mut end);
    }
    state.set_range(DateRange {
        start: Some(start),
        end: Some(end),
    });

    if ui.small_button("Reset").clicked() {
        state.set_range(state.bounds);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut ViewerState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open comparison folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(ds), Some(path)) = (&state.dataset, &state.source) {
            let name = path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
            ui.label(format!(
                "{name}: {} rows, {} in range",
                ds.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut ViewerState) {
    let file = rfd::FileDialog::new()
        .set_title("Open irradiance data")
        .add_filter("Supported files", &["csv", "parquet", "pq", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        if let Err(e) = state.open_file(&path) {
            state.report_error("Failed to load file", &e);
        }
    }
}

pub fn open_folder_dialog(state: &mut ViewerState) {
    let dir = rfd::FileDialog::new()
        .set_title("Open folder of cleaned country files")
        .pick_folder();

    if let Some(dir) = dir {
        if let Err(e) = state.open_comparison(&dir) {
            state.report_error("Failed to load comparison data", &e);
        }
    }
}
