use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::DateTime;
use eframe::egui::{Color32, RichText, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, Plot, PlotPoints, Points};

use crate::charts::{BoxStats, Bubble, ChartData, CorrelationMatrix, Histogram, ScatterSeries};
use crate::color::{diverging, generate_palette, sequential};
use crate::state::ViewerState;

const BUBBLE_HUE_BUCKETS: usize = 8;
const BUBBLE_SIZE_BUCKETS: usize = 4;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the selected chart in the central panel.
pub fn chart_view(ui: &mut Ui, state: &ViewerState) {
    let Some(data) = &state.chart_data else {
        let hint = if state.chart.needs_comparison() {
            "Open a folder of cleaned country files  (File → Open comparison folder…)"
        } else {
            "Open a file to view charts  (File → Open…)"
        };
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(hint);
        });
        return;
    };

    match data {
        ChartData::TimeSeries(series) => time_series(ui, series),
        ChartData::CleaningImpact { columns, groups } => {
            let labels: Vec<String> = groups.iter().map(|(v, _)| format!("Cleaning = {v}")).collect();
            let series: Vec<(String, Vec<Option<f64>>)> = columns
                .iter()
                .enumerate()
                .map(|(j, c)| (c.clone(), groups.iter().map(|(_, means)| means[j]).collect()))
                .collect();
            grouped_bars(ui, "cleaning_impact", labels, &series, "Average irradiance (W/m²)");
        }
        ChartData::Correlation(matrix) => correlation_table(ui, matrix),
        ChartData::Histograms(hists) => histograms(ui, hists),
        ChartData::Scatter(series) => scatters(ui, series),
        ChartData::Bubbles(points) => bubble_chart(ui, points),
        ChartData::BoxPlots(metrics) => box_plots(ui, state, metrics),
        ChartData::Ranking(ranking) => {
            let labels: Vec<String> = ranking.iter().map(|(c, _)| c.clone()).collect();
            let series: Vec<(String, Vec<Option<f64>>)> = vec![("Mean GHI".to_string(), ranking.iter().map(|(_, m)| Some(*m)).collect())];
            grouped_bars(ui, "ghi_ranking", labels, &series, "Mean GHI (W/m²)");
        }
    }
}

fn date_label(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    DateTime::from_timestamp(mark.value as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Category axis: integer marks map to `labels`, everything else is blank.
fn category_formatter(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let i = mark.value.round();
        if (mark.value - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        labels.get(i as usize).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Single-country charts
// ---------------------------------------------------------------------------

fn time_series(ui: &mut Ui, series: &[(String, Vec<[f64; 2]>)]) {
    let colors = generate_palette(series.len());
    let height = (ui.available_height() / 2.0 - 8.0).max(120.0);
    for (r, row) in series.chunks(2).enumerate() {
        ui.columns(2, |cols: &mut [Ui]| {
            for (c, (ui, (name, points))) in cols.iter_mut().zip(row).enumerate() {
                Plot::new(format!("time_series_{name}"))
                    .height(height)
                    .x_axis_label("Timestamp")
                    .y_axis_label(name.as_str())
                    .x_axis_formatter(date_label)
                    .show(ui, |plot_ui| {
                        plot_ui.line(
                            Line::new(PlotPoints::from(points.clone()))
                                .name(name)
                                .color(colors[r * 2 + c])
                                .width(1.5),
                        );
                    });
            }
        });
    }
}

fn grouped_bars(
    ui: &mut Ui,
    id: &str,
    categories: Vec<String>,
    series: &[(String, Vec<Option<f64>>)],
    y_label: &str,
) {
    let colors = generate_palette(series.len());
    let width = 0.8 / series.len().max(1) as f64;
    Plot::new(id)
        .legend(Legend::default())
        .y_axis_label(y_label)
        .x_axis_formatter(category_formatter(categories))
        .show(ui, |plot_ui| {
            for (j, (name, values)) in series.iter().enumerate() {
                let offset = (j as f64 - (series.len() as f64 - 1.0) / 2.0) * width;
                let bars = values
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| Some(Bar::new(i as f64 + offset, (*v)?).width(width)))
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars).name(name).color(colors[j]));
            }
        });
}

fn correlation_table(ui: &mut Ui, matrix: &CorrelationMatrix) {
    ui.heading("Correlation of solar metrics");
    ui.add_space(4.0);
    TableBuilder::new(ui)
        .striped(true)
        .column(TableColumn::auto())
        .columns(TableColumn::exact(72.0), matrix.labels.len())
        .header(20.0, |mut header| {
            header.col(|_ui| {});
            for label in &matrix.labels {
                header.col(|ui| {
                    ui.strong(label);
                });
            }
        })
        .body(|mut body| {
            for (label, row_values) in matrix.labels.iter().zip(&matrix.values) {
                body.row(22.0, |mut row| {
                    row.col(|ui| {
                        ui.strong(label);
                    });
                    for value in row_values {
                        row.col(|ui| match value {
                            Some(r) => {
                                ui.label(
                                    RichText::new(format!("{r:.2}"))
                                        .color(Color32::WHITE)
                                        .background_color(diverging(*r)),
                                );
                            }
                            None => {
                                ui.label("NaN");
                            }
                        });
                    }
                });
            }
        });
}

fn histograms(ui: &mut Ui, hists: &[(String, Histogram)]) {
    if hists.is_empty() {
        ui.label("No GHI or WS values in the selected range.");
        return;
    }
    let colors = generate_palette(hists.len());
    ui.columns(hists.len(), |cols: &mut [Ui]| {
        for (j, (ui, (name, hist))) in cols.iter_mut().zip(hists).enumerate() {
            let bars = hist
                .centers()
                .zip(&hist.counts)
                .map(|(x, n)| Bar::new(x, *n as f64).width(hist.bin_width))
                .collect();
            Plot::new(format!("histogram_{name}"))
                .x_axis_label(name.as_str())
                .y_axis_label("Count")
                .show(ui, |plot_ui| {
                    plot_ui.bar_chart(BarChart::new(bars).name(name).color(colors[j]));
                });
        }
    });
}

fn scatters(ui: &mut Ui, series: &[ScatterSeries]) {
    let colors = generate_palette(series.len());
    ui.columns(series.len().max(1), |cols: &mut [Ui]| {
        for (j, (ui, s)) in cols.iter_mut().zip(series).enumerate() {
            Plot::new(format!("scatter_{}_{}", s.x_label, s.y_label))
                .x_axis_label(s.x_label.as_str())
                .y_axis_label(s.y_label.as_str())
                .show(ui, |plot_ui| {
                    plot_ui.points(
                        Points::new(PlotPoints::from(s.points.clone()))
                            .radius(1.5)
                            .color(colors[j])
                            .name(format!("{} vs {}", s.y_label, s.x_label)),
                    );
                });
        }
    });
}

/// GHI vs Tamb; marker radius follows RH and colour follows BP. Bubbles are
/// bucketed so each (colour, size) pair is a single plot item.
fn bubble_chart(ui: &mut Ui, bubbles: &[Bubble]) {
    let span = |f: fn(&Bubble) -> f64| {
        let lo = bubbles.iter().map(f).fold(f64::INFINITY, f64::min);
        let hi = bubbles.iter().map(f).fold(f64::NEG_INFINITY, f64::max);
        (lo, (hi - lo).max(f64::EPSILON))
    };
    let (size_lo, size_span) = span(|b| b.size);
    let (hue_lo, hue_span) = span(|b| b.hue);
    let bucket = |v: f64, lo: f64, width: f64, n: usize| (((v - lo) / width * n as f64) as usize).min(n - 1);

    let mut groups: BTreeMap<(usize, usize), Vec<[f64; 2]>> = BTreeMap::new();
    for b in bubbles {
        let key = (
            bucket(b.hue, hue_lo, hue_span, BUBBLE_HUE_BUCKETS),
            bucket(b.size, size_lo, size_span, BUBBLE_SIZE_BUCKETS),
        );
        groups.entry(key).or_default().push([b.x, b.y]);
    }

    Plot::new("bubbles")
        .legend(Legend::default())
        .x_axis_label("GHI (W/m²)")
        .y_axis_label("Tamb (°C)")
        .show(ui, |plot_ui| {
            for ((h, s), points) in groups {
                let t = (h as f64 + 0.5) / BUBBLE_HUE_BUCKETS as f64;
                let bp = hue_lo + t * hue_span;
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .radius(2.0 + 2.0 * s as f32)
                        .color(sequential(t).gamma_multiply(0.6))
                        .name(format!("BP ≈ {bp:.0}")),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Comparison charts
// ---------------------------------------------------------------------------

fn box_plots(ui: &mut Ui, state: &ViewerState, metrics: &[(String, Vec<(String, BoxStats)>)]) {
    ui.columns(metrics.len().max(1), |cols: &mut [Ui]| {
        for (ui, (metric, boxes)) in cols.iter_mut().zip(metrics) {
            let labels: Vec<String> = boxes.iter().map(|(c, _)| c.clone()).collect();
            Plot::new(format!("box_{metric}"))
                .y_axis_label(format!("{metric} (W/m²)"))
                .x_axis_formatter(category_formatter(labels))
                .show(ui, |plot_ui| {
                    for (i, (country, b)) in boxes.iter().enumerate() {
                        let color = state
                            .country_colors
                            .as_ref()
                            .map_or(Color32::LIGHT_BLUE, |cc| cc.color_for(country));
                        let elem = BoxElem::new(
                            i as f64,
                            BoxSpread::new(b.lower_whisker, b.q1, b.median, b.q3, b.upper_whisker),
                        )
                        .name(country)
                        .fill(color.gamma_multiply(0.5))
                        .box_width(0.6);
                        plot_ui.box_plot(BoxPlot::new(vec![elem]).name(country).color(color));
                    }
                });
        }
    });
}
