use eframe::egui::{self, Align2, Color32, FontId, RichText, Sense, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Line, Plot, PlotPoints, Points,
};

use crate::color::{diverging, ColorMap};
use crate::data::aggregate::{aggregate, Reduction};
use crate::data::filter::FilteredView;
use crate::data::model::Value;
use crate::data::stats;
use crate::state::{AggregationOutcome, AppState, Derived, PlotKind};

use super::{empty_label, error_label};

const PLOT_HEIGHT: f32 = 320.0;

// ---------------------------------------------------------------------------
// Main chart (central panel)
// ---------------------------------------------------------------------------

/// Render the chart selected in the side panel over the current selection.
pub fn main_chart(ui: &mut Ui, state: &AppState) {
    let Some(session) = &state.session else {
        return;
    };
    let dataset = session.dataset();
    let view = FilteredView::from_indices(dataset, state.visible_indices.clone());

    let kind = state.plot.kind;
    let x = state.plot.x_column.as_deref();
    let y = state.plot.y_column.as_deref();
    ui.heading(match (kind, x, y) {
        (PlotKind::Heatmap, _, _) => "Correlation heatmap".to_string(),
        (PlotKind::Histogram, Some(x), _) => format!("Histogram of {x}"),
        (PlotKind::Box, Some(x), Some(y)) => format!("Box Plot of {y} grouped by {x}"),
        (_, Some(x), Some(y)) => format!("{} of {y} vs {x}", kind.label()),
        _ => kind.label().to_string(),
    });

    if let Some(e) = &state.selection_error {
        error_label(ui, e);
        return;
    }
    if view.is_empty() {
        empty_label(ui);
        return;
    }

    let columns: Vec<&str> = match kind {
        PlotKind::Heatmap => Vec::new(),
        PlotKind::Histogram => x.into_iter().collect(),
        _ => [x, y].into_iter().flatten().collect(),
    };
    if let Err(e) = session.require(&columns) {
        error_label(ui, &e);
        return;
    }

    match (kind, x, y) {
        (PlotKind::Heatmap, _, _) => heatmap(ui, &view),
        (PlotKind::Histogram, Some(x), _) => histogram(ui, &view, x, state.config.histogram_bins),
        (PlotKind::Line, Some(x), Some(y)) => xy_plot(ui, &view, x, y, true),
        (PlotKind::Scatter, Some(x), Some(y)) => xy_plot(ui, &view, x, y, false),
        (PlotKind::Bar, Some(x), Some(y)) => bar_plot(ui, &view, x, y),
        (PlotKind::Box, Some(x), Some(y)) => box_plot(ui, &view, x, y),
        _ => {
            ui.label("Pick the columns to plot in the side panel.");
        }
    }
}

/// Line (sorted by x) or scatter of two numeric columns.
fn xy_plot(ui: &mut Ui, view: &FilteredView<'_>, x: &str, y: &str, as_line: bool) {
    let dataset = view.dataset();
    if !dataset.is_numeric(x) {
        ui.label(format!("'{x}' is not numeric; use a bar or box plot instead."));
        return;
    }
    let mut points: Vec<[f64; 2]> = view
        .rows()
        .filter_map(|row| Some([row.get(x).as_f64()?, row.get(y).as_f64()?]))
        .collect();
    if as_line {
        points.sort_by(|a, b| a[0].total_cmp(&b[0]));
    }

    Plot::new("xy_plot")
        .height(PLOT_HEIGHT)
        .x_axis_label(x)
        .y_axis_label(y)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            let series = PlotPoints::from(points);
            if as_line {
                plot_ui.line(Line::new(series).name(y).color(Color32::LIGHT_BLUE).width(1.5));
            } else {
                plot_ui.points(
                    Points::new(series)
                        .name(y)
                        .color(Color32::from_rgba_unmultiplied(70, 110, 220, 128))
                        .radius(3.0),
                );
            }
        });
}

/// Sum of `y` per value of `x`, one bar per category (stacked rows add up).
fn bar_plot(ui: &mut Ui, view: &FilteredView<'_>, x: &str, y: &str) {
    match aggregate(view, x, y, Reduction::Sum) {
        Ok(series) => {
            let entries: Vec<(Value, Option<f64>)> =
                series.into_iter().map(|(k, r)| (k, r.as_f64())).collect();
            category_bars(ui, "bar_plot", &entries, None, x, y);
        }
        Err(e) => error_label(ui, &e),
    }
}

fn histogram(ui: &mut Ui, view: &FilteredView<'_>, x: &str, bins: usize) {
    let values = view.numeric_values(x);
    let hist = match stats::histogram(&values, bins) {
        Ok(h) => h,
        Err(e) => {
            error_label(ui, &e);
            return;
        }
    };
    let width = hist.bin_width();
    let bars: Vec<Bar> = hist
        .counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            Bar::new(hist.center(i), count as f64)
                .width(width)
                .name(format!("{:.2} – {:.2}", hist.edges[i], hist.edges[i + 1]))
        })
        .collect();

    Plot::new("histogram")
        .height(PLOT_HEIGHT)
        .x_axis_label(x)
        .y_axis_label("count")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(Color32::LIGHT_BLUE));
        });
}

fn box_plot(ui: &mut Ui, view: &FilteredView<'_>, x: &str, y: &str) {
    let boxes = match stats::box_summary(view, x, y) {
        Ok(b) => b,
        Err(e) => {
            error_label(ui, &e);
            return;
        }
    };
    let labels: Vec<String> = boxes.keys().map(|k| k.to_string()).collect();
    let elems: Vec<BoxElem> = boxes
        .iter()
        .enumerate()
        .map(|(i, (key, b))| {
            BoxElem::new(
                i as f64,
                BoxSpread::new(b.lower_whisker, b.q1, b.median, b.q3, b.upper_whisker),
            )
            .name(key.to_string())
            .box_width(0.6)
        })
        .collect();

    Plot::new("box_plot")
        .height(PLOT_HEIGHT)
        .x_axis_label(x)
        .y_axis_label(y)
        .x_axis_formatter(move |mark: GridMark, _range| category_label(&labels, mark.value))
        .show(ui, |plot_ui| {
            plot_ui.box_plot(BoxPlot::new(elems).name(y));
        });
}

fn heatmap(ui: &mut Ui, view: &FilteredView<'_>) {
    let matrix = match stats::correlation_matrix(view) {
        Ok(m) => m,
        Err(e) => {
            error_label(ui, &e);
            return;
        }
    };

    egui::ScrollArea::horizontal().id_salt("heatmap_scroll").show(ui, |ui: &mut Ui| {
        egui::Grid::new("heatmap").spacing([2.0, 2.0]).show(ui, |ui: &mut Ui| {
            ui.label("");
            for col in &matrix.columns {
                ui.label(RichText::new(col).small());
            }
            ui.end_row();

            for (i, row_name) in matrix.columns.iter().enumerate() {
                ui.label(RichText::new(row_name).small());
                for (j, cell) in matrix.values[i].iter().enumerate() {
                    let (rect, response) =
                        ui.allocate_exact_size(egui::vec2(64.0, 26.0), Sense::hover());
                    let (fill, text) = match cell {
                        Some(r) => (diverging(*r), format!("{r:.2}")),
                        None => (Color32::DARK_GRAY, "n/a".to_string()),
                    };
                    ui.painter().rect_filled(rect, 2.0, fill);
                    ui.painter().text(
                        rect.center(),
                        Align2::CENTER_CENTER,
                        text,
                        FontId::proportional(12.0),
                        Color32::BLACK,
                    );
                    response.on_hover_text(format!("{row_name} × {}", matrix.columns[j]));
                }
                ui.end_row();
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Aggregation chart
// ---------------------------------------------------------------------------

/// Bars of the grouped series; groups without data are listed, not drawn as zero.
pub fn aggregation_chart(ui: &mut Ui, state: &AppState) {
    let (Some(group_by), Some(target)) = (&state.aggregation.group_by, &state.aggregation.target)
    else {
        ui.label("Pick a grouping column and a target.");
        return;
    };
    ui.heading(format!(
        "{} of {target} by {group_by}",
        state.aggregation.reduction
    ));

    match &state.aggregation_result {
        Derived::Empty => empty_label(ui),
        Derived::Failed(e) => error_label(ui, e),
        Derived::Ready(AggregationOutcome { series, .. }) => {
            let entries: Vec<(Value, Option<f64>)> =
                series.iter().map(|(k, r)| (k.clone(), r.as_f64())).collect();
            category_bars(
                ui,
                "aggregation_chart",
                &entries,
                state.color_map.as_ref(),
                group_by,
                &state.aggregation.reduction.to_string(),
            );
        }
    }
}

/// One bar per category at integer positions, labelled on the x axis.
fn category_bars(
    ui: &mut Ui,
    id: &str,
    entries: &[(Value, Option<f64>)],
    colors: Option<&ColorMap>,
    x_label: &str,
    y_label: &str,
) {
    let missing: Vec<String> = entries
        .iter()
        .filter(|(_, v)| v.is_none())
        .map(|(k, _)| k.to_string())
        .collect();
    let labels: Vec<String> = entries.iter().map(|(k, _)| k.to_string()).collect();
    let bars: Vec<Bar> = entries
        .iter()
        .enumerate()
        .filter_map(|(i, (key, v))| {
            let color = colors
                .map(|cm| cm.color_for(key))
                .unwrap_or(Color32::LIGHT_BLUE);
            v.map(|v| Bar::new(i as f64, v).name(key.to_string()).width(0.7).fill(color))
        })
        .collect();

    Plot::new(id)
        .height(PLOT_HEIGHT)
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .x_axis_formatter(move |mark: GridMark, _range| category_label(&labels, mark.value))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });

    if !missing.is_empty() {
        ui.label(format!("No data for: {}", missing.join(", ")));
    }
}

/// Axis text for integer positions of a categorical axis.
fn category_label(labels: &[String], position: f64) -> String {
    let rounded = position.round();
    if (position - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_only_on_integer_ticks() {
        let labels = vec!["A".to_string(), "B".to_string()];
        assert_eq!(category_label(&labels, 0.0), "A");
        assert_eq!(category_label(&labels, 1.0), "B");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -1.0), "");
        assert_eq!(category_label(&labels, 7.0), "");
    }
}
