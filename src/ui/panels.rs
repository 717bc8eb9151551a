use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::aggregate::Reduction;
use crate::data::loader::Source;
use crate::data::model::Value;
use crate::state::{AppState, PlotKind};

// ---------------------------------------------------------------------------
// Left side panel – selectors
// ---------------------------------------------------------------------------

/// Render the left selection panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Selection");
    ui.separator();

    let session = match &state.session {
        Some(s) => s,
        None => {
            ui.label("No dataset loaded.");
            return;
        }
    };

    // Clone what we need so we can mutate state inside the closures.
    let columns = session.columns().clone();
    let states = session.distinct(&columns.state);
    let crops = session.distinct(&columns.crop);
    let years = session.distinct(&columns.year);
    let all_columns = session.dataset().column_names.clone();
    let numeric = session.dataset().numeric_columns();

    let mut changed = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- State / crop ----
            ui.strong(&columns.state);
            if let Some(pick) = value_combo(ui, "state_select", &state.selection.state, &states) {
                state.set_state(pick);
            }
            ui.strong(&columns.crop);
            if let Some(pick) = value_combo(ui, "crop_select", &state.selection.crop, &crops) {
                state.set_crop(pick);
            }

            // ---- Years (collapsible checkbox list) ----
            let checked_years: Vec<bool> = years.iter().map(|y| state.year_selected(y)).collect();
            let header_text = match state.selection.years {
                None => format!("{}  (all)", columns.year),
                Some(_) => format!(
                    "{}  ({}/{})",
                    columns.year,
                    checked_years.iter().filter(|c| **c).count(),
                    years.len()
                ),
            };
            egui::CollapsingHeader::new(RichText::new(header_text).strong())
                .id_salt("year_select")
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        if ui.small_button("All").clicked() {
                            state.select_all_years();
                        }
                        if ui.small_button("None").clicked() {
                            state.select_no_years();
                        }
                    });
                    for (year, &was_checked) in years.iter().zip(&checked_years) {
                        let mut checked = was_checked;
                        if ui.checkbox(&mut checked, year.to_string()).changed() {
                            state.toggle_year(year);
                        }
                    }
                });
            ui.separator();

            // ---- Visualization options ----
            ui.heading("Visualization");
            egui::ComboBox::from_id_salt("plot_kind")
                .selected_text(state.plot.kind.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for kind in PlotKind::ALL {
                        ui.selectable_value(&mut state.plot.kind, kind, kind.label());
                    }
                });
            if state.plot.kind != PlotKind::Heatmap {
                ui.label("X-axis column");
                let x_options = match state.plot.kind {
                    PlotKind::Histogram | PlotKind::Scatter => &numeric,
                    _ => &all_columns,
                };
                column_combo(ui, "x_column", &mut state.plot.x_column, x_options);
            }
            if state.plot.kind.uses_y() {
                ui.label("Y-axis column");
                column_combo(ui, "y_column", &mut state.plot.y_column, &numeric);
            }
            ui.separator();

            // ---- Aggregation ----
            ui.heading("Aggregation");
            ui.label("Group by");
            changed |= column_combo(ui, "group_by", &mut state.aggregation.group_by, &all_columns);
            ui.label("Target");
            changed |= column_combo(ui, "agg_target", &mut state.aggregation.target, &numeric);
            ui.horizontal(|ui: &mut Ui| {
                let before = state.aggregation.reduction;
                egui::ComboBox::from_id_salt("reduction")
                    .selected_text(before.to_string())
                    .show_ui(ui, |ui: &mut Ui| {
                        for r in Reduction::ALL {
                            ui.selectable_value(&mut state.aggregation.reduction, r, r.to_string());
                        }
                    });
                changed |= before != state.aggregation.reduction;

                ui.label("Top");
                changed |= ui
                    .add(egui::DragValue::new(&mut state.aggregation.top_n).range(1..=50))
                    .changed();
            });
            ui.separator();

            // ---- Views ----
            ui.heading("Views");
            ui.checkbox(&mut state.show_dataset, "Show dataset");
            ui.checkbox(&mut state.show_statistics, "Show descriptive statistics");
            ui.checkbox(&mut state.show_predictor, "Show yield predictor");
        });

    if changed {
        state.refresh();
    }
}

/// "All" plus one entry per value. Returns the new pick when it changed.
fn value_combo(
    ui: &mut Ui,
    id: &str,
    current: &Option<Value>,
    values: &[Value],
) -> Option<Option<Value>> {
    let mut picked = None;
    let text = current
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "All".to_string());
    egui::ComboBox::from_id_salt(id)
        .selected_text(text)
        .show_ui(ui, |ui: &mut Ui| {
            if ui.selectable_label(current.is_none(), "All").clicked() && current.is_some() {
                picked = Some(None);
            }
            for v in values {
                let is_current = current.as_ref() == Some(v);
                if ui.selectable_label(is_current, v.to_string()).clicked() && !is_current {
                    picked = Some(Some(v.clone()));
                }
            }
        });
    picked
}

/// Column picker. Returns `true` when the selection changed.
fn column_combo(ui: &mut Ui, id: &str, current: &mut Option<String>, options: &[String]) -> bool {
    let mut changed = false;
    egui::ComboBox::from_id_salt(id)
        .selected_text(current.clone().unwrap_or_default())
        .show_ui(ui, |ui: &mut Ui| {
            for col in options {
                let is_current = current.as_deref() == Some(col.as_str());
                if ui.selectable_label(is_current, col).clicked() && !is_current {
                    *current = Some(col.clone());
                    changed = true;
                }
            }
        });
    changed
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Load remote dataset").clicked() {
                state.load(Source::Url(state.config.source_url.clone()));
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(session) = &state.session {
            ui.label(format!(
                "{}: {} rows loaded, {} selected",
                session.source(),
                session.dataset().len(),
                state.visible_indices.len()
            ));
        }

        if let Some(e) = &state.selection_error {
            ui.separator();
            ui.label(RichText::new(e.to_string()).color(Color32::RED));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open dataset")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load(Source::File(path));
    }
}
